use reqwest::blocking::Client;
use std::time::{Duration, Instant};

/// Longest slice of a response body kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

pub fn build_client(timeout_ms: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|err| format!("failed to build http client: {err}"))
}

pub fn record_call_metrics<T, E>(kind: &'static str, start: Instant, result: &Result<T, E>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "hedgebook.infra.http.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("hedgebook.infra.http.call_ms", "kind" => kind)
        .record(start.elapsed().as_millis() as f64);
}

/// Shortens a response body for logs and errors, on a char boundary.
pub fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::truncate_body;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("  {\"error\":\"x\"}\n"), "{\"error\":\"x\"}");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let body = "é".repeat(400);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 512 + 3);
    }
}
