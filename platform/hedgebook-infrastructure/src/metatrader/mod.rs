use crate::http::{build_client, record_call_metrics, truncate_body};
use chrono::{DateTime, SecondsFormat, Utc};
use hedgebook_domain::repositories::deal_source::{DealSource, FeedError};
use hedgebook_domain::value_objects::deal::Deal;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Instant;

/// History-deals reader for the MetaTrader cloud API.
pub struct MetaTraderDealFeed {
    base_url: String,
    token: String,
    timeout_ms: u64,
    client: Client,
}

impl MetaTraderDealFeed {
    pub fn new(base_url: &str, token: String, timeout_ms: u64) -> Result<Self, String> {
        let client = build_client(timeout_ms)?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token,
            timeout_ms,
            client,
        })
    }

    pub fn deals_url(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<String, FeedError> {
        let account_id = account_id.trim();
        if account_id.is_empty() || account_id.contains(&['/', '?', '#'][..]) {
            return Err(FeedError::Config(format!(
                "invalid feed account id: {account_id:?}"
            )));
        }
        Ok(format!(
            "{}/users/current/accounts/{}/history-deals/time/{}/{}",
            self.base_url,
            account_id,
            from.to_rfc3339_opts(SecondsFormat::Millis, true),
            to.to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }

    fn fetch_inner(&self, url: &str) -> Result<Vec<Deal>, FeedError> {
        let response = self
            .client
            .get(url)
            .header("auth-token", &self.token)
            .header("accept", "application/json")
            .send()
            .map_err(|err| FeedError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| FeedError::Transport(format!("failed to read body: {err}")))?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FeedError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        parse_deals(&body)
    }
}

impl fmt::Debug for MetaTraderDealFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaTraderDealFeed")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl DealSource for MetaTraderDealFeed {
    fn fetch(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Deal>, FeedError> {
        let url = self.deals_url(account_id, from, to)?;
        let span = tracing::info_span!(
            "infra.metatrader.history_deals",
            account_id = %account_id.trim(),
            timeout_ms = self.timeout_ms
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.fetch_inner(&url);
        record_call_metrics("feed_deals", start, &result);
        match &result {
            Ok(deals) => tracing::info!(count = deals.len(), "fetched deals"),
            Err(err) => tracing::warn!(error = %err, "deal fetch failed"),
        }
        result
    }
}

/// Decodes a history-deals body. Anything but a JSON array reads as no deals.
pub fn parse_deals(body: &str) -> Result<Vec<Deal>, FeedError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|err| FeedError::Decode(format!("invalid json: {err}")))?;
    match value {
        Value::Array(items) => {
            let total = items.len();
            let deals: Vec<Deal> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Deal>(item).ok())
                .collect();
            if deals.len() < total {
                tracing::debug!(skipped = total - deals.len(), "skipped non-object deal entries");
            }
            Ok(deals)
        }
        other => {
            tracing::debug!(kind = json_kind(&other), "deal feed returned a non-array body");
            Ok(Vec::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_deals, MetaTraderDealFeed};
    use chrono::{TimeZone, Utc};
    use hedgebook_domain::repositories::deal_source::FeedError;
    use hedgebook_domain::value_objects::deal::EntryType;

    fn feed() -> MetaTraderDealFeed {
        MetaTraderDealFeed::new(
            "https://mt-client-api-v1.london.agiliumtrade.ai/",
            "secret-token".to_string(),
            1_000,
        )
        .expect("feed")
    }

    #[test]
    fn deals_url_uses_millisecond_iso_bounds() {
        let from = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 9, 30, 12, 30, 0).unwrap();
        let url = feed().deals_url(" acc-1 ", from, to).expect("url");
        assert_eq!(
            url,
            "https://mt-client-api-v1.london.agiliumtrade.ai/users/current/accounts/acc-1/history-deals/time/2025-09-01T00:00:00.000Z/2025-09-30T12:30:00.000Z"
        );
    }

    #[test]
    fn deals_url_rejects_path_characters() {
        let now = Utc::now();
        assert!(matches!(
            feed().deals_url("../admin", now, now),
            Err(FeedError::Config(_))
        ));
        assert!(matches!(feed().deals_url("  ", now, now), Err(FeedError::Config(_))));
    }

    #[test]
    fn parse_deals_reads_arrays_and_ignores_other_shapes() {
        let body = r#"[
            {"id":"1","positionId":"P1","entryType":"DEAL_ENTRY_IN","type":"DEAL_TYPE_BUY","volume":1,"price":100,"platform":"mt5"},
            {"id":"2","entryType":"DEAL_ENTRY_BALANCE","profit":1000}
        ]"#;
        let deals = parse_deals(body).expect("deals");
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].entry_type, EntryType::In);
        assert_eq!(deals[0].position_key(), Some("P1"));

        assert!(parse_deals(r#"{"message":"no data"}"#).expect("object").is_empty());
        assert!(parse_deals("").expect("empty").is_empty());
    }

    #[test]
    fn parse_deals_rejects_malformed_json_and_skips_non_objects() {
        assert!(matches!(parse_deals("[{"), Err(FeedError::Decode(_))));
        let deals = parse_deals(r#"[42, {"id":"7"}]"#).expect("deals");
        assert_eq!(deals.len(), 1);
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", feed());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("base_url"));
    }
}
