use chrono::{DateTime, SecondsFormat, Utc};
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "hedgebook.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("hedgebook.infra.artifacts.write_ms", "kind" => kind)
        .record(start.elapsed().as_millis() as f64);
}

pub fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path).map_err(|err| format!("failed to create dir {}: {}", path.display(), err))
}

pub fn write_positions_csv(path: &Path, records: &[HedgeRecord]) -> Result<(), String> {
    let start = Instant::now();
    let result = write_positions_csv_inner(path, records);
    record_write_metrics("positions_csv", start, &result);
    result
}

fn write_positions_csv_inner(path: &Path, records: &[HedgeRecord]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create positions csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "external_key",
        "position_key",
        "trading_account_id",
        "symbol",
        "currency_id",
        "side",
        "total_profit",
        "total_commission",
        "total_swap",
        "open_time",
        "open_price",
        "open_volume",
        "close_time",
        "close_price",
        "weighted_close_price",
        "outcome",
        "stop_loss_price",
        "take_profit_price",
    ])
    .map_err(|err| format!("failed to write positions csv header: {}", err))?;

    for record in records {
        wtr.write_record([
            record.external_key.clone(),
            record.position_key.clone(),
            text(record.trading_account_id.as_deref()),
            text(record.symbol.as_deref()),
            text(record.currency_id.as_deref()),
            text(record.side.map(|side| side.as_str())),
            record.total_profit.to_string(),
            record.total_commission.to_string(),
            record.total_swap.to_string(),
            time(record.open_time),
            number(record.open_price),
            number(record.open_volume),
            time(record.close_time),
            number(record.close_price),
            number(record.weighted_close_price),
            text(record.outcome.map(|outcome| outcome.as_str())),
            number(record.stop_loss_price),
            number(record.take_profit_price),
        ])
        .map_err(|err| format!("failed to write positions row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush positions csv: {}", err))
}

pub fn write_summary_json<T: Serialize>(path: &Path, summary: &T) -> Result<(), String> {
    let start = Instant::now();
    let result = serde_json::to_string_pretty(summary)
        .map_err(|err| format!("failed to serialize summary: {err}"))
        .and_then(|json| {
            fs::write(path, json)
                .map_err(|err| format!("failed to write summary {}: {}", path.display(), err))
        });
    record_write_metrics("summary_json", start, &result);
    result
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
