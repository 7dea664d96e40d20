use crate::config::Config;
use crate::upsert::BatchUpsertCoordinator;
use chrono::{DateTime, Duration, Utc};
use hedgebook_domain::repositories::deal_source::DealSource;
use hedgebook_domain::repositories::record_store::{RecordStore, SessionProvider};
use hedgebook_domain::repositories::symbol_lookup::SymbolLookup;
use hedgebook_domain::services::consolidation::{consolidate, ConsolidationOptions};
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use hedgebook_domain::value_objects::session::Session;
use hedgebook_domain::value_objects::upsert_outcome::UpsertOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// Account on the deal feed.
    pub account_id: String,
    /// Store-side account record that owns the imported positions.
    pub tenant_id: String,
    /// Short code scoping external keys; blank keeps the configured prefix.
    pub account_code: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub key_prefix: String,
    pub external_key_field: String,
    pub lookback_days: i64,
    pub preview_len: usize,
}

impl ImportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            key_prefix: config.import.key_prefix.clone(),
            external_key_field: config.store.external_id_field.clone(),
            lookback_days: config.import.lookback_days,
            preview_len: config.import.preview_len,
        }
    }
}

pub struct ImportDeps<'a> {
    pub deals: &'a dyn DealSource,
    pub sessions: &'a dyn SessionProvider,
    pub store: &'a dyn RecordStore,
    pub currency_lookup: Option<&'a dyn SymbolLookup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub account_id: String,
    pub tenant_id: String,
    pub account_code: String,
    pub time_range: TimeRange,
    pub total_deals: usize,
    pub consolidated_positions: usize,
    pub sent: usize,
    pub success: usize,
    pub created: usize,
    pub updated: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordErrors {
    pub index: usize,
    pub id: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub summary: ImportSummary,
    pub errors: Vec<RecordErrors>,
    pub preview: Vec<HedgeRecord>,
    pub outcomes: Vec<UpsertOutcome>,
    #[serde(skip)]
    pub records: Vec<HedgeRecord>,
}

/// Fetches deals for one account, consolidates them, scopes the records to
/// the tenant and upserts them. `session` is reused and refreshed in place.
pub fn run_import(
    request: &ImportRequest,
    settings: &ImportSettings,
    deps: &ImportDeps<'_>,
    session: &mut Option<Session>,
    now: DateTime<Utc>,
) -> Result<ImportReport, String> {
    let account_id = request.account_id.trim();
    let tenant_id = request.tenant_id.trim();
    let account_code = request.account_code.trim();
    if account_id.is_empty() {
        return Err("missing required parameter: account_id".to_string());
    }
    if tenant_id.is_empty() {
        return Err("missing required parameter: tenant_id".to_string());
    }
    let time_range = resolve_time_range(request.from, request.to, now, settings.lookback_days)?;

    tracing::info!(
        account_id,
        tenant_id,
        from = %time_range.from.to_rfc3339(),
        to = %time_range.to.to_rfc3339(),
        "import started"
    );

    let deals = deps
        .deals
        .fetch(account_id, time_range.from, time_range.to)
        .map_err(|err| format!("deal feed fetch failed: {err}"))?;

    let mut summary = ImportSummary {
        account_id: account_id.to_string(),
        tenant_id: tenant_id.to_string(),
        account_code: account_code.to_string(),
        time_range,
        total_deals: deals.len(),
        consolidated_positions: 0,
        sent: 0,
        success: 0,
        created: 0,
        updated: 0,
        error_count: 0,
    };

    if deals.is_empty() {
        tracing::info!(account_id, "no deals returned for the requested range");
        return Ok(ImportReport {
            message: Some("no deals returned for the requested range".to_string()),
            summary,
            errors: Vec::new(),
            preview: Vec::new(),
            outcomes: Vec::new(),
            records: Vec::new(),
        });
    }

    let mut options = ConsolidationOptions::new(settings.key_prefix.as_str());
    if let Some(lookup) = deps.currency_lookup {
        let active = match session.take() {
            Some(existing) => existing,
            None => deps
                .sessions
                .login()
                .map_err(|err| format!("record store login failed: {err}"))?,
        };
        lookup.prepare(session.insert(active));
        options = options.with_currency_lookup(lookup);
    }
    let consolidated = consolidate(&deals, &options);
    summary.consolidated_positions = consolidated.len();

    let records: Vec<HedgeRecord> = consolidated
        .into_iter()
        .map(|record| record.scoped_to_account(account_code, tenant_id))
        .collect();
    summary.sent = records.len();

    let coordinator =
        BatchUpsertCoordinator::new(deps.store, deps.sessions, settings.external_key_field.as_str());
    let outcomes = coordinator
        .batch_upsert(session, &records)
        .map_err(|err| format!("record store upsert failed: {err}"))?;

    let errors = collect_record_errors(&outcomes);
    summary.success = outcomes.iter().filter(|outcome| outcome.success).count();
    summary.created = outcomes.iter().filter(|outcome| outcome.created).count();
    summary.updated = outcomes.iter().filter(|outcome| outcome.is_update()).count();
    summary.error_count = errors.len();

    tracing::info!(
        account_id,
        deals = summary.total_deals,
        positions = summary.consolidated_positions,
        success = summary.success,
        created = summary.created,
        updated = summary.updated,
        errors = summary.error_count,
        "import finished"
    );

    Ok(ImportReport {
        message: None,
        summary,
        errors,
        preview: records.iter().take(settings.preview_len).cloned().collect(),
        outcomes,
        records,
    })
}

/// Defaults to the last `lookback_days` up to `now`; rejects `from > to`.
pub fn resolve_time_range(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    lookback_days: i64,
) -> Result<TimeRange, String> {
    let to = to.unwrap_or(now);
    let from = match from {
        Some(from) => from,
        None => Duration::try_days(lookback_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| "import.lookback_days out of range".to_string())?,
    };
    if from > to {
        return Err("invalid range: 'from' must be <= 'to'".to_string());
    }
    Ok(TimeRange { from, to })
}

fn collect_record_errors(outcomes: &[UpsertOutcome]) -> Vec<RecordErrors> {
    outcomes
        .iter()
        .enumerate()
        .filter(|(_, outcome)| !outcome.errors.is_empty())
        .map(|(index, outcome)| RecordErrors {
            index,
            id: outcome.id.clone(),
            errors: outcome.errors.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::resolve_time_range;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn time_range_defaults_to_lookback_window() {
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        let range = resolve_time_range(None, None, now, 30).expect("range");
        assert_eq!(range.to, now);
        assert_eq!(range.from, now - Duration::days(30));
    }

    #[test]
    fn time_range_rejects_inverted_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        let err = resolve_time_range(Some(now), Some(now - Duration::hours(1)), now, 30)
            .expect_err("inverted");
        assert!(err.contains("'from' must be <= 'to'"));
        assert!(resolve_time_range(Some(now), Some(now), now, 30).is_ok());
    }

    #[test]
    fn time_range_rejects_lookback_beyond_calendar() {
        let now = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        let err = resolve_time_range(None, None, now, 1_000_000_000_000_000).expect_err("overflow");
        assert_eq!(err, "import.lookback_days out of range");
        // A near-limit window that no longer fits below `now`.
        let err = resolve_time_range(None, None, now, 100_000_000).expect_err("underflow");
        assert_eq!(err, "import.lookback_days out of range");
        // An explicit start never consults the lookback.
        assert!(resolve_time_range(Some(now), None, now, i64::MAX).is_ok());
    }
}
