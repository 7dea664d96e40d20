use hedgebook_domain::services::consolidation::{consolidate, ConsolidationOptions};
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use hedgebook_infrastructure::artifacts::{ensure_dir, write_positions_csv};
use hedgebook_infrastructure::metatrader::parse_deals;
use std::path::PathBuf;

/// Offline consolidation of a saved history-deals payload. No network.
pub(super) fn run_consolidate(
    deals_path: PathBuf,
    key_prefix: String,
    account_code: Option<String>,
    tenant_id: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    if key_prefix.trim().is_empty() {
        return Err("--key-prefix must not be empty".to_string());
    }
    let body = std::fs::read_to_string(&deals_path)
        .map_err(|err| format!("failed to read deals {}: {}", deals_path.display(), err))?;
    let deals = parse_deals(&body)
        .map_err(|err| format!("failed to parse deals {}: {}", deals_path.display(), err))?;

    let options = ConsolidationOptions::new(key_prefix.trim());
    let mut records = consolidate(&deals, &options);
    if let Some(tenant_id) = tenant_id.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let code = account_code.as_deref().unwrap_or_default();
        records = records
            .into_iter()
            .map(|record| record.scoped_to_account(code, tenant_id))
            .collect::<Vec<HedgeRecord>>();
    }
    tracing::info!(
        deals = deals.len(),
        positions = records.len(),
        "consolidated deals file"
    );

    if let Some(out) = out.as_ref() {
        ensure_dir(out)?;
        write_positions_csv(&out.join("positions.csv"), &records)?;
    }

    let json = serde_json::to_string_pretty(&records)
        .map_err(|err| format!("failed to serialize records: {err}"))?;
    println!("{json}");
    Ok(())
}
