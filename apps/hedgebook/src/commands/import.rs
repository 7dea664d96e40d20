use super::parse_time_arg;
use hedgebook_application::config::{load_config, validate_config};
use hedgebook_application::import::{run_import as run_import_use_case, ImportDeps, ImportRequest, ImportSettings};
use hedgebook_domain::repositories::symbol_lookup::SymbolLookup;
use hedgebook_infrastructure::artifacts::{ensure_dir, write_positions_csv, write_summary_json};
use std::path::PathBuf;

pub(super) struct ImportArgs {
    pub config: PathBuf,
    pub account_id: String,
    pub tenant_id: String,
    pub account_code: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub out: Option<PathBuf>,
}

pub(super) fn run_import(args: ImportArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    validate_config(&config).map_err(|err| format!("invalid config: {err}"))?;

    let request = ImportRequest {
        account_id: args.account_id,
        tenant_id: args.tenant_id,
        account_code: args.account_code,
        from: parse_time_arg("from", args.from.as_deref())?,
        to: parse_time_arg("to", args.to.as_deref())?,
    };
    let settings = ImportSettings::from_config(&config);

    let crate::infra::ImportAdapters {
        deals,
        sessions,
        store,
        catalog,
    } = crate::infra::build_import_adapters(&config)?;
    let deps = ImportDeps {
        deals: deals.as_ref(),
        sessions: sessions.as_ref(),
        store: store.as_ref(),
        currency_lookup: catalog.as_ref().map(|c| c as &dyn SymbolLookup),
    };

    let mut session = None;
    let report = run_import_use_case(&request, &settings, &deps, &mut session, chrono::Utc::now())?;

    if let Some(out) = args.out.as_ref() {
        ensure_dir(out)?;
        write_positions_csv(&out.join("positions.csv"), &report.records)?;
        write_summary_json(&out.join("summary.json"), &report)?;
        tracing::info!(out = %out.display(), "wrote import artifacts");
    }

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize import report: {err}"))?;
    println!("{json}");
    Ok(())
}
