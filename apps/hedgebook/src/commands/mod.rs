mod consolidate;
mod import;
mod validate;

use chrono::{DateTime, Utc};
use hedgebook_domain::value_objects::deal::parse_deal_time;
use std::path::PathBuf;

pub enum Command {
    Import {
        config: PathBuf,
        account_id: String,
        tenant_id: String,
        account_code: String,
        from: Option<String>,
        to: Option<String>,
        out: Option<PathBuf>,
    },
    Consolidate {
        deals: PathBuf,
        key_prefix: String,
        account_code: Option<String>,
        tenant_id: Option<String>,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Import { .. } => "import",
            Command::Consolidate { .. } => "consolidate",
            Command::Validate { .. } => "validate",
        }
    }
}

pub fn run(command: Command) -> Result<(), String> {
    let name = command.name();
    let result = match command {
        Command::Import {
            config,
            account_id,
            tenant_id,
            account_code,
            from,
            to,
            out,
        } => import::run_import(import::ImportArgs {
            config,
            account_id,
            tenant_id,
            account_code,
            from,
            to,
            out,
        }),
        Command::Consolidate {
            deals,
            key_prefix,
            account_code,
            tenant_id,
            out,
        } => consolidate::run_consolidate(deals, key_prefix, account_code, tenant_id, out),
        Command::Validate { config } => validate::run_validate(config),
    };
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("hedgebook.cli.commands_total", "command" => name, "result" => result_label)
        .increment(1);
    result
}

/// Optional CLI time bound; accepts the same formats as deal timestamps.
fn parse_time_arg(flag: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_deal_time(raw)
            .map(Some)
            .ok_or_else(|| format!("invalid --{flag} {raw:?} (expected RFC3339 or YYYY-MM-DD HH:MM:SS)")),
    }
}
