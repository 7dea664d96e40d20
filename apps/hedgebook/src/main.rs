mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hedgebook")]
#[command(about = "Consolidate MetaTrader deals into Salesforce hedge records", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  hedgebook validate --config configs/hedgebook.toml\n  hedgebook import --config configs/hedgebook.toml --account-id <mt-account> --tenant-id <sf-account> --account-code AT-0010\n  hedgebook consolidate --deals deals.json --key-prefix AT-0010 --out runs/offline/\n"
)]
struct Cli {
    /// Default log filter when HEDGEBOOK_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: text | json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Serve Prometheus metrics on host:port (requires feature `prometheus`).
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Fetch deals for one account, consolidate them and upsert the positions.
    Import {
        #[arg(long, env = "HEDGEBOOK_CONFIG")]
        config: PathBuf,
        /// MetaTrader account id.
        #[arg(long)]
        account_id: String,
        /// Salesforce account record that owns the positions.
        #[arg(long)]
        tenant_id: String,
        /// Prefix for external keys (`<code>-<position>`); defaults to import.key_prefix.
        #[arg(long, default_value = "")]
        account_code: String,
        /// Window start (RFC3339); defaults to now minus import.lookback_days.
        #[arg(long)]
        from: Option<String>,
        /// Window end (RFC3339); defaults to now.
        #[arg(long)]
        to: Option<String>,
        /// Directory for positions.csv and summary.json.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Consolidate a saved history-deals JSON file without any network calls.
    Consolidate {
        #[arg(long)]
        deals: PathBuf,
        #[arg(long)]
        key_prefix: String,
        #[arg(long)]
        account_code: Option<String>,
        #[arg(long)]
        tenant_id: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the config file and that every secret resolves.
    Validate {
        #[arg(long, env = "HEDGEBOOK_CONFIG")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Import {
            config,
            account_id,
            tenant_id,
            account_code,
            from,
            to,
            out,
        } => Command::Import {
            config,
            account_id,
            tenant_id,
            account_code,
            from,
            to,
            out,
        },
        CliCommand::Consolidate {
            deals,
            key_prefix,
            account_code,
            tenant_id,
            out,
        } => Command::Consolidate {
            deals,
            key_prefix,
            account_code,
            tenant_id,
            out,
        },
        CliCommand::Validate { config } => Command::Validate { config },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
