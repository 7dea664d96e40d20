use hedgebook_application::config::{load_config_with_source, validate_config};
use std::path::PathBuf;

pub(super) fn run_validate(config_path: PathBuf) -> Result<(), String> {
    let (config, source) = load_config_with_source(&config_path)?;
    validate_config(&config).map_err(|err| format!("invalid config: {err}"))?;
    // Resolves secrets and builds clients without touching the network.
    let adapters = crate::infra::build_import_adapters(&config)?;

    println!(
        "hedgebook: config ok ({}, {} bytes): feed={}, store={} sobject={} key_field={}, catalog={}, key_prefix={}",
        config_path.display(),
        source.len(),
        config.feed.base_url,
        config.store.login_url,
        config.store.sobject,
        config.store.external_id_field,
        if adapters.catalog.is_some() { "on" } else { "off" },
        config.import.key_prefix,
    );
    Ok(())
}
