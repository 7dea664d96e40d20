use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const FEED_TOKEN_ENV: &str = "HEDGEBOOK_FEED_TOKEN";
pub const STORE_CLIENT_ID_ENV: &str = "HEDGEBOOK_STORE_CLIENT_ID";
pub const STORE_CLIENT_SECRET_ENV: &str = "HEDGEBOOK_STORE_CLIENT_SECRET";
pub const STORE_USERNAME_ENV: &str = "HEDGEBOOK_STORE_USERNAME";
pub const STORE_PASSWORD_ENV: &str = "HEDGEBOOK_STORE_PASSWORD";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub catalog: Option<CatalogConfig>,
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub base_url: String,
    pub token: Option<String>,
    #[serde(default = "default_feed_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub login_url: String,
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_store_api_version")]
    pub api_version: String,
    #[serde(default = "default_sobject")]
    pub sobject: String,
    #[serde(default = "default_external_id_field")]
    pub external_id_field: String,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_catalog_api_version")]
    pub api_version: String,
    #[serde(default = "default_catalog_sobject")]
    pub sobject: String,
    #[serde(default = "default_catalog_ttl_seconds")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    pub key_prefix: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
}

fn default_feed_timeout_ms() -> u64 {
    60_000
}

fn default_store_timeout_ms() -> u64 {
    30_000
}

fn default_grant_type() -> String {
    "password".to_string()
}

fn default_store_api_version() -> String {
    "v60.0".to_string()
}

fn default_sobject() -> String {
    "SR_Hedge__c".to_string()
}

fn default_external_id_field() -> String {
    "UUID_Text__c".to_string()
}

fn default_true() -> bool {
    true
}

fn default_catalog_api_version() -> String {
    "v61.0".to_string()
}

fn default_catalog_sobject() -> String {
    "Currency__c".to_string()
}

fn default_catalog_ttl_seconds() -> u64 {
    300
}

/// Upper bound on the default import window (about one hundred years).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

fn default_lookback_days() -> i64 {
    30
}

fn default_preview_len() -> usize {
    5
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

/// Checks values serde cannot: URLs, timeouts and import knobs.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if !is_http_url(&config.feed.base_url) {
        problems.push("feed.base_url must be an http(s) URL".to_string());
    }
    if config.feed.timeout_ms == 0 {
        problems.push("feed.timeout_ms must be > 0".to_string());
    }
    if !is_http_url(&config.store.login_url) {
        problems.push("store.login_url must be an http(s) URL".to_string());
    }
    if config.store.timeout_ms == 0 {
        problems.push("store.timeout_ms must be > 0".to_string());
    }
    for (name, value) in [
        ("store.grant_type", &config.store.grant_type),
        ("store.api_version", &config.store.api_version),
        ("store.sobject", &config.store.sobject),
        ("store.external_id_field", &config.store.external_id_field),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("{name} must not be empty"));
        }
    }
    if let Some(catalog) = config.catalog.as_ref() {
        if catalog.sobject.trim().is_empty() {
            problems.push("catalog.sobject must not be empty".to_string());
        }
        if catalog.ttl_seconds == 0 {
            problems.push("catalog.ttl_seconds must be > 0".to_string());
        }
    }
    if config.import.key_prefix.trim().is_empty() {
        problems.push("import.key_prefix must not be empty".to_string());
    }
    if config.import.lookback_days <= 0 || config.import.lookback_days > MAX_LOOKBACK_DAYS {
        problems.push(format!("import.lookback_days must be in 1..={MAX_LOOKBACK_DAYS}"));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

/// Returns the configured value when set, otherwise the environment variable.
pub fn resolve_secret(value: Option<&str>, env_key: &str) -> Result<String, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => std::env::var(env_key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| format!("missing value in config and env {env_key} is not set")),
    }
}

fn is_http_url(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.starts_with("https://") || trimmed.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::{resolve_secret, validate_config, Config, MAX_LOOKBACK_DAYS};

    const SAMPLE: &str = r#"
[feed]
base_url = "https://mt-client-api-v1.london.agiliumtrade.ai"

[store]
login_url = "https://login.salesforce.com"

[catalog]

[import]
key_prefix = "AT-0010"
"#;

    fn parse_config(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("config should parse")
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = parse_config(SAMPLE);
        assert_eq!(config.feed.timeout_ms, 60_000);
        assert_eq!(config.store.grant_type, "password");
        assert_eq!(config.store.api_version, "v60.0");
        assert_eq!(config.store.sobject, "SR_Hedge__c");
        assert_eq!(config.store.external_id_field, "UUID_Text__c");
        let catalog = config.catalog.as_ref().expect("catalog");
        assert!(catalog.enabled);
        assert_eq!(catalog.ttl_seconds, 300);
        assert_eq!(config.import.lookback_days, 30);
        assert_eq!(config.import.preview_len, 5);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let toml_str = SAMPLE.replace("[catalog]", "[catalog]\nrefresh = true");
        let err = toml::from_str::<Config>(&toml_str).expect_err("unknown field");
        assert!(err.to_string().contains("refresh"));
    }

    #[test]
    fn parse_config_rejects_malformed_toml() {
        let err = toml::from_str::<Config>("[feed\nbase_url = 1").expect_err("malformed");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = parse_config(SAMPLE);
        config.feed.base_url = "ftp://feed".to_string();
        config.import.lookback_days = 0;
        config.import.key_prefix = " ".to_string();
        let err = validate_config(&config).expect_err("invalid");
        assert!(err.contains("feed.base_url"));
        assert!(err.contains("import.lookback_days"));
        assert!(err.contains("import.key_prefix"));
    }

    #[test]
    fn validate_rejects_oversized_lookback() {
        let mut config = parse_config(
            &SAMPLE.replace("[import]", "[import]\nlookback_days = 1000000000000000"),
        );
        assert_eq!(config.import.lookback_days, 1_000_000_000_000_000);
        let err = validate_config(&config).expect_err("too large");
        assert!(err.contains("import.lookback_days must be in 1..=36500"));

        config.import.lookback_days = MAX_LOOKBACK_DAYS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn resolve_secret_prefers_config_value() {
        assert_eq!(
            resolve_secret(Some("inline"), "HEDGEBOOK_TEST_UNSET_SECRET").expect("secret"),
            "inline"
        );
        let err = resolve_secret(Some("  "), "HEDGEBOOK_TEST_UNSET_SECRET").expect_err("missing");
        assert!(err.contains("HEDGEBOOK_TEST_UNSET_SECRET"));
    }
}
