use hedgebook_application::config::{
    resolve_secret, Config, FEED_TOKEN_ENV, STORE_CLIENT_ID_ENV, STORE_CLIENT_SECRET_ENV,
    STORE_PASSWORD_ENV, STORE_USERNAME_ENV,
};
use hedgebook_domain::repositories::deal_source::DealSource;
use hedgebook_domain::repositories::record_store::{RecordStore, SessionProvider};
use hedgebook_infrastructure::metatrader::MetaTraderDealFeed;
use hedgebook_infrastructure::salesforce::{
    SalesforceAuth, SalesforceCredentials, SalesforceRecordStore, SymbolCatalog,
};

pub struct ImportAdapters {
    pub deals: Box<dyn DealSource>,
    pub sessions: Box<dyn SessionProvider>,
    pub store: Box<dyn RecordStore>,
    pub catalog: Option<SymbolCatalog>,
}

pub fn build_import_adapters(config: &Config) -> Result<ImportAdapters, String> {
    Ok(ImportAdapters {
        deals: Box::new(build_deal_feed(config)?),
        sessions: Box::new(build_auth(config)?),
        store: Box::new(build_record_store(config)?),
        catalog: build_catalog(config)?,
    })
}

fn build_deal_feed(config: &Config) -> Result<MetaTraderDealFeed, String> {
    let token = resolve_secret(config.feed.token.as_deref(), FEED_TOKEN_ENV)
        .map_err(|err| format!("feed.token: {err}"))?;
    MetaTraderDealFeed::new(&config.feed.base_url, token, config.feed.timeout_ms)
}

fn build_auth(config: &Config) -> Result<SalesforceAuth, String> {
    let store = &config.store;
    let secret = |value: &Option<String>, name: &str, env_key: &str| {
        resolve_secret(value.as_deref(), env_key).map_err(|err| format!("store.{name}: {err}"))
    };
    let credentials = SalesforceCredentials {
        login_url: store.login_url.clone(),
        grant_type: store.grant_type.clone(),
        client_id: secret(&store.client_id, "client_id", STORE_CLIENT_ID_ENV)?,
        client_secret: secret(&store.client_secret, "client_secret", STORE_CLIENT_SECRET_ENV)?,
        username: secret(&store.username, "username", STORE_USERNAME_ENV)?,
        password: secret(&store.password, "password", STORE_PASSWORD_ENV)?,
    };
    SalesforceAuth::new(credentials, store.timeout_ms)
}

fn build_record_store(config: &Config) -> Result<SalesforceRecordStore, String> {
    SalesforceRecordStore::new(
        &config.store.api_version,
        &config.store.sobject,
        config.store.timeout_ms,
    )
}

fn build_catalog(config: &Config) -> Result<Option<SymbolCatalog>, String> {
    match config.catalog.as_ref() {
        Some(catalog) if catalog.enabled => SymbolCatalog::new(
            &catalog.api_version,
            &catalog.sobject,
            catalog.ttl_seconds,
            config.store.timeout_ms,
        )
        .map(Some),
        _ => Ok(None),
    }
}
