use super::status_error;
use super::wire::{NamedRecord, QueryPage};
use crate::http::{build_client, record_call_metrics};
use hedgebook_domain::repositories::record_store::StoreError;
use hedgebook_domain::repositories::symbol_lookup::SymbolLookup;
use hedgebook_domain::value_objects::session::Session;
use parking_lot::RwLock;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Guards against a cursor that never terminates.
const MAX_QUERY_PAGES: usize = 500;

#[derive(Default)]
struct CatalogState {
    ids_by_name: HashMap<String, String>,
    loaded_at: Option<Instant>,
}

/// Symbol name to record id cache, loaded with a SOQL query over the
/// catalog object. Names match case-insensitively after trimming.
pub struct SymbolCatalog {
    api_version: String,
    sobject: String,
    ttl: Duration,
    client: Client,
    state: RwLock<CatalogState>,
}

impl SymbolCatalog {
    pub fn new(
        api_version: &str,
        sobject: &str,
        ttl_seconds: u64,
        timeout_ms: u64,
    ) -> Result<Self, String> {
        Ok(Self {
            api_version: api_version.trim().to_string(),
            sobject: sobject.trim().to_string(),
            ttl: Duration::from_secs(ttl_seconds.max(1)),
            client: build_client(timeout_ms)?,
            state: RwLock::new(CatalogState::default()),
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().ids_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stale(&self) -> bool {
        match self.state.read().loaded_at {
            Some(loaded_at) => loaded_at.elapsed() >= self.ttl,
            None => true,
        }
    }

    pub fn soql(&self) -> String {
        format!("SELECT Id, Name FROM {}", self.sobject)
    }

    /// Reloads every page of the catalog and swaps the cache in one step.
    /// On failure the previous entries stay in place.
    pub fn refresh(&self, session: &Session) -> Result<usize, StoreError> {
        let start = Instant::now();
        let result = self.fetch_all(session);
        record_call_metrics("catalog_query", start, &result);
        let records = result?;
        let count = self.replace_entries(records);
        tracing::info!(count, sobject = %self.sobject, "symbol catalog refreshed");
        Ok(count)
    }

    /// Refreshes when the TTL has elapsed. Returns whether the cache is
    /// usable afterwards; a failed refresh is logged and keeps old entries.
    pub fn refresh_if_stale(&self, session: &Session) -> bool {
        if !self.is_stale() {
            return true;
        }
        match self.refresh(session) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, cached = self.len(), "symbol catalog refresh failed");
                !self.is_empty()
            }
        }
    }

    /// Installs `records` as the whole cache. Rows missing a name or id
    /// are skipped.
    pub fn replace_entries(&self, records: impl IntoIterator<Item = NamedRecord>) -> usize {
        let ids_by_name: HashMap<String, String> = records
            .into_iter()
            .filter_map(|record| {
                let name = record.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
                let id = record.id.as_deref().map(str::trim).filter(|i| !i.is_empty())?;
                Some((name.to_lowercase(), id.to_string()))
            })
            .collect();
        let count = ids_by_name.len();
        let mut state = self.state.write();
        state.ids_by_name = ids_by_name;
        state.loaded_at = Some(Instant::now());
        count
    }

    fn fetch_all(&self, session: &Session) -> Result<Vec<NamedRecord>, StoreError> {
        let mut records = Vec::new();
        let first = format!("{}/services/data/{}/query", session.base_url, self.api_version);
        let mut page = self.fetch_page(session, &first, Some(&self.soql()))?;
        for _ in 0..MAX_QUERY_PAGES {
            records.append(&mut page.records);
            let Some(next) = page.next_records_url.take() else {
                return Ok(records);
            };
            page = self.fetch_page(session, &format!("{}{}", session.base_url, next), None)?;
        }
        Err(StoreError::Decode(format!(
            "catalog query exceeded {MAX_QUERY_PAGES} pages"
        )))
    }

    fn fetch_page(
        &self,
        session: &Session,
        url: &str,
        soql: Option<&str>,
    ) -> Result<QueryPage, StoreError> {
        let mut request = self.client.get(url).bearer_auth(&session.access_token);
        if let Some(soql) = soql {
            request = request.query(&[("q", soql)]);
        }
        let response = request
            .send()
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| StoreError::Transport(format!("failed to read body: {err}")))?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|err| StoreError::Decode(format!("invalid query page: {err}")))
    }
}

impl SymbolLookup for SymbolCatalog {
    fn resolve(&self, symbol: &str) -> Option<String> {
        let key = symbol.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.state.read().ids_by_name.get(&key).cloned()
    }

    fn prepare(&self, session: &Session) {
        if !self.refresh_if_stale(session) {
            tracing::warn!("symbol catalog is empty; currency ids will be left unset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SymbolCatalog;
    use crate::salesforce::wire::NamedRecord;
    use hedgebook_domain::repositories::symbol_lookup::SymbolLookup;
    use hedgebook_domain::value_objects::session::Session;

    fn named(id: Option<&str>, name: Option<&str>) -> NamedRecord {
        NamedRecord {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    fn catalog(ttl_seconds: u64) -> SymbolCatalog {
        SymbolCatalog::new("v61.0", "Currency__c", ttl_seconds, 500).expect("catalog")
    }

    #[test]
    fn resolves_names_case_insensitively() {
        let catalog = catalog(300);
        assert!(catalog.is_stale());
        let count = catalog.replace_entries(vec![
            named(Some("a0C01"), Some(" EURUSD ")),
            named(Some("a0C02"), Some("XAUUSD")),
            named(None, Some("GBPUSD")),
            named(Some("a0C04"), Some("  ")),
        ]);
        assert_eq!(count, 2);
        assert!(!catalog.is_stale());
        assert_eq!(catalog.resolve("eurusd").as_deref(), Some("a0C01"));
        assert_eq!(catalog.resolve(" XauUsd").as_deref(), Some("a0C02"));
        assert_eq!(catalog.resolve("GBPUSD"), None);
        assert_eq!(catalog.resolve(""), None);
    }

    #[test]
    fn replacing_entries_drops_old_names() {
        let catalog = catalog(300);
        catalog.replace_entries(vec![named(Some("a0C01"), Some("EURUSD"))]);
        catalog.replace_entries(vec![named(Some("a0C09"), Some("USDJPY"))]);
        assert_eq!(catalog.resolve("EURUSD"), None);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn soql_targets_configured_object() {
        assert_eq!(catalog(300).soql(), "SELECT Id, Name FROM Currency__c");
    }

    #[test]
    fn failed_refresh_keeps_previous_entries() {
        let catalog = catalog(300);
        catalog.replace_entries(vec![named(Some("a0C01"), Some("EURUSD"))]);
        // Backdate the load past the TTL.
        {
            let mut state = catalog.state.write();
            state.loaded_at = std::time::Instant::now().checked_sub(catalog.ttl);
        }
        assert!(catalog.is_stale());

        // A relative base URL fails while building the request, before any I/O.
        let session = Session::new("not-a-url", "token");
        assert!(catalog.refresh(&session).is_err());
        assert!(catalog.refresh_if_stale(&session));
        assert_eq!(catalog.resolve("EURUSD").as_deref(), Some("a0C01"));
        assert!(catalog.is_stale());
    }

    #[test]
    fn failed_refresh_on_empty_cache_reports_unusable() {
        let catalog = catalog(300);
        let session = Session::new("not-a-url", "token");
        assert!(!catalog.refresh_if_stale(&session));
        assert!(catalog.is_empty());
    }
}
