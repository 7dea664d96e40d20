use super::status_error;
use super::wire::{parse_save_results, UpsertBody};
use crate::http::{build_client, record_call_metrics};
use hedgebook_domain::repositories::record_store::{RecordStore, StoreError};
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use hedgebook_domain::value_objects::session::Session;
use hedgebook_domain::value_objects::upsert_outcome::UpsertOutcome;
use reqwest::blocking::Client;
use std::time::Instant;

/// Composite sObject collection upsert keyed by an external id field.
pub struct SalesforceRecordStore {
    api_version: String,
    sobject: String,
    client: Client,
}

impl SalesforceRecordStore {
    pub fn new(api_version: &str, sobject: &str, timeout_ms: u64) -> Result<Self, String> {
        Ok(Self {
            api_version: api_version.trim().to_string(),
            sobject: sobject.trim().to_string(),
            client: build_client(timeout_ms)?,
        })
    }

    pub fn upsert_url(&self, session: &Session, external_key_field: &str) -> String {
        format!(
            "{}/services/data/{}/composite/sobjects/{}/{}",
            session.base_url, self.api_version, self.sobject, external_key_field
        )
    }

    fn upsert_inner(
        &self,
        session: &Session,
        external_key_field: &str,
        records: &[HedgeRecord],
    ) -> Result<Vec<UpsertOutcome>, StoreError> {
        let body = UpsertBody::new(records, &self.sobject, external_key_field);
        let response = self
            .client
            .patch(self.upsert_url(session, external_key_field))
            .bearer_auth(&session.access_token)
            .json(&body)
            .send()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| StoreError::Transport(format!("failed to read body: {err}")))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        parse_save_results(&text)
    }
}

impl RecordStore for SalesforceRecordStore {
    fn upsert(
        &self,
        session: &Session,
        external_key_field: &str,
        records: &[HedgeRecord],
    ) -> Result<Vec<UpsertOutcome>, StoreError> {
        if external_key_field.trim().is_empty() {
            return Err(StoreError::Config("external key field is empty".to_string()));
        }
        let span = tracing::debug_span!(
            "infra.salesforce.upsert",
            sobject = %self.sobject,
            external_key_field,
            records = records.len()
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.upsert_inner(session, external_key_field, records);
        record_call_metrics("store_upsert", start, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::SalesforceRecordStore;
    use hedgebook_domain::repositories::record_store::{RecordStore, StoreError};
    use hedgebook_domain::value_objects::session::Session;

    #[test]
    fn upsert_url_targets_composite_endpoint() {
        let store = SalesforceRecordStore::new("v60.0", "SR_Hedge__c", 1_000).expect("store");
        let session = Session::new("https://acme.my.salesforce.com/", "token");
        assert_eq!(
            store.upsert_url(&session, "UUID_Text__c"),
            "https://acme.my.salesforce.com/services/data/v60.0/composite/sobjects/SR_Hedge__c/UUID_Text__c"
        );
    }

    #[test]
    fn blank_external_key_field_is_rejected_locally() {
        let store = SalesforceRecordStore::new("v60.0", "SR_Hedge__c", 1_000).expect("store");
        let session = Session::new("https://acme.my.salesforce.com", "token");
        let err = store.upsert(&session, " ", &[]).expect_err("config");
        assert!(matches!(err, StoreError::Config(_)));
    }
}
