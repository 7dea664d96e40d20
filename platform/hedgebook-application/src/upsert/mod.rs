use hedgebook_domain::repositories::record_store::{RecordStore, SessionProvider, StoreError};
use hedgebook_domain::value_objects::hedge_record::HedgeRecord;
use hedgebook_domain::value_objects::session::Session;
use hedgebook_domain::value_objects::upsert_outcome::UpsertOutcome;
use thiserror::Error;

/// Largest batch the record store accepts in one composite call.
pub const MAX_BATCH_SIZE: usize = 200;

#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("record store login failed: {0}")]
    Login(#[source] StoreError),
    #[error("batch {batch} failed: {source}")]
    Batch {
        batch: usize,
        #[source]
        source: StoreError,
    },
    #[error("batch {batch} returned {returned} results for {sent} records")]
    ResultCountMismatch {
        batch: usize,
        sent: usize,
        returned: usize,
    },
}

impl UpsertError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            UpsertError::Login(source) | UpsertError::Batch { source, .. } => {
                source.is_unauthorized()
            }
            UpsertError::ResultCountMismatch { .. } => false,
        }
    }
}

/// Drives batched, continue-on-error upserts against a [`RecordStore`].
///
/// Batches run strictly one after another. An authorization failure earns a
/// single re-login and a single retry of the same batch; every other failure
/// ends the run.
pub struct BatchUpsertCoordinator<'a> {
    store: &'a dyn RecordStore,
    sessions: &'a dyn SessionProvider,
    external_key_field: String,
}

impl<'a> BatchUpsertCoordinator<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        sessions: &'a dyn SessionProvider,
        external_key_field: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            external_key_field: external_key_field.into(),
        }
    }

    /// Upserts `records` and returns one outcome per record in input order.
    ///
    /// `session` is reused when present and replaced on re-login, so callers
    /// can carry it across runs.
    pub fn batch_upsert(
        &self,
        session: &mut Option<Session>,
        records: &[HedgeRecord],
    ) -> Result<Vec<UpsertOutcome>, UpsertError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let batches = records.len().div_ceil(MAX_BATCH_SIZE);
        let mut results = Vec::with_capacity(records.len());
        for (batch, chunk) in records.chunks(MAX_BATCH_SIZE).enumerate() {
            let outcomes = match self.upsert_batch(session, batch, chunk) {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    metrics::counter!("hedgebook.upsert.batches_total", "result" => "err")
                        .increment(1);
                    return Err(err);
                }
            };
            if outcomes.len() != chunk.len() {
                metrics::counter!("hedgebook.upsert.batches_total", "result" => "err")
                    .increment(1);
                return Err(UpsertError::ResultCountMismatch {
                    batch,
                    sent: chunk.len(),
                    returned: outcomes.len(),
                });
            }

            let failed = outcomes.iter().filter(|outcome| !outcome.success).count();
            metrics::counter!("hedgebook.upsert.batches_total", "result" => "ok").increment(1);
            metrics::counter!("hedgebook.upsert.records_total", "result" => "success")
                .increment((outcomes.len() - failed) as u64);
            metrics::counter!("hedgebook.upsert.records_total", "result" => "failure")
                .increment(failed as u64);
            tracing::info!(
                batch = batch + 1,
                batches,
                records = chunk.len(),
                failed,
                "upserted batch"
            );
            results.extend(outcomes);
        }
        Ok(results)
    }

    fn upsert_batch(
        &self,
        session: &mut Option<Session>,
        batch: usize,
        chunk: &[HedgeRecord],
    ) -> Result<Vec<UpsertOutcome>, UpsertError> {
        let active = match session.take() {
            Some(existing) => existing,
            None => self.login()?,
        };
        let active = session.insert(active);

        match self.store.upsert(active, &self.external_key_field, chunk) {
            Ok(outcomes) => Ok(outcomes),
            Err(err) if err.is_unauthorized() => {
                tracing::warn!(batch, error = %err, "record store rejected session, logging in again");
                metrics::counter!("hedgebook.upsert.reauth_total").increment(1);
                let refreshed = session.insert(self.login()?);
                self.store
                    .upsert(refreshed, &self.external_key_field, chunk)
                    .map_err(|source| UpsertError::Batch { batch, source })
            }
            Err(source) => Err(UpsertError::Batch { batch, source }),
        }
    }

    fn login(&self) -> Result<Session, UpsertError> {
        let session = self.sessions.login().map_err(UpsertError::Login)?;
        tracing::info!(base_url = %session.base_url, "record store session established");
        Ok(session)
    }
}
