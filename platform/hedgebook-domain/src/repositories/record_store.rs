use crate::value_objects::hedge_record::HedgeRecord;
use crate::value_objects::session::Session;
use crate::value_objects::upsert_outcome::UpsertOutcome;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store rejected credentials: {0}")]
    Unauthorized(String),
    #[error("record store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("record store request failed: {0}")]
    Transport(String),
    #[error("record store response could not be decoded: {0}")]
    Decode(String),
    #[error("record store misconfigured: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}

pub trait SessionProvider {
    fn login(&self) -> Result<Session, StoreError>;
}

pub trait RecordStore {
    /// Upserts `records` keyed by `external_key_field`, continuing past
    /// per-record failures. Returns one outcome per record, in order.
    fn upsert(
        &self,
        session: &Session,
        external_key_field: &str,
        records: &[HedgeRecord],
    ) -> Result<Vec<UpsertOutcome>, StoreError>;
}
