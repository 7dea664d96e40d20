use crate::value_objects::deal::Deal;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("deal feed rejected credentials (status {status})")]
    Unauthorized { status: u16 },
    #[error("deal feed returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("deal feed request failed: {0}")]
    Transport(String),
    #[error("deal feed response could not be decoded: {0}")]
    Decode(String),
    #[error("deal feed misconfigured: {0}")]
    Config(String),
}

pub trait DealSource {
    fn fetch(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Deal>, FeedError>;
}
