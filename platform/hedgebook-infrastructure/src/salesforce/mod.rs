//! Salesforce REST adapters: OAuth login, composite upsert and the
//! currency catalog used to resolve symbols.

pub mod auth;
pub mod catalog;
pub mod store;
pub mod wire;

pub use auth::{SalesforceAuth, SalesforceCredentials};
pub use catalog::SymbolCatalog;
pub use store::SalesforceRecordStore;

use crate::http::truncate_body;
use hedgebook_domain::repositories::record_store::StoreError;
use reqwest::StatusCode;

fn status_error(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::UNAUTHORIZED {
        StoreError::Unauthorized(truncate_body(body))
    } else {
        StoreError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::status_error;
    use hedgebook_domain::repositories::record_store::StoreError;
    use reqwest::StatusCode;

    #[test]
    fn only_401_counts_as_unauthorized() {
        let expired = status_error(
            StatusCode::UNAUTHORIZED,
            r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#,
        );
        assert!(expired.is_unauthorized());

        let forbidden = status_error(StatusCode::FORBIDDEN, "REQUEST_LIMIT_EXCEEDED");
        assert!(!forbidden.is_unauthorized());
        assert!(matches!(forbidden, StoreError::Status { status: 403, .. }));
    }
}
