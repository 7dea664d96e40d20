use chrono::{DateTime, Utc};
use std::fmt;

/// Authenticated handle on the record store, produced by a
/// [`SessionProvider`](crate::repositories::record_store::SessionProvider)
/// and passed explicitly to every store call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub base_url: String,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::new("https://example.my.salesforce.com/", "secret-token");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert_eq!(session.base_url, "https://example.my.salesforce.com");
    }
}
