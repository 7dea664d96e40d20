use super::status_error;
use crate::http::{build_client, record_call_metrics};
use hedgebook_domain::repositories::record_store::{SessionProvider, StoreError};
use hedgebook_domain::value_objects::session::Session;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Instant;

#[derive(Clone)]
pub struct SalesforceCredentials {
    pub login_url: String,
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("login_url", &self.login_url)
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    instance_url: String,
    access_token: String,
}

/// OAuth username-password login against the org's token endpoint.
pub struct SalesforceAuth {
    credentials: SalesforceCredentials,
    client: Client,
}

impl SalesforceAuth {
    pub fn new(credentials: SalesforceCredentials, timeout_ms: u64) -> Result<Self, String> {
        Ok(Self {
            credentials,
            client: build_client(timeout_ms)?,
        })
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/services/oauth2/token",
            self.credentials.login_url.trim().trim_end_matches('/')
        )
    }

    fn login_inner(&self) -> Result<Session, StoreError> {
        let creds = &self.credentials;
        let form = [
            ("grant_type", creds.grant_type.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
        ];
        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| StoreError::Transport(format!("failed to read body: {err}")))?;
        if !status.is_success() {
            // The token endpoint answers bad credentials with 400 invalid_grant.
            let status = if status == StatusCode::BAD_REQUEST {
                StatusCode::UNAUTHORIZED
            } else {
                status
            };
            return Err(status_error(status, &body));
        }
        parse_token_reply(&body)
    }
}

impl SessionProvider for SalesforceAuth {
    fn login(&self) -> Result<Session, StoreError> {
        let span = tracing::info_span!(
            "infra.salesforce.login",
            login_url = %self.credentials.login_url,
            username = %self.credentials.username
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.login_inner();
        record_call_metrics("store_login", start, &result);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "salesforce login failed");
        }
        result
    }
}

pub(crate) fn parse_token_reply(body: &str) -> Result<Session, StoreError> {
    let reply: TokenReply = serde_json::from_str(body)
        .map_err(|err| StoreError::Decode(format!("invalid token reply: {err}")))?;
    if reply.instance_url.trim().is_empty() || reply.access_token.trim().is_empty() {
        return Err(StoreError::Decode(
            "token reply is missing instance_url or access_token".to_string(),
        ));
    }
    Ok(Session::new(reply.instance_url.trim(), reply.access_token))
}

#[cfg(test)]
mod tests {
    use super::{parse_token_reply, SalesforceAuth, SalesforceCredentials};
    use hedgebook_domain::repositories::record_store::StoreError;

    fn credentials() -> SalesforceCredentials {
        SalesforceCredentials {
            login_url: "https://login.salesforce.com/".to_string(),
            grant_type: "password".to_string(),
            client_id: "client".to_string(),
            client_secret: "very-secret".to_string(),
            username: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn token_url_strips_trailing_slash() {
        let auth = SalesforceAuth::new(credentials(), 1_000).expect("auth");
        assert_eq!(auth.token_url(), "https://login.salesforce.com/services/oauth2/token");
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("ops@example.com"));
    }

    #[test]
    fn token_reply_becomes_session() {
        let session = parse_token_reply(
            r#"{"access_token":"00D!AQ","instance_url":"https://acme.my.salesforce.com/","id":"x","token_type":"Bearer"}"#,
        )
        .expect("session");
        assert_eq!(session.base_url, "https://acme.my.salesforce.com");
        assert_eq!(session.access_token, "00D!AQ");
    }

    #[test]
    fn incomplete_token_reply_is_a_decode_error() {
        let err = parse_token_reply(r#"{"access_token":"","instance_url":"https://x"}"#)
            .expect_err("empty token");
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(matches!(
            parse_token_reply("<html>"),
            Err(StoreError::Decode(_))
        ));
    }
}
