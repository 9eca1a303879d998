//! services/api/src/adapters/google.rs
//!
//! `IdentityVerifier` backed by Google's `tokeninfo` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use roastery_core::domain::{FederatedIdentity, Provider};
use roastery_core::ports::{IdentityVerifier, PortError, PortResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// The subset of the `tokeninfo` payload we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    /// Google sends `"true"` as a string here; accept a bool too.
    #[serde(default)]
    email_verified: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

impl TokenInfo {
    fn email_is_verified(&self) -> bool {
        match &self.email_verified {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_identity(self, client_id: &str) -> PortResult<FederatedIdentity> {
        if self.aud != client_id {
            warn!(aud = %self.aud, "Google token issued for another client");
            return Err(PortError::Unauthorized);
        }
        if !self.email_is_verified() {
            return Err(PortError::InvalidInput(
                "Your Google account email is not verified".to_string(),
            ));
        }
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| PortError::InvalidInput("Google did not share an email".to_string()))?;

        Ok(FederatedIdentity {
            provider: Provider::Google,
            subject: self.sub,
            email,
            display_name: self.name,
            given_name: self.given_name,
            family_name: self.family_name,
        })
    }
}

#[derive(Clone)]
pub struct GoogleTokenVerifier {
    http: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            client_id: client_id.into(),
            endpoint: TOKENINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    #[instrument(skip_all)]
    async fn verify_id_token(&self, id_token: &str) -> PortResult<FederatedIdentity> {
        if id_token.trim().is_empty() {
            return Err(PortError::InvalidInput("Missing Google ID token".to_string()));
        }

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                warn!("Google tokeninfo request failed: {}", e);
                PortError::Unavailable("Google sign-in is temporarily unavailable".to_string())
            })?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            warn!(%status, "Google tokeninfo returned an error");
            return Err(PortError::Unavailable(
                "Google sign-in is temporarily unavailable".to_string(),
            ));
        }

        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable tokeninfo payload: {e}")))?;
        info.into_identity(&self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: Value) -> TokenInfo {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_string_email_verified_flag() {
        let identity = info(json!({
            "aud": "client-1",
            "sub": "1234",
            "email": "ayse@example.com",
            "email_verified": "true",
            "given_name": "Ayşe"
        }))
        .into_identity("client-1")
        .unwrap();
        assert_eq!(identity.subject, "1234");
        assert_eq!(identity.given_name.as_deref(), Some("Ayşe"));
    }

    #[test]
    fn rejects_foreign_audience_and_unverified_email() {
        let foreign = info(json!({
            "aud": "someone-else",
            "sub": "1",
            "email": "a@b.co",
            "email_verified": true
        }));
        assert_eq!(foreign.into_identity("client-1"), Err(PortError::Unauthorized));

        let unverified = info(json!({
            "aud": "client-1",
            "sub": "1",
            "email": "a@b.co",
            "email_verified": "false"
        }));
        assert!(matches!(
            unverified.into_identity("client-1"),
            Err(PortError::InvalidInput(_))
        ));
    }
}
