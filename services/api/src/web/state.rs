//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use chrono::Duration;
use roastery_core::ports::{CredentialHasher, DatabaseService, IdentityVerifier};
use roastery_core::services::{AccountPolicy, AuthGateway};
use roastery_core::{AuthorizedStore, SessionRegistry};

use crate::config::Config;
use crate::error::ApiError;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub gateway: Arc<AuthGateway>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the auth gateway and the session registry around the given ports.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        hasher: Arc<dyn CredentialHasher>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
        config: Arc<Config>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let policy = AccountPolicy::new(
            config.admin_emails.iter().cloned(),
            Duration::days(config.session_ttl_days),
        );
        let gateway = Arc::new(AuthGateway::new(
            db.clone(),
            hasher,
            verifier,
            sessions.clone(),
            policy,
        ));
        Self {
            db,
            gateway,
            sessions,
            config,
        }
    }

    /// A store scope for unauthenticated callers: public reads and the contact form.
    pub fn anonymous_scope(&self) -> AuthorizedStore {
        AuthorizedStore::anonymous(self.db.clone())
    }

    /// The business WhatsApp number, or 503 when none is configured.
    pub fn whatsapp_number(&self) -> Result<&str, ApiError> {
        self.config.whatsapp_number.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("WhatsApp contact is not configured".to_string())
        })
    }
}
