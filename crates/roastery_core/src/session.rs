//! crates/roastery_core/src/session.rs
//!
//! Explicitly scoped session state. A `SessionContext` is created when a request
//! presents a valid auth session and is handed to whatever needs it; the
//! `SessionRegistry` owns one cancellation token per auth session so that a
//! logout cancels every request still running on behalf of that session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::AuthSession;
use crate::ports::{PortError, PortResult};

/// Per-request view of an authenticated session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub session_id: String,
    cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(user_id: Uuid, session_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug)]
struct Tracked {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Tokens {
    live: HashMap<String, Tracked>,
    /// Revoked session ids, remembered until they would have expired anyway.
    revoked: HashMap<String, DateTime<Utc>>,
}

impl Tokens {
    /// Drops everything past its expiry. Expired live sessions are cancelled.
    fn sweep(&mut self, now: DateTime<Utc>) {
        self.live.retain(|_, tracked| {
            let alive = tracked.expires_at > now;
            if !alive {
                tracked.token.cancel();
            }
            alive
        });
        self.revoked.retain(|_, expires_at| *expires_at > now);
    }

    fn revoke(&mut self, session_id: &str, expires_at: Option<DateTime<Utc>>) -> bool {
        let removed = self.live.remove(session_id);
        let until = expires_at.or(removed.as_ref().map(|t| t.expires_at));
        if let Some(until) = until {
            self.revoked.insert(session_id.to_string(), until);
        }
        match removed {
            Some(tracked) => {
                tracked.token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Tracks the cancellation token of every live auth session seen by this process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    tokens: Mutex<Tokens>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the context for one request on a validated session. The request
    /// gets a child token, so cancelling it never affects sibling requests,
    /// while revoking the session cancels all of them.
    ///
    /// A session revoked after the caller validated it is `Unauthorized`.
    pub async fn context_for(&self, session: &AuthSession) -> PortResult<SessionContext> {
        let mut tokens = self.tokens.lock().await;
        if tokens.revoked.contains_key(&session.id) {
            return Err(PortError::Unauthorized);
        }
        if !tokens.live.contains_key(&session.id) {
            tokens.sweep(Utc::now());
            tokens.live.insert(
                session.id.clone(),
                Tracked {
                    user_id: session.user_id,
                    expires_at: session.expires_at,
                    token: CancellationToken::new(),
                },
            );
        }
        let parent = tokens
            .live
            .get(&session.id)
            .map(|tracked| tracked.token.child_token())
            .ok_or(PortError::Unauthorized)?;
        Ok(SessionContext::new(session.user_id, &session.id, parent))
    }

    /// Cancels the session's requests and refuses it from now on, until
    /// `expires_at` (or the tracked expiry when none is given). Returns whether
    /// the session had a live token.
    pub async fn revoke(&self, session_id: &str, expires_at: Option<DateTime<Utc>>) -> bool {
        self.tokens.lock().await.revoke(session_id, expires_at)
    }

    /// Revokes every tracked session of `user_id`. Returns how many were live.
    pub async fn revoke_user(&self, user_id: Uuid) -> usize {
        let mut tokens = self.tokens.lock().await;
        let owned: Vec<String> = tokens
            .live
            .iter()
            .filter(|(_, tracked)| tracked.user_id == user_id)
            .map(|(id, _)| id.clone())
            .collect();
        for session_id in &owned {
            tokens.revoke(session_id, None);
        }
        owned.len()
    }

    pub async fn live_sessions(&self) -> usize {
        self.tokens.lock().await.live.len()
    }
}
