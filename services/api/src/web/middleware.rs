//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, and the extractor that
//! turns the authenticated session into an authorized store scope.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use roastery_core::ports::PortError;
use roastery_core::{AuthorizedStore, SessionContext};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Reads the auth session id from the `Cookie` header.
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// Middleware that validates the auth session cookie.
///
/// If valid, a [`SessionContext`] carrying a child cancellation token of the
/// session is inserted into the request extensions. If invalid or missing,
/// the request is rejected with 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_id_from(req.headers())
        .ok_or(PortError::Unauthorized)?
        .to_string();

    let session = state
        .db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            debug!("Rejected auth session: {:?}", e);
            PortError::Unauthorized
        })?;

    // Refused if a logout revoked the session after the lookup above.
    let ctx = state.sessions.context_for(&session).await?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// The authenticated caller of a protected route.
///
/// Resolves the principal from the stored profile, so the admin flag is
/// always the server's copy.
pub struct Caller {
    pub ctx: SessionContext,
    pub store: AuthorizedStore,
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(PortError::Unauthorized)?;
        let store = AuthorizedStore::for_session(state.db.clone(), &ctx).await?;
        Ok(Self { ctx, store })
    }
}
