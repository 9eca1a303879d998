//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, Google sign-in and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use roastery_core::ports::PortError;
use roastery_core::services::{SignedIn, SignupForm};
use roastery_core::UserProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::middleware::{session_id_from, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GoogleSignInRequest {
    /// The ID token returned by Google Identity Services.
    pub id_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    /// Whether this call created the profile.
    pub created: bool,
    /// A new Google user has no phone number yet; the client should ask for one.
    pub needs_phone_number: bool,
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

fn session_cookie(session_id: &str, max_age_secs: i64) -> String {
    format!(
        "{SESSION_COOKIE}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id, max_age_secs
    )
}

fn signed_in_response(
    state: &AppState,
    status: StatusCode,
    signed: SignedIn,
) -> impl IntoResponse {
    let cookie = session_cookie(
        &signed.session.id,
        state.gateway.policy().session_ttl.num_seconds(),
    );
    let response = AuthResponse {
        user: signed.profile,
        created: signed.created,
        needs_phone_number: signed.needs_phone_number,
    };
    (status, [(header::SET_COOKIE, cookie)], Json(response))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account with email and password
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupForm,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid email, password or phone number"),
        (status = 409, description = "Email already registered")
    )
)]
#[instrument(skip_all)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignupForm>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = state.gateway.signup(form).await?;
    Ok(signed_in_response(&state, StatusCode::CREATED, signed))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
#[instrument(skip_all)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = state
        .gateway
        .login(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => ApiError::InvalidCredentials,
            other => ApiError::Port(other),
        })?;
    Ok(signed_in_response(&state, StatusCode::OK, signed))
}

/// POST /auth/google - Sign in with a Google ID token
#[utoipa::path(
    post,
    path = "/auth/google",
    tag = "auth",
    request_body = GoogleSignInRequest,
    responses(
        (status = 200, description = "Signed in; `created` tells whether the profile is new", body = AuthResponse),
        (status = 401, description = "Token rejected"),
        (status = 503, description = "Google sign-in is not configured")
    )
)]
#[instrument(skip_all)]
pub async fn google_sign_in_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleSignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = state.gateway.sign_in_with_google(&req.id_token).await?;
    Ok(signed_in_response(&state, StatusCode::OK, signed))
}

/// POST /auth/logout - Logout, invalidate the session and cancel its in-flight requests
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
#[instrument(skip_all)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id = session_id_from(&headers).ok_or(PortError::Unauthorized)?;
    state.gateway.logout(auth_session_id).await?;

    let cookie = session_cookie("", 0);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}
