//! services/api/src/web/admin.rs
//!
//! Admin users panel. The other admin panels live next to their public
//! counterparts.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use roastery_core::services::users;
use roastery_core::{ProfileFilter, UserProfile};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::Caller;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Matches email, display name, first or last name.
    pub search: Option<String>,
    #[serde(default)]
    pub admins_only: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminFlagUpdate {
    pub is_admin: bool,
}

/// GET /admin/users
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(UserQuery),
    responses(
        (status = 200, description = "Matching profiles, newest first", body = [UserProfile]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list_users_handler(
    caller: Caller,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let filter = ProfileFilter {
        search: query.search,
        admins_only: query.admins_only,
    };
    Ok(Json(users::list_users(&caller.store, &filter).await?))
}

/// PUT /admin/users/{uid}/admin - Grant or revoke the admin flag
#[utoipa::path(
    put,
    path = "/admin/users/{uid}/admin",
    tag = "admin",
    params(("uid" = Uuid, Path, description = "Profile uid")),
    request_body = AdminFlagUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 403, description = "Admins only, and never on their own account"),
        (status = 404, description = "No such profile")
    )
)]
#[instrument(skip(caller, update), fields(by = %caller.ctx.user_id))]
pub async fn set_admin_handler(
    caller: Caller,
    Path(uid): Path<Uuid>,
    Json(update): Json<AdminFlagUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(
        users::set_admin(&caller.store, uid, update.is_admin).await?,
    ))
}

/// DELETE /admin/users/{uid} - Delete an account with its orders and enrollments
#[utoipa::path(
    delete,
    path = "/admin/users/{uid}",
    tag = "admin",
    params(("uid" = Uuid, Path, description = "Profile uid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only, and never on their own account"),
        (status = 404, description = "No such profile")
    )
)]
#[instrument(skip(state, caller), fields(by = %caller.ctx.user_id))]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(uid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    users::delete_user(&caller.store, uid).await?;
    let revoked = state.sessions.revoke_user(uid).await;
    debug!(%uid, revoked, "Revoked sessions of deleted account");
    Ok(StatusCode::NO_CONTENT)
}
