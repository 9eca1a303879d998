//! services/api/src/web/profile.rs
//!
//! Account pages: the caller's own profile and, for admins, anyone's.

use axum::{extract::Path, Json};
use roastery_core::services::{accounts, sample_orders};
use roastery_core::{ProfilePatch, SampleOrder, UserProfile};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::Caller;

/// GET /me - The caller's profile
#[utoipa::path(
    get,
    path = "/me",
    tag = "profile",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = UserProfile),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me_handler(caller: Caller) -> Result<Json<UserProfile>, ApiError> {
    let profile = accounts::get_user_data(&caller.store, caller.ctx.user_id).await?;
    Ok(Json(profile))
}

/// PATCH /me - Merge fields into the caller's profile
#[utoipa::path(
    patch,
    path = "/me",
    tag = "profile",
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid phone number"),
        (status = 401, description = "Not signed in")
    )
)]
#[instrument(skip_all, fields(uid = %caller.ctx.user_id))]
pub async fn patch_me_handler(
    caller: Caller,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = accounts::update_user_profile(&caller.store, caller.ctx.user_id, patch).await?;
    Ok(Json(profile))
}

/// GET /users/{uid} - A profile by uid (self or admin)
#[utoipa::path(
    get,
    path = "/users/{uid}",
    tag = "profile",
    params(("uid" = Uuid, Path, description = "Profile uid")),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "No such profile")
    )
)]
pub async fn get_user_handler(
    caller: Caller,
    Path(uid): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(accounts::get_user_data(&caller.store, uid).await?))
}

/// PATCH /users/{uid} - Merge fields into a profile (self or admin)
#[utoipa::path(
    patch,
    path = "/users/{uid}",
    tag = "profile",
    params(("uid" = Uuid, Path, description = "Profile uid")),
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "No such profile")
    )
)]
#[instrument(skip(caller, patch))]
pub async fn patch_user_handler(
    caller: Caller,
    Path(uid): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(accounts::update_user_profile(&caller.store, uid, patch).await?))
}

/// GET /users/{uid}/sample-orders - A user's sample orders, newest first
#[utoipa::path(
    get,
    path = "/users/{uid}/sample-orders",
    tag = "sample-orders",
    params(("uid" = Uuid, Path, description = "Owner uid")),
    responses(
        (status = 200, description = "Orders of the user", body = [SampleOrder]),
        (status = 403, description = "Not your orders")
    )
)]
pub async fn user_sample_orders_handler(
    caller: Caller,
    Path(uid): Path<Uuid>,
) -> Result<Json<Vec<SampleOrder>>, ApiError> {
    Ok(Json(
        sample_orders::get_user_sample_orders(&caller.store, uid).await?,
    ))
}
