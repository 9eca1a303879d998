//! services/api/src/web/courses.rs
//!
//! Coffee academy: the public course catalog, enrollment, and the admin
//! course panel.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use roastery_core::messaging::{course_inquiry_text, whatsapp_link};
use roastery_core::services::courses;
use roastery_core::{Course, CoursePatch, Enrollment, EnrollmentDetails, Language, NewCourse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::Caller;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct EnrollResponse {
    pub enrollment: Enrollment,
    /// True when the caller was already enrolled; nothing was written.
    pub already_enrolled: bool,
}

#[derive(Serialize, ToSchema)]
pub struct WhatsappLinkResponse {
    pub url: String,
}

#[derive(Deserialize, IntoParams)]
pub struct InquiryQuery {
    /// Language of the prefilled message; Turkish when omitted.
    #[serde(default)]
    pub lang: Option<Language>,
}

//=========================================================================================
// Public Catalog
//=========================================================================================

/// GET /courses - All courses, newest first
#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    responses((status = 200, description = "Course catalog", body = [Course]))
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(courses::get_all_courses(&state.anonymous_scope()).await?))
}

/// GET /courses/{id} - One course with its roster
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "No such course")
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Course>, ApiError> {
    Ok(Json(
        courses::get_course_by_id(&state.anonymous_scope(), id).await?,
    ))
}

/// GET /courses/{id}/whatsapp-link - A chat link prefilled with a course inquiry
#[utoipa::path(
    get,
    path = "/courses/{id}/whatsapp-link",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course id"), InquiryQuery),
    responses(
        (status = 200, description = "wa.me link", body = WhatsappLinkResponse),
        (status = 404, description = "No such course"),
        (status = 503, description = "No WhatsApp number configured")
    )
)]
pub async fn course_whatsapp_link_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<InquiryQuery>,
) -> Result<Json<WhatsappLinkResponse>, ApiError> {
    let number = state.whatsapp_number()?;
    let course = courses::get_course_by_id(&state.anonymous_scope(), id).await?;
    let text = course_inquiry_text(&course, query.lang.unwrap_or_default());
    Ok(Json(WhatsappLinkResponse {
        url: whatsapp_link(number, &text)?,
    }))
}

//=========================================================================================
// Enrollment
//=========================================================================================

/// POST /courses/{id}/enroll - Enroll the caller
#[utoipa::path(
    post,
    path = "/courses/{id}/enroll",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = EnrollmentDetails,
    responses(
        (status = 201, description = "Enrolled", body = EnrollResponse),
        (status = 200, description = "Already enrolled; existing record returned", body = EnrollResponse),
        (status = 400, description = "Missing name or phone number"),
        (status = 404, description = "No such course"),
        (status = 409, description = "Course is full")
    )
)]
#[instrument(skip(caller, details), fields(uid = %caller.ctx.user_id))]
pub async fn enroll_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(details): Json<EnrollmentDetails>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = courses::enroll_student(&caller.store, id, caller.ctx.user_id, details).await?;
    let already_enrolled = outcome.already_enrolled();
    let status = if already_enrolled {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(EnrollResponse {
            enrollment: outcome.into_enrollment(),
            already_enrolled,
        }),
    ))
}

//=========================================================================================
// Admin Panel
//=========================================================================================

/// POST /admin/courses - Create a course
#[utoipa::path(
    post,
    path = "/admin/courses",
    tag = "admin",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Invalid course"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_course_handler(
    caller: Caller,
    Json(new): Json<NewCourse>,
) -> Result<impl IntoResponse, ApiError> {
    let course = courses::create_course(&caller.store, new).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// PATCH /admin/courses/{id} - Update course fields
#[utoipa::path(
    patch,
    path = "/admin/courses/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CoursePatch,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Capacity below current roster")
    )
)]
pub async fn update_course_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<CoursePatch>,
) -> Result<Json<Course>, ApiError> {
    Ok(Json(courses::update_course(&caller.store, id, patch).await?))
}

/// DELETE /admin/courses/{id} - Delete a course and its enrollments
#[utoipa::path(
    delete,
    path = "/admin/courses/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such course")
    )
)]
pub async fn delete_course_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    courses::delete_course(&caller.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
