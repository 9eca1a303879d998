//! services/api/src/web/contact.rs
//!
//! The public contact form, the WhatsApp shortcut, and the admin inbox.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use roastery_core::messaging::whatsapp_link;
use roastery_core::services::contact;
use roastery_core::{ContactFilter, ContactMessage, InquiryType, MessageStatus, NewContactMessage};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::courses::WhatsappLinkResponse;
use crate::web::middleware::Caller;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WhatsappQuery {
    /// Prefilled message text.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContactQuery {
    pub status: Option<MessageStatus>,
    pub inquiry_type: Option<InquiryType>,
}

#[derive(Deserialize, ToSchema)]
pub struct MessageStatusUpdate {
    pub status: MessageStatus,
}

/// POST /contact - Submit the contact form
#[utoipa::path(
    post,
    path = "/contact",
    tag = "contact",
    request_body = NewContactMessage,
    responses(
        (status = 201, description = "Message stored", body = ContactMessage),
        (status = 400, description = "Missing or invalid fields")
    )
)]
#[instrument(skip_all)]
pub async fn submit_contact_handler(
    State(state): State<Arc<AppState>>,
    Json(form): Json<NewContactMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let message = contact::submit_message(&state.anonymous_scope(), form).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /contact/whatsapp-link - A chat link to the business number
#[utoipa::path(
    get,
    path = "/contact/whatsapp-link",
    tag = "contact",
    params(WhatsappQuery),
    responses(
        (status = 200, description = "wa.me link", body = WhatsappLinkResponse),
        (status = 503, description = "No WhatsApp number configured")
    )
)]
pub async fn contact_whatsapp_link_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WhatsappQuery>,
) -> Result<Json<WhatsappLinkResponse>, ApiError> {
    let number = state.whatsapp_number()?;
    let url = whatsapp_link(number, query.text.as_deref().unwrap_or_default())?;
    Ok(Json(WhatsappLinkResponse { url }))
}

/// GET /admin/contact-messages - Inbox, filtered by status and/or inquiry type
#[utoipa::path(
    get,
    path = "/admin/contact-messages",
    tag = "admin",
    params(ContactQuery),
    responses(
        (status = 200, description = "Matching messages, newest first", body = [ContactMessage]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list_contact_messages_handler(
    caller: Caller,
    Query(query): Query<ContactQuery>,
) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    let filter = ContactFilter {
        status: query.status,
        inquiry_type: query.inquiry_type,
    };
    Ok(Json(contact::list_messages(&caller.store, &filter).await?))
}

/// PUT /admin/contact-messages/{id}/status
#[utoipa::path(
    put,
    path = "/admin/contact-messages/{id}/status",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Message id")),
    request_body = MessageStatusUpdate,
    responses(
        (status = 200, description = "Updated message", body = ContactMessage),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such message")
    )
)]
pub async fn update_contact_status_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(update): Json<MessageStatusUpdate>,
) -> Result<Json<ContactMessage>, ApiError> {
    Ok(Json(
        contact::set_message_status(&caller.store, id, update.status).await?,
    ))
}

/// DELETE /admin/contact-messages/{id}
#[utoipa::path(
    delete,
    path = "/admin/contact-messages/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "No such message")
    )
)]
pub async fn delete_contact_message_handler(
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    contact::delete_message(&caller.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
