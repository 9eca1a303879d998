//! Public contact form and the admin inbox.

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{ContactFilter, ContactMessage, MessageStatus, NewContactMessage};
use crate::ports::{PortError, PortResult};
use crate::services::validation::{normalize_email, require_filled, validate_phone, MAX_MESSAGE_LEN};

#[instrument(skip_all, fields(inquiry_type = %form.inquiry_type))]
pub async fn submit_message(
    store: &AuthorizedStore,
    form: NewContactMessage,
) -> PortResult<ContactMessage> {
    let name = form.name.trim().to_string();
    let message = form.message.trim().to_string();
    require_filled(&[("name", name.as_str()), ("message", message.as_str())])?;
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(PortError::InvalidInput(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    let email = normalize_email(&form.email)?;
    let phone = form
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }

    let now = Utc::now();
    let saved = store
        .create_contact_message(ContactMessage {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            company: form
                .company
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            inquiry_type: form.inquiry_type,
            message,
            status: MessageStatus::Unread,
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(message_id = %saved.id, "Contact message received");
    Ok(saved)
}

pub async fn list_messages(
    store: &AuthorizedStore,
    filter: &ContactFilter,
) -> PortResult<Vec<ContactMessage>> {
    store.list_contact_messages(filter).await
}

pub async fn set_message_status(
    store: &AuthorizedStore,
    id: Uuid,
    status: MessageStatus,
) -> PortResult<ContactMessage> {
    store.update_contact_status(id, status, Utc::now()).await
}

pub async fn delete_message(store: &AuthorizedStore, id: Uuid) -> PortResult<()> {
    store.delete_contact_message(id).await
}
