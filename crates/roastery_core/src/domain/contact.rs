//! Messages from the public contact form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum InquiryType {
    #[default]
    General,
    Wholesale,
    Academy,
    Samples,
    Other,
}

text_enum!(InquiryType {
    General => "general",
    Wholesale => "wholesale",
    Academy => "academy",
    Samples => "samples",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Unread,
    Read,
    Archived,
}

text_enum!(MessageStatus {
    Unread => "unread",
    Read => "read",
    Archived => "archived",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub inquiry_type: InquiryType,
    pub message: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub inquiry_type: InquiryType,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub status: Option<MessageStatus>,
    pub inquiry_type: Option<InquiryType>,
}

impl ContactFilter {
    pub fn accepts(&self, message: &ContactMessage) -> bool {
        self.status.map_or(true, |s| message.status == s)
            && self.inquiry_type.map_or(true, |t| message.inquiry_type == t)
    }
}
