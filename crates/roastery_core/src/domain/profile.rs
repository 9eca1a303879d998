//! Identity and profile documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::course::Enrollment;

/// How the user signed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Email,
    Google,
}

text_enum!(Provider {
    Email => "email",
    Google => "google",
});

/// The per-user profile document.
///
/// `enrolled_courses` and `sample_orders` are derived by the store from the
/// enrollment and sample-order collections; they are never written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserProfile {
    pub uid: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub provider: Provider,
    pub is_admin: bool,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub enrolled_courses: Vec<Enrollment>,
    pub sample_orders: Vec<Uuid>,
}

impl UserProfile {
    /// Builds a fresh profile document from provisioning input.
    pub fn from_new(new: NewProfile, now: DateTime<Utc>) -> Self {
        Self {
            uid: new.uid,
            email: new.email,
            display_name: new.display_name,
            first_name: new.first_name,
            last_name: new.last_name,
            phone_number: new.phone_number,
            provider: new.provider,
            is_admin: new.is_admin,
            company: None,
            address: None,
            city: None,
            postal_code: None,
            created_at: now,
            last_login: None,
            updated_at: now,
            enrolled_courses: Vec::new(),
            sample_orders: Vec::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Applies a partial update, field by field.
    pub fn apply(&mut self, patch: &ProfilePatch, now: DateTime<Utc>) {
        if let Some(v) = &patch.display_name {
            self.display_name = Some(v.clone());
        }
        if let Some(v) = &patch.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &patch.phone_number {
            self.phone_number = v.clone();
        }
        if let Some(v) = &patch.company {
            self.company = Some(v.clone());
        }
        if let Some(v) = &patch.address {
            self.address = Some(v.clone());
        }
        if let Some(v) = &patch.city {
            self.city = Some(v.clone());
        }
        if let Some(v) = &patch.postal_code {
            self.postal_code = Some(v.clone());
        }
        self.updated_at = now;
    }
}

/// Input for provisioning a profile after a successful identity callback.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub uid: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub provider: Provider,
    pub is_admin: bool,
}

/// A partial profile update. Absent fields are left untouched.
/// The admin flag is not patchable; it changes through the admin users panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Admin users panel filter.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    /// Case-insensitive match on email, display name, first or last name.
    pub search: Option<String>,
    pub admins_only: bool,
}

impl ProfileFilter {
    pub fn accepts(&self, profile: &UserProfile) -> bool {
        if self.admins_only && !profile.is_admin {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    Some(profile.email.as_str()),
                    profile.display_name.as_deref(),
                    Some(profile.first_name.as_str()),
                    Some(profile.last_name.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// An identity asserted by a federated provider after token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub provider: Provider,
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}
