//! Academy courses and enrollments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::localized::LocalizedText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Course {
    pub id: Uuid,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub instructor: LocalizedText,
    pub price: Decimal,
    pub max_students: u32,
    /// Roster of enrolled user ids, oldest first.
    pub enrolled_students: Vec<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn from_new(id: Uuid, new: NewCourse, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            instructor: new.instructor,
            price: new.price,
            max_students: new.max_students,
            enrolled_students: Vec::new(),
            start_date: new.start_date,
            end_date: new.end_date,
            location: new.location,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students.len() >= self.max_students as usize
    }

    pub fn seats_left(&self) -> u32 {
        self.max_students
            .saturating_sub(u32::try_from(self.enrolled_students.len()).unwrap_or(u32::MAX))
    }

    pub fn apply(&mut self, patch: &CoursePatch, now: DateTime<Utc>) {
        if let Some(v) = &patch.title {
            self.title = v.clone();
        }
        if let Some(v) = &patch.description {
            self.description = v.clone();
        }
        if let Some(v) = &patch.instructor {
            self.instructor = v.clone();
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(v) = patch.max_students {
            self.max_students = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = Some(v);
        }
        if let Some(v) = patch.end_date {
            self.end_date = Some(v);
        }
        if let Some(v) = &patch.location {
            self.location = Some(v.clone());
        }
        if let Some(v) = &patch.image_url {
            self.image_url = Some(v.clone());
        }
        self.updated_at = now;
    }
}

/// Input for the admin course-creation form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCourse {
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub instructor: LocalizedText,
    pub price: Decimal,
    pub max_students: u32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct CoursePatch {
    pub title: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub instructor: Option<LocalizedText>,
    pub price: Option<Decimal>,
    pub max_students: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

text_enum!(EnrollmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
});

/// What the student fills in on the enrollment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EnrollmentDetails {
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A record linking one user to one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Enrollment {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub details: EnrollmentDetails,
    pub status: EnrollmentStatus,
    pub payment_status: PaymentStatus,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(
        course_id: Uuid,
        user_id: Uuid,
        details: EnrollmentDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id,
            user_id,
            details,
            status: EnrollmentStatus::default(),
            payment_status: PaymentStatus::default(),
            enrolled_at: now,
        }
    }
}

/// Result of the store's conditional enrollment write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled(Enrollment),
    /// The `(user, course)` pair already had a record; it is returned unchanged.
    AlreadyEnrolled(Enrollment),
}

impl EnrollmentOutcome {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            Self::Enrolled(e) | Self::AlreadyEnrolled(e) => e,
        }
    }

    pub fn into_enrollment(self) -> Enrollment {
        match self {
            Self::Enrolled(e) | Self::AlreadyEnrolled(e) => e,
        }
    }

    pub fn already_enrolled(&self) -> bool {
        matches!(self, Self::AlreadyEnrolled(_))
    }
}
