//! Academy catalog, enrollment, and the admin courses panel.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::AuthorizedStore;
use crate::domain::{
    Course, CoursePatch, Enrollment, EnrollmentDetails, EnrollmentOutcome, NewCourse,
};
use crate::ports::{PortError, PortResult};
use crate::services::validation::{require_filled, validate_phone};

pub async fn get_all_courses(store: &AuthorizedStore) -> PortResult<Vec<Course>> {
    store.list_courses().await
}

pub async fn get_course_by_id(store: &AuthorizedStore, id: Uuid) -> PortResult<Course> {
    store.get_course(id).await
}

/// Enrolls `uid` in `course_id`. Re-enrolling returns the existing record.
#[instrument(skip(store, details))]
pub async fn enroll_student(
    store: &AuthorizedStore,
    course_id: Uuid,
    uid: Uuid,
    details: EnrollmentDetails,
) -> PortResult<EnrollmentOutcome> {
    let details = EnrollmentDetails {
        full_name: details.full_name.trim().to_string(),
        phone_number: details.phone_number.trim().to_string(),
        notes: details
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };
    require_filled(&[
        ("full_name", details.full_name.as_str()),
        ("phone_number", details.phone_number.as_str()),
    ])?;
    validate_phone(&details.phone_number)?;

    let outcome = store
        .enroll(Enrollment::new(course_id, uid, details, Utc::now()))
        .await?;
    if !outcome.already_enrolled() {
        info!(%course_id, %uid, "Student enrolled");
    }
    Ok(outcome)
}

fn validate_price(price: Decimal) -> PortResult<()> {
    if price.is_sign_negative() {
        return Err(PortError::InvalidInput("price cannot be negative".to_string()));
    }
    Ok(())
}

fn validate_schedule(course: &Course) -> PortResult<()> {
    if let (Some(start), Some(end)) = (course.start_date, course.end_date) {
        if end < start {
            return Err(PortError::InvalidInput(
                "end_date cannot be before start_date".to_string(),
            ));
        }
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_course(store: &AuthorizedStore, new: NewCourse) -> PortResult<Course> {
    if new.title.is_blank() {
        return Err(PortError::InvalidInput("title is required".to_string()));
    }
    if new.max_students == 0 {
        return Err(PortError::InvalidInput("max_students must be positive".to_string()));
    }
    validate_price(new.price)?;
    let course = Course::from_new(Uuid::new_v4(), new, Utc::now());
    validate_schedule(&course)?;
    let course = store.create_course(course).await?;
    info!(course_id = %course.id, "Course created");
    Ok(course)
}

/// Applies a partial update. The patched document is validated before it is
/// written; the store rejects a capacity below the current roster.
#[instrument(skip(store, patch))]
pub async fn update_course(
    store: &AuthorizedStore,
    id: Uuid,
    patch: CoursePatch,
) -> PortResult<Course> {
    let mut preview = store.get_course(id).await?;
    preview.apply(&patch, Utc::now());
    if preview.title.is_blank() {
        return Err(PortError::InvalidInput("title is required".to_string()));
    }
    validate_price(preview.price)?;
    if preview.max_students == 0 {
        return Err(PortError::InvalidInput("max_students must be positive".to_string()));
    }
    validate_schedule(&preview)?;
    store.update_course(id, &patch, Utc::now()).await
}

/// Deleting a course removes its enrollments from every profile.
#[instrument(skip(store))]
pub async fn delete_course(store: &AuthorizedStore, id: Uuid) -> PortResult<()> {
    store.delete_course(id).await?;
    info!(course_id = %id, "Course deleted");
    Ok(())
}
