//! crates/roastery_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthSession, ContactFilter, ContactMessage, Course, CoursePatch, Enrollment,
    EnrollmentOutcome, FederatedIdentity, MessageStatus, OrderStatus, Product, ProductFilter,
    ProductPatch, ProfileFilter, ProfilePatch, Provider, SampleOrder, SampleOrderFilter,
    UserCredentials, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request cancelled because the session ended")]
    Cancelled,
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The document store.
///
/// Implementations guarantee per-document atomicity, plus atomicity for the
/// few multi-document writes called out below. Callers reach it through
/// [`crate::access::AuthorizedStore`], which owns authorization.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Credentials & Auth Sessions ---
    /// Inserts a password account: the profile and its credentials are written
    /// together or not at all. An email already in use is a `Conflict`.
    async fn create_account(
        &self,
        profile: UserProfile,
        hashed_password: &str,
    ) -> PortResult<UserProfile>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn find_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
    ) -> PortResult<Option<Uuid>>;

    /// Links `(provider, subject)` to `user_id` unless a link already exists.
    /// Returns the user id that owns the link afterwards.
    async fn link_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
        user_id: Uuid,
    ) -> PortResult<Uuid>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns a live session; unknown and expired sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<AuthSession>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Profiles ---
    /// Inserts `profile` unless one with the same uid exists. Returns the stored
    /// document and whether it was created by this call.
    async fn insert_profile_if_absent(&self, profile: UserProfile)
        -> PortResult<(UserProfile, bool)>;

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile>;

    async fn find_profile_by_email(&self, email: &str) -> PortResult<Option<UserProfile>>;

    /// Field-wise partial update; fields absent from `patch` are untouched.
    async fn merge_profile(
        &self,
        uid: Uuid,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> PortResult<UserProfile>;

    async fn record_login(&self, uid: Uuid, at: DateTime<Utc>) -> PortResult<()>;

    async fn set_admin(&self, uid: Uuid, is_admin: bool) -> PortResult<UserProfile>;

    async fn list_profiles(&self, filter: &ProfileFilter) -> PortResult<Vec<UserProfile>>;

    /// Deletes the profile with its credentials, identities, sessions,
    /// enrollments and sample orders.
    async fn delete_profile(&self, uid: Uuid) -> PortResult<()>;

    // --- Courses & Enrollment ---
    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course(&self, id: Uuid) -> PortResult<Course>;

    async fn create_course(&self, course: Course) -> PortResult<Course>;

    /// A `max_students` below the current roster is a `Conflict`, checked in
    /// the same step as the write so concurrent enrollments cannot slip past it.
    async fn update_course(
        &self,
        id: Uuid,
        patch: &CoursePatch,
        at: DateTime<Utc>,
    ) -> PortResult<Course>;

    async fn delete_course(&self, id: Uuid) -> PortResult<()>;

    /// Conditional write keyed by `(user_id, course_id)`: at most one record per
    /// pair, roster append included. A full course is a `Conflict`.
    async fn enroll(&self, enrollment: Enrollment) -> PortResult<EnrollmentOutcome>;

    // --- Sample Orders ---
    /// Inserts the order and appends it to the owner's profile in one step.
    async fn create_sample_order(&self, order: SampleOrder) -> PortResult<SampleOrder>;

    async fn get_sample_order(&self, id: Uuid) -> PortResult<SampleOrder>;

    async fn list_sample_orders(&self, filter: &SampleOrderFilter)
        -> PortResult<Vec<SampleOrder>>;

    /// Compare-and-set on status: fails with `Conflict` if the stored status is
    /// no longer `from`.
    async fn update_sample_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> PortResult<SampleOrder>;

    async fn delete_sample_order(&self, id: Uuid) -> PortResult<()>;

    // --- Contact Messages ---
    async fn create_contact_message(&self, message: ContactMessage) -> PortResult<ContactMessage>;

    async fn list_contact_messages(&self, filter: &ContactFilter)
        -> PortResult<Vec<ContactMessage>>;

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> PortResult<ContactMessage>;

    async fn delete_contact_message(&self, id: Uuid) -> PortResult<()>;

    // --- Products ---
    async fn list_products(&self, filter: &ProductFilter) -> PortResult<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> PortResult<Product>;

    async fn create_product(&self, product: Product) -> PortResult<Product>;

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        at: DateTime<Utc>,
    ) -> PortResult<Product>;

    async fn delete_product(&self, id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies a federated ID token and returns the identity it asserts.
    async fn verify_id_token(&self, id_token: &str) -> PortResult<FederatedIdentity>;
}

#[async_trait]
pub trait CredentialHasher: Send + Sync {
    /// Produces a self-describing hash of `password` suitable for storage.
    async fn hash_password(&self, password: &str) -> PortResult<String>;

    /// Checks `password` against a hash produced by `hash_password`.
    async fn verify_password(&self, password: &str, hashed: &str) -> PortResult<bool>;
}
