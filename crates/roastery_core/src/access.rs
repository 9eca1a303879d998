//! crates/roastery_core/src/access.rs
//!
//! Authorization at the store boundary.
//!
//! `AuthorizedStore` is the only handle services get on the document store. It
//! resolves the caller's role from the stored profile (never from anything the
//! client sends), evaluates the rule for every read and write, and refuses
//! writes once the caller's session has been cancelled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{
    AuthSession, ContactFilter, ContactMessage, Course, CoursePatch, Enrollment,
    EnrollmentOutcome, MessageStatus, OrderStatus, Product, ProductFilter, ProductPatch,
    ProfileFilter, ProfilePatch, Provider, SampleOrder, SampleOrderFilter, UserCredentials,
    UserProfile,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::session::SessionContext;

/// Who is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User { uid: Uuid, is_admin: bool },
    /// The server itself, acting on a verified identity-provider callback.
    System,
}

impl Principal {
    pub fn uid(&self) -> Option<Uuid> {
        match self {
            Self::User { uid, .. } => Some(*uid),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::User { is_admin: true, .. } | Self::System)
    }

    pub fn is_user(&self, uid: Uuid) -> bool {
        self.uid() == Some(uid)
    }

    pub fn is_self_or_admin(&self, uid: Uuid) -> bool {
        self.is_user(uid) || self.is_admin()
    }

    /// Admin flag and account deletion: admins only, and never on themselves.
    pub fn can_manage_account(&self, target: Uuid) -> bool {
        self.is_admin() && !self.is_user(target)
    }
}

/// A store handle bound to one principal and one cancellation token.
#[derive(Clone)]
pub struct AuthorizedStore {
    db: Arc<dyn DatabaseService>,
    principal: Principal,
    cancel: CancellationToken,
}

impl AuthorizedStore {
    pub fn anonymous(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            db,
            principal: Principal::Anonymous,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn system(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            db,
            principal: Principal::System,
            cancel: CancellationToken::new(),
        }
    }

    /// Resolves the session's principal from the stored profile.
    pub async fn for_session(db: Arc<dyn DatabaseService>, ctx: &SessionContext) -> PortResult<Self> {
        let profile = db.get_profile(ctx.user_id).await.map_err(|e| match e {
            PortError::NotFound(_) => PortError::Unauthorized,
            other => other,
        })?;
        Ok(Self {
            db,
            principal: Principal::User {
                uid: profile.uid,
                is_admin: profile.is_admin,
            },
            cancel: ctx.cancellation_token(),
        })
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// The principal's uid, or `Unauthorized` for anonymous and system callers.
    pub fn require_user(&self) -> PortResult<Uuid> {
        self.principal.uid().ok_or(PortError::Unauthorized)
    }

    fn allow(&self, allowed: bool, action: &str) -> PortResult<()> {
        if allowed {
            return Ok(());
        }
        match self.principal {
            Principal::Anonymous => Err(PortError::Unauthorized),
            _ => Err(PortError::Forbidden(format!("not allowed to {action}"))),
        }
    }

    fn allow_write(&self, allowed: bool, action: &str) -> PortResult<()> {
        self.allow(allowed, action)?;
        if self.cancel.is_cancelled() {
            return Err(PortError::Cancelled);
        }
        Ok(())
    }

    fn system_only(&self, action: &str) -> PortResult<()> {
        self.allow_write(self.principal == Principal::System, action)
    }

    // --- Credentials & identities (system only) ---

    pub async fn create_account(
        &self,
        profile: UserProfile,
        hashed_password: &str,
    ) -> PortResult<UserProfile> {
        self.system_only("create accounts")?;
        self.db.create_account(profile, hashed_password).await
    }

    pub async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.allow(self.principal == Principal::System, "read credentials")?;
        self.db.get_credentials_by_email(email).await
    }

    pub async fn find_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
    ) -> PortResult<Option<Uuid>> {
        self.allow(self.principal == Principal::System, "read identities")?;
        self.db.find_federated_identity(provider, subject).await
    }

    pub async fn link_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
        user_id: Uuid,
    ) -> PortResult<Uuid> {
        self.system_only("link identities")?;
        self.db.link_federated_identity(provider, subject, user_id).await
    }

    pub async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.system_only("open sessions")?;
        self.db.create_auth_session(session_id, user_id, expires_at).await
    }

    pub async fn validate_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        self.allow(self.principal == Principal::System, "read sessions")?;
        self.db.validate_auth_session(session_id).await
    }

    pub async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.system_only("close sessions")?;
        self.db.delete_auth_session(session_id).await
    }

    // --- Profiles ---

    pub async fn insert_profile_if_absent(
        &self,
        profile: UserProfile,
    ) -> PortResult<(UserProfile, bool)> {
        self.system_only("provision profiles")?;
        self.db.insert_profile_if_absent(profile).await
    }

    pub async fn find_profile_by_email(&self, email: &str) -> PortResult<Option<UserProfile>> {
        self.allow(self.principal == Principal::System, "look up profiles by email")?;
        self.db.find_profile_by_email(email).await
    }

    pub async fn record_login(&self, uid: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        self.system_only("record logins")?;
        self.db.record_login(uid, at).await
    }

    pub async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        self.allow(self.principal.is_self_or_admin(uid), "read this profile")?;
        self.db.get_profile(uid).await
    }

    pub async fn merge_profile(
        &self,
        uid: Uuid,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> PortResult<UserProfile> {
        self.allow_write(self.principal.is_self_or_admin(uid), "edit this profile")?;
        self.db.merge_profile(uid, patch, at).await
    }

    pub async fn set_admin(&self, uid: Uuid, is_admin: bool) -> PortResult<UserProfile> {
        self.allow_write(
            self.principal.can_manage_account(uid),
            "change this account's admin flag",
        )?;
        self.db.set_admin(uid, is_admin).await
    }

    pub async fn list_profiles(&self, filter: &ProfileFilter) -> PortResult<Vec<UserProfile>> {
        self.allow(self.principal.is_admin(), "list users")?;
        self.db.list_profiles(filter).await
    }

    pub async fn delete_profile(&self, uid: Uuid) -> PortResult<()> {
        self.allow_write(self.principal.can_manage_account(uid), "delete this account")?;
        self.db.delete_profile(uid).await
    }

    // --- Courses ---

    pub async fn list_courses(&self) -> PortResult<Vec<Course>> {
        self.db.list_courses().await
    }

    pub async fn get_course(&self, id: Uuid) -> PortResult<Course> {
        self.db.get_course(id).await
    }

    pub async fn create_course(&self, course: Course) -> PortResult<Course> {
        self.allow_write(self.principal.is_admin(), "manage courses")?;
        self.db.create_course(course).await
    }

    pub async fn update_course(
        &self,
        id: Uuid,
        patch: &CoursePatch,
        at: DateTime<Utc>,
    ) -> PortResult<Course> {
        self.allow_write(self.principal.is_admin(), "manage courses")?;
        self.db.update_course(id, patch, at).await
    }

    pub async fn delete_course(&self, id: Uuid) -> PortResult<()> {
        self.allow_write(self.principal.is_admin(), "manage courses")?;
        self.db.delete_course(id).await
    }

    pub async fn enroll(&self, enrollment: Enrollment) -> PortResult<EnrollmentOutcome> {
        self.allow_write(
            self.principal.is_self_or_admin(enrollment.user_id),
            "enroll this user",
        )?;
        self.db.enroll(enrollment).await
    }

    // --- Sample orders ---

    pub async fn create_sample_order(&self, order: SampleOrder) -> PortResult<SampleOrder> {
        self.allow_write(
            self.principal.is_user(order.user_id),
            "place orders for another user",
        )?;
        self.db.create_sample_order(order).await
    }

    pub async fn get_sample_order(&self, id: Uuid) -> PortResult<SampleOrder> {
        self.allow(self.principal.uid().is_some() || self.principal.is_admin(), "read orders")?;
        let order = self.db.get_sample_order(id).await?;
        self.allow(self.principal.is_self_or_admin(order.user_id), "read this order")?;
        Ok(order)
    }

    /// Admins may list everything; users only their own orders.
    pub async fn list_sample_orders(
        &self,
        filter: &SampleOrderFilter,
    ) -> PortResult<Vec<SampleOrder>> {
        let own = filter.user_id.is_some_and(|u| self.principal.is_user(u));
        self.allow(own || self.principal.is_admin(), "list these orders")?;
        self.db.list_sample_orders(filter).await
    }

    pub async fn update_sample_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> PortResult<SampleOrder> {
        self.allow_write(self.principal.is_admin(), "change order status")?;
        self.db.update_sample_order_status(id, from, to, at).await
    }

    pub async fn delete_sample_order(&self, id: Uuid) -> PortResult<()> {
        self.allow_write(self.principal.is_admin(), "delete orders")?;
        self.db.delete_sample_order(id).await
    }

    // --- Contact messages ---

    /// Anyone, including anonymous visitors, may write to the inbox.
    pub async fn create_contact_message(&self, message: ContactMessage) -> PortResult<ContactMessage> {
        self.allow_write(true, "send messages")?;
        self.db.create_contact_message(message).await
    }

    pub async fn list_contact_messages(
        &self,
        filter: &ContactFilter,
    ) -> PortResult<Vec<ContactMessage>> {
        self.allow(self.principal.is_admin(), "read the inbox")?;
        self.db.list_contact_messages(filter).await
    }

    pub async fn update_contact_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> PortResult<ContactMessage> {
        self.allow_write(self.principal.is_admin(), "manage the inbox")?;
        self.db.update_contact_status(id, status, at).await
    }

    pub async fn delete_contact_message(&self, id: Uuid) -> PortResult<()> {
        self.allow_write(self.principal.is_admin(), "manage the inbox")?;
        self.db.delete_contact_message(id).await
    }

    // --- Products ---

    pub async fn list_products(&self, filter: &ProductFilter) -> PortResult<Vec<Product>> {
        self.db.list_products(filter).await
    }

    pub async fn get_product(&self, id: Uuid) -> PortResult<Product> {
        self.db.get_product(id).await
    }

    pub async fn create_product(&self, product: Product) -> PortResult<Product> {
        self.allow_write(self.principal.is_admin(), "manage products")?;
        self.db.create_product(product).await
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        at: DateTime<Utc>,
    ) -> PortResult<Product> {
        self.allow_write(self.principal.is_admin(), "manage products")?;
        self.db.update_product(id, patch, at).await
    }

    pub async fn delete_product(&self, id: Uuid) -> PortResult<()> {
        self.allow_write(self.principal.is_admin(), "manage products")?;
        self.db.delete_product(id).await
    }
}
