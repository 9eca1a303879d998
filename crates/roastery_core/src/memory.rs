//! crates/roastery_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Every operation
//! runs under a single `RwLock`, which gives the multi-document writes the same
//! atomicity the Postgres adapter gets from transactions. Used by the test
//! suites and by `STORE_BACKEND=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    AuthSession, ContactFilter, ContactMessage, Course, CoursePatch, Enrollment,
    EnrollmentOutcome, EnrollmentStatus, MessageStatus, OrderStatus, Product, ProductFilter,
    ProductPatch, ProfileFilter, ProfilePatch, Provider, SampleOrder, SampleOrderFilter,
    UserCredentials, UserProfile,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Inner {
    /// Keyed by lowercased email.
    credentials: HashMap<String, UserCredentials>,
    identities: HashMap<(Provider, String), Uuid>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    /// Stored without the derived `enrolled_courses` / `sample_orders` lists.
    profiles: HashMap<Uuid, UserProfile>,
    /// Stored without the derived roster.
    courses: HashMap<Uuid, Course>,
    /// Insertion order doubles as roster order.
    enrollments: Vec<Enrollment>,
    orders: HashMap<Uuid, SampleOrder>,
    messages: HashMap<Uuid, ContactMessage>,
    products: HashMap<Uuid, Product>,
}

impl Inner {
    fn hydrate_profile(&self, stored: &UserProfile) -> UserProfile {
        let mut profile = stored.clone();
        profile.enrolled_courses = self
            .enrollments
            .iter()
            .filter(|e| e.user_id == stored.uid)
            .cloned()
            .collect();
        let mut orders: Vec<&SampleOrder> = self
            .orders
            .values()
            .filter(|o| o.user_id == stored.uid)
            .collect();
        orders.sort_by_key(|o| o.created_at);
        profile.sample_orders = orders.into_iter().map(|o| o.id).collect();
        profile
    }

    fn hydrate_course(&self, stored: &Course) -> Course {
        let mut course = stored.clone();
        course.enrolled_students = self.roster(stored.id);
        course
    }

    fn roster(&self, course_id: Uuid) -> Vec<Uuid> {
        self.enrollments
            .iter()
            .filter(|e| e.course_id == course_id && e.status != EnrollmentStatus::Cancelled)
            .map(|e| e.user_id)
            .collect()
    }

    fn profile(&self, uid: Uuid) -> PortResult<&UserProfile> {
        self.profiles
            .get(&uid)
            .ok_or_else(|| PortError::NotFound(format!("Profile {uid} not found")))
    }

    fn email_taken_by_other(&self, email: &str, uid: Uuid) -> bool {
        self.profiles
            .values()
            .any(|p| p.uid != uid && p.email.eq_ignore_ascii_case(email))
    }
}

/// Newest first.
fn sort_newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_account(
        &self,
        profile: UserProfile,
        hashed_password: &str,
    ) -> PortResult<UserProfile> {
        let mut inner = self.inner.write().await;
        let key = profile.email.to_lowercase();
        if inner.credentials.contains_key(&key) || inner.email_taken_by_other(&key, profile.uid) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                profile.email
            )));
        }
        if inner.profiles.contains_key(&profile.uid) {
            return Err(PortError::Conflict(format!("Profile {} already exists", profile.uid)));
        }
        inner.credentials.insert(
            key,
            UserCredentials {
                user_id: profile.uid,
                email: profile.email.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        let mut stored = profile;
        stored.enrolled_courses.clear();
        stored.sample_orders.clear();
        let hydrated = inner.hydrate_profile(&stored);
        inner.profiles.insert(stored.uid, stored);
        Ok(hydrated)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.inner
            .read()
            .await
            .credentials
            .get(&email.to_lowercase())
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No credentials for {email}")))
    }

    async fn find_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
    ) -> PortResult<Option<Uuid>> {
        Ok(self
            .inner
            .read()
            .await
            .identities
            .get(&(provider, subject.to_string()))
            .copied())
    }

    async fn link_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
        user_id: Uuid,
    ) -> PortResult<Uuid> {
        let mut inner = self.inner.write().await;
        Ok(*inner
            .identities
            .entry((provider, subject.to_string()))
            .or_insert(user_id))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        let mut inner = self.inner.write().await;
        let (user_id, expires_at) = *inner
            .sessions
            .get(session_id)
            .ok_or(PortError::Unauthorized)?;
        if expires_at <= Utc::now() {
            inner.sessions.remove(session_id);
            return Err(PortError::Unauthorized);
        }
        Ok(AuthSession {
            id: session_id.to_string(),
            user_id,
            expires_at,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn insert_profile_if_absent(
        &self,
        profile: UserProfile,
    ) -> PortResult<(UserProfile, bool)> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.profiles.get(&profile.uid) {
            return Ok((inner.hydrate_profile(existing), false));
        }
        if inner.email_taken_by_other(&profile.email, profile.uid) {
            return Err(PortError::Conflict(format!(
                "An account with email {} already exists",
                profile.email
            )));
        }
        let mut stored = profile;
        stored.enrolled_courses.clear();
        stored.sample_orders.clear();
        let hydrated = inner.hydrate_profile(&stored);
        inner.profiles.insert(stored.uid, stored);
        Ok((hydrated, true))
    }

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        let inner = self.inner.read().await;
        let stored = inner.profile(uid)?;
        Ok(inner.hydrate_profile(stored))
    }

    async fn find_profile_by_email(&self, email: &str) -> PortResult<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .map(|p| inner.hydrate_profile(p)))
    }

    async fn merge_profile(
        &self,
        uid: Uuid,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> PortResult<UserProfile> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .profiles
            .get_mut(&uid)
            .ok_or_else(|| PortError::NotFound(format!("Profile {uid} not found")))?;
        stored.apply(patch, at);
        let snapshot = stored.clone();
        Ok(inner.hydrate_profile(&snapshot))
    }

    async fn record_login(&self, uid: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .profiles
            .get_mut(&uid)
            .ok_or_else(|| PortError::NotFound(format!("Profile {uid} not found")))?;
        stored.last_login = Some(at);
        Ok(())
    }

    async fn set_admin(&self, uid: Uuid, is_admin: bool) -> PortResult<UserProfile> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .profiles
            .get_mut(&uid)
            .ok_or_else(|| PortError::NotFound(format!("Profile {uid} not found")))?;
        stored.is_admin = is_admin;
        stored.updated_at = Utc::now();
        let snapshot = stored.clone();
        Ok(inner.hydrate_profile(&snapshot))
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> PortResult<Vec<UserProfile>> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<UserProfile> = inner
            .profiles
            .values()
            .filter(|p| filter.accepts(p))
            .map(|p| inner.hydrate_profile(p))
            .collect();
        sort_newest_first(&mut profiles, |p| p.created_at);
        Ok(profiles)
    }

    async fn delete_profile(&self, uid: Uuid) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        inner.profile(uid)?;
        inner.profiles.remove(&uid);
        inner.credentials.retain(|_, c| c.user_id != uid);
        inner.identities.retain(|_, owner| *owner != uid);
        inner.sessions.retain(|_, (owner, _)| *owner != uid);
        inner.enrollments.retain(|e| e.user_id != uid);
        inner.orders.retain(|_, o| o.user_id != uid);
        Ok(())
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = inner
            .courses
            .values()
            .map(|c| inner.hydrate_course(c))
            .collect();
        sort_newest_first(&mut courses, |c| c.created_at);
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> PortResult<Course> {
        let inner = self.inner.read().await;
        inner
            .courses
            .get(&id)
            .map(|c| inner.hydrate_course(c))
            .ok_or_else(|| PortError::NotFound(format!("Course {id} not found")))
    }

    async fn create_course(&self, course: Course) -> PortResult<Course> {
        let mut inner = self.inner.write().await;
        if inner.courses.contains_key(&course.id) {
            return Err(PortError::Conflict(format!("Course {} already exists", course.id)));
        }
        let mut stored = course;
        stored.enrolled_students.clear();
        let hydrated = inner.hydrate_course(&stored);
        inner.courses.insert(stored.id, stored);
        Ok(hydrated)
    }

    async fn update_course(
        &self,
        id: Uuid,
        patch: &CoursePatch,
        at: DateTime<Utc>,
    ) -> PortResult<Course> {
        let mut inner = self.inner.write().await;
        let enrolled = inner.roster(id).len();
        let stored = inner
            .courses
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Course {id} not found")))?;
        if let Some(max_students) = patch.max_students {
            if (max_students as usize) < enrolled {
                return Err(PortError::Conflict(format!(
                    "{enrolled} students are already enrolled"
                )));
            }
        }
        stored.apply(patch, at);
        let snapshot = stored.clone();
        Ok(inner.hydrate_course(&snapshot))
    }

    async fn delete_course(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        if inner.courses.remove(&id).is_none() {
            return Err(PortError::NotFound(format!("Course {id} not found")));
        }
        inner.enrollments.retain(|e| e.course_id != id);
        Ok(())
    }

    async fn enroll(&self, enrollment: Enrollment) -> PortResult<EnrollmentOutcome> {
        let mut inner = self.inner.write().await;
        let course = inner
            .courses
            .get(&enrollment.course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", enrollment.course_id)))?;
        let max_students = course.max_students as usize;
        inner.profile(enrollment.user_id)?;

        if let Some(existing) = inner
            .enrollments
            .iter()
            .find(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        {
            return Ok(EnrollmentOutcome::AlreadyEnrolled(existing.clone()));
        }
        if inner.roster(enrollment.course_id).len() >= max_students {
            return Err(PortError::Conflict("This course is full".to_string()));
        }
        inner.enrollments.push(enrollment.clone());
        Ok(EnrollmentOutcome::Enrolled(enrollment))
    }

    async fn create_sample_order(&self, order: SampleOrder) -> PortResult<SampleOrder> {
        let mut inner = self.inner.write().await;
        inner.profile(order.user_id)?;
        if inner.orders.contains_key(&order.id) {
            return Err(PortError::Conflict(format!("Order {} already exists", order.id)));
        }
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_sample_order(&self, id: Uuid) -> PortResult<SampleOrder> {
        self.inner
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Sample order {id} not found")))
    }

    async fn list_sample_orders(
        &self,
        filter: &SampleOrderFilter,
    ) -> PortResult<Vec<SampleOrder>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<SampleOrder> = inner
            .orders
            .values()
            .filter(|o| filter.accepts(o))
            .cloned()
            .collect();
        sort_newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn update_sample_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> PortResult<SampleOrder> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Sample order {id} not found")))?;
        if order.status != from {
            return Err(PortError::Conflict(format!(
                "Order status changed to {} meanwhile",
                order.status
            )));
        }
        order.status = to;
        order.updated_at = at;
        Ok(order.clone())
    }

    async fn delete_sample_order(&self, id: Uuid) -> PortResult<()> {
        self.inner
            .write()
            .await
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Sample order {id} not found")))
    }

    async fn create_contact_message(&self, message: ContactMessage) -> PortResult<ContactMessage> {
        self.inner
            .write()
            .await
            .messages
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_contact_messages(
        &self,
        filter: &ContactFilter,
    ) -> PortResult<Vec<ContactMessage>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<ContactMessage> = inner
            .messages
            .values()
            .filter(|m| filter.accepts(m))
            .cloned()
            .collect();
        sort_newest_first(&mut messages, |m| m.created_at);
        Ok(messages)
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> PortResult<ContactMessage> {
        let mut inner = self.inner.write().await;
        let message = inner
            .messages
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Contact message {id} not found")))?;
        message.status = status;
        message.updated_at = at;
        Ok(message.clone())
    }

    async fn delete_contact_message(&self, id: Uuid) -> PortResult<()> {
        self.inner
            .write()
            .await
            .messages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Contact message {id} not found")))
    }

    async fn list_products(&self, filter: &ProductFilter) -> PortResult<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| filter.accepts(p))
            .cloned()
            .collect();
        sort_newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> PortResult<Product> {
        self.inner
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Product {id} not found")))
    }

    async fn create_product(&self, product: Product) -> PortResult<Product> {
        let mut inner = self.inner.write().await;
        if inner.products.contains_key(&product.id) {
            return Err(PortError::Conflict(format!("Product {} already exists", product.id)));
        }
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        at: DateTime<Utc>,
    ) -> PortResult<Product> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Product {id} not found")))?;
        product.apply(patch, at);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> PortResult<()> {
        self.inner
            .write()
            .await
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Product {id} not found")))
    }
}
