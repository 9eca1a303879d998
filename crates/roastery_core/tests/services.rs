//! Service-level scenarios against the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use roastery_core::messaging::course_inquiry_text;
use roastery_core::services::{accounts, contact, courses, products, sample_orders, users};
use roastery_core::{
    AccountPolicy, AuthGateway, AuthSession, AuthorizedStore, ContactFilter, ContactMessage,
    Course, CoursePatch, CredentialHasher, DatabaseService, Enrollment, EnrollmentDetails,
    EnrollmentOutcome, FederatedIdentity, IdentityVerifier, Language, LocalizedText,
    MemoryStore, MessageStatus, NewContactMessage, NewCourse, NewProduct, NewProfile,
    NewSampleOrder, OrderStatus, PortError, PortResult, Product, ProductFilter, ProductPatch,
    ProfileFilter, ProfilePatch, Provider, SampleItem, SampleOrder, SampleOrderFilter,
    SessionRegistry, ShippingDetails, SignedIn, SignupForm, UserCredentials, UserProfile,
};
use rust_decimal::Decimal;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "barista@roastery.test";

struct PlainHasher;

#[async_trait]
impl CredentialHasher for PlainHasher {
    async fn hash_password(&self, password: &str) -> PortResult<String> {
        Ok(format!("plain:{password}"))
    }

    async fn verify_password(&self, password: &str, hashed: &str) -> PortResult<bool> {
        Ok(hashed == format!("plain:{password}"))
    }
}

struct StubGoogle;

#[async_trait]
impl IdentityVerifier for StubGoogle {
    async fn verify_id_token(&self, id_token: &str) -> PortResult<FederatedIdentity> {
        match id_token {
            "google-ayse" => Ok(FederatedIdentity {
                provider: Provider::Google,
                subject: "g-123".to_string(),
                email: "ayse@example.com".to_string(),
                display_name: Some("Ayşe Yılmaz".to_string()),
                given_name: Some("Ayşe".to_string()),
                family_name: Some("Yılmaz".to_string()),
            }),
            _ => Err(PortError::Unauthorized),
        }
    }
}

/// In-memory store whose next account write can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_next_account: AtomicBool,
}

impl FlakyStore {
    fn fail_next_account(&self) {
        self.fail_next_account.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseService for FlakyStore {
    async fn create_account(
        &self,
        profile: UserProfile,
        hashed_password: &str,
    ) -> PortResult<UserProfile> {
        if self.fail_next_account.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unavailable("connection reset".to_string()));
        }
        self.inner.create_account(profile, hashed_password).await
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.inner.get_credentials_by_email(email).await
    }

    async fn find_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
    ) -> PortResult<Option<Uuid>> {
        self.inner.find_federated_identity(provider, subject).await
    }

    async fn link_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
        user_id: Uuid,
    ) -> PortResult<Uuid> {
        self.inner.link_federated_identity(provider, subject, user_id).await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner.create_auth_session(session_id, user_id, expires_at).await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        self.inner.validate_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.delete_auth_session(session_id).await
    }

    async fn insert_profile_if_absent(
        &self,
        profile: UserProfile,
    ) -> PortResult<(UserProfile, bool)> {
        self.inner.insert_profile_if_absent(profile).await
    }

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        self.inner.get_profile(uid).await
    }

    async fn find_profile_by_email(&self, email: &str) -> PortResult<Option<UserProfile>> {
        self.inner.find_profile_by_email(email).await
    }

    async fn merge_profile(
        &self,
        uid: Uuid,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> PortResult<UserProfile> {
        self.inner.merge_profile(uid, patch, at).await
    }

    async fn record_login(&self, uid: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        self.inner.record_login(uid, at).await
    }

    async fn set_admin(&self, uid: Uuid, is_admin: bool) -> PortResult<UserProfile> {
        self.inner.set_admin(uid, is_admin).await
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> PortResult<Vec<UserProfile>> {
        self.inner.list_profiles(filter).await
    }

    async fn delete_profile(&self, uid: Uuid) -> PortResult<()> {
        self.inner.delete_profile(uid).await
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        self.inner.list_courses().await
    }

    async fn get_course(&self, id: Uuid) -> PortResult<Course> {
        self.inner.get_course(id).await
    }

    async fn create_course(&self, course: Course) -> PortResult<Course> {
        self.inner.create_course(course).await
    }

    async fn update_course(
        &self,
        id: Uuid,
        patch: &CoursePatch,
        at: DateTime<Utc>,
    ) -> PortResult<Course> {
        self.inner.update_course(id, patch, at).await
    }

    async fn delete_course(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_course(id).await
    }

    async fn enroll(&self, enrollment: Enrollment) -> PortResult<EnrollmentOutcome> {
        self.inner.enroll(enrollment).await
    }

    async fn create_sample_order(&self, order: SampleOrder) -> PortResult<SampleOrder> {
        self.inner.create_sample_order(order).await
    }

    async fn get_sample_order(&self, id: Uuid) -> PortResult<SampleOrder> {
        self.inner.get_sample_order(id).await
    }

    async fn list_sample_orders(
        &self,
        filter: &SampleOrderFilter,
    ) -> PortResult<Vec<SampleOrder>> {
        self.inner.list_sample_orders(filter).await
    }

    async fn update_sample_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> PortResult<SampleOrder> {
        self.inner.update_sample_order_status(id, from, to, at).await
    }

    async fn delete_sample_order(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_sample_order(id).await
    }

    async fn create_contact_message(&self, message: ContactMessage) -> PortResult<ContactMessage> {
        self.inner.create_contact_message(message).await
    }

    async fn list_contact_messages(
        &self,
        filter: &ContactFilter,
    ) -> PortResult<Vec<ContactMessage>> {
        self.inner.list_contact_messages(filter).await
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> PortResult<ContactMessage> {
        self.inner.update_contact_status(id, status, at).await
    }

    async fn delete_contact_message(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_contact_message(id).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> PortResult<Vec<Product>> {
        self.inner.list_products(filter).await
    }

    async fn get_product(&self, id: Uuid) -> PortResult<Product> {
        self.inner.get_product(id).await
    }

    async fn create_product(&self, product: Product) -> PortResult<Product> {
        self.inner.create_product(product).await
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        at: DateTime<Utc>,
    ) -> PortResult<Product> {
        self.inner.update_product(id, patch, at).await
    }

    async fn delete_product(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_product(id).await
    }
}

struct Harness {
    db: Arc<dyn DatabaseService>,
    sessions: Arc<SessionRegistry>,
    gateway: AuthGateway,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_store(db: Arc<dyn DatabaseService>) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let gateway = AuthGateway::new(
            db.clone(),
            Arc::new(PlainHasher),
            Some(Arc::new(StubGoogle)),
            sessions.clone(),
            AccountPolicy::new(vec![ADMIN_EMAIL.to_string()], Duration::days(30)),
        );
        Self {
            db,
            sessions,
            gateway,
        }
    }

    async fn signup(&self, email: &str, first_name: &str) -> SignedIn {
        self.gateway
            .signup(SignupForm {
                email: email.to_string(),
                password: "hunter22".to_string(),
                first_name: first_name.to_string(),
                last_name: String::new(),
                phone_number: String::new(),
                display_name: None,
            })
            .await
            .unwrap()
    }

    async fn scope(&self, signed: &SignedIn) -> AuthorizedStore {
        let ctx = self.sessions.context_for(&signed.session).await.unwrap();
        AuthorizedStore::for_session(self.db.clone(), &ctx)
            .await
            .unwrap()
    }

    async fn admin(&self) -> AuthorizedStore {
        let admin = self.signup(ADMIN_EMAIL, "Admin").await;
        assert!(admin.profile.is_admin);
        self.scope(&admin).await
    }
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Ayşe Yılmaz".to_string(),
        email: "ayse@example.com".to_string(),
        phone_number: "+905551112233".to_string(),
        company: Some("Kahve Evi".to_string()),
        address: "Moda Cd. 12".to_string(),
        city: "İstanbul".to_string(),
        postal_code: Some("34710".to_string()),
        notes: None,
    }
}

fn items(n: usize) -> Vec<SampleItem> {
    (0..n)
        .map(|i| SampleItem {
            id: format!("sample-{i}"),
            name: format!("Sample {i}"),
            origin: "Ethiopia".to_string(),
            image: None,
        })
        .collect()
}

fn new_course(max_students: u32) -> NewCourse {
    NewCourse {
        title: LocalizedText::new("Espresso Temelleri", "Espresso Basics"),
        description: LocalizedText::default(),
        instructor: LocalizedText::new("Mehmet", "Mehmet"),
        price: Decimal::new(150000, 2),
        max_students,
        start_date: None,
        end_date: None,
        location: None,
        image_url: None,
    }
}

fn details() -> EnrollmentDetails {
    EnrollmentDetails {
        full_name: "Ayşe Yılmaz".to_string(),
        phone_number: "+905551112233".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn provisioning_twice_merges_into_one_profile() {
    let h = Harness::new();
    let uid = Uuid::new_v4();
    let new = |first_name: &str| NewProfile {
        uid,
        email: "ayse@example.com".to_string(),
        display_name: None,
        first_name: first_name.to_string(),
        last_name: String::new(),
        phone_number: String::new(),
        provider: Provider::Google,
        is_admin: false,
    };

    let first = h.gateway.provision_profile(new("")).await.unwrap();
    let second = h.gateway.provision_profile(new("Ayşe")).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.profile.first_name, "Ayşe");
    let all = h.db.list_profiles(&ProfileFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn duplicate_google_callback_yields_one_profile() {
    let h = Harness::new();
    let first = h.gateway.sign_in_with_google("google-ayse").await.unwrap();
    let second = h.gateway.sign_in_with_google("google-ayse").await.unwrap();

    assert_eq!(first.profile.uid, second.profile.uid);
    assert!(first.created && first.needs_phone_number);
    assert!(!second.created && !second.needs_phone_number);
    assert_eq!(first.profile.provider, Provider::Google);
    assert!(second.profile.last_login.is_some());
    let all = h.db.list_profiles(&ProfileFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn rejected_google_token_is_unauthorized() {
    let h = Harness::new();
    let err = h.gateway.sign_in_with_google("forged").await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized);
}

#[tokio::test]
async fn signup_rejects_duplicate_email_and_weak_password() {
    let h = Harness::new();
    h.signup("ayse@example.com", "Ayşe").await;

    let dup = h
        .gateway
        .signup(SignupForm {
            email: "AYSE@example.com".to_string(),
            password: "another1".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            display_name: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, PortError::Conflict(_)));

    let weak = h
        .gateway
        .signup(SignupForm {
            email: "new@example.com".to_string(),
            password: "123".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            display_name: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(weak, PortError::InvalidInput(_)));
}

#[tokio::test]
async fn login_checks_password_and_records_last_login() {
    let h = Harness::new();
    h.signup("ayse@example.com", "Ayşe").await;

    let err = h.gateway.login("ayse@example.com", "wrong-pass").await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized);

    let signed = h.gateway.login(" Ayse@Example.com ", "hunter22").await.unwrap();
    assert!(signed.profile.last_login.is_some());
    assert_eq!(signed.profile.first_name, "Ayşe");
}

#[tokio::test]
async fn phone_update_keeps_other_fields() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    assert_eq!(ayse.profile.phone_number, "");
    let store = h.scope(&ayse).await;

    accounts::update_user_profile(
        &store,
        ayse.profile.uid,
        ProfilePatch {
            phone_number: Some("+905551112233".to_string()),
            ..ProfilePatch::default()
        },
    )
    .await
    .unwrap();

    let profile = accounts::get_user_data(&store, ayse.profile.uid).await.unwrap();
    assert_eq!(profile.phone_number, "+905551112233");
    assert_eq!(profile.first_name, "Ayşe");
    assert_eq!(profile.email, "ayse@example.com");
}

#[tokio::test]
async fn non_admin_cannot_write_another_profile() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let mehmet = h.signup("mehmet@example.com", "Mehmet").await;
    let store = h.scope(&ayse).await;

    let err = accounts::update_user_profile(
        &store,
        mehmet.profile.uid,
        ProfilePatch {
            first_name: Some("Hacked".to_string()),
            ..ProfilePatch::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PortError::Forbidden(_)));

    let untouched = h.db.get_profile(mehmet.profile.uid).await.unwrap();
    assert_eq!(untouched.first_name, "Mehmet");

    assert!(matches!(
        users::set_admin(&store, ayse.profile.uid, true).await,
        Err(PortError::Forbidden(_))
    ));
    assert!(matches!(
        users::list_users(&store, &ProfileFilter::default()).await,
        Err(PortError::Forbidden(_))
    ));
}

#[tokio::test]
async fn admin_manages_users_but_not_their_own_account() {
    let h = Harness::new();
    let admin = h.admin().await;
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let admin_uid = admin.principal().uid().unwrap();

    let promoted = users::set_admin(&admin, ayse.profile.uid, true).await.unwrap();
    assert!(promoted.is_admin);
    let admins = users::list_users(
        &admin,
        &ProfileFilter {
            search: None,
            admins_only: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(admins.len(), 2);

    assert!(matches!(
        users::set_admin(&admin, admin_uid, false).await,
        Err(PortError::Forbidden(_))
    ));
    assert!(matches!(
        users::delete_user(&admin, admin_uid).await,
        Err(PortError::Forbidden(_))
    ));

    users::delete_user(&admin, ayse.profile.uid).await.unwrap();
    let err = h.gateway.login("ayse@example.com", "hunter22").await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized);
}

#[tokio::test]
async fn sample_order_with_n_items_appends_one_id() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    let order = sample_orders::create_sample_order(
        &store,
        NewSampleOrder {
            items: items(3),
            shipping: shipping(),
        },
    )
    .await
    .unwrap();

    assert_eq!(order.items.len(), 3);
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.order_number.starts_with("SMP-"));

    let mine = sample_orders::get_user_sample_orders(&store, ayse.profile.uid)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].items.len(), 3);

    let profile = accounts::get_user_data(&store, ayse.profile.uid).await.unwrap();
    assert_eq!(profile.sample_orders, vec![order.id]);
    assert_eq!(profile.phone_number, "+905551112233");
    assert_eq!(profile.city.as_deref(), Some("İstanbul"));
    assert_eq!(profile.first_name, "Ayşe");
}

#[tokio::test]
async fn sample_order_rejects_empty_and_duplicate_items() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    let empty = sample_orders::create_sample_order(
        &store,
        NewSampleOrder {
            items: Vec::new(),
            shipping: shipping(),
        },
    )
    .await;
    assert!(matches!(empty, Err(PortError::InvalidInput(_))));

    let mut twice = items(2);
    twice[1].id = twice[0].id.clone();
    let dup = sample_orders::create_sample_order(
        &store,
        NewSampleOrder {
            items: twice,
            shipping: shipping(),
        },
    )
    .await;
    assert!(matches!(dup, Err(PortError::InvalidInput(_))));
}

#[tokio::test]
async fn admin_status_change_is_visible_to_filters() {
    let h = Harness::new();
    let admin = h.admin().await;
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;
    let order = sample_orders::create_sample_order(
        &store,
        NewSampleOrder {
            items: items(1),
            shipping: shipping(),
        },
    )
    .await
    .unwrap();

    sample_orders::update_order_status(&admin, order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let shipped = sample_orders::get_all_sample_orders(
        &admin,
        &SampleOrderFilter {
            status: Some(OrderStatus::Shipped),
            user_id: None,
        },
    )
    .await
    .unwrap();
    assert!(shipped.iter().any(|o| o.id == order.id));

    let pending = sample_orders::get_all_sample_orders(
        &admin,
        &SampleOrderFilter {
            status: Some(OrderStatus::Pending),
            user_id: None,
        },
    )
    .await
    .unwrap();
    assert!(pending.iter().all(|o| o.id != order.id));

    let back = sample_orders::update_order_status(&admin, order.id, OrderStatus::Pending).await;
    assert!(matches!(back, Err(PortError::Conflict(_))));

    let by_owner = sample_orders::update_order_status(&store, order.id, OrderStatus::Delivered).await;
    assert!(matches!(by_owner, Err(PortError::Forbidden(_))));
}

#[tokio::test]
async fn deleting_an_order_removes_it_from_the_profile() {
    let h = Harness::new();
    let admin = h.admin().await;
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;
    let order = sample_orders::create_sample_order(
        &store,
        NewSampleOrder {
            items: items(2),
            shipping: shipping(),
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        sample_orders::delete_sample_order(&store, order.id).await,
        Err(PortError::Forbidden(_))
    ));
    sample_orders::delete_sample_order(&admin, order.id).await.unwrap();

    let profile = accounts::get_user_data(&store, ayse.profile.uid).await.unwrap();
    assert!(profile.sample_orders.is_empty());
}

#[tokio::test]
async fn sequential_double_enrollment_creates_one_record() {
    let h = Harness::new();
    let admin = h.admin().await;
    let course = courses::create_course(&admin, new_course(10)).await.unwrap();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    let first = courses::enroll_student(&store, course.id, ayse.profile.uid, details())
        .await
        .unwrap();
    let second = courses::enroll_student(&store, course.id, ayse.profile.uid, details())
        .await
        .unwrap();

    assert!(!first.already_enrolled());
    assert!(second.already_enrolled());
    let profile = accounts::get_user_data(&store, ayse.profile.uid).await.unwrap();
    assert_eq!(profile.enrolled_courses.len(), 1);
    let course = courses::get_course_by_id(&store, course.id).await.unwrap();
    assert_eq!(course.enrolled_students, vec![ayse.profile.uid]);
}

#[tokio::test]
async fn concurrent_enrollment_still_creates_one_record() {
    let h = Harness::new();
    let admin = h.admin().await;
    let course = courses::create_course(&admin, new_course(10)).await.unwrap();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    let (a, b) = tokio::join!(
        courses::enroll_student(&store, course.id, ayse.profile.uid, details()),
        courses::enroll_student(&store, course.id, ayse.profile.uid, details()),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    assert_eq!(outcomes.iter().filter(|o| !o.already_enrolled()).count(), 1);
    let course = courses::get_course_by_id(&store, course.id).await.unwrap();
    assert_eq!(course.enrolled_students.len(), 1);
}

#[tokio::test]
async fn full_course_rejects_new_students() {
    let h = Harness::new();
    let admin = h.admin().await;
    let course = courses::create_course(&admin, new_course(1)).await.unwrap();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let mehmet = h.signup("mehmet@example.com", "Mehmet").await;

    courses::enroll_student(&h.scope(&ayse).await, course.id, ayse.profile.uid, details())
        .await
        .unwrap();
    let err = courses::enroll_student(
        &h.scope(&mehmet).await,
        course.id,
        mehmet.profile.uid,
        details(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));
}

#[tokio::test]
async fn non_admin_cannot_manage_catalog() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    assert!(matches!(
        courses::create_course(&store, new_course(5)).await,
        Err(PortError::Forbidden(_))
    ));
    let product = NewProduct {
        name: LocalizedText::new("Yirgacheffe", "Yirgacheffe"),
        description: LocalizedText::default(),
        origin: "Ethiopia".to_string(),
        category: "filter".to_string(),
        price: Decimal::new(45000, 2),
        weight_grams: Some(250),
        image_url: None,
        in_stock: true,
        featured: false,
    };
    assert!(matches!(
        products::create_product(&store, product).await,
        Err(PortError::Forbidden(_))
    ));
}

#[tokio::test]
async fn logout_cancels_writes_of_in_flight_requests() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let store = h.scope(&ayse).await;

    h.gateway.logout(&ayse.session.id).await.unwrap();

    let err = accounts::update_user_profile(
        &store,
        ayse.profile.uid,
        ProfilePatch {
            phone_number: Some("+905551112233".to_string()),
            ..ProfilePatch::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, PortError::Cancelled);
    assert!(h.db.validate_auth_session(&ayse.session.id).await.is_err());
    let profile = h.db.get_profile(ayse.profile.uid).await.unwrap();
    assert_eq!(profile.phone_number, "");
}

#[tokio::test]
async fn contact_inbox_is_write_only_for_visitors() {
    let h = Harness::new();
    let visitor = AuthorizedStore::anonymous(h.db.clone());
    let saved = contact::submit_message(
        &visitor,
        NewContactMessage {
            name: "Ayşe".to_string(),
            email: "ayse@example.com".to_string(),
            phone: None,
            company: None,
            inquiry_type: Default::default(),
            message: "Toptan fiyat alabilir miyim?".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(saved.status, MessageStatus::Unread);

    assert_eq!(
        contact::list_messages(&visitor, &ContactFilter::default())
            .await
            .unwrap_err(),
        PortError::Unauthorized
    );

    let admin = h.admin().await;
    contact::set_message_status(&admin, saved.id, MessageStatus::Read)
        .await
        .unwrap();
    let unread = contact::list_messages(
        &admin,
        &ContactFilter {
            status: Some(MessageStatus::Unread),
            inquiry_type: None,
        },
    )
    .await
    .unwrap();
    assert!(unread.is_empty());
}

fn new_product(tr: &str, en: &str, category: &str, in_stock: bool) -> NewProduct {
    NewProduct {
        name: LocalizedText::new(tr, en),
        description: LocalizedText::default(),
        origin: "Colombia".to_string(),
        category: category.to_string(),
        price: Decimal::new(38000, 2),
        weight_grams: Some(250),
        image_url: None,
        in_stock,
        featured: false,
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
}

#[tokio::test]
async fn failed_account_write_leaves_the_email_free() {
    let store = Arc::new(FlakyStore::default());
    let h = Harness::with_store(store.clone());
    store.fail_next_account();

    let err = h
        .gateway
        .signup(SignupForm {
            email: "ayse@example.com".to_string(),
            password: "hunter22".to_string(),
            first_name: "Ayşe".to_string(),
            last_name: String::new(),
            phone_number: String::new(),
            display_name: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Unavailable(_)));
    assert!(h.db.find_profile_by_email("ayse@example.com").await.unwrap().is_none());
    assert!(h.db.list_profiles(&ProfileFilter::default()).await.unwrap().is_empty());

    let signed = h.signup("ayse@example.com", "Ayşe").await;
    let again = h.gateway.login("ayse@example.com", "hunter22").await.unwrap();
    assert_eq!(again.profile.uid, signed.profile.uid);
}

#[tokio::test]
async fn request_validated_before_logout_is_refused_afterwards() {
    let h = Harness::new();
    let ayse = h.signup("ayse@example.com", "Ayşe").await;
    let looked_up = h.db.validate_auth_session(&ayse.session.id).await.unwrap();

    h.gateway.logout(&ayse.session.id).await.unwrap();

    let err = h.sessions.context_for(&looked_up).await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized);
    assert_eq!(h.sessions.live_sessions().await, 0);
}

#[tokio::test]
async fn course_update_validates_the_patched_course() {
    let h = Harness::new();
    let admin = h.admin().await;
    let course = courses::create_course(&admin, new_course(10)).await.unwrap();

    let zero = courses::update_course(
        &admin,
        course.id,
        CoursePatch {
            max_students: Some(0),
            ..CoursePatch::default()
        },
    )
    .await;
    assert!(matches!(zero, Err(PortError::InvalidInput(_))));

    let blank = courses::update_course(
        &admin,
        course.id,
        CoursePatch {
            title: Some(LocalizedText::default()),
            ..CoursePatch::default()
        },
    )
    .await;
    assert!(matches!(blank, Err(PortError::InvalidInput(_))));

    courses::update_course(
        &admin,
        course.id,
        CoursePatch {
            start_date: Some(date(10)),
            ..CoursePatch::default()
        },
    )
    .await
    .unwrap();
    let backwards = courses::update_course(
        &admin,
        course.id,
        CoursePatch {
            end_date: Some(date(1)),
            ..CoursePatch::default()
        },
    )
    .await;
    assert!(matches!(backwards, Err(PortError::InvalidInput(_))));

    let updated = courses::update_course(
        &admin,
        course.id,
        CoursePatch {
            price: Some(Decimal::new(175000, 2)),
            end_date: Some(date(12)),
            ..CoursePatch::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.price, Decimal::new(175000, 2));
    assert_eq!(updated.max_students, 10);
    assert_eq!(updated.start_date, Some(date(10)));
    assert_eq!(updated.title, course.title);
}

#[tokio::test]
async fn capacity_cannot_drop_below_the_roster() {
    let h = Harness::new();
    let admin = h.admin().await;
    let course = courses::create_course(&admin, new_course(5)).await.unwrap();
    for (email, name) in [("ayse@example.com", "Ayşe"), ("mehmet@example.com", "Mehmet")] {
        let student = h.signup(email, name).await;
        courses::enroll_student(&h.scope(&student).await, course.id, student.profile.uid, details())
            .await
            .unwrap();
    }
    let shrink = |max| CoursePatch {
        max_students: Some(max),
        ..CoursePatch::default()
    };

    let err = courses::update_course(&admin, course.id, shrink(1)).await.unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));
    let err = h.db.update_course(course.id, &shrink(1), Utc::now()).await.unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));

    let course = courses::update_course(&admin, course.id, shrink(2)).await.unwrap();
    assert_eq!(course.max_students, 2);
    assert_eq!(course.enrolled_students.len(), 2);
}

#[tokio::test]
async fn product_filters_combine() {
    let h = Harness::new();
    let admin = h.admin().await;
    for product in [
        new_product("Etiyopya Yirgacheffe", "Ethiopia Yirgacheffe", "filter", true),
        new_product("Kolombiya Huila", "Colombia Huila", "Filter", false),
        new_product("Brezilya Santos", "Brazil Santos", "espresso", true),
    ] {
        products::create_product(&admin, product).await.unwrap();
    }
    let visitor = AuthorizedStore::anonymous(h.db.clone());
    let names = |found: Vec<Product>| {
        let mut names: Vec<String> = found.into_iter().map(|p| p.name.en).collect();
        names.sort();
        names
    };

    let filter = ProductFilter {
        category: Some("FILTER".to_string()),
        ..ProductFilter::default()
    };
    let found = products::list_products(&visitor, &filter).await.unwrap();
    assert_eq!(names(found), ["Colombia Huila", "Ethiopia Yirgacheffe"]);

    let filter = ProductFilter {
        category: Some("filter".to_string()),
        in_stock: Some(true),
        ..ProductFilter::default()
    };
    let found = products::list_products(&visitor, &filter).await.unwrap();
    assert_eq!(names(found), ["Ethiopia Yirgacheffe"]);

    let filter = ProductFilter {
        search: Some("kolombiya".to_string()),
        ..ProductFilter::default()
    };
    let found = products::list_products(&visitor, &filter).await.unwrap();
    assert_eq!(names(found), ["Colombia Huila"]);

    let filter = ProductFilter {
        search: Some("brazil".to_string()),
        ..ProductFilter::default()
    };
    let found = products::list_products(&visitor, &filter).await.unwrap();
    assert_eq!(names(found), ["Brazil Santos"]);
}

#[tokio::test]
async fn product_update_keeps_unpatched_fields() {
    let h = Harness::new();
    let admin = h.admin().await;
    let product = products::create_product(
        &admin,
        new_product("Kolombiya Huila", "Colombia Huila", "filter", true),
    )
    .await
    .unwrap();

    let updated = products::update_product(
        &admin,
        product.id,
        ProductPatch {
            in_stock: Some(false),
            price: Some(Decimal::new(41000, 2)),
            ..ProductPatch::default()
        },
    )
    .await
    .unwrap();
    assert!(!updated.in_stock);
    assert_eq!(updated.price, Decimal::new(41000, 2));
    assert_eq!(updated.name, product.name);

    let blank = products::update_product(
        &admin,
        product.id,
        ProductPatch {
            name: Some(LocalizedText::default()),
            ..ProductPatch::default()
        },
    )
    .await;
    assert!(matches!(blank, Err(PortError::InvalidInput(_))));
}

#[tokio::test]
async fn users_panel_search_matches_names_and_email() {
    let h = Harness::new();
    let admin = h.admin().await;
    h.signup("ayse@example.com", "Ayşe").await;
    h.signup("mehmet@kahve.test", "Mehmet").await;
    let search = |needle: &str| ProfileFilter {
        search: Some(needle.to_string()),
        admins_only: false,
    };

    let found = users::list_users(&admin, &search("MEHM")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "mehmet@kahve.test");

    let found = users::list_users(&admin, &search("example.com")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Ayşe");

    let found = users::list_users(&admin, &search("  ")).await.unwrap();
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn course_inquiry_follows_language_with_fallback() {
    let course = Course::from_new(Uuid::new_v4(), new_course(10), Utc::now());
    let en = course_inquiry_text(&course, Language::En);
    assert!(en.starts_with("Hello"));
    assert!(en.contains("Espresso Basics"));
    let tr = course_inquiry_text(&course, Language::Tr);
    assert!(tr.starts_with("Merhaba"));
    assert!(tr.contains("Espresso Temelleri"));

    let mut turkish_only = new_course(10);
    turkish_only.title = LocalizedText::new("Latte Sanatı", " ");
    let course = Course::from_new(Uuid::new_v4(), turkish_only, Utc::now());
    let en = course_inquiry_text(&course, Language::En);
    assert!(en.starts_with("Hello"));
    assert!(en.contains("Latte Sanatı"));
}
