//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries are checked at runtime (`query_as::<_, Record>`), so building the
//! crate never needs a live database.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use roastery_core::domain::{
    AuthSession, ContactFilter, ContactMessage, Course, CoursePatch, Enrollment,
    EnrollmentDetails, EnrollmentOutcome, LocalizedText, MessageStatus, OrderStatus, Product,
    ProductFilter, ProductPatch, ProfileFilter, ProfilePatch, Provider, SampleItem, SampleOrder,
    SampleOrderFilter, ShippingDetails, UserCredentials, UserProfile,
};
use roastery_core::ports::{DatabaseService, PortError, PortResult};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A Postgres-backed document store implementing the `DatabaseService` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error and Conversion Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps constraint violations on writes to domain errors.
fn write_err(e: sqlx::Error, conflict: &str) -> PortError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return PortError::Conflict(conflict.to_string());
        }
        if db.is_foreign_key_violation() {
            return PortError::NotFound("The referenced account or course no longer exists".into());
        }
        if db.is_check_violation() {
            return PortError::InvalidInput(db.message().to_string());
        }
    }
    unexpected(e)
}

fn parse_text<T: FromStr<Err = String>>(raw: &str) -> PortResult<T> {
    raw.parse().map_err(PortError::Unexpected)
}

fn to_i32(value: u32, field: &str) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::InvalidInput(format!("{field} is too large")))
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const PROFILE_SELECT: &str = "SELECT p.uid, p.email, p.display_name, p.first_name, p.last_name, \
     p.phone_number, p.provider, p.is_admin, p.company, p.address, p.city, p.postal_code, \
     p.created_at, p.last_login, p.updated_at, \
     COALESCE((SELECT array_agg(o.id ORDER BY o.created_at) FROM sample_orders o \
               WHERE o.user_id = p.uid), '{}') AS sample_orders \
     FROM profiles p";

#[derive(FromRow)]
struct ProfileRecord {
    uid: Uuid,
    email: String,
    display_name: Option<String>,
    first_name: String,
    last_name: String,
    phone_number: String,
    provider: String,
    is_admin: bool,
    company: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    sample_orders: Vec<Uuid>,
}

impl ProfileRecord {
    fn to_domain(self, enrolled_courses: Vec<Enrollment>) -> PortResult<UserProfile> {
        Ok(UserProfile {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            provider: parse_text(&self.provider)?,
            is_admin: self.is_admin,
            company: self.company,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            created_at: self.created_at,
            last_login: self.last_login,
            updated_at: self.updated_at,
            enrolled_courses,
            sample_orders: self.sample_orders,
        })
    }
}

const ENROLLMENT_COLUMNS: &str =
    "user_id, course_id, full_name, phone_number, notes, status, payment_status, enrolled_at";

#[derive(FromRow)]
struct EnrollmentRecord {
    user_id: Uuid,
    course_id: Uuid,
    full_name: String,
    phone_number: String,
    notes: Option<String>,
    status: String,
    payment_status: String,
    enrolled_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    fn to_domain(self) -> PortResult<Enrollment> {
        Ok(Enrollment {
            course_id: self.course_id,
            user_id: self.user_id,
            details: EnrollmentDetails {
                full_name: self.full_name,
                phone_number: self.phone_number,
                notes: self.notes,
            },
            status: parse_text(&self.status)?,
            payment_status: parse_text(&self.payment_status)?,
            enrolled_at: self.enrolled_at,
        })
    }
}

const COURSE_SELECT: &str = "SELECT c.id, c.title, c.description, c.instructor, c.price, \
     c.max_students, c.start_date, c.end_date, c.location, c.image_url, c.created_at, \
     c.updated_at, \
     COALESCE((SELECT array_agg(e.user_id ORDER BY e.enrolled_at) FROM enrollments e \
               WHERE e.course_id = c.id AND e.status <> 'cancelled'), '{}') AS enrolled_students \
     FROM courses c";

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: Json<LocalizedText>,
    description: Json<LocalizedText>,
    instructor: Json<LocalizedText>,
    price: Decimal,
    max_students: i32,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    location: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    enrolled_students: Vec<Uuid>,
}

impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title.0,
            description: self.description.0,
            instructor: self.instructor.0,
            price: self.price,
            max_students: to_u32(self.max_students),
            enrolled_students: self.enrolled_students,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str =
    "id, order_number, user_id, user_email, items, shipping, status, created_at, updated_at";

#[derive(FromRow)]
struct SampleOrderRecord {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    user_email: String,
    items: Json<Vec<SampleItem>>,
    shipping: Json<ShippingDetails>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SampleOrderRecord {
    fn to_domain(self) -> PortResult<SampleOrder> {
        Ok(SampleOrder {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            user_email: self.user_email,
            items: self.items.0,
            shipping: self.shipping.0,
            status: parse_text(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const CONTACT_COLUMNS: &str =
    "id, name, email, phone, company, inquiry_type, message, status, created_at, updated_at";

#[derive(FromRow)]
struct ContactRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    inquiry_type: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactRecord {
    fn to_domain(self) -> PortResult<ContactMessage> {
        Ok(ContactMessage {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            inquiry_type: parse_text(&self.inquiry_type)?,
            message: self.message,
            status: parse_text(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, origin, category, price, weight_grams, \
     image_url, in_stock, featured, created_at, updated_at";

#[derive(FromRow)]
struct ProductRecord {
    id: Uuid,
    name: Json<LocalizedText>,
    description: Json<LocalizedText>,
    origin: String,
    category: String,
    price: Decimal,
    weight_grams: Option<i32>,
    image_url: Option<String>,
    in_stock: bool,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            name: self.name.0,
            description: self.description.0,
            origin: self.origin,
            category: self.category,
            price: self.price,
            weight_grams: self.weight_grams.map(to_u32),
            image_url: self.image_url,
            in_stock: self.in_stock,
            featured: self.featured,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// Profile Hydration
//=========================================================================================

impl PgStore {
    /// Attaches each profile's enrollment records in one round trip.
    async fn hydrate_profiles(&self, records: Vec<ProfileRecord>) -> PortResult<Vec<UserProfile>> {
        let uids: Vec<Uuid> = records.iter().map(|r| r.uid).collect();
        let enrollments = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = ANY($1) ORDER BY enrolled_at"
        ))
        .bind(&uids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_user: HashMap<Uuid, Vec<Enrollment>> = HashMap::new();
        for record in enrollments {
            let enrollment = record.to_domain()?;
            by_user.entry(enrollment.user_id).or_default().push(enrollment);
        }
        records
            .into_iter()
            .map(|r| {
                let enrolled = by_user.remove(&r.uid).unwrap_or_default();
                r.to_domain(enrolled)
            })
            .collect()
    }

    async fn fetch_profile(&self, uid: Uuid) -> PortResult<Option<UserProfile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!("{PROFILE_SELECT} WHERE p.uid = $1"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        match record {
            Some(record) => Ok(self.hydrate_profiles(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn order_exists(&self, id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM sample_orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for PgStore {
    // --- Credentials & Auth Sessions ---

    /// One transaction: a failed credentials insert leaves no profile behind.
    #[instrument(skip_all, fields(uid = %profile.uid))]
    async fn create_account(
        &self,
        profile: UserProfile,
        hashed_password: &str,
    ) -> PortResult<UserProfile> {
        let taken = format!("Email {} is already registered", profile.email);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO profiles (uid, email, display_name, first_name, last_name, phone_number, \
             provider, is_admin, company, address, city, postal_code, created_at, last_login, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(profile.uid)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone_number)
        .bind(profile.provider.as_str())
        .bind(profile.is_admin)
        .bind(&profile.company)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(profile.created_at)
        .bind(profile.last_login)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_err(e, &taken))?;

        sqlx::query("INSERT INTO credentials (user_id, email, hashed_password) VALUES ($1, lower($2), $3)")
            .bind(profile.uid)
            .bind(&profile.email)
            .bind(hashed_password)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_err(e, &taken))?;

        tx.commit().await.map_err(unexpected)?;
        self.get_profile(profile.uid).await
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT user_id, email, hashed_password FROM credentials WHERE email = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        let (user_id, email, hashed_password) =
            row.ok_or_else(|| PortError::NotFound(format!("No account for {email}")))?;
        Ok(UserCredentials {
            user_id,
            email,
            hashed_password,
        })
    }

    async fn find_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
    ) -> PortResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM federated_identities WHERE provider = $1 AND subject = $2",
        )
        .bind(provider.as_str())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn link_federated_identity(
        &self,
        provider: Provider,
        subject: &str,
        user_id: Uuid,
    ) -> PortResult<Uuid> {
        sqlx::query(
            "INSERT INTO federated_identities (provider, subject, user_id) VALUES ($1, $2, $3) \
             ON CONFLICT (provider, subject) DO NOTHING",
        )
        .bind(provider.as_str())
        .bind(subject)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM federated_identities WHERE provider = $1 AND subject = $2",
        )
        .bind(provider.as_str())
        .bind(subject)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| write_err(e, "Session id collision"))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match row {
            Some((user_id, expires_at)) if expires_at > Utc::now() => Ok(AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            }),
            Some(_) => {
                sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
                    .bind(session_id)
                    .execute(&self.pool)
                    .await
                    .map_err(unexpected)?;
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Profiles ---

    #[instrument(skip_all, fields(uid = %profile.uid))]
    async fn insert_profile_if_absent(
        &self,
        profile: UserProfile,
    ) -> PortResult<(UserProfile, bool)> {
        let inserted = sqlx::query(
            "INSERT INTO profiles (uid, email, display_name, first_name, last_name, phone_number, \
             provider, is_admin, company, address, city, postal_code, created_at, last_login, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (uid) DO NOTHING",
        )
        .bind(profile.uid)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone_number)
        .bind(profile.provider.as_str())
        .bind(profile.is_admin)
        .bind(&profile.company)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(profile.created_at)
        .bind(profile.last_login)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_err(
                e,
                &format!("An account with email {} already exists", profile.email),
            )
        })?
        .rows_affected()
            == 1;

        let stored = self
            .fetch_profile(profile.uid)
            .await?
            .ok_or_else(|| PortError::Unexpected(format!("Profile {} vanished", profile.uid)))?;
        Ok((stored, inserted))
    }

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        self.fetch_profile(uid)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Profile {uid} not found")))
    }

    async fn find_profile_by_email(&self, email: &str) -> PortResult<Option<UserProfile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "{PROFILE_SELECT} WHERE lower(p.email) = lower($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match record {
            Some(record) => Ok(self.hydrate_profiles(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Per-column `COALESCE`, so concurrent merges of different fields both land.
    async fn merge_profile(
        &self,
        uid: Uuid,
        patch: &ProfilePatch,
        at: DateTime<Utc>,
    ) -> PortResult<UserProfile> {
        let updated = sqlx::query(
            "UPDATE profiles SET \
               display_name = COALESCE($2, display_name), \
               first_name = COALESCE($3, first_name), \
               last_name = COALESCE($4, last_name), \
               phone_number = COALESCE($5, phone_number), \
               company = COALESCE($6, company), \
               address = COALESCE($7, address), \
               city = COALESCE($8, city), \
               postal_code = COALESCE($9, postal_code), \
               updated_at = $10 \
             WHERE uid = $1",
        )
        .bind(uid)
        .bind(&patch.display_name)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.phone_number)
        .bind(&patch.company)
        .bind(&patch.address)
        .bind(&patch.city)
        .bind(&patch.postal_code)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Profile {uid} not found")));
        }
        self.get_profile(uid).await
    }

    async fn record_login(&self, uid: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        let updated = sqlx::query("UPDATE profiles SET last_login = $2 WHERE uid = $1")
            .bind(uid)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Profile {uid} not found")));
        }
        Ok(())
    }

    async fn set_admin(&self, uid: Uuid, is_admin: bool) -> PortResult<UserProfile> {
        let updated = sqlx::query("UPDATE profiles SET is_admin = $2, updated_at = now() WHERE uid = $1")
            .bind(uid)
            .bind(is_admin)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Profile {uid} not found")));
        }
        self.get_profile(uid).await
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> PortResult<Vec<UserProfile>> {
        let records = sqlx::query_as::<_, ProfileRecord>(&format!(
            "{PROFILE_SELECT} WHERE (NOT $1 OR p.is_admin) ORDER BY p.created_at DESC"
        ))
        .bind(filter.admins_only)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        let profiles = self.hydrate_profiles(records).await?;
        Ok(profiles.into_iter().filter(|p| filter.accepts(p)).collect())
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, uid: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        sqlx::query("DELETE FROM federated_identities WHERE user_id = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        // Credentials, sessions, enrollments and orders cascade from here.
        let deleted = sqlx::query("DELETE FROM profiles WHERE uid = $1")
            .bind(uid)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Profile {uid} not found")));
        }
        tx.commit().await.map_err(unexpected)
    }

    // --- Courses & Enrollment ---

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "{COURSE_SELECT} ORDER BY c.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CourseRecord::to_domain).collect())
    }

    async fn get_course(&self, id: Uuid) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!("{COURSE_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(CourseRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Course {id} not found")))
    }

    async fn create_course(&self, course: Course) -> PortResult<Course> {
        sqlx::query(
            "INSERT INTO courses (id, title, description, instructor, price, max_students, \
             start_date, end_date, location, image_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(course.id)
        .bind(Json(&course.title))
        .bind(Json(&course.description))
        .bind(Json(&course.instructor))
        .bind(course.price)
        .bind(to_i32(course.max_students, "max_students")?)
        .bind(course.start_date)
        .bind(course.end_date)
        .bind(&course.location)
        .bind(&course.image_url)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err(e, "A course with this id already exists"))?;
        Ok(Course {
            enrolled_students: Vec::new(),
            ..course
        })
    }

    async fn update_course(
        &self,
        id: Uuid,
        patch: &CoursePatch,
        at: DateTime<Utc>,
    ) -> PortResult<Course> {
        let max_students = patch
            .max_students
            .map(|m| to_i32(m, "max_students"))
            .transpose()?;
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Same row lock as `enroll`, so the roster cannot grow under the check.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Course {id} not found")))?;

        if let Some(max_students) = max_students {
            let enrolled = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status <> 'cancelled'",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
            if enrolled > i64::from(max_students) {
                return Err(PortError::Conflict(format!(
                    "{enrolled} students are already enrolled"
                )));
            }
        }

        sqlx::query(
            "UPDATE courses SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               instructor = COALESCE($4, instructor), \
               price = COALESCE($5, price), \
               max_students = COALESCE($6, max_students), \
               start_date = COALESCE($7, start_date), \
               end_date = COALESCE($8, end_date), \
               location = COALESCE($9, location), \
               image_url = COALESCE($10, image_url), \
               updated_at = $11 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.title.as_ref().map(Json))
        .bind(patch.description.as_ref().map(Json))
        .bind(patch.instructor.as_ref().map(Json))
        .bind(patch.price)
        .bind(max_students)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(&patch.location)
        .bind(&patch.image_url)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_err(e, "Course update conflicts with existing data"))?;

        tx.commit().await.map_err(unexpected)?;
        self.get_course(id).await
    }

    async fn delete_course(&self, id: Uuid) -> PortResult<()> {
        let deleted = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Course {id} not found")));
        }
        Ok(())
    }

    /// Locks the course row, so the pair check, capacity check and insert
    /// cannot interleave with another enrollment into the same course.
    #[instrument(skip_all, fields(course_id = %enrollment.course_id, user_id = %enrollment.user_id))]
    async fn enroll(&self, enrollment: Enrollment) -> PortResult<EnrollmentOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let max_students =
            sqlx::query_scalar::<_, i32>("SELECT max_students FROM courses WHERE id = $1 FOR UPDATE")
                .bind(enrollment.course_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(unexpected)?
                .ok_or_else(|| {
                    PortError::NotFound(format!("Course {} not found", enrollment.course_id))
                })?;

        let existing = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;
        if let Some(record) = existing {
            return Ok(EnrollmentOutcome::AlreadyEnrolled(record.to_domain()?));
        }

        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status <> 'cancelled'",
        )
        .bind(enrollment.course_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        if taken >= i64::from(max_students) {
            return Err(PortError::Conflict("This course is full".to_string()));
        }

        sqlx::query(&format!(
            "INSERT INTO enrollments ({ENROLLMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(&enrollment.details.full_name)
        .bind(&enrollment.details.phone_number)
        .bind(&enrollment.details.notes)
        .bind(enrollment.status.as_str())
        .bind(enrollment.payment_status.as_str())
        .bind(enrollment.enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_err(e, "Already enrolled in this course"))?;

        tx.commit().await.map_err(unexpected)?;
        Ok(EnrollmentOutcome::Enrolled(enrollment))
    }

    // --- Sample Orders ---

    /// A single insert; the owner's `sample_orders` list is derived from this table.
    async fn create_sample_order(&self, order: SampleOrder) -> PortResult<SampleOrder> {
        sqlx::query(&format!(
            "INSERT INTO sample_orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(&order.user_email)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping))
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err(e, &format!("Order {} already exists", order.id)))?;
        Ok(order)
    }

    async fn get_sample_order(&self, id: Uuid) -> PortResult<SampleOrder> {
        sqlx::query_as::<_, SampleOrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sample_orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Sample order {id} not found")))?
        .to_domain()
    }

    async fn list_sample_orders(
        &self,
        filter: &SampleOrderFilter,
    ) -> PortResult<Vec<SampleOrder>> {
        sqlx::query_as::<_, SampleOrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sample_orders \
             WHERE ($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR user_id = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(SampleOrderRecord::to_domain)
        .collect()
    }

    async fn update_sample_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> PortResult<SampleOrder> {
        let record = sqlx::query_as::<_, SampleOrderRecord>(&format!(
            "UPDATE sample_orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match record {
            Some(record) => record.to_domain(),
            None if self.order_exists(id).await? => Err(PortError::Conflict(format!(
                "Order status changed since it was read as {from}"
            ))),
            None => Err(PortError::NotFound(format!("Sample order {id} not found"))),
        }
    }

    async fn delete_sample_order(&self, id: Uuid) -> PortResult<()> {
        let deleted = sqlx::query("DELETE FROM sample_orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Sample order {id} not found")));
        }
        Ok(())
    }

    // --- Contact Messages ---

    async fn create_contact_message(&self, message: ContactMessage) -> PortResult<ContactMessage> {
        sqlx::query(&format!(
            "INSERT INTO contact_messages ({CONTACT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(message.id)
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.company)
        .bind(message.inquiry_type.as_str())
        .bind(&message.message)
        .bind(message.status.as_str())
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err(e, "Message already exists"))?;
        Ok(message)
    }

    async fn list_contact_messages(
        &self,
        filter: &ContactFilter,
    ) -> PortResult<Vec<ContactMessage>> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_messages \
             WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR inquiry_type = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.inquiry_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ContactRecord::to_domain)
        .collect()
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> PortResult<ContactMessage> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "UPDATE contact_messages SET status = $2, updated_at = $3 WHERE id = $1 \
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Message {id} not found")))?
        .to_domain()
    }

    async fn delete_contact_message(&self, id: Uuid) -> PortResult<()> {
        let deleted = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Message {id} not found")));
        }
        Ok(())
    }

    // --- Products ---

    /// Flag filters run in SQL; text search runs on the decoded names.
    async fn list_products(&self, filter: &ProductFilter) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::bool IS NULL OR in_stock = $1) AND ($2::bool IS NULL OR featured = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.in_stock)
        .bind(filter.featured)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(ProductRecord::to_domain)
            .filter(|p| filter.accepts(p))
            .collect())
    }

    async fn get_product(&self, id: Uuid) -> PortResult<Product> {
        sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ProductRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Product {id} not found")))
    }

    async fn create_product(&self, product: Product) -> PortResult<Product> {
        let weight_grams = product
            .weight_grams
            .map(|w| to_i32(w, "weight_grams"))
            .transpose()?;
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(product.id)
        .bind(Json(&product.name))
        .bind(Json(&product.description))
        .bind(&product.origin)
        .bind(&product.category)
        .bind(product.price)
        .bind(weight_grams)
        .bind(&product.image_url)
        .bind(product.in_stock)
        .bind(product.featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err(e, "A product with this id already exists"))?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
        at: DateTime<Utc>,
    ) -> PortResult<Product> {
        let weight_grams = patch
            .weight_grams
            .map(|w| to_i32(w, "weight_grams"))
            .transpose()?;
        let updated = sqlx::query(
            "UPDATE products SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               origin = COALESCE($4, origin), \
               category = COALESCE($5, category), \
               price = COALESCE($6, price), \
               weight_grams = COALESCE($7, weight_grams), \
               image_url = COALESCE($8, image_url), \
               in_stock = COALESCE($9, in_stock), \
               featured = COALESCE($10, featured), \
               updated_at = $11 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.name.as_ref().map(Json))
        .bind(patch.description.as_ref().map(Json))
        .bind(&patch.origin)
        .bind(&patch.category)
        .bind(patch.price)
        .bind(weight_grams)
        .bind(&patch.image_url)
        .bind(patch.in_stock)
        .bind(patch.featured)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Product {id} not found")));
        }
        self.get_product(id).await
    }

    async fn delete_product(&self, id: Uuid) -> PortResult<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Product {id} not found")));
        }
        Ok(())
    }
}
