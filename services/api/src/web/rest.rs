//! services/api/src/web/rest.rs
//!
//! The health check and the master definition for the OpenAPI specification.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, auth, contact, courses, products, profile, sample_orders};
use roastery_core::services::SignupForm;
use roastery_core::{
    ContactMessage, Course, CoursePatch, Enrollment, EnrollmentDetails, EnrollmentStatus,
    InquiryType, Language, LocalizedText, MessageStatus, NewContactMessage, NewCourse, NewProduct,
    NewSampleOrder, OrderStatus, PaymentStatus, Product, ProductPatch, ProfilePatch, Provider,
    SampleItem, SampleOrder, ShippingDetails, UserProfile,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::google_sign_in_handler,
        auth::logout_handler,
        profile::get_me_handler,
        profile::patch_me_handler,
        profile::get_user_handler,
        profile::patch_user_handler,
        profile::user_sample_orders_handler,
        products::list_products_handler,
        products::get_product_handler,
        products::create_product_handler,
        products::update_product_handler,
        products::delete_product_handler,
        courses::list_courses_handler,
        courses::get_course_handler,
        courses::course_whatsapp_link_handler,
        courses::enroll_handler,
        courses::create_course_handler,
        courses::update_course_handler,
        courses::delete_course_handler,
        sample_orders::create_sample_order_handler,
        sample_orders::list_sample_orders_handler,
        sample_orders::update_order_status_handler,
        sample_orders::delete_sample_order_handler,
        contact::submit_contact_handler,
        contact::contact_whatsapp_link_handler,
        contact::list_contact_messages_handler,
        contact::update_contact_status_handler,
        contact::delete_contact_message_handler,
        admin::list_users_handler,
        admin::set_admin_handler,
        admin::delete_user_handler,
    ),
    components(
        schemas(
            HealthResponse,
            SignupForm,
            auth::LoginRequest,
            auth::GoogleSignInRequest,
            auth::AuthResponse,
            UserProfile,
            ProfilePatch,
            Provider,
            LocalizedText,
            Language,
            Product,
            NewProduct,
            ProductPatch,
            Course,
            NewCourse,
            CoursePatch,
            Enrollment,
            EnrollmentDetails,
            EnrollmentStatus,
            PaymentStatus,
            courses::EnrollResponse,
            courses::WhatsappLinkResponse,
            SampleOrder,
            NewSampleOrder,
            SampleItem,
            ShippingDetails,
            OrderStatus,
            sample_orders::OrderStatusUpdate,
            ContactMessage,
            NewContactMessage,
            InquiryType,
            MessageStatus,
            contact::MessageStatusUpdate,
            admin::AdminFlagUpdate,
        )
    ),
    tags(
        (name = "auth", description = "Sign-up, login, Google sign-in and logout."),
        (name = "profile", description = "The signed-in user's profile."),
        (name = "products", description = "Public coffee catalog."),
        (name = "courses", description = "Coffee academy courses and enrollment."),
        (name = "sample-orders", description = "Sample requests."),
        (name = "contact", description = "Contact form and WhatsApp shortcut."),
        (name = "admin", description = "Back office panels; admins only.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
