//! services/api/src/lib.rs
//!
//! The HTTP service: configuration, adapters for the core ports, and the axum
//! router. The `api` binary wires these together; tests drive the router
//! directly.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    admin, auth, contact, courses, products, profile, require_auth, rest, sample_orders,
    AppState,
};

/// Builds the complete application router, Swagger UI included.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/google", post(auth::google_sign_in_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/products", get(products::list_products_handler))
        .route("/products/{id}", get(products::get_product_handler))
        .route("/courses", get(courses::list_courses_handler))
        .route("/courses/{id}", get(courses::get_course_handler))
        .route(
            "/courses/{id}/whatsapp-link",
            get(courses::course_whatsapp_link_handler),
        )
        .route("/contact", post(contact::submit_contact_handler))
        .route(
            "/contact/whatsapp-link",
            get(contact::contact_whatsapp_link_handler),
        );

    // Protected routes (auth required); admin rules are enforced by the store scope
    let protected_routes = Router::new()
        .route(
            "/me",
            get(profile::get_me_handler).patch(profile::patch_me_handler),
        )
        .route(
            "/users/{uid}",
            get(profile::get_user_handler).patch(profile::patch_user_handler),
        )
        .route(
            "/users/{uid}/sample-orders",
            get(profile::user_sample_orders_handler),
        )
        .route("/courses/{id}/enroll", post(courses::enroll_handler))
        .route(
            "/sample-orders",
            post(sample_orders::create_sample_order_handler),
        )
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{uid}", delete(admin::delete_user_handler))
        .route("/admin/users/{uid}/admin", put(admin::set_admin_handler))
        .route("/admin/products", post(products::create_product_handler))
        .route(
            "/admin/products/{id}",
            patch(products::update_product_handler).delete(products::delete_product_handler),
        )
        .route("/admin/courses", post(courses::create_course_handler))
        .route(
            "/admin/courses/{id}",
            patch(courses::update_course_handler).delete(courses::delete_course_handler),
        )
        .route(
            "/admin/sample-orders",
            get(sample_orders::list_sample_orders_handler),
        )
        .route(
            "/admin/sample-orders/{id}",
            delete(sample_orders::delete_sample_order_handler),
        )
        .route(
            "/admin/sample-orders/{id}/status",
            put(sample_orders::update_order_status_handler),
        )
        .route(
            "/admin/contact-messages",
            get(contact::list_contact_messages_handler),
        )
        .route(
            "/admin/contact-messages/{id}",
            delete(contact::delete_contact_message_handler),
        )
        .route(
            "/admin/contact-messages/{id}/status",
            put(contact::update_contact_status_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
