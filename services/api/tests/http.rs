//! End-to-end checks of the router over the in-memory store.

use std::sync::Arc;

use api_lib::{config::Config, router, web::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use roastery_core::{
    CredentialHasher, DatabaseService, FederatedIdentity, IdentityVerifier, MemoryStore,
    PortError, PortResult, Provider,
};
use serde_json::{json, Value};
use tower::ServiceExt;

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
        if id_token != "google-ayse" {
            return Err(PortError::Unauthorized);
        }
        Ok(FederatedIdentity {
            provider: Provider::Google,
            subject: "g-123".to_string(),
            email: "ayse@example.com".to_string(),
            display_name: Some("Ayşe Yılmaz".to_string()),
            given_name: Some("Ayşe".to_string()),
            family_name: Some("Yılmaz".to_string()),
        })
    }
}

fn app_with(whatsapp_number: Option<&str>) -> Router {
    let db: Arc<dyn DatabaseService> = Arc::new(MemoryStore::new());
    let config = Config {
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        whatsapp_number: whatsapp_number.map(str::to_string),
        ..Config::default()
    };
    let state = AppState::new(
        db,
        Arc::new(PlainHasher),
        Some(Arc::new(StubGoogle)),
        Arc::new(config),
    );
    router(Arc::new(state))
}

fn app() -> Router {
    app_with(None)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, set_cookie, json)
}

/// Signs up and returns the `session=<id>` pair to send back, plus the profile.
async fn signup(app: &Router, email: &str, first_name: &str) -> (String, Value) {
    let (status, set_cookie, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "email": email,
            "password": "hunter22",
            "first_name": first_name,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let set_cookie = set_cookie.expect("signup sets the session cookie");
    let pair = set_cookie.split(';').next().unwrap().to_string();
    assert!(pair.starts_with("session="));
    (pair, body["user"].clone())
}

fn new_course(max_students: u32) -> Value {
    json!({
        "title": { "tr": "Espresso Temelleri", "en": "Espresso Basics" },
        "price": "1500.00",
        "max_students": max_students,
        "location": "Kadıköy",
    })
}

fn sample_order_body() -> Value {
    json!({
        "items": [
            { "id": "eth-yirgacheffe", "name": "Yirgacheffe", "origin": "Ethiopia" },
            { "id": "col-huila", "name": "Huila", "origin": "Colombia" },
        ],
        "shipping": {
            "full_name": "Ayşe Yılmaz",
            "email": "ayse@example.com",
            "phone_number": "+905551112233",
            "address": "Moda Cd. 12",
            "city": "İstanbul",
            "postal_code": "34710",
        }
    })
}

#[tokio::test]
async fn health_answers_ok() {
    let (status, _, body) = send(&app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_sets_a_hardened_cookie_and_me_returns_the_profile() {
    let app = app();
    let (status, set_cookie, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "email": "ayse@example.com", "password": "hunter22", "first_name": "Ayşe" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    assert_eq!(body["needs_phone_number"], false);

    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let cookie = set_cookie.split(';').next().unwrap();

    let (status, _, me) = send(&app, Method::GET, "/me", Some(cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ayse@example.com");
    assert_eq!(me["first_name"], "Ayşe");
    assert_eq!(me["is_admin"], false);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app();
    let (status, _, body) = send(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, Method::GET, "/me", Some("session=bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_a_wrong_password_is_rejected_without_detail() {
    let app = app();
    signup(&app, "ayse@example.com", "Ayşe").await;

    let (status, set_cookie, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ayse@example.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(set_cookie.is_none());
    assert_eq!(body["error"], "Invalid email or password");

    let (status, set_cookie, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ayse@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.is_some());
}

#[tokio::test]
async fn google_sign_in_provisions_once() {
    let app = app();
    let body = json!({ "id_token": "google-ayse" });

    let (status, _, first) =
        send(&app, Method::POST, "/auth/google", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["created"], true);
    assert_eq!(first["user"]["provider"], "google");
    assert_eq!(first["needs_phone_number"], true);

    let (status, _, second) = send(&app, Method::POST, "/auth/google", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(second["user"]["uid"], first["user"]["uid"]);
    assert_eq!(second["needs_phone_number"], false);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/google",
        None,
        Some(json!({ "id_token": "forged" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patching_the_phone_number_keeps_the_rest_of_the_profile() {
    let app = app();
    let (cookie, _) = signup(&app, "ayse@example.com", "Ayşe").await;

    let (status, _, profile) = send(
        &app,
        Method::PATCH,
        "/me",
        Some(&cookie),
        Some(json!({ "phone_number": "+905551112233" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["phone_number"], "+905551112233");
    assert_eq!(profile["first_name"], "Ayşe");
    assert_eq!(profile["email"], "ayse@example.com");
}

#[tokio::test]
async fn users_cannot_touch_each_other_or_the_admin_panels() {
    let app = app();
    let (ayse, _) = signup(&app, "ayse@example.com", "Ayşe").await;
    let (_, mehmet) = signup(&app, "mehmet@example.com", "Mehmet").await;
    let other = format!("/users/{}", mehmet["uid"].as_str().unwrap());

    let (status, _, _) = send(
        &app,
        Method::PATCH,
        &other,
        Some(&ayse),
        Some(json!({ "first_name": "Hacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, Method::GET, "/admin/users", Some(&ayse), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/admin/courses",
        Some(&ayse),
        Some(new_course(10)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn enrolling_twice_keeps_one_seat() {
    let app = app();
    let (admin, admin_profile) = signup(&app, ADMIN_EMAIL, "Admin").await;
    assert_eq!(admin_profile["is_admin"], true);

    let (status, _, course) = send(
        &app,
        Method::POST,
        "/admin/courses",
        Some(&admin),
        Some(new_course(1)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    let enroll_uri = format!("/courses/{}/enroll", course["id"].as_str().unwrap());
    let details = json!({ "full_name": "Ayşe Yılmaz", "phone_number": "+905551112233" });

    let (ayse, _) = signup(&app, "ayse@example.com", "Ayşe").await;
    let (status, _, first) = send(
        &app,
        Method::POST,
        &enroll_uri,
        Some(&ayse),
        Some(details.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["already_enrolled"], false);

    let (status, _, second) = send(
        &app,
        Method::POST,
        &enroll_uri,
        Some(&ayse),
        Some(details.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_enrolled"], true);

    let course_uri = format!("/courses/{}", course["id"].as_str().unwrap());
    let (_, _, course) = send(&app, Method::GET, &course_uri, None, None).await;
    assert_eq!(course["enrolled_students"].as_array().unwrap().len(), 1);

    let (mehmet, _) = signup(&app, "mehmet@example.com", "Mehmet").await;
    let (status, _, _) = send(&app, Method::POST, &enroll_uri, Some(&mehmet), Some(details)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, me) = send(&app, Method::GET, "/me", Some(&ayse), None).await;
    assert_eq!(me["enrolled_courses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sample_orders_flow_through_the_admin_panel() {
    let app = app();
    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    let (ayse, _) = signup(&app, "ayse@example.com", "Ayşe").await;

    let (status, _, order) = send(
        &app,
        Method::POST,
        "/sample-orders",
        Some(&ayse),
        Some(sample_order_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, _, me) = send(&app, Method::GET, "/me", Some(&ayse), None).await;
    assert_eq!(me["sample_orders"], json!([order_id]));
    assert_eq!(me["city"], "İstanbul");

    let (status, _, _) = send(
        &app,
        Method::GET,
        "/admin/sample-orders",
        Some(&ayse),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, pending) = send(
        &app,
        Method::GET,
        "/admin/sample-orders?status=pending",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let status_uri = format!("/admin/sample-orders/{order_id}/status");
    let (status, _, shipped) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "shipped");

    let (status, _, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, pending) = send(
        &app,
        Method::GET,
        "/admin/sample-orders?status=pending",
        Some(&admin),
        None,
    )
    .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app();
    let (cookie, _) = signup(&app, "ayse@example.com", "Ayşe").await;

    let (status, set_cookie, _) =
        send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(set_cookie.unwrap().contains("Max-Age=0"));

    let (status, _, _) = send(&app, Method::GET, "/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contact_form_is_open_and_the_inbox_is_not() {
    let app = app();
    let (status, _, message) = send(
        &app,
        Method::POST,
        "/contact",
        None,
        Some(json!({
            "name": "Can",
            "email": "can@example.com",
            "inquiry_type": "wholesale",
            "message": "Kafemiz için toptan fiyat alabilir miyiz?",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["status"], "unread");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/contact",
        None,
        Some(json!({ "name": "", "email": "can@example.com", "message": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, Method::GET, "/admin/contact-messages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    let (status, _, inbox) = send(
        &app,
        Method::GET,
        "/admin/contact-messages?inquiry_type=wholesale",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn whatsapp_links_need_a_configured_number() {
    let (status, _, _) = send(&app(), Method::GET, "/contact/whatsapp-link", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = app_with(Some("905551112233"));
    let (status, _, body) = send(
        &app,
        Method::GET,
        "/contact/whatsapp-link?text=Merhaba",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/905551112233"), "{url}");
    assert!(url.contains("Merhaba"));
}

#[tokio::test]
async fn google_sign_in_without_a_client_id_is_unavailable() {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(PlainHasher),
        None,
        Arc::new(Config::default()),
    );
    let app = router(Arc::new(state));

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/auth/google",
        None,
        Some(json!({ "id_token": "google-ayse" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Google sign-in is not configured");
}

async fn create(app: &Router, admin: &str, uri: &str, body: Value) -> String {
    let (status, _, created) = send(app, Method::POST, uri, Some(admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn admin_course_patch_validates_and_respects_the_roster() {
    let app = app();
    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    let id = create(&app, &admin, "/admin/courses", new_course(5)).await;
    let uri = format!("/admin/courses/{id}");

    let (status, _, course) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "price": "1750.00", "location": "Moda" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{course}");
    assert_eq!(course["price"], "1750.00");
    assert_eq!(course["location"], "Moda");
    assert_eq!(course["title"]["en"], "Espresso Basics");

    let (status, _, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "max_students": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let details = json!({ "full_name": "Ayşe Yılmaz", "phone_number": "+905551112233" });
    for (email, name) in [("ayse@example.com", "Ayşe"), ("mehmet@example.com", "Mehmet")] {
        let (student, _) = signup(&app, email, name).await;
        let (status, _, _) = send(
            &app,
            Method::POST,
            &format!("/courses/{id}/enroll"),
            Some(&student),
            Some(details.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&admin),
        Some(json!({ "max_students": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, course) = send(&app, Method::GET, &format!("/courses/{id}"), None, None).await;
    assert_eq!(course["max_students"], 5);
}

#[tokio::test]
async fn admin_product_patch_and_catalog_filters() {
    let app = app();
    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    let product = |tr: &str, en: &str, category: &str| {
        json!({
            "name": { "tr": tr, "en": en },
            "origin": "Colombia",
            "category": category,
            "price": "380.00",
        })
    };
    let huila = create(
        &app,
        &admin,
        "/admin/products",
        product("Kolombiya Huila", "Colombia Huila", "filter"),
    )
    .await;
    create(
        &app,
        &admin,
        "/admin/products",
        product("Brezilya Santos", "Brazil Santos", "espresso"),
    )
    .await;

    let (status, _, patched) = send(
        &app,
        Method::PATCH,
        &format!("/admin/products/{huila}"),
        Some(&admin),
        Some(json!({ "in_stock": false, "featured": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["in_stock"], false);
    assert_eq!(patched["featured"], true);
    assert_eq!(patched["name"]["tr"], "Kolombiya Huila");

    let (status, _, _) = send(
        &app,
        Method::PATCH,
        &format!("/admin/products/{huila}"),
        Some(&admin),
        Some(json!({ "name": { "tr": " ", "en": "" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let names = |body: &Value| -> Vec<String> {
        let mut names: Vec<String> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"]["en"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    };
    let (_, _, all) = send(&app, Method::GET, "/products", None, None).await;
    assert_eq!(names(&all), ["Brazil Santos", "Colombia Huila"]);
    let (_, _, in_stock) = send(&app, Method::GET, "/products?in_stock=true", None, None).await;
    assert_eq!(names(&in_stock), ["Brazil Santos"]);
    let (_, _, filter) = send(&app, Method::GET, "/products?category=Filter", None, None).await;
    assert_eq!(names(&filter), ["Colombia Huila"]);
    let (_, _, found) = send(&app, Method::GET, "/products?search=brezilya", None, None).await;
    assert_eq!(names(&found), ["Brazil Santos"]);
    let (_, _, featured) = send(&app, Method::GET, "/products?featured=true&search=", None, None).await;
    assert_eq!(names(&featured), ["Colombia Huila"]);
}

#[tokio::test]
async fn admin_users_panel_searches_profiles() {
    let app = app();
    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    signup(&app, "ayse@example.com", "Ayşe").await;
    signup(&app, "mehmet@kahve.test", "Mehmet").await;

    let (status, _, found) = send(&app, Method::GET, "/admin/users?search=MEHM", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["email"], "mehmet@kahve.test");

    let (_, _, admins) = send(&app, Method::GET, "/admin/users?admins_only=true", Some(&admin), None).await;
    assert_eq!(admins.as_array().unwrap().len(), 1);
    assert_eq!(admins[0]["email"], ADMIN_EMAIL);

    let (_, _, everyone) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(everyone.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn course_whatsapp_link_speaks_the_requested_language() {
    let app = app_with(Some("905551112233"));
    let (admin, _) = signup(&app, ADMIN_EMAIL, "Admin").await;
    let espresso = create(&app, &admin, "/admin/courses", new_course(10)).await;
    let latte = create(
        &app,
        &admin,
        "/admin/courses",
        json!({ "title": { "tr": "Latte Sanatı" }, "price": "900.00", "max_students": 8 }),
    )
    .await;
    let link = |id: &str, lang: &str| format!("/courses/{id}/whatsapp-link{lang}");

    let (status, _, body) = send(&app, Method::GET, &link(&espresso, "?lang=en"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/905551112233?text=Hello"), "{url}");
    assert!(url.contains("Espresso+Basics"), "{url}");

    let (_, _, body) = send(&app, Method::GET, &link(&espresso, ""), None, None).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("text=Merhaba"), "{url}");
    assert!(url.contains("Espresso+Temelleri"), "{url}");

    let (_, _, body) = send(&app, Method::GET, &link(&latte, "?lang=en"), None, None).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("text=Hello"), "{url}");
    assert!(url.contains("Latte+Sanat%C4%B1"), "{url}");

    let (status, _, _) = send(&app, Method::GET, &link(&latte, "?lang=de"), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
