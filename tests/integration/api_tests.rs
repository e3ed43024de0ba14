//! HTTP surface tests driven through the router with `oneshot`

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use equiplend_server::{
    api,
    config::AppConfig,
    models::{user::UserClaims, UserRole},
    repository::Repository,
    services::{email::LogNotifier, otp::InMemoryOtpStore, Services},
    AppState,
};

fn app() -> (Router, AppConfig) {
    let config = AppConfig::default();
    let services = Services::new(
        Repository::new(),
        &config,
        Arc::new(InMemoryOtpStore::new()),
        Arc::new(LogNotifier),
    );
    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
    };
    (api::create_router(state), config)
}

fn token(config: &AppConfig, role: UserRole, user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("{:?}", role).to_lowercase(),
        user_id,
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
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
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (app, _) = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equipment_items"], 0);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (app, _) = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/equipment", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");

    let (status, _) = call(&app, Method::GET, "/api/v1/equipment", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn borrowers_cannot_register_equipment() {
    let (app, config) = app();
    let borrower = token(&config, UserRole::Borrower, Uuid::new_v4());
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&borrower),
        Some(json!({ "name": "Tripod", "category": "Photo", "total": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn borrowing_lifecycle_over_http() {
    let (app, config) = app();
    let admin = token(&config, UserRole::Admin, Uuid::new_v4());
    let borrower_id = Uuid::new_v4();
    let borrower = token(&config, UserRole::Borrower, borrower_id);

    let (status, item) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&admin),
        Some(json!({ "name": "Laptop", "category": "Computing", "condition": "good", "total": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let equipment_id = item["id"].as_str().unwrap().to_string();

    let borrow_from = Utc::now();
    let (status, created) = call(
        &app,
        Method::POST,
        "/api/v1/borrowings",
        Some(&borrower),
        Some(json!({
            "equipment_id": equipment_id,
            "quantity": 3,
            "purpose": "Hackathon",
            "intended_borrow_date": borrow_from,
            "intended_return_date": borrow_from + Duration::days(3),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["is_overdue"], false);
    let id = created["id"].as_str().unwrap().to_string();

    // borrowers cannot drive status
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/borrowings/{}/status", id),
        Some(&borrower),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for target in ["approved", "released"] {
        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/v1/borrowings/{}/status", id),
            Some(&admin),
            Some(json!({ "status": target })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], target);
    }

    let (_, availability) = call(
        &app,
        Method::GET,
        &format!("/api/v1/equipment/{}/availability", equipment_id),
        None,
        None,
    )
    .await;
    assert_eq!(availability["available"], 2);

    let (status, outcome) = call(
        &app,
        Method::POST,
        &format!("/api/v1/borrowings/{}/return", id),
        Some(&borrower),
        Some(json!({ "condition_on_return": "fair", "damage_severity": "severe" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["borrowing"]["status"], "return_requested");
    assert_eq!(outcome["return_record"]["status"], "pending");
    let return_id = outcome["return_record"]["id"].as_str().unwrap().to_string();

    let (status, reviewed) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/returns/{}/status", return_id),
        Some(&admin),
        Some(json!({ "status": "approved", "damage_fee": "120.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["borrowing"]["status"], "returned");
    assert_eq!(reviewed["return_record"]["status"], "approved");

    let (status, paid) = call(
        &app,
        Method::POST,
        &format!("/api/v1/returns/{}/payment", return_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["is_fee_paid"], true);

    let (_, availability) = call(
        &app,
        Method::GET,
        &format!("/api/v1/equipment/{}/availability", equipment_id),
        None,
        None,
    )
    .await;
    assert_eq!(availability["available"], 5);
}

#[tokio::test]
async fn return_date_in_the_body_is_ignored() {
    let (app, config) = app();
    let admin = token(&config, UserRole::Admin, Uuid::new_v4());
    let borrower = token(&config, UserRole::Borrower, Uuid::new_v4());

    let (_, item) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&admin),
        Some(json!({ "name": "Oscilloscope", "category": "Lab", "total": 1 })),
    )
    .await;
    let due = Utc::now() - Duration::days(10);
    let (_, created) = call(
        &app,
        Method::POST,
        "/api/v1/borrowings",
        Some(&borrower),
        Some(json!({
            "equipment_id": item["id"],
            "quantity": 1,
            "purpose": "Lab session",
            "intended_borrow_date": due - Duration::days(2),
            "intended_return_date": due,
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    for target in ["approved", "released"] {
        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/v1/borrowings/{}/status", id),
            Some(&admin),
            Some(json!({ "status": target })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, outcome) = call(
        &app,
        Method::POST,
        &format!("/api/v1/borrowings/{}/return", id),
        Some(&borrower),
        Some(json!({ "condition_on_return": "good", "actual_return_date": due })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["return_record"]["late_days"], 10);
    assert_eq!(outcome["return_record"]["is_late"], true);
}

#[tokio::test]
async fn domain_errors_map_to_status_codes() {
    let (app, config) = app();
    let admin = token(&config, UserRole::Admin, Uuid::new_v4());
    let borrower = token(&config, UserRole::Borrower, Uuid::new_v4());

    let (_, item) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&admin),
        Some(json!({ "name": "Drone", "category": "Aerial", "total": 1 })),
    )
    .await;
    let equipment_id = item["id"].as_str().unwrap().to_string();
    let now = Utc::now();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/borrowings",
        Some(&borrower),
        Some(json!({
            "equipment_id": equipment_id,
            "quantity": 2,
            "purpose": "Survey",
            "intended_borrow_date": now,
            "intended_return_date": now + Duration::days(1),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InsufficientStock");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/borrowings/{}", Uuid::new_v4()),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchRecord");

    let (_, created) = call(
        &app,
        Method::POST,
        "/api/v1/borrowings",
        Some(&borrower),
        Some(json!({
            "equipment_id": equipment_id,
            "quantity": 1,
            "purpose": "Survey",
            "intended_borrow_date": now,
            "intended_return_date": now + Duration::days(1),
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/borrowings/{}/status", id),
        Some(&admin),
        Some(json!({ "status": "returned" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidTransition");
}

#[tokio::test]
async fn guest_submission_needs_verified_email() {
    let (app, config) = app();
    let admin = token(&config, UserRole::Admin, Uuid::new_v4());
    let (_, item) = call(
        &app,
        Method::POST,
        "/api/v1/equipment",
        Some(&admin),
        Some(json!({ "name": "Microphone", "category": "Audio", "total": 4 })),
    )
    .await;
    let now = Utc::now();
    let submission = json!({
        "email": "walkin@example.com",
        "first_name": "Alan",
        "last_name": "Turing",
        "equipment_id": item["id"],
        "purpose": "Podcast",
        "intended_borrow_date": now,
        "intended_return_date": now + Duration::days(2),
    });

    let (status, _) = call(&app, Method::POST, "/api/v1/guest/borrowings", None, Some(submission)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let otp = json!({ "email": "walkin@example.com", "first_name": "Alan", "last_name": "Turing" });
    let (status, _) = call(&app, Method::POST, "/api/v1/guest/otp", None, Some(otp.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, Method::POST, "/api/v1/guest/otp", None, Some(otp)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "TooManyRequests");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/guest/otp/verify",
        None,
        Some(json!({ "email": "walkin@example.com", "code": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
