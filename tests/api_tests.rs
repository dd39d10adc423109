//! API smoke tests against a running server.
//!
//! Start the server, then run with: cargo test --test api_tests -- --ignored

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use schoolride_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Token signed with the server's secret
fn token(role: Role, user_id: i32) -> String {
    let secret = std::env::var("SCHOOLRIDE__AUTH__JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", user_id),
        user_id,
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_checks_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/bookings/1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
#[ignore]
async fn test_unknown_plan_type_is_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .bearer_auth(token(Role::Parent, 41))
        .json(&json!({
            "student_id": 7,
            "route_id": 1,
            "pickup_point_id": 1,
            "plan_type": "lifetime",
            "trip_type": "two_way",
            "start_date": Utc::now().date_naive().to_string()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 12);
    assert_eq!(body["message"], "Unknown or unpriced plan type");
}

#[tokio::test]
#[ignore]
async fn test_both_pickup_locations_are_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .bearer_auth(token(Role::Parent, 41))
        .json(&json!({
            "student_id": 7,
            "route_id": 1,
            "pickup_point_id": 1,
            "address": { "address": "4 Orchard Lane", "latitude": 48.85, "longitude": 2.35 },
            "plan_type": "weekly",
            "trip_type": "two_way",
            "start_date": Utc::now().date_naive().to_string()
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_parents_cannot_read_rosters() {
    let client = Client::new();

    let response = client
        .get(format!("{}/routes/1/roster?period=am", BASE_URL))
        .bearer_auth(token(Role::Parent, 41))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_completion_status_for_unknown_route() {
    let client = Client::new();

    let response = client
        .get(format!("{}/routes/999999/completion?period=pm&date=2024-03-01", BASE_URL))
        .bearer_auth(token(Role::Driver, 900))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_sweep_requires_admin() {
    let client = Client::new();

    let forbidden = client
        .post(format!("{}/operations/sweep", BASE_URL))
        .bearer_auth(token(Role::Driver, 900))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(forbidden.status(), 403);

    let response = client
        .post(format!("{}/operations/sweep", BASE_URL))
        .bearer_auth(token(Role::Admin, 1))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["expired"].is_number());
    assert!(body["records_created"].is_number());
}
