use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: &TestConfig) -> Router {
    doctor_routes(Arc::new(config.to_app_config()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn admin_can_create_a_doctor() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let doctor_id = Uuid::new_v4().to_string();

    // Duplicate-email probe comes back empty, then the insert returns the
    // created row.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "new.doctor@example.com", "Dana")
        ])))
        .mount(&mock_server)
        .await;

    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let request_body = json!({
        "first_name": "Dana",
        "last_name": "Example",
        "email": "new.doctor@example.com",
        "specialty": "General Practice",
        "timezone": "UTC"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["doctor"]["email"], "new.doctor@example.com");
}

#[tokio::test]
async fn non_admin_cannot_create_a_doctor() {
    let config = TestConfig::default();
    let user = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let request_body = json!({
        "first_name": "Dana",
        "last_name": "Example",
        "email": "new.doctor@example.com"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn working_hours_round_trip_through_the_api() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let doctor_id = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "doctor@example.com", "Dana")
        ])))
        .mount(&mock_server)
        .await;

    let user = TestUser::client("viewer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/{}/working-hours", doctor_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let week = body["working_hours"].as_array().unwrap();
    assert_eq!(week.len(), 7);
    assert_eq!(week[0]["status"], "closed");
    assert_eq!(week[1]["status"], "open");
    assert_eq!(week[1]["start"], "09:00:00");
}

#[tokio::test]
async fn inverted_working_hours_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    // Monday closes before it opens.
    let request_body = json!({
        "working_hours": [
            { "status": "closed" },
            { "status": "open", "start": "17:00:00", "end": "09:00:00" },
            { "status": "closed" },
            { "status": "closed" },
            { "status": "closed" },
            { "status": "closed" },
            { "status": "closed" }
        ]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(&format!("/{}/working-hours", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn service_with_zero_duration_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let request_body = json!({
        "name": "Instant consult",
        "duration_minutes": 0,
        "price": 10.0
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&format!("/{}/services", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn service_with_half_defined_override_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let request_body = json!({
        "name": "Afternoon clinic",
        "duration_minutes": 30,
        "price": 40.0,
        "start_time": "13:00:00"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&format!("/{}/services", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_services_returns_catalog_rows() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    let doctor_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::service_response(&service_id, &doctor_id, 45)
        ])))
        .mount(&mock_server)
        .await;

    let user = TestUser::client("viewer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let app = create_test_app(&config);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/{}/services", doctor_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["services"][0]["duration_minutes"], 45);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let config = TestConfig::default();
    let app = create_test_app(&config);

    let response = app
        .oneshot(Request::builder().method("GET").uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
