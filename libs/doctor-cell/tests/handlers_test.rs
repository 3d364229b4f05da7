use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn test_app(config: &TestConfig) -> Router {
    doctor_routes(config.to_arc())
}

#[tokio::test]
async fn slot_generation_requires_a_token() {
    let config = TestConfig::default();
    let app = test_app(&config);

    let request = Request::builder()
        .method("POST")
        .uri("/some-doctor/slots/generate")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "appointment_duration": 30 }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctors_cannot_generate_slots_for_each_other() {
    let config = TestConfig::default();
    let app = test_app(&config);

    let user = TestUser::doctor("drjones@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("POST")
        .uri("/another-doctor-id/slots/generate")
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(json!({ "appointment_duration": 30 }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_numeric_duration_is_a_plain_bad_request() {
    let config = TestConfig::default();
    let app = test_app(&config);

    let user = TestUser::doctor("drjones@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("POST")
        .uri(&format!("/{}/slots/generate", user.id))
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(json!({ "appointment_duration": "soon" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json_response["error"],
        "Invalid data or appointment duration."
    );
}

#[tokio::test]
async fn availability_covers_the_whole_horizon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = test_app(&config);

    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/some-doctor/two-week-availability")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["status"], "success");
    let slots = json_response["slots"].as_object().unwrap();
    assert_eq!(slots.len(), 14);
    assert!(slots.values().all(|v| v.as_array().unwrap().is_empty()));
}
