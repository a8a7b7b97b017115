//! Router-level tests driven with `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use form_relay::config::RelayConfig;
use form_relay::{FormPipeline, HttpServer};

mod common;

use common::{PanickingMailer, RecordingMailer, StubTokens};

struct Harness {
    router: Router,
    tokens: Arc<StubTokens>,
    mailer: Arc<RecordingMailer>,
}

fn harness(config: RelayConfig) -> Harness {
    harness_with(config, RecordingMailer::default())
}

fn harness_with(config: RelayConfig, mailer: RecordingMailer) -> Harness {
    let tokens = Arc::new(StubTokens::default());
    let mailer = Arc::new(mailer);
    let pipeline = FormPipeline::new(tokens.clone(), mailer.clone());
    let peer: SocketAddr = "198.51.100.7:40000".parse().unwrap();
    let router = HttpServer::new(config, pipeline)
        .router()
        .layer(MockConnectInfo(peer));
    Harness {
        router,
        tokens,
        mailer,
    }
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_contact_form_success() {
    let h = harness(RelayConfig::default());

    let (status, body) = send(&h.router, post_json("/api/contact-form", &common::consultation_json())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(h.tokens.calls(), 1);
    assert_eq!(h.mailer.sent()[0].to, "sales@secureautomations.ai");
}

#[tokio::test]
async fn test_contact_alias_route() {
    let h = harness(RelayConfig::default());
    let (status, _) = send(&h.router, post_json("/api/contact", &common::consultation_json())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_fields_is_400() {
    let h = harness(RelayConfig::default());
    let mut body = common::consultation_json();
    body.as_object_mut().unwrap().remove("message");

    let (status, body) = send(&h.router, post_json("/api/contact-form", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));
    assert_eq!(h.tokens.calls(), 0);
}

#[tokio::test]
async fn test_null_field_is_treated_as_absent() {
    let mut config = RelayConfig::default();
    config.rate_limit.enabled = false;
    let h = harness(config);

    let mut checkup = common::checkup_json();
    checkup["phone"] = Value::Null;
    checkup["certifications"] = json!(["ISO 27001", null]);
    let (status, body) = send(&h.router, post_json("/api/send-email", &checkup)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(h.mailer.sent()[0].html.contains("Not provided"));

    let mut contact = common::consultation_json();
    contact["message"] = Value::Null;
    let (status, body) = send(&h.router, post_json("/api/contact-form", &contact)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let h = harness(RelayConfig::default());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/submit-quiz")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let h = harness(RelayConfig::default());
    let mut body = common::consultation_json();
    body["message"] = json!("x".repeat(20 * 1024));

    let (status, body) = send(&h.router, post_json("/api/contact-form", &body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));
    assert_eq!(h.tokens.calls(), 0);
}

#[tokio::test]
async fn test_sixth_request_is_rate_limited() {
    let h = harness(RelayConfig::default());
    let mut invalid = common::consultation_json();
    invalid["email"] = json!("no-at-sign");

    // Rejected submissions still count against the window.
    for _ in 0..5 {
        let (status, _) = send(&h.router, post_json("/api/contact-form", &invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/contact-form", &common::consultation_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(h.tokens.calls(), 0);

    // Health is outside the limiter.
    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&h.router, health).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_can_be_disabled() {
    let mut config = RelayConfig::default();
    config.rate_limit.enabled = false;
    let h = harness(config);

    for _ in 0..8 {
        let (status, _) = send(&h.router, post_json("/api/contact", &common::consultation_json())).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(h.mailer.sent().len(), 8);
}

#[tokio::test]
async fn test_disallowed_origin_is_403() {
    let h = harness(RelayConfig::default());
    let mut request = post_json("/api/contact-form", &common::consultation_json());
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Not allowed by CORS" }));
    assert_eq!(h.tokens.calls(), 0);
}

#[tokio::test]
async fn test_allowed_origin_gets_cors_headers() {
    let h = harness(RelayConfig::default());
    let mut request = post_json("/api/contact-form", &common::consultation_json());
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://secureautomations.ai".parse().unwrap());

    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://secureautomations.ai"
    );
}

#[tokio::test]
async fn test_localhost_only_outside_production() {
    let localhost = || {
        let mut request = post_json("/api/contact-form", &common::consultation_json());
        request
            .headers_mut()
            .insert(header::ORIGIN, "http://localhost:5173".parse().unwrap());
        request
    };

    let prod = harness(RelayConfig::default());
    let (status, _) = send(&prod.router, localhost()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut config = RelayConfig::default();
    config.cors.production = false;
    let dev = harness(config);
    let (status, _) = send(&dev.router, localhost()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let h = harness(RelayConfig::default());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_caller_request_id_is_propagated() {
    let h = harness(RelayConfig::default());
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc")
        .body(Body::empty())
        .unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc");
}

#[tokio::test]
async fn test_quiz_and_checkup_routes() {
    let mut config = RelayConfig::default();
    config.rate_limit.enabled = false;
    let h = harness(config);

    let (status, _) = send(&h.router, post_json("/api/submit-quiz", &common::quiz_json())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.router, post_json("/api/send-email", &common::checkup_json())).await;
    assert_eq!(status, StatusCode::OK);

    let recipients: Vec<String> = h.mailer.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(
        recipients,
        vec![
            "grace@navy.example",
            "sales@secureautomations.ai",
            "compliance@secureautomations.ai",
        ]
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let h = harness(RelayConfig::default());
    let request = Request::builder().uri("/api/nope").body(Body::empty()).unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_injected_store_is_shared_and_keyed_by_peer() {
    use form_relay::security::{MemoryStore, RateLimitStore};

    let store = Arc::new(MemoryStore::new());
    let router_for = |peer: &str| {
        let pipeline = FormPipeline::new(
            Arc::new(StubTokens::default()),
            Arc::new(RecordingMailer::default()),
        );
        HttpServer::with_store(RelayConfig::default(), pipeline, store.clone())
            .router()
            .layer(MockConnectInfo(peer.parse::<SocketAddr>().unwrap()))
    };
    let first = router_for("203.0.113.1:1000");
    let second = router_for("203.0.113.1:2000");
    let other = router_for("203.0.113.2:1000");

    for _ in 0..5 {
        let (status, _) = send(&first, post_json("/api/contact", &common::consultation_json())).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Same IP through another server instance shares the window.
    let (status, body) = send(&second, post_json("/api/contact", &common::consultation_json())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "Too many requests, please try again later." }));

    let (status, _) = send(&other, post_json("/api/contact", &common::consultation_json())).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(store.get("203.0.113.1").map(|r| r.count), Some(6));
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_relay_answers_504_and_still_delivers() {
    let mut config = RelayConfig::default();
    config.timeouts.request_secs = 2;
    let h = harness_with(config, RecordingMailer::slow_on(2, Duration::from_secs(5)));

    let (status, body) = send(&h.router, post_json("/api/submit-quiz", &common::quiz_json())).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, json!({ "error": "Request timed out" }));
    assert_eq!(h.mailer.sent().len(), 1);

    // The sales copy is still delivered after the response went out.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let recipients: Vec<String> = h.mailer.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(recipients, vec!["grace@navy.example", "sales@secureautomations.ai"]);
    assert_eq!(h.mailer.attempts(), 2);
}

#[tokio::test]
async fn test_panicking_mailer_is_500() {
    let pipeline = FormPipeline::new(Arc::new(StubTokens::default()), Arc::new(PanickingMailer));
    let peer: SocketAddr = "198.51.100.7:40000".parse().unwrap();
    let router = HttpServer::new(RelayConfig::default(), pipeline)
        .router()
        .layer(MockConnectInfo(peer));

    let response = router
        .clone()
        .oneshot(post_json("/api/contact-form", &common::consultation_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = send(&router, post_json("/api/contact", &common::consultation_json())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "An unexpected error occurred" }));
}

