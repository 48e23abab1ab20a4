//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_probe_with_in_process_storage() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage_backend"], "memory");
    assert!(json["checks"].get("database").is_none());
    assert_eq!(json["checks"]["websocket"]["active_connections"], 0);
}

#[tokio::test]
async fn test_readiness_fails_after_hub_teardown() {
    let app = TestApp::new().await;
    app.state.hub.teardown();

    let response = app.server.get("/health/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_counters() {
    let app = TestApp::new().await;
    app.server.get("/health").await.assert_status_ok();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("http_requests_total"));
}
