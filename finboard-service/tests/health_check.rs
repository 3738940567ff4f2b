//! Liveness and metrics endpoint tests. Require `TEST_DATABASE_URL`.

mod common;

use common::try_spawn_app;
use serde_json::Value;
use wiremock::MockServer;

#[tokio::test]
async fn health_check_works() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "finboard-service");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}
