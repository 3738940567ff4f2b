//! User CRUD and income/bills tests. Require `TEST_DATABASE_URL`.

mod common;

use common::try_spawn_app;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::MockServer;

#[tokio::test]
async fn create_and_fetch_user() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let auth_id = format!("auth-{}", Uuid::new_v4());
    let response = app
        .client
        .post(format!("{}/users", app.address))
        .json(&json!({ "auth_id": auth_id, "username": "alex" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alex");
    // The auth id and income figures stay out of the user response.
    assert!(body.get("auth_id").is_none());
    assert!(body.get("monthly_income").is_none());

    let user_id = body["id"].as_str().unwrap();
    let fetched: Value = app
        .client
        .get(format!("{}/users/{}", app.address, user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"], body["id"]);
}

#[tokio::test]
async fn duplicate_auth_id_conflicts() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let auth_id = format!("auth-{}", Uuid::new_v4());
    let payload = json!({ "auth_id": auth_id, "username": "alex" });

    let first = app
        .client
        .post(format!("{}/users", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = app
        .client
        .post(format!("{}/users", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
}

#[tokio::test]
async fn empty_username_is_rejected() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let response = app
        .client
        .post(format!("{}/users", app.address))
        .json(&json!({ "auth_id": format!("auth-{}", Uuid::new_v4()), "username": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let response = app
        .client
        .get(format!("{}/users/{}", app.address, Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn delete_user_then_fetch_is_not_found() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let user_id = app.create_user().await;

    let response = app
        .client
        .delete(format!("{}/users/{}", app.address, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .client
        .get(format!("{}/users/{}", app.address, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn income_bills_roundtrip() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let user_id = app.create_user().await;

    let set: Value = app
        .client
        .put(format!("{}/users/{}/income-bills", app.address, user_id))
        .json(&json!({ "monthly_income": "5000.00", "monthly_bills": "1800.50" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(set["monthly_income"], "5000.00");
    assert_eq!(set["monthly_bills"], "1800.50");

    let fetched: Value = app
        .client
        .get(format!("{}/users/{}/income-bills", app.address, user_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["monthly_income"], "5000.00");
}

#[tokio::test]
async fn income_bills_for_missing_user_is_not_found() {
    let server = MockServer::start().await;
    let Some(app) = try_spawn_app(&server.uri()).await else {
        return;
    };

    let response = app
        .client
        .put(format!(
            "{}/users/{}/income-bills",
            app.address,
            Uuid::new_v4()
        ))
        .json(&json!({ "monthly_income": "1.00", "monthly_bills": "1.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
