//! Common test utilities for finboard-service integration tests.
#![allow(dead_code)]

use finboard_service::config::{AggregatorConfig, Config, DatabaseConfig};
use finboard_service::services::{Database, SyncService};
use finboard_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::sync::Once;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,finboard_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub db: Database,
    pub sync: std::sync::Arc<SyncService>,
}

/// Spawn a test application wired to the given aggregator base URL.
///
/// Returns `None` (after logging a skip notice) when `TEST_DATABASE_URL`
/// is not set, so the database-backed suite degrades to a no-op on
/// machines without Postgres.
pub async fn try_spawn_app(aggregator_base_url: &str) -> Option<TestApp> {
    init_tracing();

    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: TEST_DATABASE_URL not set");
            return None;
        }
    };

    let config = Config {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "finboard-service-test".to_string(),
        log_level: "debug".to_string(),
        database: DatabaseConfig {
            url: Secret::new(database_url),
            max_connections: 2,
            min_connections: 1,
        },
        aggregator: AggregatorConfig {
            client_id: "test-client".to_string(),
            secret: Secret::new("test-secret".to_string()),
            base_url: aggregator_base_url.to_string(),
            client_name: "finboard-test".to_string(),
            country_codes: vec!["US".to_string()],
            page_count: 100,
            request_timeout_secs: 5,
        },
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build test application");

    let port = app.port();
    let db = app.db().clone();
    let sync = app.state().sync;
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    // Wait for the server to come up.
    let client = reqwest::Client::new();
    let health_url = format!("{}/health", address);
    for _ in 0..50 {
        if client.get(&health_url).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    Some(TestApp {
        address,
        client,
        db,
        sync,
    })
}

impl TestApp {
    /// Create a user with a unique auth id and return its id.
    pub async fn create_user(&self) -> Uuid {
        let response = self
            .client
            .post(format!("{}/users", self.address))
            .json(&json!({
                "auth_id": format!("auth-{}", Uuid::new_v4()),
                "username": "testuser"
            }))
            .send()
            .await
            .expect("Failed to create user");
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.expect("Invalid user response");
        body["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("User response missing id")
    }

    /// Run the link flow against the mocked aggregator and return the
    /// response body (an item on success, `{}` when no accounts came back).
    pub async fn link_item(&self, user_id: Uuid, institution_id: &str) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/items", self.address))
            .json(&json!({
                "public_token": "public-sandbox-token",
                "institution_id": institution_id,
                "user_id": user_id
            }))
            .send()
            .await
            .expect("Failed to call POST /items");

        let status = response.status().as_u16();
        let body = response.json().await.expect("Invalid item response");
        (status, body)
    }
}

// -----------------------------------------------------------------------------
// Aggregator mock payloads
// -----------------------------------------------------------------------------

pub fn transaction_json(id: &str, account_id: &str, name: &str, amount: &str, date: &str) -> Value {
    json!({
        "transaction_id": id,
        "account_id": account_id,
        "name": name,
        "amount": amount.parse::<f64>().unwrap(),
        "iso_currency_code": "USD",
        "category": ["Food and Drink", "Restaurants"],
        "transaction_type": "place",
        "date": date,
        "pending": false
    })
}

pub fn sync_page_json(added: Vec<Value>, next_cursor: &str, has_more: bool) -> Value {
    json!({
        "added": added,
        "modified": [],
        "removed": [],
        "next_cursor": next_cursor,
        "has_more": has_more
    })
}

pub fn account_json(account_id: &str, name: &str) -> Value {
    json!({
        "account_id": account_id,
        "name": name,
        "mask": "0000",
        "official_name": null,
        "balances": { "available": 100.0, "current": 110.0, "iso_currency_code": "USD" },
        "type": "depository",
        "subtype": "checking"
    })
}

/// Identifiers used by the happy-path aggregator mocks. External ids are
/// derived from the item id so parallel tests sharing one database never
/// collide on the global transaction-id uniqueness constraint.
pub struct HappyAggregator {
    pub access_token: String,
    pub account_id: String,
    pub transaction_id: String,
}

/// Mount the standard happy-path aggregator mocks: token exchange, a
/// single sync page ending at `cursor-1`, and one checking account.
pub async fn mount_happy_aggregator(server: &MockServer, external_item_id: &str) -> HappyAggregator {
    let ids = HappyAggregator {
        access_token: format!("access-{}", external_item_id),
        account_id: format!("acct-{}", external_item_id),
        transaction_id: format!("txn-{}", external_item_id),
    };

    Mock::given(method("POST"))
        .and(path("/item/public_token/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ids.access_token,
            "item_id": external_item_id
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/transactions/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sync_page_json(
            vec![transaction_json(
                &ids.transaction_id,
                &ids.account_id,
                "Coffee Shop",
                "4.50",
                "2026-08-01",
            )],
            "cursor-1",
            false,
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/accounts/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [account_json(&ids.account_id, "Checking")]
        })))
        .mount(server)
        .await;

    ids
}

/// Mount a sync page served only for requests carrying the given cursor.
/// Higher priority than the catch-all page mocks so the cursor match
/// wins.
pub async fn mount_sync_page_for_cursor(server: &MockServer, cursor: &str, page: Value) {
    Mock::given(method("POST"))
        .and(path("/transactions/sync"))
        .and(body_partial_json(json!({ "cursor": cursor })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .with_priority(1)
        .mount(server)
        .await;
}
