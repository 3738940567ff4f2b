use crate::config::Config;
use crate::handlers;
use crate::services::{AggregatorClient, Database, SyncService};
use axum::{
    routing::{get, post, put},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub aggregator: AggregatorClient,
    pub sync: Arc<SyncService>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Postgres: {}", e);
            e
        })?;
        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let aggregator = AggregatorClient::new(config.aggregator.clone());
        if aggregator.is_configured() {
            tracing::info!("Aggregator client initialized");
        } else {
            tracing::warn!("Aggregator credentials not configured - bank linking will fail");
        }

        let sync = Arc::new(SyncService::new(db.clone(), aggregator.clone()));

        let state = AppState {
            config: config.clone(),
            db,
            aggregator,
            sync,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/users", post(handlers::create_user))
            .route(
                "/users/:user_id",
                get(handlers::get_user).delete(handlers::delete_user),
            )
            .route(
                "/users/:user_id/transactions",
                get(handlers::get_user_transactions),
            )
            .route(
                "/users/:user_id/recurring-transactions",
                get(handlers::get_user_recurring_transactions),
            )
            .route("/users/:user_id/accounts", get(handlers::get_user_accounts))
            .route("/users/:user_id/items", get(handlers::get_user_items))
            .route(
                "/users/:user_id/income-bills",
                get(handlers::get_income_bills)
                    .post(handlers::set_income_bills)
                    .put(handlers::set_income_bills),
            )
            .route(
                "/users/:user_id/budget-categories",
                get(handlers::list_budget_categories).post(handlers::create_budget_category),
            )
            .route(
                "/users/:user_id/budget-categories/:category",
                put(handlers::update_budget_category),
            )
            .route("/items", post(handlers::create_item))
            .route(
                "/items/:item_id",
                put(handlers::update_item_status).delete(handlers::delete_item),
            )
            .route("/items/:item_id/sync", post(handlers::sync_item))
            .route("/assets", post(handlers::create_asset))
            // GET takes a user id, DELETE an asset id; both are bare UUIDs
            // so they share one path parameter.
            .route(
                "/assets/:id",
                get(handlers::get_user_assets).delete(handlers::delete_asset),
            )
            .route("/link-token", post(handlers::create_link_token))
            .route("/link-events", post(handlers::record_link_event))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state.clone());

        let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e))
            })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
