use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

/// Full configuration for the finboard service.
#[derive(Clone, Debug)]
pub struct Config {
    pub common: service_core::config::Config,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub aggregator: AggregatorConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Credentials and endpoint for the bank-data aggregator.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    pub client_id: String,
    pub secret: Secret<String>,
    pub base_url: String,
    pub client_name: String,
    pub country_codes: Vec<String>,
    /// Page size requested from the transactions-sync endpoint.
    pub page_count: u32,
    /// Per-request timeout; a timed-out page fetch aborts the sync attempt.
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let common = service_core::config::Config::load()
            .map_err(|e| anyhow!("failed to load common config: {}", e))?;

        let db_url = env::var("FINBOARD_DATABASE_URL")
            .map_err(|_| anyhow!("FINBOARD_DATABASE_URL must be set"))?;
        let max_connections = env::var("FINBOARD_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("FINBOARD_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let aggregator = AggregatorConfig {
            client_id: env::var("AGGREGATOR_CLIENT_ID").unwrap_or_default(),
            secret: Secret::new(env::var("AGGREGATOR_SECRET").unwrap_or_default()),
            base_url: env::var("AGGREGATOR_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.plaid.com".to_string()),
            client_name: env::var("AGGREGATOR_CLIENT_NAME")
                .unwrap_or_else(|_| "finboard".to_string()),
            country_codes: env::var("AGGREGATOR_COUNTRY_CODES")
                .unwrap_or_else(|_| "US".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            page_count: env::var("AGGREGATOR_PAGE_COUNT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            request_timeout_secs: env::var("AGGREGATOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        };

        Ok(Self {
            common,
            service_name: "finboard-service".to_string(),
            log_level: env::var("FINBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            aggregator,
        })
    }
}
