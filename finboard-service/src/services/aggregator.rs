//! Bank-data aggregator client.
//!
//! Wraps the provider's link-token issuance, public/access token
//! exchange, cursor-paginated transactions-sync, accounts fetch, and
//! item removal. One HTTP call per page; the sync loop lives in
//! `services::sync`.

use crate::config::AggregatorConfig;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error code the provider returns when the user must re-authenticate.
/// Callers flip the Item status to `bad` when they see it.
const LOGIN_REQUIRED_CODE: &str = "ITEM_LOGIN_REQUIRED";

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("aggregator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("aggregator error: {error_type}/{error_code}: {error_message}")]
    Api {
        error_type: String,
        error_code: String,
        error_message: String,
    },

    #[error("failed to decode aggregator response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("aggregator credentials not configured")]
    NotConfigured,
}

impl AggregatorError {
    /// True when the Item needs the user to re-link (login required).
    pub fn is_login_required(&self) -> bool {
        matches!(self, Self::Api { error_code, .. } if error_code == LOGIN_REQUIRED_CODE)
    }
}

/// Provider error body shape.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_type: String,
    error_code: String,
    error_message: String,
}

#[derive(Debug, Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateLinkTokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    client_name: &'a str,
    language: &'a str,
    country_codes: &'a [String],
    user: LinkTokenUser<'a>,
    products: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkTokenResponse {
    pub link_token: String,
    pub expiration: String,
}

#[derive(Debug, Serialize)]
struct ExchangeTokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    public_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeTokenResponse {
    pub access_token: String,
    pub item_id: String,
}

#[derive(Debug, Serialize)]
struct TransactionsSyncRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
    count: u32,
}

/// One page of the provider's delta feed.
#[derive(Debug, Deserialize)]
pub struct TransactionsSyncPage {
    pub added: Vec<AggregatorTransaction>,
    pub modified: Vec<AggregatorTransaction>,
    pub removed: Vec<RemovedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// Transaction record as the provider reports it.
///
/// Provider sign convention: positive = money leaving the account.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub name: String,
    pub amount: Decimal,
    pub iso_currency_code: Option<String>,
    pub category: Option<Vec<String>>,
    pub transaction_type: Option<String>,
    pub date: NaiveDate,
    pub pending: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemovedTransaction {
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AccountsGetResponse {
    pub accounts: Vec<AggregatorAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorAccount {
    pub account_id: String,
    pub name: String,
    pub mask: Option<String>,
    pub official_name: Option<String>,
    pub balances: AccountBalances,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalances {
    pub available: Option<Decimal>,
    pub current: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemResponse {
    pub request_id: String,
}

/// Client for the bank-data aggregator API.
#[derive(Clone)]
pub struct AggregatorClient {
    client: Client,
    config: AggregatorConfig,
}

impl AggregatorClient {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if aggregator credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.secret.expose_secret().is_empty()
    }

    /// Issue a link token for the client-side link flow.
    ///
    /// When `access_token` is supplied the token is issued in update mode:
    /// the products list is empty and the existing credential is attached.
    pub async fn create_link_token(
        &self,
        client_user_id: &str,
        access_token: Option<&str>,
    ) -> Result<CreateLinkTokenResponse, AggregatorError> {
        let products = if access_token.is_some() {
            vec![]
        } else {
            vec!["transactions"]
        };

        let request = CreateLinkTokenRequest {
            client_id: &self.config.client_id,
            secret: self.config.secret.expose_secret(),
            client_name: &self.config.client_name,
            language: "en",
            country_codes: &self.config.country_codes,
            user: LinkTokenUser { client_user_id },
            products,
            access_token,
        };

        self.post("/link/token/create", &request).await
    }

    /// Exchange a short-lived public token for an access token + item id.
    pub async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<ExchangeTokenResponse, AggregatorError> {
        let request = ExchangeTokenRequest {
            client_id: &self.config.client_id,
            secret: self.config.secret.expose_secret(),
            public_token,
        };

        self.post("/item/public_token/exchange", &request).await
    }

    /// Fetch one page of the transaction delta feed.
    pub async fn transactions_sync(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionsSyncPage, AggregatorError> {
        let request = TransactionsSyncRequest {
            client_id: &self.config.client_id,
            secret: self.config.secret.expose_secret(),
            access_token,
            cursor,
            count: self.config.page_count,
        };

        self.post("/transactions/sync", &request).await
    }

    /// Fetch the current account list with balances.
    pub async fn get_accounts(
        &self,
        access_token: &str,
    ) -> Result<AccountsGetResponse, AggregatorError> {
        let request = AccessTokenRequest {
            client_id: &self.config.client_id,
            secret: self.config.secret.expose_secret(),
            access_token,
        };

        self.post("/accounts/get", &request).await
    }

    /// Remove an item at the aggregator, invalidating its access token.
    pub async fn remove_item(
        &self,
        access_token: &str,
    ) -> Result<RemoveItemResponse, AggregatorError> {
        let request = AccessTokenRequest {
            client_id: &self.config.client_id,
            secret: self.config.secret.expose_secret(),
            access_token,
        };

        self.post("/item/remove", &request).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AggregatorError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        if !self.is_configured() {
            return Err(AggregatorError::NotConfigured);
        }

        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(path = %path, status = %status, "aggregator response");

        if status.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            let error: ApiErrorBody =
                serde_json::from_str(&text).unwrap_or_else(|_| ApiErrorBody {
                    error_type: "API_ERROR".to_string(),
                    error_code: "UNKNOWN".to_string(),
                    error_message: text.clone(),
                });
            tracing::error!(
                path = %path,
                error_type = %error.error_type,
                error_code = %error.error_code,
                "aggregator call failed"
            );
            Err(AggregatorError::Api {
                error_type: error.error_type,
                error_code: error.error_code,
                error_message: error.error_message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> AggregatorConfig {
        AggregatorConfig {
            client_id: "client_123".to_string(),
            secret: Secret::new("secret_456".to_string()),
            base_url: "https://sandbox.example.com".to_string(),
            client_name: "finboard".to_string(),
            country_codes: vec!["US".to_string()],
            page_count: 100,
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn is_configured_requires_both_credentials() {
        let client = AggregatorClient::new(test_config());
        assert!(client.is_configured());

        let mut config = test_config();
        config.secret = Secret::new(String::new());
        let client = AggregatorClient::new(config);
        assert!(!client.is_configured());
    }

    #[test]
    fn login_required_is_detected_by_code() {
        let err = AggregatorError::Api {
            error_type: "ITEM_ERROR".to_string(),
            error_code: "ITEM_LOGIN_REQUIRED".to_string(),
            error_message: "the login details of this item have changed".to_string(),
        };
        assert!(err.is_login_required());

        let err = AggregatorError::Api {
            error_type: "RATE_LIMIT_EXCEEDED".to_string(),
            error_code: "TRANSACTIONS_LIMIT".to_string(),
            error_message: "rate limited".to_string(),
        };
        assert!(!err.is_login_required());
    }
}
