//! Request and response DTOs.
//!
//! Response types are fixed allow-lists: whatever a model carries, only
//! the fields declared here are serialized. Credentials and sync cursors
//! have no representation in any response type.

use crate::models::{Account, Asset, BudgetCategory, Item, Transaction, User};
use crate::services::recurring::RecurringMatch;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// -----------------------------------------------------------------------------
// Requests
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub auth_id: String,
    #[validate(length(min = 1))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1))]
    pub public_token: String,
    #[validate(length(min = 1))]
    pub institution_id: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkTokenRequest {
    pub user_id: Uuid,
    /// When set, the token is issued in update mode for this item.
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct IncomeBillsRequest {
    pub monthly_income: Decimal,
    pub monthly_bills: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBudgetCategoryRequest {
    #[validate(length(min = 1))]
    pub category: String,
    pub budgeted: Decimal,
    pub actual: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBudgetCategoryRequest {
    pub budgeted: Decimal,
    pub actual: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssetRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub description: String,
    pub value: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LinkEventRequest {
    pub user_id: Option<Uuid>,
    pub event_type: String,
    #[serde(default)]
    pub link_session_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_code: String,
}

// -----------------------------------------------------------------------------
// Responses
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IncomeBillsResponse {
    pub user_id: Uuid,
    pub monthly_income: Decimal,
    pub monthly_bills: Decimal,
}

impl From<User> for IncomeBillsResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            monthly_income: user.monthly_income,
            monthly_bills: user.monthly_bills,
        }
    }
}

/// Sanitized item view. The access token and sync cursor are never
/// serialized to a client.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            user_id: item.user_id,
            institution_id: item.institution_id,
            status: item.status,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub mask: String,
    pub official_name: String,
    pub current_balance: Decimal,
    pub available_balance: Decimal,
    pub iso_currency_code: String,
    pub account_type: String,
    pub account_subtype: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            item_id: account.item_id,
            name: account.name,
            mask: account.mask,
            official_name: account.official_name,
            current_balance: account.current_balance,
            available_balance: account.available_balance,
            iso_currency_code: account.iso_currency_code,
            account_type: account.account_type,
            account_subtype: account.account_subtype,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub subcategory: String,
    pub transaction_type: String,
    pub iso_currency_code: String,
    pub date: NaiveDate,
    pub pending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            account_id: t.account_id,
            name: t.name,
            amount: t.amount,
            category: t.category,
            subcategory: t.subcategory,
            transaction_type: t.transaction_type,
            iso_currency_code: t.iso_currency_code,
            date: t.date,
            pending: t.pending,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecurringTransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub subcategory: String,
    pub date: NaiveDate,
    /// Inferred billing interval in days.
    pub frequency: i64,
    pub last_transaction_date: NaiveDate,
}

impl From<RecurringMatch> for RecurringTransactionResponse {
    fn from(m: RecurringMatch) -> Self {
        Self {
            id: m.transaction.id,
            account_id: m.transaction.account_id,
            name: m.transaction.name,
            amount: m.transaction.amount,
            category: m.transaction.category,
            subcategory: m.transaction.subcategory,
            date: m.transaction.date,
            frequency: m.frequency,
            last_transaction_date: m.last_transaction_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        Self {
            id: asset.id,
            user_id: asset.user_id,
            description: asset.description,
            value: asset.value,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetCategoryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub budgeted: Decimal,
    pub actual: Decimal,
    pub remaining: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BudgetCategory> for BudgetCategoryResponse {
    fn from(b: BudgetCategory) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            category: b.category,
            budgeted: b.budgeted,
            actual: b.actual,
            remaining: b.remaining,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
    pub expiration: String,
}

/// Outcome of an explicit re-sync request.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub item_live: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_item() -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            external_item_id: "item-ext-1".to_string(),
            access_token: "access-sandbox-secret".to_string(),
            institution_id: "ins_1".to_string(),
            status: "good".to_string(),
            transactions_cursor: Some("cursor-42".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn item_response_is_limited_to_allow_list() {
        let value = serde_json::to_value(ItemResponse::from(sample_item())).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        let allowed = [
            "id",
            "user_id",
            "institution_id",
            "status",
            "created_at",
            "updated_at",
        ];
        assert!(keys.iter().all(|k| allowed.contains(k)));
        assert!(!keys.contains(&"access_token"));
        assert!(!keys.contains(&"transactions_cursor"));
        assert!(!keys.contains(&"external_item_id"));
    }

    #[test]
    fn item_response_never_leaks_credential_text() {
        let body = serde_json::to_string(&ItemResponse::from(sample_item())).unwrap();
        assert!(!body.contains("access-sandbox-secret"));
        assert!(!body.contains("cursor-42"));
    }

    #[test]
    fn user_response_omits_income_figures_and_auth_id() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            auth_id: "auth0|12345".to_string(),
            username: "jo".to_string(),
            monthly_income: Decimal::new(5000, 0),
            monthly_bills: Decimal::new(1500, 0),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(UserResponse::from(user)).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("auth_id"));
        assert!(!object.contains_key("monthly_income"));
        assert!(!object.contains_key("monthly_bills"));
    }
}
