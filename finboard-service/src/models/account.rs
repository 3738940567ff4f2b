//! Account model - a financial account under one Item.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// A bank account. `external_account_id` is unique per Item and joins
/// incoming transaction records to their account during sync.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub item_id: Uuid,
    pub external_account_id: String,
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
