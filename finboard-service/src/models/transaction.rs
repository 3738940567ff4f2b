//! Transaction model - a ledger entry under one Account.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// A ledger entry. `external_transaction_id` is globally unique and is
/// the only stable join key across sync calls.
///
/// Stored amounts use the convention "positive = inflow"; the aggregator's
/// outflow-positive sign is negated on write. Category, subcategory, and
/// currency are empty strings when the aggregator omits them, never NULL.
#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_transaction_id: String,
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
