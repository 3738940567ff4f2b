//! User model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// A dashboard user, keyed by the external identity provider's subject id.
///
/// `monthly_income` and `monthly_bills` back the income-bills endpoints
/// used by the budget view.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub auth_id: String,
    pub username: String,
    pub monthly_income: Decimal,
    pub monthly_bills: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
