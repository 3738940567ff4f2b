//! Budget category model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user named budget bucket. `remaining` is maintained as
/// `budgeted - actual` on every write.
#[derive(Debug, Clone, FromRow)]
pub struct BudgetCategory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub budgeted: Decimal,
    pub actual: Decimal,
    pub remaining: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
