//! Item model - one linked bank connection.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Item health as reported by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Good,
    Bad,
}

impl ItemStatus {
    /// Accepted wire values, quoted in validation error messages.
    pub const ACCEPTED: &'static [&'static str] = &["good", "bad"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(Self::Good),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bank connection: access credential, institution, and sync state.
///
/// Deliberately not `Serialize`: `access_token` and `transactions_cursor`
/// must never reach a client. Responses go through `dtos::ItemResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_item_id: String,
    pub access_token: String,
    pub institution_id: String,
    pub status: String,
    pub transactions_cursor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
