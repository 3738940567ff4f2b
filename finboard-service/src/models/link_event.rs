//! Link-flow telemetry. Append-only, never mutated.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome of a client link-flow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEventType {
    Success,
    Exit,
    Error,
}

impl LinkEventType {
    pub const ACCEPTED: &'static [&'static str] = &["success", "exit", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Exit => "exit",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "exit" => Some(Self::Exit),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LinkEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub link_session_id: String,
    pub request_id: String,
    pub error_type: String,
    pub error_code: String,
    pub created_at: DateTime<Utc>,
}
