use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleEventType {
    Executed,
    Failed,
}

impl RuleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleEventType::Executed => "EXECUTED",
            RuleEventType::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RuleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database row for the append-only rule_events table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleEvent {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub event_type: String,
    pub details: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Idempotency key for one (rule, token, window bucket) sell. Overlapping
/// cycles that land in the same bucket share the key and only one of them
/// may claim it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionKey {
    pub rule_id: Uuid,
    pub token_address: String,
    pub window_bucket: i64,
}

impl ExecutionKey {
    /// Buckets `as_of` into fixed windows of `window_secs` seconds.
    pub fn new(rule_id: Uuid, token_address: String, as_of: DateTime<Utc>, window_secs: i64) -> Self {
        let window = window_secs.max(1);
        Self {
            rule_id,
            token_address: token_address.to_lowercase(),
            window_bucket: as_of.timestamp().div_euclid(window),
        }
    }
}

impl fmt::Display for ExecutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.rule_id, self.token_address, self.window_bucket)
    }
}
