use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Paused,
    Disabled,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Paused => "paused",
            RuleStatus::Disabled => "disabled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(RuleStatus::Active),
            "paused" => Some(RuleStatus::Paused),
            "disabled" => Some(RuleStatus::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Who a rule follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RuleSources {
    /// An explicit list of wallet addresses.
    User {
        #[serde(default)]
        wallets: Vec<String>,
    },
    /// A named group of wallets. Declared by the strategy flow but never
    /// expanded into member wallets.
    Group {
        #[serde(default, rename = "groupId")]
        group_id: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Condition policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionMode {
    Any,
    All,
}

impl fmt::Display for ConditionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionMode::Any => write!(f, "ANY"),
            ConditionMode::All => write!(f, "ALL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPolicy {
    pub mode: ConditionMode,
    #[serde(default = "default_count")]
    pub count: u32,
    pub time_window_seconds: i64,
}

fn default_count() -> u32 {
    1
}

/// Longest accepted lookback: one year.
pub const MAX_TIME_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

impl ConditionPolicy {
    /// Lookback window, clamped to `1..=MAX_TIME_WINDOW_SECS` seconds.
    pub fn time_window(&self) -> Duration {
        Duration::seconds(self.time_window_seconds.clamp(1, MAX_TIME_WINDOW_SECS))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.time_window_seconds > MAX_TIME_WINDOW_SECS {
            anyhow::bail!(
                "timeWindowSeconds {} exceeds maximum of {MAX_TIME_WINDOW_SECS}",
                self.time_window_seconds
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sell policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellPolicy {
    /// `false` means observe only.
    #[serde(default)]
    pub follow_seller: bool,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Database row for the copy_trade_rules table.
#[derive(Debug, Clone, FromRow)]
pub struct CopyTradeRuleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner_address: String,
    pub status: String,
    pub sources: Json<serde_json::Value>,
    pub condition: Json<serde_json::Value>,
    pub sell_policy: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A follower's standing instruction to mirror sells. The engine never
/// mutates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyTradeRule {
    pub id: Uuid,
    pub owner_address: String,
    pub status: RuleStatus,
    pub sources: RuleSources,
    pub condition: ConditionPolicy,
    pub sell_policy: SellPolicy,
    pub created_at: DateTime<Utc>,
}

/// A stored rule that could not be decoded. Reported per rule instead of
/// being dropped from the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRule {
    pub id: Uuid,
    pub reason: String,
}

pub type StoredRule = Result<CopyTradeRule, InvalidRule>;

impl TryFrom<CopyTradeRuleRow> for CopyTradeRule {
    type Error = anyhow::Error;

    fn try_from(row: CopyTradeRuleRow) -> Result<Self, Self::Error> {
        let status = RuleStatus::from_db_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown rule status '{}'", row.status))?;
        let condition: ConditionPolicy = serde_json::from_value(row.condition.0)
            .map_err(|e| anyhow::anyhow!("invalid condition: {e}"))?;
        condition
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid condition: {e}"))?;

        Ok(Self {
            id: row.id,
            owner_address: row.owner_address,
            status,
            sources: serde_json::from_value(row.sources.0)
                .map_err(|e| anyhow::anyhow!("invalid sources: {e}"))?,
            condition,
            sell_policy: serde_json::from_value(row.sell_policy.0)
                .map_err(|e| anyhow::anyhow!("invalid sell policy: {e}"))?,
            created_at: row.created_at,
        })
    }
}
