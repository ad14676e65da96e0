use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Why a rule did not execute this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoSourceWallets,
    GroupSourcesUnsupported,
    ConditionNotMet,
    FollowSellerDisabled,
    NoIntersectingPositions,
    NoBalancesToSell,
    TimedOut,
    /// Unexpected error while evaluating the rule.
    Error(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSourceWallets => f.write_str("No source wallets"),
            SkipReason::GroupSourcesUnsupported => f.write_str("Group sources not supported"),
            SkipReason::ConditionNotMet => f.write_str("Condition not met"),
            SkipReason::FollowSellerDisabled => f.write_str("followSeller disabled"),
            SkipReason::NoIntersectingPositions => f.write_str("No intersecting positions"),
            SkipReason::NoBalancesToSell => f.write_str("No balances to sell"),
            SkipReason::TimedOut => f.write_str("timed out"),
            SkipReason::Error(msg) => f.write_str(msg),
        }
    }
}

/// One entry per evaluated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub rule_id: Uuid,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl RuleOutcome {
    pub fn executed(rule_id: Uuid, tx_hash: Option<String>) -> Self {
        Self {
            rule_id,
            executed: true,
            reason: None,
            tx_hash,
        }
    }

    pub fn skipped(rule_id: Uuid, reason: SkipReason) -> Self {
        Self {
            rule_id,
            executed: false,
            reason: Some(reason.to_string()),
            tx_hash: None,
        }
    }
}

/// Aggregated, non-persisted output of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleResult {
    pub ok: bool,
    pub network_id: Option<String>,
    pub results: Vec<RuleOutcome>,
}

impl CycleResult {
    pub fn empty() -> Self {
        Self {
            ok: true,
            network_id: None,
            results: Vec::new(),
        }
    }

    pub fn executed_count(&self) -> usize {
        self.results.iter().filter(|r| r.executed).count()
    }
}
