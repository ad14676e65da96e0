pub mod cycle;
pub mod rule;
pub mod rule_event;
pub mod transfer;

pub use cycle::{CycleResult, RuleOutcome, SkipReason};
pub use rule::{
    ConditionMode, ConditionPolicy, CopyTradeRule, CopyTradeRuleRow, InvalidRule, RuleSources,
    RuleStatus, SellPolicy, StoredRule, MAX_TIME_WINDOW_SECS,
};
pub use rule_event::{ExecutionKey, RuleEvent, RuleEventType};
pub use transfer::TransferEvent;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity: the follower whose rules a cycle evaluates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub user_id: Uuid,
    pub wallet_address: Option<String>,
}

// ---------------------------------------------------------------------------
// Address helpers
// ---------------------------------------------------------------------------

/// Parse a 0x-prefixed account or token address. Case is ignored, so
/// mixed-case and checksummed inputs compare equal once parsed.
pub fn parse_address(raw: &str) -> Option<Address> {
    raw.trim().parse::<Address>().ok()
}

/// Lower-case hex form used as the storage and comparison key.
pub fn address_key(address: &Address) -> String {
    format!("{address:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_case_insensitive() {
        let lower = parse_address("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913").unwrap();
        let mixed = parse_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(address_key(&mixed), "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("not-an-address").is_none());
        assert!(parse_address("0x1234").is_none());
        assert!(parse_address("").is_none());
    }
}
