use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of a mirrored position to sell once a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SellSizing {
    /// Liquidate the entire balance.
    #[default]
    Full,
    /// Sell a whole-number percentage (1..=100) of the balance.
    Percent(u8),
}

impl SellSizing {
    /// `100` (or anything out of range) is `Full`.
    pub fn from_percent(pct: u8) -> Self {
        match pct {
            1..=99 => SellSizing::Percent(pct),
            _ => SellSizing::Full,
        }
    }
}

impl fmt::Display for SellSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellSizing::Full => write!(f, "full"),
            SellSizing::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// Raw amount to sell out of `balance`.
pub fn sell_amount(strategy: SellSizing, balance: U256) -> U256 {
    match strategy {
        SellSizing::Full => balance,
        SellSizing::Percent(p) => balance * U256::from(p) / U256::from(100u64),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
