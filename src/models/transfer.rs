use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ERC-20 transfer as reported by the indexer. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub token_address: Address,
    /// Raw token units.
    pub value: U256,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: Option<String>,
}

impl TransferEvent {
    /// A sell by `wallet` is any transfer out of it, whatever the destination.
    pub fn is_sell_by(&self, wallet: &Address) -> bool {
        self.from == *wallet
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer: from={} to={} token={} value={} at={}",
            self.from, self.to, self.token_address, self.value, self.timestamp,
        )
    }
}
