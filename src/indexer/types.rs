use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{parse_address, TransferEvent};

/// One page of `/{address}/erc20/transfers`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTransferPage {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub result: Vec<ApiTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTransfer {
    /// Token contract address.
    pub address: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub value: Option<String>,
    pub block_timestamp: Option<String>,
    pub transaction_hash: Option<String>,
    pub token_symbol: Option<String>,
}

impl ApiTransfer {
    /// Convert into a `TransferEvent`, or `None` if any required field is
    /// missing or malformed.
    pub fn to_event(&self) -> Option<TransferEvent> {
        let from = parse_address(self.from_address.as_deref()?)?;
        let to = parse_address(self.to_address.as_deref()?)?;
        let token_address = parse_address(self.address.as_deref()?)?;
        let value = U256::from_str_radix(self.value.as_deref()?.trim(), 10).ok()?;
        let timestamp = DateTime::parse_from_rfc3339(self.block_timestamp.as_deref()?)
            .ok()?
            .with_timezone(&Utc);

        Some(TransferEvent {
            from,
            to,
            token_address,
            value,
            timestamp,
            tx_hash: self.transaction_hash.clone(),
        })
    }
}
