pub mod networks;
pub mod onchain;
pub mod relay;

pub use networks::NetworkDefaults;
pub use onchain::OnchainExecutor;
pub use relay::RelayExecutor;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// On-chain holding of one token by the agent wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub decimals: u8,
    /// Raw token units.
    pub raw: U256,
}

impl TokenBalance {
    pub fn is_empty(&self) -> bool {
        self.raw.is_zero()
    }

    /// Human-readable amount, e.g. `1.5` for 1.5e18 raw with 18 decimals.
    pub fn human(&self) -> String {
        format_amount(self.raw, self.decimals)
    }
}

/// Format a raw amount with `decimals` places, trimming trailing zeros.
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Sell order handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_raw: U256,
    pub amount_human: String,
    pub slippage_tolerance_pct: Decimal,
    pub fee_tier: u32,
}

/// Successful swap (or dry-run quote).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    /// `None` in dry-run mode.
    pub tx_hash: Option<String>,
    /// Provider output kept verbatim for the audit trail.
    pub raw: String,
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("swap rejected by provider: {0}")]
    Rejected(String),

    #[error("quote failed: {0}")]
    Quote(String),

    #[error("approval failed: {0}")]
    Approval(String),

    #[error("swap submission failed: {0}")]
    Submission(String),

    #[error("swap reverted in tx {0}")]
    Reverted(String),

    #[error("provider transport error: {0}")]
    Transport(String),

    /// Submitted, but the outcome is unknown.
    #[error("swap submitted but not confirmed: {0}")]
    Unconfirmed(String),
}

impl SwapError {
    /// False only when the sell may have gone through.
    pub fn is_definite(&self) -> bool {
        !matches!(self, SwapError::Unconfirmed(_))
    }
}

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("balance read failed: {0}")]
    Read(String),

    #[error("unexpected balance response: {0}")]
    Unexpected(String),
}

/// Wallet and swap capability the engine sells through. Payload encoding
/// stays behind this boundary.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    /// Current network identifier, e.g. `base-mainnet`.
    async fn network_id(&self) -> anyhow::Result<String>;

    /// Address of the agent wallet that holds mirrored positions.
    async fn agent_address(&self) -> anyhow::Result<Address>;

    async fn read_balance(&self, token: &Address) -> Result<TokenBalance, BalanceError>;

    async fn swap(&self, request: &SwapRequest) -> Result<SwapReceipt, SwapError>;
}
