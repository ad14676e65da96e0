pub mod client;
pub mod types;

pub use client::IndexerClient;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::TransferEvent;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Upper bound on how much of a wallet's history one fetch may walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub max_pages: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            max_pages: 5,
            page_size: 100,
        }
    }
}

/// Source of ERC-20 transfer events for a wallet.
///
/// "No results" is an empty vector, never an error. Errors are reserved for
/// connectivity and protocol failures.
#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn fetch_transfers(
        &self,
        network: &str,
        wallet: &Address,
        since: DateTime<Utc>,
        pagination: Pagination,
    ) -> Result<Vec<TransferEvent>, IndexerError>;
}
