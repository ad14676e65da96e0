use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};

use crate::models::{address_key, TransferEvent};

use super::types::ApiTransferPage;
use super::{IndexerError, Pagination, TransferSource};

const DEFAULT_INDEXER_BASE: &str = "https://deep-index.moralis.io/api/v2.2";

/// Map an engine network id onto the indexer's `chain` parameter.
pub fn chain_param(network: &str) -> &str {
    match network {
        "base-mainnet" | "base" => "base",
        "base-sepolia" => "base sepolia",
        "ethereum-mainnet" | "ethereum" => "eth",
        "ethereum-sepolia" => "sepolia",
        "arbitrum-mainnet" => "arbitrum",
        "polygon-mainnet" => "polygon",
        other => other,
    }
}

/// HTTP client for the chain-indexing service.
#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl IndexerClient {
    pub fn new(http: Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_INDEXER_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            api_key,
        }
    }

    async fn fetch_page(
        &self,
        network: &str,
        wallet: &Address,
        since: DateTime<Utc>,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<ApiTransferPage, IndexerError> {
        let endpoint = format!("{}/{}/erc20/transfers", self.base_url, address_key(wallet));
        let from_date = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let limit = page_size.to_string();

        let mut params: Vec<(&str, &str)> = vec![
            ("chain", chain_param(network)),
            ("from_date", from_date.as_str()),
            ("limit", limit.as_str()),
            ("order", "DESC"),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }

        let url = Url::parse_with_params(&endpoint, &params)
            .map_err(|e| IndexerError::Url(e.to_string()))?;

        let mut req = self.http.get(url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }

        let page: ApiTransferPage = req.send().await?.error_for_status()?.json().await?;
        Ok(page)
    }
}

#[async_trait]
impl TransferSource for IndexerClient {
    async fn fetch_transfers(
        &self,
        network: &str,
        wallet: &Address,
        since: DateTime<Utc>,
        pagination: Pagination,
    ) -> Result<Vec<TransferEvent>, IndexerError> {
        let mut events = Vec::new();
        let mut cursor: Option<String> = None;
        let mut skipped = 0usize;

        for page_no in 0..pagination.max_pages.max(1) {
            let page = self
                .fetch_page(network, wallet, since, pagination.page_size, cursor.as_deref())
                .await?;

            for row in &page.result {
                match row.to_event() {
                    Some(event) if event.timestamp >= since => events.push(event),
                    Some(_) => {}
                    None => skipped += 1,
                }
            }

            cursor = page.cursor.filter(|c| !c.is_empty());
            if cursor.is_none() || page.result.is_empty() {
                break;
            }

            if page_no + 1 == pagination.max_pages {
                tracing::debug!(
                    wallet = %wallet,
                    max_pages = pagination.max_pages,
                    "Indexer page limit reached, remaining history ignored"
                );
            }
        }

        if skipped > 0 {
            tracing::debug!(wallet = %wallet, skipped, "Skipped unparsable transfer rows");
        }

        Ok(events)
    }
}
