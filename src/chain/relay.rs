use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use crate::models::{address_key, parse_address};

use super::{BalanceError, ExecutionProvider, SwapError, SwapReceipt, SwapRequest, TokenBalance};

/// Prefix the relay uses to report a failed action in its free-text reply.
pub const ERROR_MARKER: &str = "Error";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletDetails {
    network_id: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    decimals: u8,
    /// Raw units as a decimal string. May carry a sign.
    balance: String,
}

/// Client for an external agent-wallet relay.
///
/// The relay answers swaps with free text; `classify_swap_response` turns
/// that text into a typed result so nothing past this adapter parses it.
#[derive(Debug, Clone)]
pub struct RelayExecutor {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RelayExecutor {
    pub fn new(http: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn wallet_details(&self) -> anyhow::Result<WalletDetails> {
        let url = format!("{}/v1/wallet", self.base_url);
        let details = self
            .authed(self.http.get(&url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(details)
    }
}

/// Classify a full relay swap reply. Any non-2xx status is a transport
/// failure whatever the body says.
pub fn classify_swap_reply(status: StatusCode, text: &str) -> Result<SwapReceipt, SwapError> {
    if !status.is_success() {
        let snippet: String = text.trim().chars().take(200).collect();
        return Err(SwapError::Transport(format!("relay returned {status}: {snippet}")));
    }
    classify_swap_response(text)
}

/// Classify a relay swap reply body. Text starting with the error marker is a
/// failure; anything else is a success whose text is kept verbatim.
pub fn classify_swap_response(text: &str) -> Result<SwapReceipt, SwapError> {
    let trimmed = text.trim();
    let is_error = trimmed
        .get(..ERROR_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ERROR_MARKER));

    if is_error {
        return Err(SwapError::Rejected(trimmed.to_string()));
    }

    Ok(SwapReceipt {
        tx_hash: extract_tx_hash(trimmed),
        raw: trimmed.to_string(),
    })
}

/// First 32-byte 0x-prefixed hex token in `text`, if any.
fn extract_tx_hash(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| {
            word.len() == 66
                && word.starts_with("0x")
                && word[2..].chars().all(|c| c.is_ascii_hexdigit())
        })
        .map(str::to_string)
}

/// Parse a signed decimal balance; negative values count as empty.
fn parse_raw_balance(s: &str) -> Result<U256, BalanceError> {
    let s = s.trim();
    if s.starts_with('-') {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(s.trim_start_matches('+'), 10)
        .map_err(|_| BalanceError::Unexpected(format!("balance '{s}' is not an integer")))
}

#[async_trait]
impl ExecutionProvider for RelayExecutor {
    async fn network_id(&self) -> anyhow::Result<String> {
        Ok(self.wallet_details().await?.network_id)
    }

    async fn agent_address(&self) -> anyhow::Result<Address> {
        let details = self.wallet_details().await?;
        parse_address(&details.address)
            .ok_or_else(|| anyhow::anyhow!("relay returned malformed address '{}'", details.address))
    }

    async fn read_balance(&self, token: &Address) -> Result<TokenBalance, BalanceError> {
        let endpoint = format!("{}/v1/balance", self.base_url);
        let url = Url::parse_with_params(&endpoint, &[("token", address_key(token))])
            .map_err(|e| BalanceError::Read(e.to_string()))?;

        let resp: BalanceResponse = self
            .authed(self.http.get(url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BalanceError::Read(e.to_string()))?
            .json()
            .await
            .map_err(|e| BalanceError::Unexpected(e.to_string()))?;

        Ok(TokenBalance {
            decimals: resp.decimals,
            raw: parse_raw_balance(&resp.balance)?,
        })
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapReceipt, SwapError> {
        let url = format!("{}/v1/swap", self.base_url);
        let body = json!({
            "tokenIn": address_key(&request.token_in),
            "tokenOut": address_key(&request.token_out),
            "amount": request.amount_human,
            "slippageTolerance": request.slippage_tolerance_pct.to_string(),
            "feeTier": request.fee_tier,
        });

        let resp = self
            .authed(self.http.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SwapError::Transport(e.to_string())
                } else {
                    SwapError::Unconfirmed(e.to_string())
                }
            })?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SwapError::Unconfirmed(e.to_string()))?;

        classify_swap_reply(status, &text)
    }
}
