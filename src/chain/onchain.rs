use std::str::FromStr;

use alloy::network::EthereumWallet;
use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::networks::{network_from_chain_id, NetworkDefaults};
use super::{BalanceError, ExecutionProvider, SwapError, SwapReceipt, SwapRequest, TokenBalance};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }

    #[sol(rpc)]
    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }
}

/// Options for connecting the on-chain executor.
#[derive(Debug, Clone)]
pub struct OnchainOptions {
    pub rpc_url: String,
    /// Required unless `dry_run` is set.
    pub private_key: Option<String>,
    /// Watch-only address used when no private key is configured.
    pub agent_address: Option<String>,
    pub dry_run: bool,
    pub swap_router: Option<Address>,
    pub quoter: Option<Address>,
}

/// Sells through Uniswap V3 (QuoterV2 + SwapRouter02) from a local signer.
///
/// In dry-run mode every read and quote is real, but nothing is submitted.
pub struct OnchainExecutor {
    provider: DynProvider,
    address: Address,
    network: String,
    swap_router: Address,
    quoter: Address,
    dry_run: bool,
}

impl OnchainExecutor {
    pub async fn connect(opts: OnchainOptions) -> anyhow::Result<Self> {
        let url = opts.rpc_url.parse()?;

        let (provider, address) = match &opts.private_key {
            Some(key) => {
                let signer = PrivateKeySigner::from_str(key)?;
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url)
                    .erased();
                (provider, address)
            }
            None => {
                if !opts.dry_run {
                    anyhow::bail!("AGENT_PRIVATE_KEY is required when DRY_RUN=false");
                }
                let address = opts
                    .agent_address
                    .as_deref()
                    .and_then(crate::models::parse_address)
                    .ok_or_else(|| anyhow::anyhow!("AGENT_ADDRESS must be set for watch-only dry-run"))?;
                let provider = ProviderBuilder::new().connect_http(url).erased();
                (provider, address)
            }
        };

        let chain_id = provider.get_chain_id().await?;
        let network = network_from_chain_id(chain_id);
        let defaults = NetworkDefaults::for_network(&network);

        let swap_router = opts
            .swap_router
            .or(defaults.map(|d| d.swap_router))
            .ok_or_else(|| anyhow::anyhow!("no swap router known for {network}; set SWAP_ROUTER_ADDRESS"))?;
        let quoter = opts
            .quoter
            .or(defaults.map(|d| d.quoter))
            .ok_or_else(|| anyhow::anyhow!("no quoter known for {network}; set QUOTER_ADDRESS"))?;

        tracing::info!(
            network = %network,
            agent = %address,
            dry_run = opts.dry_run,
            "On-chain executor connected"
        );

        Ok(Self {
            provider,
            address,
            network,
            swap_router,
            quoter,
            dry_run: opts.dry_run,
        })
    }

    async fn quote(&self, request: &SwapRequest, fee: U24) -> Result<U256, SwapError> {
        let quoter = IQuoterV2::new(self.quoter, &self.provider);
        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: request.token_in,
            tokenOut: request.token_out,
            amountIn: request.amount_raw,
            fee,
            sqrtPriceLimitX96: U160::ZERO,
        };

        let quote = quoter
            .quoteExactInputSingle(params)
            .call()
            .await
            .map_err(|e| SwapError::Quote(e.to_string()))?;

        Ok(quote.amountOut)
    }

    async fn ensure_allowance(&self, token: Address, amount: U256) -> Result<(), SwapError> {
        let erc20 = IERC20::new(token, &self.provider);
        let current = erc20
            .allowance(self.address, self.swap_router)
            .call()
            .await
            .map_err(|e| SwapError::Approval(e.to_string()))?;

        if current >= amount {
            return Ok(());
        }

        let receipt = erc20
            .approve(self.swap_router, amount)
            .send()
            .await
            .map_err(|e| SwapError::Approval(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| SwapError::Approval(e.to_string()))?;

        if !receipt.status() {
            return Err(SwapError::Approval(format!(
                "approve reverted in tx {}",
                receipt.transaction_hash
            )));
        }

        tracing::debug!(token = %token, tx_hash = %receipt.transaction_hash, "Router allowance granted");
        Ok(())
    }
}

/// Minimum acceptable output after applying a percentage slippage tolerance.
pub fn apply_slippage(quoted: U256, slippage_pct: Decimal) -> U256 {
    let bps = (slippage_pct * Decimal::ONE_HUNDRED)
        .round()
        .to_u64()
        .unwrap_or(0)
        .min(10_000);
    quoted * U256::from(10_000 - bps) / U256::from(10_000u64)
}

#[async_trait]
impl ExecutionProvider for OnchainExecutor {
    async fn network_id(&self) -> anyhow::Result<String> {
        Ok(self.network.clone())
    }

    async fn agent_address(&self) -> anyhow::Result<Address> {
        Ok(self.address)
    }

    async fn read_balance(&self, token: &Address) -> Result<TokenBalance, BalanceError> {
        let erc20 = IERC20::new(*token, &self.provider);

        let raw = erc20
            .balanceOf(self.address)
            .call()
            .await
            .map_err(|e| BalanceError::Read(e.to_string()))?;
        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| BalanceError::Read(e.to_string()))?;

        Ok(TokenBalance { decimals, raw })
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapReceipt, SwapError> {
        let fee = U24::try_from(request.fee_tier)
            .map_err(|_| SwapError::Quote(format!("invalid fee tier {}", request.fee_tier)))?;

        let quoted = self.quote(request, fee).await?;
        let min_out = apply_slippage(quoted, request.slippage_tolerance_pct);

        if self.dry_run {
            tracing::info!(
                token_in = %request.token_in,
                token_out = %request.token_out,
                amount = %request.amount_human,
                quoted_out = %quoted,
                min_out = %min_out,
                "[DRY-RUN] Would submit swap"
            );
            return Ok(SwapReceipt {
                tx_hash: None,
                raw: format!("dry-run: quoted {quoted}, min out {min_out}"),
            });
        }

        self.ensure_allowance(request.token_in, request.amount_raw).await?;

        let router = ISwapRouter02::new(self.swap_router, &self.provider);
        let params = ISwapRouter02::ExactInputSingleParams {
            tokenIn: request.token_in,
            tokenOut: request.token_out,
            fee,
            recipient: self.address,
            amountIn: request.amount_raw,
            amountOutMinimum: min_out,
            sqrtPriceLimitX96: U160::ZERO,
        };

        let receipt = router
            .exactInputSingle(params)
            .send()
            .await
            .map_err(|e| SwapError::Submission(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| SwapError::Unconfirmed(e.to_string()))?;

        let tx_hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(SwapError::Reverted(tx_hash));
        }

        tracing::info!(
            token_in = %request.token_in,
            amount = %request.amount_human,
            tx_hash = %tx_hash,
            "Swap confirmed"
        );

        Ok(SwapReceipt {
            raw: tx_hash.clone(),
            tx_hash: Some(tx_hash),
        })
    }
}
