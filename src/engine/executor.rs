use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::Address;
use metrics::counter;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::Instant;

use crate::chain::{format_amount, BalanceError, ExecutionProvider, SwapError, SwapReceipt, SwapRequest};
use crate::db::RuleStore;
use crate::models::{address_key, CopyTradeRule, ExecutionKey};

use super::audit::AuditLog;
use super::sizing::{self, SellSizing};
use super::CycleContext;

/// Fixed swap parameters applied to every sell.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub slippage_tolerance_pct: Decimal,
    pub fee_tier: u32,
    pub sizing: SellSizing,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            slippage_tolerance_pct: Decimal::ONE, // 1%
            fee_tier: 3_000,                      // 0.3% pool
            sizing: SellSizing::Full,
        }
    }
}

#[derive(Debug, Error)]
enum TokenError {
    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error("execution claim failed: {0}")]
    Claim(String),
}

enum TokenOutcome {
    Sold(SwapReceipt),
    Skipped(&'static str),
}

/// What happened across one rule's candidate tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub any_tx: bool,
    /// Hash of the last confirmed swap, if any carried one.
    pub tx_hash: Option<String>,
    pub attempted: usize,
    pub failed: usize,
    /// The deadline passed before every candidate was tried.
    pub timed_out: bool,
}

/// Sells mirrored positions into the settlement asset, one token at a time.
pub struct SellExecutor {
    provider: Arc<dyn ExecutionProvider>,
    store: Arc<dyn RuleStore>,
    audit: AuditLog,
    settings: ExecutionSettings,
}

impl SellExecutor {
    pub fn new(
        provider: Arc<dyn ExecutionProvider>,
        store: Arc<dyn RuleStore>,
        audit: AuditLog,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            provider,
            store,
            audit,
            settings,
        }
    }

    /// Attempt every candidate. A failing token is audited and skipped; it
    /// never stops the remaining tokens. Swaps run sequentially because they
    /// share the agent wallet's nonce sequence.
    ///
    /// The deadline is checked before each token. A sell already under way
    /// always runs to completion and is audited.
    pub async fn execute(
        &self,
        ctx: &CycleContext,
        rule: &CopyTradeRule,
        candidates: &BTreeSet<Address>,
        deadline: Instant,
    ) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        for token in candidates {
            if Instant::now() >= deadline {
                tracing::warn!(rule_id = %rule.id, token = %token, "Deadline reached, remaining tokens not attempted");
                summary.timed_out = true;
                break;
            }

            match self.sell_token(ctx, rule, token).await {
                Ok(TokenOutcome::Sold(receipt)) => {
                    summary.attempted += 1;
                    summary.any_tx = true;
                    if receipt.tx_hash.is_some() {
                        summary.tx_hash = receipt.tx_hash.clone();
                    }
                    counter!("swaps_executed_total").increment(1);
                }
                Ok(TokenOutcome::Skipped(why)) => {
                    tracing::debug!(rule_id = %rule.id, token = %token, why, "Token skipped");
                }
                Err(e) => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    counter!("swaps_failed_total").increment(1);

                    let msg = e.to_string();
                    tracing::error!(rule_id = %rule.id, token = %token, error = %msg, "Mirrored sell failed");
                    self.audit.failed(rule.id, token, &msg).await;
                }
            }
        }

        summary
    }

    async fn sell_token(
        &self,
        ctx: &CycleContext,
        rule: &CopyTradeRule,
        token: &Address,
    ) -> Result<TokenOutcome, TokenError> {
        // 1. Read balance and precision
        let balance = self.provider.read_balance(token).await?;
        if balance.is_empty() {
            return Ok(TokenOutcome::Skipped("zero balance"));
        }

        // 2. Size the sell
        let amount = sizing::sell_amount(self.settings.sizing, balance.raw);
        if amount.is_zero() {
            return Ok(TokenOutcome::Skipped("sized to zero"));
        }
        let amount_human = format_amount(amount, balance.decimals);

        // 3. Claim the (rule, token, window) key
        let key = ExecutionKey::new(
            rule.id,
            address_key(token),
            ctx.as_of,
            rule.condition.time_window_seconds,
        );
        let claimed = self
            .store
            .claim_execution(&key)
            .await
            .map_err(|e| TokenError::Claim(e.to_string()))?;
        if !claimed {
            tracing::info!(rule_id = %rule.id, token = %token, key = %key, "Already sold in this window");
            return Ok(TokenOutcome::Skipped("already executed in window"));
        }

        // 4. Swap into the settlement asset
        let request = SwapRequest {
            token_in: *token,
            token_out: ctx.settlement_token,
            amount_raw: amount,
            amount_human: amount_human.clone(),
            slippage_tolerance_pct: self.settings.slippage_tolerance_pct,
            fee_tier: self.settings.fee_tier,
        };

        tracing::info!(
            rule_id = %rule.id,
            token = %token,
            amount = %amount_human,
            sizing = %self.settings.sizing,
            "Submitting mirrored sell"
        );

        let receipt = match self.provider.swap(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is_definite() {
                    self.release(&key).await;
                }
                return Err(e.into());
            }
        };

        // 5. Audit
        self.audit
            .executed(rule.id, token, &ctx.settlement_token, &amount_human, &receipt, &key)
            .await;

        Ok(TokenOutcome::Sold(receipt))
    }

    /// Free the key after a swap that certainly did not settle, so the next
    /// cycle in the window can retry.
    async fn release(&self, key: &ExecutionKey) {
        if let Err(e) = self.store.release_execution(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to release execution claim");
        }
    }
}
