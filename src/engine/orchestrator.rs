use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::{FutureExt, StreamExt};
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::chain::{ExecutionProvider, NetworkDefaults};
use crate::db::{MirroredPositions, RuleStore};
use crate::indexer::{Pagination, TransferSource};
use crate::models::{
    parse_address, CopyTradeRule, CycleResult, RuleOutcome, RuleSources, SkipReason, StoredRule,
    TransferEvent,
};

use super::audit::AuditLog;
use super::auth::WorkerAuth;
use super::executor::{ExecutionSettings, SellExecutor};
use super::resolver;
use super::trigger::{self, EventsByWallet};
use super::CycleContext;

/// Engine-wide settings fixed at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pagination: Pagination,
    pub cycle_timeout: Duration,
    /// Rules evaluated at once. Results keep rule order regardless.
    pub rule_concurrency: usize,
    /// Overrides the per-network settlement stablecoin.
    pub settlement_token: Option<Address>,
    pub execution: ExecutionSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pagination: Pagination::default(),
            cycle_timeout: Duration::from_secs(240),
            rule_concurrency: 1,
            settlement_token: None,
            execution: ExecutionSettings::default(),
        }
    }
}

/// One invocation of the engine.
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub credential: String,
    pub identity: String,
    /// Replaces "now" for window arithmetic.
    pub as_of: Option<DateTime<Utc>>,
}

/// Reasons a cycle cannot start. Nothing is evaluated when these occur.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("invalid worker credential")]
    Unauthorized,

    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("rule store unavailable: {0}")]
    Store(anyhow::Error),

    #[error("execution context unavailable: {0}")]
    Context(anyhow::Error),
}

/// Drives one copy-trade cycle: load rules, then per rule fetch → trigger →
/// resolve → execute → audit.
pub struct CopyTradeEngine {
    store: Arc<dyn RuleStore>,
    source: Arc<dyn TransferSource>,
    provider: Arc<dyn ExecutionProvider>,
    executor: SellExecutor,
    auth: WorkerAuth,
    config: EngineConfig,
}

impl CopyTradeEngine {
    pub fn new(
        store: Arc<dyn RuleStore>,
        source: Arc<dyn TransferSource>,
        provider: Arc<dyn ExecutionProvider>,
        auth: WorkerAuth,
        config: EngineConfig,
    ) -> Self {
        let audit = AuditLog::new(Arc::clone(&store));
        let executor = SellExecutor::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            audit,
            config.execution.clone(),
        );

        Self {
            store,
            source,
            provider,
            executor,
            auth,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn auth(&self) -> &WorkerAuth {
        &self.auth
    }

    /// Run one cycle. Either fails before touching any rule, or returns an
    /// outcome for every active rule.
    pub async fn run_cycle(&self, request: CycleRequest) -> Result<CycleResult, CycleError> {
        let started = std::time::Instant::now();

        // 1. Authenticate and resolve identity
        if !self.auth.verify(&request.credential) {
            counter!("cycles_rejected_total").increment(1);
            tracing::warn!("Cycle rejected: bad worker credential");
            return Err(CycleError::Unauthorized);
        }

        let identity = self
            .store
            .resolve_identity(&request.identity)
            .await
            .map_err(CycleError::Store)?
            .ok_or_else(|| {
                counter!("cycles_rejected_total").increment(1);
                CycleError::UnknownIdentity(request.identity.clone())
            })?;

        let as_of = request.as_of.unwrap_or_else(Utc::now);
        counter!("cycles_total").increment(1);

        // 2. Load active rules
        let rules = self
            .store
            .list_active_rules(&identity)
            .await
            .map_err(CycleError::Store)?;

        if rules.is_empty() {
            tracing::debug!(user_id = %identity.user_id, "No active rules");
            return Ok(CycleResult::empty());
        }

        // 3. Shared context, once per cycle
        let ctx = self.resolve_context(as_of).await?;

        // 4. Mirrored positions for the whole batch
        let rule_ids: Vec<Uuid> = rules.iter().flatten().map(|r| r.id).collect();
        let positions = self
            .store
            .list_mirrored_positions(&rule_ids)
            .await
            .map_err(CycleError::Store)?;

        tracing::info!(
            user_id = %identity.user_id,
            rules = rules.len(),
            network = %ctx.network,
            agent = %ctx.agent_address,
            as_of = %as_of,
            "Copy-trade cycle started"
        );

        // 5. Evaluate every rule before the deadline
        let deadline = Instant::now() + self.config.cycle_timeout;
        let rule_futures: Vec<_> = rules
            .iter()
            .map(|stored| self.run_stored_rule(&ctx, stored, &positions, deadline))
            .collect();
        let results: Vec<RuleOutcome> = futures_util::stream::iter(rule_futures)
            .buffered(self.config.rule_concurrency.max(1))
            .collect()
            .await;

        let result = CycleResult {
            ok: true,
            network_id: Some(ctx.network.clone()),
            results,
        };

        histogram!("cycle_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            user_id = %identity.user_id,
            evaluated = result.results.len(),
            executed = result.executed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Copy-trade cycle finished"
        );

        Ok(result)
    }

    async fn resolve_context(&self, as_of: DateTime<Utc>) -> Result<CycleContext, CycleError> {
        let network = self.provider.network_id().await.map_err(CycleError::Context)?;
        let agent_address = self.provider.agent_address().await.map_err(CycleError::Context)?;

        let settlement_token = self
            .config
            .settlement_token
            .or_else(|| NetworkDefaults::for_network(&network).map(|d| d.settlement_token))
            .ok_or_else(|| {
                CycleError::Context(anyhow::anyhow!(
                    "no settlement token known for {network}; set SETTLEMENT_TOKEN"
                ))
            })?;

        Ok(CycleContext {
            network,
            agent_address,
            settlement_token,
            as_of,
        })
    }

    async fn run_stored_rule(
        &self,
        ctx: &CycleContext,
        stored: &StoredRule,
        positions: &MirroredPositions,
        deadline: Instant,
    ) -> RuleOutcome {
        match stored {
            Ok(rule) => self.run_rule_guarded(ctx, rule, positions, deadline).await,
            Err(invalid) => {
                counter!("rules_evaluated_total").increment(1);
                tracing::error!(rule_id = %invalid.id, error = %invalid.reason, "Rule definition invalid");
                RuleOutcome::skipped(invalid.id, SkipReason::Error(invalid.reason.clone()))
            }
        }
    }

    /// Contains every per-rule failure: deadline, error or panic all become
    /// a not-executed outcome for that rule alone. Only the fetch phase is
    /// cut short by the deadline; a started sell is never abandoned.
    async fn run_rule_guarded(
        &self,
        ctx: &CycleContext,
        rule: &CopyTradeRule,
        positions: &MirroredPositions,
        deadline: Instant,
    ) -> RuleOutcome {
        counter!("rules_evaluated_total").increment(1);

        if Instant::now() >= deadline {
            counter!("rules_timed_out_total").increment(1);
            tracing::warn!(rule_id = %rule.id, "Cycle deadline passed before rule started");
            return RuleOutcome::skipped(rule.id, SkipReason::TimedOut);
        }

        let work = AssertUnwindSafe(self.run_rule(ctx, rule, positions, deadline)).catch_unwind();

        let outcome = match work.await {
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                tracing::error!(rule_id = %rule.id, error = %msg, "Rule evaluation panicked");
                RuleOutcome::skipped(rule.id, SkipReason::Error(msg))
            }
            Ok(Err(e)) => {
                tracing::error!(rule_id = %rule.id, error = %e, "Rule evaluation failed");
                RuleOutcome::skipped(rule.id, SkipReason::Error(e.to_string()))
            }
            Ok(Ok(outcome)) => outcome,
        };

        if outcome.executed {
            counter!("rules_executed_total").increment(1);
        }
        outcome
    }

    async fn run_rule(
        &self,
        ctx: &CycleContext,
        rule: &CopyTradeRule,
        positions: &MirroredPositions,
        deadline: Instant,
    ) -> anyhow::Result<RuleOutcome> {
        // 1. Source wallets
        let wallets = match &rule.sources {
            RuleSources::User { wallets } => source_wallets(wallets),
            RuleSources::Group { group_id } => {
                tracing::info!(rule_id = %rule.id, group_id = ?group_id, "Group sources are not resolved");
                return Ok(RuleOutcome::skipped(rule.id, SkipReason::GroupSourcesUnsupported));
            }
        };

        if wallets.is_empty() {
            return Ok(RuleOutcome::skipped(rule.id, SkipReason::NoSourceWallets));
        }

        // 2. Transfer events in window
        let since = ctx.as_of - rule.condition.time_window();
        let fetch = self.fetch_window(&ctx.network, &wallets, since, ctx.as_of);
        let Ok(events) = tokio::time::timeout_at(deadline, fetch).await else {
            counter!("rules_timed_out_total").increment(1);
            tracing::warn!(rule_id = %rule.id, "Rule timed out fetching transfers");
            return Ok(RuleOutcome::skipped(rule.id, SkipReason::TimedOut));
        };

        // 3. Trigger
        let fired = trigger::evaluate(&events, &rule.condition);

        if !rule.sell_policy.follow_seller {
            tracing::info!(rule_id = %rule.id, fired, "Observe-only rule");
            return Ok(RuleOutcome::skipped(rule.id, SkipReason::FollowSellerDisabled));
        }

        if !fired {
            tracing::debug!(
                rule_id = %rule.id,
                mode = %rule.condition.mode,
                count = rule.condition.count,
                "Condition not met"
            );
            return Ok(RuleOutcome::skipped(rule.id, SkipReason::ConditionNotMet));
        }

        // 4. Eligible tokens
        let sellers = trigger::wallets_with_sells(&events);
        let empty = HashSet::new();
        let mirrored = positions.get(&rule.id).unwrap_or(&empty);
        let candidates: BTreeSet<Address> = resolver::resolve(&sellers, &events, mirrored);

        if candidates.is_empty() {
            return Ok(RuleOutcome::skipped(rule.id, SkipReason::NoIntersectingPositions));
        }

        tracing::info!(
            rule_id = %rule.id,
            sellers = sellers.len(),
            candidates = candidates.len(),
            "Rule fired"
        );

        // 5. Execute
        let summary = self.executor.execute(ctx, rule, &candidates, deadline).await;

        if summary.any_tx {
            Ok(RuleOutcome::executed(rule.id, summary.tx_hash))
        } else if summary.timed_out {
            counter!("rules_timed_out_total").increment(1);
            Ok(RuleOutcome::skipped(rule.id, SkipReason::TimedOut))
        } else {
            Ok(RuleOutcome::skipped(rule.id, SkipReason::NoBalancesToSell))
        }
    }

    /// Fetch every wallet concurrently. A failed fetch counts as "no events"
    /// for that wallet only.
    async fn fetch_window(
        &self,
        network: &str,
        wallets: &[Address],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> EventsByWallet {
        let fetches = wallets.iter().map(|wallet| async move {
            let events = match self
                .source
                .fetch_transfers(network, wallet, since, self.config.pagination)
                .await
            {
                Ok(events) => events,
                Err(e) => {
                    counter!("indexer_fetch_failures_total").increment(1);
                    tracing::warn!(wallet = %wallet, error = %e, "Transfer fetch failed, treating as no events");
                    Vec::new()
                }
            };
            (*wallet, in_window(events, since, until))
        });

        join_all(fetches).await.into_iter().collect()
    }
}

/// Parse and de-duplicate source wallets, keeping first-seen order.
fn source_wallets(raw: &[String]) -> Vec<Address> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|w| {
            let parsed = parse_address(w);
            if parsed.is_none() {
                tracing::warn!(wallet = %w, "Ignoring malformed source wallet");
            }
            parsed
        })
        .filter(|w| seen.insert(*w))
        .collect()
}

fn in_window(mut events: Vec<TransferEvent>, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<TransferEvent> {
    events.retain(|e| e.timestamp >= since && e.timestamp <= until);
    events
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule evaluation panicked".to_string()
    }
}
