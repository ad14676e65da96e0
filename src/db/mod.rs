pub mod event_repo;
pub mod rule_repo;
pub mod user_repo;

use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ExecutionKey, Identity, RuleEvent, RuleEventType, StoredRule};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Token addresses a follower holds under each rule.
pub type MirroredPositions = HashMap<Uuid, HashSet<Address>>;

/// The engine's narrow view of persistence. Rule definitions are read-only;
/// the only writes are audit events and execution claims.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn resolve_identity(&self, raw: &str) -> anyhow::Result<Option<Identity>>;

    /// Active rules ordered by creation time, undecodable rows included.
    async fn list_active_rules(&self, identity: &Identity) -> anyhow::Result<Vec<StoredRule>>;

    async fn list_mirrored_positions(&self, rule_ids: &[Uuid]) -> anyhow::Result<MirroredPositions>;

    async fn append_rule_event(
        &self,
        rule_id: Uuid,
        event_type: RuleEventType,
        details: serde_json::Value,
    ) -> anyhow::Result<()>;

    /// Returns false if the key was already claimed.
    async fn claim_execution(&self, key: &ExecutionKey) -> anyhow::Result<bool>;

    /// Drop a claim whose swap definitely did not go through.
    async fn release_execution(&self, key: &ExecutionKey) -> anyhow::Result<()>;

    /// Newest first.
    async fn recent_rule_events(&self, rule_id: Uuid, limit: i64) -> anyhow::Result<Vec<RuleEvent>>;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn resolve_identity(&self, raw: &str) -> anyhow::Result<Option<Identity>> {
        user_repo::resolve_identity(&self.pool, raw).await
    }

    async fn list_active_rules(&self, identity: &Identity) -> anyhow::Result<Vec<StoredRule>> {
        rule_repo::list_active_rules(&self.pool, identity.user_id).await
    }

    async fn list_mirrored_positions(&self, rule_ids: &[Uuid]) -> anyhow::Result<MirroredPositions> {
        rule_repo::list_mirrored_positions(&self.pool, rule_ids).await
    }

    async fn append_rule_event(
        &self,
        rule_id: Uuid,
        event_type: RuleEventType,
        details: serde_json::Value,
    ) -> anyhow::Result<()> {
        event_repo::append_rule_event(&self.pool, rule_id, event_type, &details).await
    }

    async fn claim_execution(&self, key: &ExecutionKey) -> anyhow::Result<bool> {
        event_repo::claim_execution(&self.pool, key).await
    }

    async fn release_execution(&self, key: &ExecutionKey) -> anyhow::Result<()> {
        event_repo::release_execution(&self.pool, key).await
    }

    async fn recent_rule_events(&self, rule_id: Uuid, limit: i64) -> anyhow::Result<Vec<RuleEvent>> {
        event_repo::get_recent_rule_events(&self.pool, rule_id, limit).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
