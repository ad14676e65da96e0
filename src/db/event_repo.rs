use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ExecutionKey, RuleEvent, RuleEventType};

/// Append one audit record.
pub async fn append_rule_event(
    pool: &PgPool,
    rule_id: Uuid,
    event_type: RuleEventType,
    details: &serde_json::Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rule_events (rule_id, event_type, details)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(rule_id)
    .bind(event_type.as_str())
    .bind(sqlx::types::Json(details))
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent audit records for a rule.
pub async fn get_recent_rule_events(
    pool: &PgPool,
    rule_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<RuleEvent>> {
    let events = sqlx::query_as::<_, RuleEvent>(
        "SELECT * FROM rule_events WHERE rule_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(rule_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Claim an execution key. Returns false when another cycle already holds it.
pub async fn claim_execution(pool: &PgPool, key: &ExecutionKey) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO execution_claims (rule_id, token_address, window_bucket)
        VALUES ($1, $2, $3)
        ON CONFLICT (rule_id, token_address, window_bucket) DO NOTHING
        "#,
    )
    .bind(key.rule_id)
    .bind(&key.token_address)
    .bind(key.window_bucket)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Release a claimed key so a later cycle in the same window may retry.
pub async fn release_execution(pool: &PgPool, key: &ExecutionKey) -> anyhow::Result<()> {
    sqlx::query(
        "DELETE FROM execution_claims WHERE rule_id = $1 AND token_address = $2 AND window_bucket = $3",
    )
    .bind(key.rule_id)
    .bind(&key.token_address)
    .bind(key.window_bucket)
    .execute(pool)
    .await?;

    Ok(())
}
