use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{parse_address, CopyTradeRule, CopyTradeRuleRow, InvalidRule, StoredRule};

/// Active rules for a user, oldest first. Ties on `created_at` fall back to
/// the insertion sequence so the order never changes between reads. Rows
/// that fail to decode keep their place as `Err` entries.
pub async fn list_active_rules(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<StoredRule>> {
    let rows = sqlx::query_as::<_, CopyTradeRuleRow>(
        r#"
        SELECT id, user_id, owner_address, status, sources, condition, sell_policy, created_at
        FROM copy_trade_rules
        WHERE user_id = $1 AND status = 'active'
        ORDER BY created_at ASC, seq ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let rules = rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            CopyTradeRule::try_from(row).map_err(|e| {
                tracing::warn!(rule_id = %id, error = %e, "Malformed rule row");
                InvalidRule {
                    id,
                    reason: e.to_string(),
                }
            })
        })
        .collect();

    Ok(rules)
}

/// Mirrored positions for a batch of rules in one query, partitioned per
/// rule. Rules with no positions map to an empty set.
pub async fn list_mirrored_positions(
    pool: &PgPool,
    rule_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, HashSet<Address>>> {
    let mut by_rule: HashMap<Uuid, HashSet<Address>> =
        rule_ids.iter().map(|id| (*id, HashSet::new())).collect();

    if rule_ids.is_empty() {
        return Ok(by_rule);
    }

    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT rule_id, token_address FROM mirrored_positions WHERE rule_id = ANY($1)",
    )
    .bind(rule_ids)
    .fetch_all(pool)
    .await?;

    for (rule_id, token) in rows {
        match parse_address(&token) {
            Some(address) => {
                by_rule.entry(rule_id).or_default().insert(address);
            }
            None => {
                tracing::warn!(rule_id = %rule_id, token = %token, "Ignoring malformed mirrored position");
            }
        }
    }

    Ok(by_rule)
}
