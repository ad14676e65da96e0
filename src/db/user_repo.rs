use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Identity;

/// Resolve a caller-supplied identity: either a user id or the follower's
/// wallet address (case-insensitive).
pub async fn resolve_identity(pool: &PgPool, raw: &str) -> anyhow::Result<Option<Identity>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(user_id) = Uuid::parse_str(raw) {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT id AS user_id, wallet_address FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        return Ok(identity);
    }

    let identity = sqlx::query_as::<_, Identity>(
        "SELECT id AS user_id, wallet_address FROM users WHERE LOWER(wallet_address) = LOWER($1) LIMIT 1",
    )
    .bind(raw)
    .fetch_optional(pool)
    .await?;

    Ok(identity)
}
