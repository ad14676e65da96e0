use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RuleEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

/// GET /api/worker/rules/:id/events
pub async fn list(
    State(state): State<AppState>,
    Path(rule_id): Path<Uuid>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<RuleEvent>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let events = state.engine.store().recent_rule_events(rule_id, limit).await?;
    Ok(Json(events))
}
