use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

pub const WORKER_SECRET_HEADER: &str = "x-worker-secret";

/// Presented worker secret, or empty when the header is missing.
pub fn worker_secret(headers: &HeaderMap) -> String {
    headers
        .get(WORKER_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Rejects requests whose `x-worker-secret` does not match the engine's.
pub async fn require_worker_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let presented = worker_secret(req.headers());
    if state.engine.auth().verify(&presented) {
        next.run(req).await
    } else {
        AppError::Unauthorized.into_response()
    }
}
