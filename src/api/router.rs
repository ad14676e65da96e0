use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_worker_secret;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // The engine authenticates the run request itself
    let worker = Router::new()
        .route("/api/worker/copy-trade/run", post(handlers::cycle::run));

    // Read-only audit trail, gated on the same secret
    let audit = Router::new()
        .route("/api/worker/rules/:id/events", get(handlers::events::list))
        .layer(middleware::from_fn_with_state(state.clone(), require_worker_secret));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(worker)
        .merge(audit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
