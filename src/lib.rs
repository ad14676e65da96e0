pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::engine::CopyTradeEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CopyTradeEngine>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
