pub mod audit;
pub mod auth;
pub mod executor;
pub mod orchestrator;
pub mod resolver;
pub mod sizing;
pub mod trigger;

pub use auth::WorkerAuth;
pub use executor::{ExecutionSettings, ExecutionSummary, SellExecutor};
pub use orchestrator::{CopyTradeEngine, CycleError, CycleRequest, EngineConfig};
pub use sizing::SellSizing;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};

/// Resolved once per cycle and shared by every rule in it.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub network: String,
    pub agent_address: Address,
    /// Stablecoin every mirrored sell settles into.
    pub settlement_token: Address,
    /// "Now" for this cycle; inner components never read the clock.
    pub as_of: DateTime<Utc>,
}
