use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::engine::{CopyTradeEngine, CycleRequest};

/// Run the in-process cycle scheduler. Every tick runs one cycle per
/// configured identity, in order. A failing identity is logged and the loop
/// moves on.
pub async fn run_scheduler(
    engine: Arc<CopyTradeEngine>,
    credential: String,
    identities: Vec<String>,
    interval_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        identities = identities.len(),
        interval_secs,
        "Cycle scheduler started"
    );

    loop {
        ticker.tick().await;
        let ok = run_scheduled_cycles(&engine, &credential, &identities).await;
        tracing::debug!(ok, total = identities.len(), "Scheduler tick finished");
    }
}

/// One pass over `identities`. Returns how many cycles completed.
pub async fn run_scheduled_cycles(
    engine: &CopyTradeEngine,
    credential: &str,
    identities: &[String],
) -> usize {
    let mut completed = 0;

    for identity in identities {
        let request = CycleRequest {
            credential: credential.to_string(),
            identity: identity.clone(),
            as_of: None,
        };

        match engine.run_cycle(request).await {
            Ok(result) => {
                completed += 1;
                tracing::info!(
                    identity = %identity,
                    rules = result.results.len(),
                    executed = result.executed_count(),
                    "Scheduled cycle complete"
                );
            }
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Scheduled cycle failed");
            }
        }
    }

    completed
}
