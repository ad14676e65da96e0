use std::sync::OnceLock;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and register all engine metrics.
/// Later calls return the handle of the recorder installed first.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE.get_or_init(install).clone()
}

fn install() -> PrometheusHandle {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("A global metrics recorder was already installed");
    }

    // Pre-register counters so they appear even before the first increment.
    counter!("cycles_total").absolute(0);
    counter!("cycles_rejected_total").absolute(0);
    counter!("rules_evaluated_total").absolute(0);
    counter!("rules_executed_total").absolute(0);
    counter!("rules_timed_out_total").absolute(0);
    counter!("indexer_fetch_failures_total").absolute(0);
    counter!("swaps_executed_total").absolute(0);
    counter!("swaps_failed_total").absolute(0);
    counter!("audit_write_failures_total").absolute(0);

    // Histogram is lazily created on first record; force creation.
    histogram!("cycle_duration_seconds").record(0.0);

    handle
}
