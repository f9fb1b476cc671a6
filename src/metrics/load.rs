//! Staging load metrics.

use crate::metrics::{phase_metric, PhaseMetrics};

pub struct LoadMetrics;

impl LoadMetrics {
    pub fn record_success(rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "load", "batches")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "load", "rows")).increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "load", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_error() {
        ::metrics::counter!(phase_metric!(counter, "load", "errors")).increment(1);
    }

    /// Stale rows removed by the delete half of a reload.
    pub fn record_replaced(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "load", "replaced_rows")).increment(rows as u64);
    }
}

impl PhaseMetrics for LoadMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "load", "batches"));
        let _ = ::metrics::counter!(phase_metric!(counter, "load", "rows"));
        let _ = ::metrics::counter!(phase_metric!(counter, "load", "errors"));
        let _ = ::metrics::counter!(phase_metric!(counter, "load", "replaced_rows"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "load", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "load"
    }
}
