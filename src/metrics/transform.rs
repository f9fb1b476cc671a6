//! Window transform metrics.

use crate::metrics::{phase_metric, PhaseMetrics};

pub struct TransformMetrics;

impl TransformMetrics {
    pub fn record_success(rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "transform", "windows")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "transform", "rows")).increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "transform", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_error() {
        ::metrics::counter!(phase_metric!(counter, "transform", "errors")).increment(1);
    }

    /// Places without the location marker, passed through uncleaned.
    pub fn record_place_passthrough(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "place_passthrough"))
            .increment(rows as u64);
    }
}

impl PhaseMetrics for TransformMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "transform", "windows"));
        let _ = ::metrics::counter!(phase_metric!(counter, "transform", "rows"));
        let _ = ::metrics::counter!(phase_metric!(counter, "transform", "errors"));
        let _ = ::metrics::counter!(phase_metric!(counter, "transform", "place_passthrough"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "transform", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "transform"
    }
}
