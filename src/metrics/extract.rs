//! Extract phase metrics: feed requests and the records they yield.

use crate::metrics::{phase_metric, PhaseMetrics};

pub struct ExtractMetrics;

impl ExtractMetrics {
    pub fn record_request_success(records: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "extract", "requests")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "extract", "records")).increment(records as u64);
        ::metrics::histogram!(phase_metric!(histogram, "extract", "request_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_request_error() {
        ::metrics::counter!(phase_metric!(counter, "extract", "requests")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "extract", "errors")).increment(1);
    }

    /// Rows written to the most recent batch file.
    pub fn record_batch_written(rows: usize) {
        ::metrics::gauge!(phase_metric!(gauge, "extract", "batch_rows")).set(rows as f64);
    }
}

impl PhaseMetrics for ExtractMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "extract", "requests"));
        let _ = ::metrics::counter!(phase_metric!(counter, "extract", "records"));
        let _ = ::metrics::counter!(phase_metric!(counter, "extract", "errors"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "extract", "request_duration_seconds"));
        let _ = ::metrics::gauge!(phase_metric!(gauge, "extract", "batch_rows"));
    }

    fn phase_name() -> &'static str {
        "extract"
    }
}
