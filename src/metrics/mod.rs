//! Per-stage pipeline metrics.
//!
//! Each stage owns a submodule with its counters and histograms so names stay
//! consistent: `quake_{phase}_{metric}`, with `_total` appended to counters.
//! Without an installed recorder every call is a no-op.

pub mod extract;
pub mod load;
pub mod transform;

pub use extract::ExtractMetrics;
pub use load::LoadMetrics;
pub use transform::TransformMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{debug, info, warn};

static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Idempotent. Does nothing when `addr` is `None`.
pub fn init_metrics(addr: Option<&str>) {
    let Some(addr_str) = addr else {
        return;
    };
    INIT.call_once(|| {
        let addr = match addr_str.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                info!("Prometheus exporter listening at http://{}/metrics", addr);
                register_phase::<ExtractMetrics>();
                register_phase::<LoadMetrics>();
                register_phase::<TransformMetrics>();
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

fn register_phase<M: PhaseMetrics>() {
    M::register_metrics();
    debug!("Registered {} metrics", M::phase_name());
}

/// Implemented by each stage's metric collection.
pub trait PhaseMetrics {
    /// Pre-register every metric of the phase so it is exported before its first use.
    fn register_metrics();

    fn phase_name() -> &'static str;
}

/// Builds a metric name following `quake_{phase}_{name}`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("quake_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("quake_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("quake_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
