//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

/// Describe the metrics recorded by the cache and the claims service
fn register_metrics() {
    metrics::describe_counter!(
        "claims_gate_cache_lookups_total",
        "Cache lookups by result (hit, join, miss)"
    );
    metrics::describe_counter!(
        "claims_gate_claims_fetches_total",
        "Claims provider fetches by outcome"
    );
    metrics::describe_histogram!(
        "claims_gate_claims_fetch_duration_seconds",
        "Duration of claims provider fetches in seconds"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}
