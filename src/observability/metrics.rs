//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): dispatched requests by method, status, outcome
//! - `router_request_duration_seconds` (histogram): time spent in the chain
//! - `router_rate_limited_total` (counter): requests rejected by the rate limiter
//! - `router_panics_total` (counter): panics caught by the recovery middleware
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so tests and
//!   embedders pay nothing by default
//! - Histogram buckets tuned for in-process handlers (sub-millisecond up)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const DURATION_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
];

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("router_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .with_http_listener(addr)
        .install()?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, started: Instant) {
    ::metrics::counter!(
        "router_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "router_request_duration_seconds",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
}

/// `reason` is a fixed label value; never a client identifier.
pub fn record_rate_limited(reason: &'static str) {
    ::metrics::counter!("router_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_panic() {
    ::metrics::counter!("router_panics_total").increment(1);
}
