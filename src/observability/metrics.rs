//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route type, status
//! - `edge_dispatch_duration_seconds` (histogram): dispatch latency by route type
//! - `edge_cache_lookups_total` (counter): object cache lookups by result
//! - `edge_upstream_failures_total` (counter): proxy failures by kind
//! - `edge_usage_events_total` (counter): usage events by outcome
//! - `edge_background_failures_total` (counter): failed detached tasks by task
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// Record a dispatched request.
pub fn record_request(route_type: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "edge_requests_total",
        "route_type" => route_type,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("edge_dispatch_duration_seconds", "route_type" => route_type)
        .record(start.elapsed().as_secs_f64());
}

/// Record an edge cache lookup ("hit", "miss" or "error").
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("edge_cache_lookups_total", "result" => result).increment(1);
}

/// Record a failed upstream call ("timeout" or "network").
pub fn record_upstream_failure(kind: &'static str) {
    metrics::counter!("edge_upstream_failures_total", "kind" => kind).increment(1);
}

/// Record a usage event ("recorded" or "failed").
pub fn record_usage_event(outcome: &'static str) {
    metrics::counter!("edge_usage_events_total", "outcome" => outcome).increment(1);
}

pub fn record_background_failure(task: &'static str) {
    metrics::counter!("edge_background_failures_total", "task" => task).increment(1);
}
