//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (commands, latency, barrier and upstream failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_commands_total` (counter): completed commands by kind, status
//! - `proxy_command_duration_seconds` (histogram): receive-to-response time by kind
//! - `proxy_barrier_failures_total` (counter): rejected commands by kind
//! - `proxy_upstream_errors_total` (counter): failed exchanges by stage
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   embedders pay nothing when the endpoint is off
//! - Kind labels are the static variant names; no per-session labels

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::CommandKind;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// A command whose upstream response was fully relayed.
pub fn record_command(kind: CommandKind, status: u16, elapsed: Duration) {
    ::metrics::counter!(
        "proxy_commands_total",
        "kind" => kind.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_command_duration_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());
}

/// A command stopped by a barrier.
pub fn record_barrier_failure(kind: CommandKind) {
    ::metrics::counter!("proxy_barrier_failures_total", "kind" => kind.as_str()).increment(1);
}

/// An exchange that failed before or while relaying the upstream response.
pub fn record_error(stage: &str) {
    ::metrics::counter!("proxy_upstream_errors_total", "stage" => stage.to_string()).increment(1);
}
