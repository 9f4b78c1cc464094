//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatcher metrics (resolutions, auth redirects, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_resolutions_total` (counter): resolutions by outcome
//! - `router_auth_redirects_total` (counter): denied routes by route id
//! - `router_dispatch_duration_seconds` (histogram): controller latency by route, status
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without an installed recorder every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Count one resolution. `outcome` is a fixed label such as `matched`.
pub fn record_resolution(outcome: &'static str) {
    counter!("router_resolutions_total", "outcome" => outcome).increment(1);
}

/// Count an access violation that redirected away from `route`.
pub fn record_auth_redirect(route: &str) {
    counter!("router_auth_redirects_total", "route" => route.to_string()).increment(1);
}

/// Record controller latency for a dispatched request.
pub fn record_dispatch(route: &str, status: u16, start: Instant) {
    histogram!(
        "router_dispatch_duration_seconds",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
