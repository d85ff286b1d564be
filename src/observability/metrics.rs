//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): dispatched requests by outcome
//! - `lb_request_duration_seconds` (histogram): time spent in the dispatcher
//! - `lb_forward_attempts_total` (counter): forwards including retries
//! - `lb_node_failovers_total` (counter): nodes condemned by the dispatcher, by node
//! - `lb_node_alive` (gauge): 1=alive, 0=dead, by node
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("lb_requests_total", "outcome" => outcome).increment(1);
    histogram!("lb_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_forward_attempt() {
    counter!("lb_forward_attempts_total").increment(1);
}

pub fn record_failover(node: &str) {
    counter!("lb_node_failovers_total", "node" => node.to_string()).increment(1);
}

pub fn record_node_liveness(node: &str, alive: bool) {
    gauge!("lb_node_alive", "node" => node.to_string()).set(if alive { 1.0 } else { 0.0 });
}
