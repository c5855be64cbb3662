//! Metrics collection and exposition.
//!
//! # Metrics
//! - `similar_requests_total` (counter): inbound requests by method, status
//! - `similar_request_duration_seconds` (histogram): inbound latency
//! - `similar_upstream_calls_total` (counter): catalog calls by dependency, outcome
//! - `similar_retries_total` (counter): retry attempts by dependency
//! - `similar_cache_lookups_total` (counter): hits and misses
//! - `similar_cache_entries` (gauge): current cache size
//! - `similar_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `similar_batch_filtered_total` / `similar_batch_timed_out_total` (counters)
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "similar_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(
        "similar_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(dependency: &str, outcome: &'static str) {
    counter!(
        "similar_upstream_calls_total",
        "dependency" => dependency.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_retry(dependency: &str) {
    counter!("similar_retries_total", "dependency" => dependency.to_string()).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("similar_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("similar_cache_entries").set(size as f64);
}

pub fn record_circuit_state(dependency: &str, state: CircuitState) {
    gauge!("similar_circuit_state", "dependency" => dependency.to_string()).set(state as u8 as f64);
}

pub fn record_batch(filtered: usize, timed_out: usize) {
    counter!("similar_batch_filtered_total").increment(filtered as u64);
    counter!("similar_batch_timed_out_total").increment(timed_out as u64);
}
