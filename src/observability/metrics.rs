//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, status
//! - `router_request_duration_seconds` (histogram): latency distribution
//! - `router_entity_resolutions_total` (counter): by typename, outcome
//! - `router_reloads_total` (counter): by outcome
//! - `router_active_generation` (gauge): sequence of the active generation
//! - `router_draining_instances` (gauge): superseded generations still draining
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until the
//!   Prometheus exporter is installed
//! - Generation labels are avoided on request metrics to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!("router_requests_total", "Requests served by the router");
    metrics::describe_histogram!(
        "router_request_duration_seconds",
        metrics::Unit::Seconds,
        "Request latency"
    );
    metrics::describe_counter!(
        "router_entity_resolutions_total",
        "Entity representations resolved, by outcome"
    );
    metrics::describe_counter!("router_reloads_total", "Execution config reloads, by outcome");
    metrics::describe_gauge!("router_active_generation", "Sequence of the active generation");
    metrics::describe_gauge!("router_draining_instances", "Generations still draining");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "router_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("router_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_entity_resolution(typename: &str, outcome: &'static str) {
    metrics::counter!(
        "router_entity_resolutions_total",
        "typename" => typename.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("router_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_active_generation(sequence: u64) {
    metrics::gauge!("router_active_generation").set(sequence as f64);
}

pub fn set_draining_instances(count: usize) {
    metrics::gauge!("router_draining_instances").set(count as f64);
}
