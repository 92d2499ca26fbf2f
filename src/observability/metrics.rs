//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hello_requests_total` (counter): requests by role, method, status
//! - `hello_request_duration_seconds` (histogram): latency distribution
//! - `hello_fetch_total` (counter): client fetch outcomes
//! - `hello_instance_health` (gauge): 1=healthy, 0=unhealthy, per service and address
//!
//! Recording is a no-op until `init_metrics` installs the exporter.
//! Health gauges that stop being refreshed expire, so instances that left
//! the registry drop out of the scrape.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_util::MetricKindMask;

/// Missed health rounds before an instance's gauge is dropped.
const GAUGE_IDLE_ROUNDS: u32 = 3;

/// Exporter settings shared by the scrape listener and tests.
pub fn exporter(health_interval: Duration) -> PrometheusBuilder {
    PrometheusBuilder::new().idle_timeout(
        MetricKindMask::GAUGE,
        Some(health_interval.saturating_mul(GAUGE_IDLE_ROUNDS)),
    )
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr, health_interval: Duration) {
    match exporter(health_interval).with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(role: &'static str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("role", role.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("hello_requests_total", &labels).increment(1);
    metrics::histogram!("hello_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fetch(outcome: &'static str) {
    metrics::counter!("hello_fetch_total", "outcome" => outcome).increment(1);
}

pub fn record_instance_health(service: &str, address: SocketAddr, healthy: bool) {
    metrics::gauge!(
        "hello_instance_health",
        "service" => service.to_string(),
        "address" => address.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
