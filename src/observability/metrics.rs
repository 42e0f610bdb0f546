//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lrs_requests_total` (counter): requests by method, status
//! - `lrs_request_duration_seconds` (histogram): latency by method
//! - `lrs_statements_received_total` (counter): statements delivered to observers
//! - `lrs_agent_profiles_received_total` (counter): profile documents delivered
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one answered request.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    ::metrics::counter!(
        "lrs_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("lrs_request_duration_seconds", "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_statements(count: usize) {
    ::metrics::counter!("lrs_statements_received_total").increment(count as u64);
}

pub fn record_agent_profile() {
    ::metrics::counter!("lrs_agent_profiles_received_total").increment(1);
}
