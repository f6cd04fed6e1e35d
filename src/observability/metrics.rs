//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fesl_connections_total` (counter): accepted connections
//! - `fesl_active_connections` (gauge): current connection count
//! - `fesl_transactions_total` (counter): handled requests by class, txn
//! - `fesl_unknown_transactions_total` (counter): unrecognized requests by class
//! - `fesl_framing_errors_total` (counter): connections dropped for bad frames
//! - `fesl_tls_handshake_failures_total` (counter)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter is opt-in via config

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn connection_opened() {
    metrics::counter!("fesl_connections_total").increment(1);
    metrics::gauge!("fesl_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("fesl_active_connections").decrement(1.0);
}

pub fn record_transaction(class: &str, txn: &str) {
    metrics::counter!(
        "fesl_transactions_total",
        "class" => class.to_string(),
        "txn" => txn.to_string()
    )
    .increment(1);
}

pub fn record_unknown_transaction(class: &str) {
    metrics::counter!("fesl_unknown_transactions_total", "class" => class.to_string()).increment(1);
}

pub fn record_framing_error() {
    metrics::counter!("fesl_framing_errors_total").increment(1);
}

pub fn record_tls_handshake_failure() {
    metrics::counter!("fesl_tls_handshake_failures_total").increment(1);
}
