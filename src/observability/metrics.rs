//! Metrics collection and exposition.
//!
//! # Metrics
//! - `txflow_rpc_requests_total` (counter): JSON-RPC requests by method, outcome
//! - `txflow_rpc_batches_total` (counter): batch requests sent
//! - `txflow_sync_rounds_total` (counter): liveness rounds by outcome
//! - `txflow_failovers_total` (counter): secondary endpoint activations
//! - `txflow_connected` (gauge): 1=connection live, 0=cleared
//! - `txflow_fee_estimates_total` (counter): estimates by authoritative flag
//! - `txflow_transactions_total` (counter): signed / broadcast / confirmed / failed
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_request(method: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("txflow_rpc_requests_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_rpc_batch(size: usize) {
    counter!("txflow_rpc_batches_total").increment(1);
    counter!("txflow_rpc_batched_calls_total").increment(size as u64);
}

pub fn record_sync_round(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!("txflow_sync_rounds_total", "outcome" => outcome).increment(1);
}

pub fn record_failover() {
    counter!("txflow_failovers_total").increment(1);
}

pub fn record_connection_state(connected: bool) {
    gauge!("txflow_connected").set(if connected { 1.0 } else { 0.0 });
}

pub fn record_fee_estimate(token: &str, authoritative: bool) {
    counter!(
        "txflow_fee_estimates_total",
        "token" => token.to_string(),
        "authoritative" => if authoritative { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_transaction(stage: &'static str) {
    counter!("txflow_transactions_total", "stage" => stage).increment(1);
}
