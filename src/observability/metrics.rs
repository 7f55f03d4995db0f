//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_claims_total` (counter): claims by outcome
//! - `faucet_transactions_total` (counter): submitted transactions by kind
//! - `faucet_nonce_resyncs_total` (counter): nonce resynchronizations
//! - `faucet_rate_limit_entries` (gauge): live rate-limit table size
//! - `faucet_claim_duration_seconds` (histogram): claim latency

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Claim outcome label values.
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const FAILED: &str = "failed";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INVALID: &str = "invalid";
}

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_claim(outcome: &'static str, start_time: Instant) {
    ::metrics::counter!("faucet_claims_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("faucet_claim_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_transaction(kind: &'static str) {
    ::metrics::counter!("faucet_transactions_total", "kind" => kind).increment(1);
}

pub fn record_nonce_resync() {
    ::metrics::counter!("faucet_nonce_resyncs_total").increment(1);
}

pub fn record_rate_limit_entries(entries: usize) {
    ::metrics::gauge!("faucet_rate_limit_entries").set(entries as f64);
}
