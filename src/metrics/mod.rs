//! Metrics module
//!
//! Prometheus metrics for credential issuance. Registered in the default
//! registry; [`gather_text`] renders them in the text exposition format.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

lazy_static! {
    pub static ref CREDENTIAL_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "oss_sts_credential_requests_total",
        "AssumeRole credential requests by outcome",
        &["outcome"]  // "success" or an error kind
    ).unwrap();

    pub static ref CREDENTIAL_REQUEST_DURATION: Histogram = register_histogram!(
        "oss_sts_credential_request_duration_seconds",
        "AssumeRole round-trip duration in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
}

/// Record one finished credential request
pub fn record_credential_request(outcome: &str, duration_secs: f64) {
    CREDENTIAL_REQUESTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    CREDENTIAL_REQUEST_DURATION.observe(duration_secs);
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
