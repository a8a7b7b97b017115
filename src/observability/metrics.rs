//! Metrics collection and exposition.
//!
//! # Metrics
//! - `form_submissions_total` (counter): submissions by form and outcome
//! - `form_submission_duration_seconds` (histogram): end-to-end handler latency
//! - `form_rate_limited_total` (counter): requests rejected by the limiter
//! - `form_rate_limit_records` (gauge): live rate-limit records after a sweep
//! - `form_upstream_failures_total` (counter): failures by stage (configuration, token, send)
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_submission(form: &'static str, outcome: &'static str, start: Instant) {
    ::metrics::counter!("form_submissions_total", "form" => form, "outcome" => outcome).increment(1);
    ::metrics::histogram!("form_submission_duration_seconds", "form" => form)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    ::metrics::counter!("form_rate_limited_total").increment(1);
}

pub fn record_rate_limit_records(count: usize) {
    ::metrics::gauge!("form_rate_limit_records").set(count as f64);
}

pub fn record_upstream_failure(stage: &'static str) {
    ::metrics::counter!("form_upstream_failures_total", "stage" => stage).increment(1);
}
