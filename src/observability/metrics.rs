//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirect_regex_requests_total` (counter): requests seen by a redirect
//!   rule, labelled by `rule`, `outcome` (`redirect`, `forward`, `error`) and
//!   `status` (redirect status, forward reason, or error kind)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

const REQUESTS_TOTAL: &str = "redirect_regex_requests_total";

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_redirect(rule: &str, status: StatusCode) {
    counter!(
        REQUESTS_TOTAL,
        "rule" => rule.to_string(),
        "outcome" => "redirect",
        "status" => status.as_str().to_string()
    )
    .increment(1);
}

pub fn record_forward(rule: &str, reason: &'static str) {
    counter!(
        REQUESTS_TOTAL,
        "rule" => rule.to_string(),
        "outcome" => "forward",
        "status" => reason
    )
    .increment(1);
}

pub fn record_failure(rule: &str, kind: &'static str) {
    counter!(
        REQUESTS_TOTAL,
        "rule" => rule.to_string(),
        "outcome" => "error",
        "status" => kind
    )
    .increment(1);
}
