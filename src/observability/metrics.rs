//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): requests by method, status
//! - `shield_request_duration_seconds` (histogram): latency distribution
//! - `shield_rate_limited_total` (counter): rejections by scope
//! - `shield_threats_total` (counter): detector findings by category, action
//! - `shield_verifications_total` (counter): zero-trust outcomes
//! - `shield_events_total` (counter): monitored events by kind
//! - `shield_alerts_total` (counter): alerts by severity
//! - `shield_store_failures_total` (counter): storage faults by component

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::monitor::SecurityEventKind;
use crate::types::Severity;

/// Install the Prometheus exporter on `addr`.
///
/// Must run inside a tokio runtime. Failure to install is logged and
/// otherwise ignored; recording macros are no-ops without an exporter.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(%error, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "shield_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("shield_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &str) {
    counter!("shield_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_threat(category: &str, action: &str) {
    counter!(
        "shield_threats_total",
        "category" => category.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
}

pub fn record_verification(allowed: bool) {
    let outcome = if allowed { "allowed" } else { "refused" };
    counter!("shield_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_event(kind: SecurityEventKind) {
    counter!("shield_events_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_alert(severity: Severity) {
    counter!("shield_alerts_total", "severity" => severity.as_str()).increment(1);
}

pub fn record_store_failure(component: &'static str) {
    counter!("shield_store_failures_total", "component" => component).increment(1);
}
