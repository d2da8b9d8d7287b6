//! # Metrics Collection
//!
//! Prometheus metrics for enrollment. Recording is a no-op until
//! [`init_metrics`] installs an exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use ::tracing::info;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const ENROLLMENTS_TOTAL: &str = "certwarden_enrollments_total";
pub const CA_POLLS_TOTAL: &str = "certwarden_ca_polls_total";
pub const ENROLLMENT_DURATION_SECONDS: &str = "certwarden_enrollment_duration_seconds";

/// Metrics recorder that tracks enrollment metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record a finished enrollment. `outcome` is `issued` or an error kind.
    pub fn record_enrollment(&self, role: &str, outcome: &str, duration: f64) {
        let labels = [("role", role.to_string()), ("outcome", outcome.to_string())];
        counter!(ENROLLMENTS_TOTAL, &labels).increment(1);

        let duration_labels = [("role", role.to_string())];
        histogram!(ENROLLMENT_DURATION_SECONDS, &duration_labels).record(duration);
    }

    /// Record one retrieval poll (`issued`, `pending`, `timeout`, `error`).
    pub fn record_ca_poll(&self, outcome: &str) {
        let labels = [("outcome", outcome.to_string())];
        counter!(CA_POLLS_TOTAL, &labels).increment(1);
    }

    /// Register descriptions so exports appear before events occur.
    pub fn register_enrollment_metrics(&self) {
        describe_counter!(
            ENROLLMENTS_TOTAL,
            Unit::Count,
            "Enrollment requests grouped by role and outcome"
        );
        describe_counter!(CA_POLLS_TOTAL, Unit::Count, "CA retrieval polls grouped by outcome");
        describe_histogram!(
            ENROLLMENT_DURATION_SECONDS,
            Unit::Seconds,
            "Time from request to response, including CA polling"
        );
    }
}

/// Start the Prometheus exporter when a metrics port is configured.
pub fn init_metrics(config: &ObservabilityConfig) -> Result<bool> {
    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => return Ok(false),
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register_enrollment_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        let recorder = MetricsRecorder::new();
        recorder.register_enrollment_metrics();
        recorder.record_enrollment("web", "issued", 0.25);
        recorder.record_ca_poll("pending");
    }

    #[test]
    fn test_init_metrics_disabled() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert!(!init_metrics(&config).unwrap());
    }
}
