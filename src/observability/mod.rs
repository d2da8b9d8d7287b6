//! # Observability Infrastructure
//!
//! Structured logging and Prometheus metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging and, when configured, the metrics exporter.
///
/// Must be called from within a tokio runtime when metrics are enabled.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;
    let metrics_enabled = init_metrics(config)?;

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled,
        "Observability initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_observability_without_metrics() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert!(init_observability(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = ObservabilityConfig { log_level: "web=loud".into(), ..Default::default() };
        assert!(init_logging(&config).is_err());
    }
}
