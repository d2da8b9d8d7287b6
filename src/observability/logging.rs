//! # Structured Logging
//!
//! tracing-subscriber setup plus span helpers for enrollment.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for one enrollment.
///
/// ```rust,ignore
/// let span = enrollment_span!("web", "example.com");
/// ```
#[macro_export]
macro_rules! enrollment_span {
    ($role:expr, $common_name:expr) => {
        tracing::info_span!(
            "enrollment",
            role = %$role,
            common_name = %$common_name,
            enrollment_id = %uuid::Uuid::new_v4(),
            pickup_id = tracing::field::Empty,
            serial_number = tracing::field::Empty
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Returns `Ok(false)` when a
/// subscriber was already installed (e.g. by a test harness).
pub fn init_logging(config: &ObservabilityConfig) -> Result<bool> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        fmt().json().with_env_filter(filter).with_current_span(true).try_init().is_ok()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
    };
    Ok(installed)
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        ca_backend = %config.ca.backend,
        storage_backend = %config.storage.backend,
        poll_interval_seconds = config.polling.interval_seconds,
        poll_max_attempts = ?config.polling.max_attempts,
        poll_deadline_seconds = ?config.polling.deadline_seconds,
        role_source = %config.role_source,
        roles = config.roles.len(),
        metrics_port = config.observability.metrics_port,
        "certwarden configuration"
    );
}
