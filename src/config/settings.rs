//! # Configuration Settings
//!
//! Defines the configuration structure for certwarden.

use crate::ca::CaBackendType;
use crate::enroll::PollPolicy;
use crate::errors::{Error, Result};
use crate::pki::RolePolicy;
use crate::roles::RoleSource;
use crate::secret::SecretString;
use crate::storage::StorageBackendType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Certificate authority backend
    #[validate(nested)]
    pub ca: CaConfig,

    /// Record storage backend
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Retrieval polling bounds
    #[validate(nested)]
    pub polling: PollingConfig,

    /// Lease settings
    #[validate(nested)]
    pub lease: LeaseConfig,

    /// Logging and metrics
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Where role policies are read from
    pub role_source: RoleSource,

    /// Role policies by name (used when `role_source` is `config`)
    pub roles: HashMap<String, RolePolicy>,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks that depend on the selected backends
    fn validate_custom(&self) -> Result<()> {
        match self.ca.backend {
            CaBackendType::Tpp => {
                if self.ca.url.is_none() || self.ca.zone.is_none() {
                    return Err(Error::config("The tpp CA backend requires ca.url and ca.zone"));
                }
                if self.ca.access_token.is_none() {
                    return Err(Error::config("The tpp CA backend requires ca.access_token"));
                }
            }
            CaBackendType::VaultPki => {
                if self.ca.url.is_none() || self.ca.role.is_none() {
                    return Err(Error::config(
                        "The vault_pki CA backend requires ca.url and ca.role",
                    ));
                }
            }
            CaBackendType::Local => {}
            CaBackendType::Mock => {
                return Err(Error::config("The mock CA backend cannot be configured"));
            }
        }

        if self.storage.backend == StorageBackendType::VaultKv && self.storage.address.is_none() {
            return Err(Error::config("The vault_kv storage backend requires storage.address"));
        }

        if self.role_source == RoleSource::Storage
            && self.storage.backend == StorageBackendType::Memory
        {
            return Err(Error::config(
                "role_source = \"storage\" requires a persistent storage backend",
            ));
        }

        let mut names: Vec<&String> = self.roles.keys().collect();
        names.sort();
        for name in names {
            if let Err(e) = self.roles[name].key_spec() {
                return Err(Error::config(format!("Role '{}' has an invalid key policy: {}", name, e)));
            }
        }

        Ok(())
    }
}

/// Certificate authority configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CaConfig {
    /// Which CA to talk to
    pub backend: CaBackendType,

    /// Base URL of the CA (TPP server or Vault address)
    pub url: Option<String>,

    /// TPP policy folder; `\VED\Policy\` is prepended when missing
    pub zone: Option<String>,

    /// Bearer token (TPP) or Vault token (vault_pki)
    pub access_token: Option<SecretString>,

    /// Vault PKI mount path
    #[validate(length(min = 1, message = "PKI mount cannot be empty"))]
    pub mount: String,

    /// Vault PKI role used for signing
    pub role: Option<String>,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 600, message = "Timeout must be between 1 and 600 seconds"))]
    pub timeout_seconds: u64,

    /// Polls answered with Pending before the local CA hands out a certificate
    pub local_pending_polls: u32,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            backend: CaBackendType::Local,
            url: None,
            zone: None,
            access_token: None,
            mount: "pki".to_string(),
            role: None,
            timeout_seconds: 60,
            local_pending_polls: 0,
        }
    }
}

impl CaConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,

    /// KV v2 mount path
    #[validate(length(min = 1, message = "Storage mount cannot be empty"))]
    pub mount: String,

    /// Vault address for the vault_kv backend
    pub address: Option<String>,

    /// Vault token for the vault_kv backend
    pub token: Option<SecretString>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Memory,
            mount: "secret".to_string(),
            address: None,
            token: None,
        }
    }
}

/// Retrieval polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds to wait after a Pending/Timeout answer
    #[validate(range(min = 1, max = 3600, message = "Poll interval must be between 1 and 3600 seconds"))]
    pub interval_seconds: u64,

    /// Give up after this many retrievals (unbounded when unset)
    #[validate(range(min = 1, message = "Max attempts must be at least 1"))]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds of polling (unbounded when unset)
    #[validate(range(min = 1, message = "Deadline must be at least 1 second"))]
    pub deadline_seconds: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 5, max_attempts: None, deadline_seconds: None }
    }
}

impl PollingConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_seconds),
            max_attempts: self.max_attempts,
            deadline: self.deadline_seconds.map(Duration::from_secs),
        }
    }
}

/// Lease configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LeaseConfig {
    /// Prefix of lease ids (`<mount>/issue/<role>/<uuid>`)
    #[validate(length(min = 1, message = "Lease mount cannot be empty"))]
    pub mount: String,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self { mount: "pki".to_string() }
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            metrics_port: 0,
            service_name: "certwarden".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}
