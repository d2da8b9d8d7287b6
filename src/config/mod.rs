//! # Configuration Management
//!
//! Configuration comes from an optional TOML file followed by environment
//! overrides:
//!
//! - `CERTWARDEN_CONFIG`: path of the TOML file (also `--config`)
//! - `CERTWARDEN_LOG_LEVEL`: `observability.log_level`
//! - `CERTWARDEN_CA_URL`, `CERTWARDEN_CA_TOKEN`: `ca.url`, `ca.access_token`
//! - `VAULT_ADDR`, `VAULT_TOKEN`: `storage.address`, `storage.token`

pub mod settings;

pub use settings::{
    AppConfig, CaConfig, LeaseConfig, ObservabilityConfig, PollingConfig, StorageConfig,
};

use crate::errors::{Error, Result};
use crate::secret::SecretString;
use std::path::Path;
use tracing::debug;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CERTWARDEN_CONFIG";

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml_str(&contents)
    }

    /// Load from `path` (or `CERTWARDEN_CONFIG`, or defaults), apply the
    /// environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let mut config = match path.or(env_path.as_deref().map(Path::new)) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(level) = var("CERTWARDEN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(url) = var("CERTWARDEN_CA_URL") {
            self.ca.url = Some(url);
        }
        if let Some(token) = var("CERTWARDEN_CA_TOKEN") {
            self.ca.access_token = Some(SecretString::new(token));
        }
        if let Some(address) = var("VAULT_ADDR") {
            self.storage.address = Some(address);
        }
        if let Some(token) = var("VAULT_TOKEN") {
            self.storage.token = Some(SecretString::new(token));
        }
    }
}
