//! Shared Vault client construction for the PKI and KV backends.

use crate::errors::{Error, Result};
use crate::secret::SecretString;
use tracing::{error, info};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};

/// Build a Vault client for `address`.
///
/// `VAULT_NAMESPACE` is honoured when set.
pub fn build_client(address: &str, token: Option<&SecretString>) -> Result<VaultClient> {
    reqwest::Url::parse(address)
        .map_err(|e| Error::config(format!("Invalid Vault address '{}': {}", address, e)))?;

    let mut settings_builder = VaultClientSettingsBuilder::default();
    settings_builder.address(address);

    if let Some(token) = token {
        settings_builder.token(token.expose_secret());
    }

    if let Ok(namespace) = std::env::var("VAULT_NAMESPACE") {
        settings_builder.namespace(Some(namespace));
    }

    let settings = settings_builder
        .build()
        .map_err(|e| Error::config(format!("Invalid Vault configuration: {}", e)))?;

    VaultClient::new(settings)
        .map_err(|e| Error::config(format!("Failed to create Vault client: {}", e)))
}

/// Query Vault's health endpoint once.
pub async fn check_health(client: &VaultClient, address: &str) -> Result<()> {
    match vaultrs::sys::health(client).await {
        Ok(_) => {
            info!(vault_addr = %address, "Connected to Vault");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, vault_addr = %address, "Failed to connect to Vault");
            Err(Error::config(format!("Vault health check failed: {}", e)))
        }
    }
}
