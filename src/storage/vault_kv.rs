//! Vault KV v2 storage.
//!
//! Each entry is one KV secret holding the entry bytes as a UTF-8 string in
//! its `value` field.

use super::{Storage, StorageEntry, StorageError};
use crate::config::StorageConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error};
use vaultrs::client::VaultClient;
use vaultrs::error::ClientError;
use vaultrs::kv2;

pub struct VaultKvStorage {
    client: VaultClient,
    mount_path: String,
}

impl std::fmt::Debug for VaultKvStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKvStorage")
            .field("mount_path", &self.mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultKvStorage {
    pub fn new(client: VaultClient, mount_path: impl Into<String>) -> Self {
        Self { client, mount_path: mount_path.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let address = config
            .address
            .as_deref()
            .ok_or_else(|| Error::config("storage.address is required for vault_kv"))?;
        let client = crate::vault::build_client(address, config.token.as_ref())?;
        Ok(Self::new(client, &config.mount))
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }
}

fn is_not_found(err: &ClientError) -> bool {
    matches!(err, ClientError::APIError { code: 404, .. })
}

#[async_trait]
impl Storage for VaultKvStorage {
    async fn put(&self, entry: StorageEntry) -> std::result::Result<(), StorageError> {
        let value = String::from_utf8(entry.value)
            .map_err(|_| StorageError::InvalidValue { key: entry.key.clone() })?;
        let mut data = HashMap::new();
        data.insert("value".to_string(), value);

        kv2::set(&self.client, &self.mount_path, &entry.key, &data).await.map_err(|e| {
            error!(error = %e, key = %entry.key, "Failed to write entry to Vault");
            StorageError::Backend(format!("Failed to store '{}': {}", entry.key, e))
        })?;

        debug!(key = %entry.key, mount_path = %self.mount_path, "Stored entry in Vault");
        Ok(())
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<StorageEntry>, StorageError> {
        let secret: HashMap<String, String> =
            match kv2::read(&self.client, &self.mount_path, key).await {
                Ok(secret) => secret,
                Err(e) if is_not_found(&e) => return Ok(None),
                Err(e) => {
                    error!(error = %e, key = %key, "Failed to read entry from Vault");
                    return Err(StorageError::Backend(format!("Failed to read '{}': {}", key, e)));
                }
            };

        let value = secret.get("value").cloned().ok_or_else(|| {
            StorageError::Backend(format!("Entry '{}' has no 'value' field", key))
        })?;
        Ok(Some(StorageEntry { key: key.to_string(), value: value.into_bytes() }))
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError> {
        match kv2::delete_metadata(&self.client, &self.mount_path, key).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => {
                error!(error = %e, key = %key, "Failed to delete entry from Vault");
                Err(StorageError::Backend(format!("Failed to delete '{}': {}", key, e)))
            }
        }
    }

    async fn list(&self, prefix: &str) -> std::result::Result<Vec<String>, StorageError> {
        match kv2::list(&self.client, &self.mount_path, prefix).await {
            Ok(keys) => Ok(keys),
            Err(e) if is_not_found(&e) => Ok(Vec::new()),
            Err(e) => {
                error!(error = %e, prefix = %prefix, "Failed to list entries from Vault");
                Err(StorageError::Backend(format!("Failed to list '{}': {}", prefix, e)))
            }
        }
    }
}
