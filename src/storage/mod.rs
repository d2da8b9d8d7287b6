//! # Storage
//!
//! Flat key/value storage for certificate records and roles. Keys are plain
//! strings such as `certs/example.com`; values are opaque bytes (JSON in
//! practice). Writes are independent: there is no transaction spanning two
//! keys.

mod memory;
mod vault_kv;

pub use memory::MemoryStorage;
pub use vault_kv::VaultKvStorage;

use crate::config::StorageConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    /// Serialize `value` as JSON under `key`.
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self { key: key.into(), value: serde_json::to_vec(value)? })
    }

    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// Errors from a storage backend.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("value under '{key}' is not valid UTF-8")]
    InvalidValue { key: String },
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::storage(err.to_string())
    }
}

/// Type of storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendType {
    /// Process-local map; contents are lost on exit
    #[default]
    Memory,
    /// HashiCorp Vault KV version 2
    VaultKv,
}

impl StorageBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::VaultKv => "vault_kv",
        }
    }
}

impl fmt::Display for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generic storage collaborator.
#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Write `entry`, replacing any existing value under its key.
    async fn put(&self, entry: StorageEntry) -> std::result::Result<(), StorageError>;

    /// Read the value under `key`, `None` if absent.
    async fn get(&self, key: &str) -> std::result::Result<Option<StorageEntry>, StorageError>;

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError>;

    /// Immediate children of `prefix`. Nested levels are returned once with a
    /// trailing `/`.
    async fn list(&self, prefix: &str) -> std::result::Result<Vec<String>, StorageError>;
}

/// Build the storage backend selected by configuration.
pub fn build_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackendType::Memory => Arc::new(MemoryStorage::new()),
        StorageBackendType::VaultKv => Arc::new(VaultKvStorage::from_config(config)?),
    };
    Ok(storage)
}
