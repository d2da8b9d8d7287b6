//! Role lookup.
//!
//! Roles are read-only to enrollment. `role_source` selects where they come
//! from: the config file (`[roles.<name>]` tables) or the storage backend
//! under `role/<name>`.

use crate::config::AppConfig;
use crate::errors::{Error, Result};
use crate::pki::RolePolicy;
use crate::storage::{Storage, StorageEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const ROLE_PREFIX: &str = "role/";

/// Where role policies are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// `[roles.<name>]` tables in the config file
    #[default]
    Config,
    /// JSON entries under `role/<name>` in the storage backend
    Storage,
}

impl RoleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for RoleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the role store selected by `config.role_source`.
///
/// With [`RoleSource::Storage`] the `[roles]` tables are ignored.
pub fn build_role_store(config: &AppConfig, storage: Arc<dyn Storage>) -> Arc<dyn RoleStore> {
    let store: Arc<dyn RoleStore> = match config.role_source {
        RoleSource::Config => Arc::new(ConfigRoleStore::new(config.roles.clone())),
        RoleSource::Storage => Arc::new(StorageRoleStore::new(storage)),
    };
    store
}

/// Role/config store collaborator.
#[async_trait]
pub trait RoleStore: Send + Sync + std::fmt::Debug {
    /// Look up a role, `None` if it does not exist.
    async fn get_role(&self, name: &str) -> Result<Option<RolePolicy>>;

    /// Look up a role, failing with [`Error::RoleNotFound`] if it does not exist.
    async fn require_role(&self, name: &str) -> Result<RolePolicy> {
        self.get_role(name).await?.ok_or_else(|| Error::role_not_found(name))
    }
}

/// Roles defined in configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigRoleStore {
    roles: HashMap<String, RolePolicy>,
}

impl ConfigRoleStore {
    pub fn new(roles: HashMap<String, RolePolicy>) -> Self {
        Self { roles }
    }

    pub fn with_role(mut self, name: impl Into<String>, policy: RolePolicy) -> Self {
        self.roles.insert(name.into(), policy);
        self
    }
}

#[async_trait]
impl RoleStore for ConfigRoleStore {
    async fn get_role(&self, name: &str) -> Result<Option<RolePolicy>> {
        Ok(self.roles.get(name).cloned())
    }
}

/// Roles stored as JSON under `role/<name>`.
#[derive(Debug, Clone)]
pub struct StorageRoleStore {
    storage: Arc<dyn Storage>,
}

impl StorageRoleStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create or replace a role.
    pub async fn put_role(&self, name: &str, policy: &RolePolicy) -> Result<()> {
        let entry = StorageEntry::json(format!("{}{}", ROLE_PREFIX, name), policy)?;
        self.storage.put(entry).await?;
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<String>> {
        Ok(self.storage.list(ROLE_PREFIX).await?)
    }
}

#[async_trait]
impl RoleStore for StorageRoleStore {
    async fn get_role(&self, name: &str) -> Result<Option<RolePolicy>> {
        match self.storage.get(&format!("{}{}", ROLE_PREFIX, name)).await? {
            Some(entry) => Ok(Some(entry.decode_json()?)),
            None => Ok(None),
        }
    }
}
