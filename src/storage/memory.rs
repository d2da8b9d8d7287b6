//! In-memory storage backed by a concurrent map.

use super::{Storage, StorageEntry, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Process-local storage. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
        self.entries.insert(entry.key, entry.value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
        Ok(self
            .entries
            .get(key)
            .map(|value| StorageEntry { key: key.to_string(), value: value.clone() }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let children: BTreeSet<String> = self
            .entries
            .iter()
            .filter_map(|item| {
                let rest = item.key().strip_prefix(prefix)?;
                Some(match rest.find('/') {
                    Some(idx) => rest[..=idx].to_string(),
                    None => rest.to_string(),
                })
            })
            .collect();
        Ok(children.into_iter().collect())
    }
}
