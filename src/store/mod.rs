//! Local storage for the fallback datasets.
//!
//! The services never talk to a concrete storage mechanism: they go through
//! the [`KeyValueStore`] port, which holds one JSON document per key.

mod fallback;
mod sqlite;

pub use fallback::*;
pub use sqlite::*;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::AppError;

/// Key-value port used to persist fallback datasets.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), AppError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Process-memory store, used when no durable storage is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("mock.roles").await.unwrap(), None);

        store.set("mock.roles", "[]".to_string()).await.unwrap();
        assert_eq!(
            store.get("mock.roles").await.unwrap().as_deref(),
            Some("[]")
        );

        store.remove("mock.roles").await.unwrap();
        store.remove("mock.roles").await.unwrap();
        assert_eq!(store.get("mock.roles").await.unwrap(), None);
    }
}
