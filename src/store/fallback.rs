//! The fallback dataset of one resource.
//!
//! Lazily loaded from the key-value port on first use, seeded with a fixed
//! dataset when nothing usable is stored, then kept in memory and written
//! back after every mutation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::config::Persistence;
use crate::errors::AppError;

/// A record type that can live in a fallback store.
pub trait Seeded: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Fixed dataset used to initialize an empty store.
    fn seed() -> Vec<Self>;
}

/// Identity of a record within its store, used to drop duplicates on load.
pub type Identity<T> = fn(&T) -> String;

/// Storage key for a resource's fallback dataset.
pub fn storage_key(resource: &str) -> String {
    format!("mock.{}", resource)
}

/// In-memory view of one resource's fallback dataset, backed by the port.
pub struct FallbackStore<T> {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    persistence: Persistence,
    identity: Identity<T>,
    /// `None` until the first access; never reset afterwards.
    state: Mutex<Option<Vec<T>>>,
}

impl<T: Seeded> FallbackStore<T> {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        resource: &str,
        persistence: Persistence,
        identity: Identity<T>,
    ) -> Self {
        Self {
            storage,
            key: storage_key(resource),
            persistence,
            identity,
            state: Mutex::new(None),
        }
    }

    /// Run `f` against the current dataset.
    pub async fn read<U>(&self, f: impl FnOnce(&[T]) -> U) -> U {
        let mut state = self.state.lock().await;
        let records = self.ensure_loaded(&mut state).await;
        f(records.as_slice())
    }

    /// Copy of the full dataset.
    pub async fn snapshot(&self) -> Vec<T> {
        self.read(|records| records.to_vec()).await
    }

    /// Apply `f` to a working copy of the dataset and commit it.
    ///
    /// Nothing changes if `f` fails. Read, modify and write happen under one
    /// lock, so sequential callers always see the last write.
    pub async fn mutate<U>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Result<U, AppError>,
    ) -> Result<U, AppError> {
        let mut state = self.state.lock().await;
        let mut working = self.ensure_loaded(&mut state).await.clone();

        let output = f(&mut working)?;
        self.persist(&working).await?;

        *state = Some(working);
        Ok(output)
    }

    /// Wipe the dataset, both persisted and in memory.
    ///
    /// The store stays initialized: it is not reseeded for the rest of the
    /// process lifetime.
    pub async fn clear(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if let Err(err) = self.storage.remove(&self.key).await {
            self.absorb_write_failure(err)?;
        }

        *state = Some(Vec::new());
        tracing::info!(key = %self.key, "Fallback store cleared");
        Ok(())
    }

    async fn ensure_loaded<'a>(&self, state: &'a mut Option<Vec<T>>) -> &'a mut Vec<T> {
        if state.is_none() {
            let loaded = self.load_or_seed().await;
            *state = Some(loaded);
        }
        state.get_or_insert_with(Vec::new)
    }

    async fn load_or_seed(&self) -> Vec<T> {
        let stored = match self.storage.get(&self.key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "Failed to read fallback store");
                None
            }
        };

        let records = stored
            .and_then(|raw| match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(records) => Some(records),
                Err(err) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %err,
                        "Corrupt fallback store, treating it as empty"
                    );
                    None
                }
            })
            .unwrap_or_default();

        if !records.is_empty() {
            return self.dedupe(records);
        }

        let seed = T::seed();
        tracing::info!(key = %self.key, count = seed.len(), "Seeding fallback store");
        if let Err(err) = self.write(&seed).await {
            tracing::warn!(key = %self.key, error = %err, "Failed to persist seed data");
        }
        seed
    }

    /// Keep the first record for every identity.
    fn dedupe(&self, records: Vec<T>) -> Vec<T> {
        let mut seen = HashSet::new();
        let before = records.len();
        let unique: Vec<T> = records
            .into_iter()
            .filter(|record| seen.insert((self.identity)(record)))
            .collect();

        if unique.len() != before {
            tracing::warn!(
                key = %self.key,
                dropped = before - unique.len(),
                "Dropped records with duplicate ids from fallback store"
            );
        }
        unique
    }

    async fn persist(&self, records: &[T]) -> Result<(), AppError> {
        match self.write(records).await {
            Ok(()) => Ok(()),
            Err(err) => self.absorb_write_failure(err),
        }
    }

    async fn write(&self, records: &[T]) -> Result<(), AppError> {
        let raw = serde_json::to_string(records)
            .map_err(|e| AppError::Storage(format!("Failed to serialize {}: {}", self.key, e)))?;
        self.storage.set(&self.key, raw).await
    }

    fn absorb_write_failure(&self, err: AppError) -> Result<(), AppError> {
        match self.persistence {
            Persistence::BestEffort => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "Fallback store write failed; change kept in memory only"
                );
                Ok(())
            }
            Persistence::Strict => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Part {
        id: u32,
        name: String,
    }

    impl Seeded for Part {
        fn seed() -> Vec<Self> {
            vec![
                Part {
                    id: 1,
                    name: "Brake pad".into(),
                },
                Part {
                    id: 2,
                    name: "Oil filter".into(),
                },
            ]
        }
    }

    /// Store whose writes always fail, reads return nothing.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), AppError> {
            Err(AppError::Storage("quota exceeded".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), AppError> {
            Err(AppError::Storage("storage disabled".into()))
        }
    }

    fn part_store(
        storage: Arc<dyn KeyValueStore>,
        persistence: Persistence,
    ) -> FallbackStore<Part> {
        FallbackStore::new(storage, "parts", persistence, |part: &Part| part.id.to_string())
    }

    #[tokio::test]
    async fn test_seeds_once_and_persists_seed() {
        let storage = Arc::new(MemoryStore::new());
        let store = part_store(storage.clone(), Persistence::BestEffort);

        assert_eq!(store.snapshot().await, Part::seed());
        let raw = storage.get("mock.parts").await.unwrap().unwrap();
        let persisted: Vec<Part> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, Part::seed());
    }

    #[tokio::test]
    async fn test_loads_existing_data_without_reseeding() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set("mock.parts", r#"[{"id":7,"name":"Spark plug"}]"#.into())
            .await
            .unwrap();

        let store = part_store(storage, Persistence::BestEffort);
        let records = store.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 7);
    }

    #[tokio::test]
    async fn test_corrupt_json_is_treated_as_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set("mock.parts", "{not json".into()).await.unwrap();

        let store = part_store(storage, Persistence::BestEffort);
        assert_eq!(store.snapshot().await, Part::seed());
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first_record() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(
                "mock.parts",
                r#"[{"id":1,"name":"first"},{"id":1,"name":"second"},{"id":2,"name":"other"}]"#
                    .into(),
            )
            .await
            .unwrap();

        let store = part_store(storage, Persistence::BestEffort);
        let records = store.snapshot().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "first");
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_store_untouched() {
        let store = part_store(Arc::new(MemoryStore::new()), Persistence::BestEffort);

        let result: Result<(), AppError> = store
            .mutate(|records| {
                records.clear();
                Err(AppError::PreconditionFailed("guarded".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.snapshot().await, Part::seed());
    }

    #[tokio::test]
    async fn test_clear_does_not_reseed() {
        let storage = Arc::new(MemoryStore::new());
        let store = part_store(storage.clone(), Persistence::BestEffort);
        store.snapshot().await;

        store.clear().await.unwrap();
        assert!(store.snapshot().await.is_empty());
        assert_eq!(storage.get("mock.parts").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_best_effort_keeps_change_when_write_fails() {
        let store = part_store(Arc::new(ReadOnlyStore), Persistence::BestEffort);

        store
            .mutate(|records| {
                records.retain(|p| p.id != 1);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_strict_surfaces_write_failure_and_discards_change() {
        let store = part_store(Arc::new(ReadOnlyStore), Persistence::Strict);

        let result = store
            .mutate(|records| {
                records.retain(|p| p.id != 1);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(store.snapshot().await, Part::seed());
    }
}
