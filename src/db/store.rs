use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Evaluations,
    Periods,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Evaluations,
        Collection::Periods,
        Collection::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Evaluations => "evaluations",
            Collection::Periods => "periods",
            Collection::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record '{key}' already exists in {collection}")]
    Duplicate { collection: &'static str, key: String },
    #[error("malformed record '{key}' in {collection}: {source}")]
    Corrupt {
        collection: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Key/value storage for flat JSON records grouped into collections.
///
/// Callers go through the typed helpers in [`crate::db`]; implementations
/// only move documents around.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;

    /// Every record of the collection ordered by key.
    async fn get_all(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError>;

    /// Inserts or replaces.
    async fn put(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError>;

    /// Inserts, failing with [`StoreError::Duplicate`] when the key is taken.
    async fn add(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, StoreError>;

    async fn clear(&self, collection: Collection) -> Result<(), StoreError>;

    async fn count(&self, collection: Collection) -> Result<usize, StoreError>;
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    async fn add(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();
        if records.contains_key(key) {
            return Err(StoreError::Duplicate {
                collection: collection.as_str(),
                key: key.to_string(),
            });
        }
        records.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .and_then(|records| records.remove(key))
            .is_some())
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.collections.write().await.remove(&collection);
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, BTreeMap::len))
    }
}
