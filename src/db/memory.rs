use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError, validate_segment};

/// Process-local store, used by tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .await
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn put(&self, collection: &str, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let key = (
            validate_segment(collection)?.to_string(),
            validate_segment(id)?.to_string(),
        );
        self.entries.write().await.insert(key, bytes.to_vec());
        Ok(())
    }
}
