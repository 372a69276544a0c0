//! Key/value persistence.
//!
//! Entities are stored as opaque byte blobs addressed by `(collection, id)`.
//! The core only ever talks to the [`KeyValueStore`] trait, so the flat-file
//! backend can be swapped for [`MemoryStore`] in tests.

mod file_store;
mod memory;
pub mod repositories;

pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use repositories::anime::{ANIME_COLLECTION, AnimeRepository};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("invalid key segment '{0}'")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode stored entity: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the blob stored under `(collection, id)`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] when nothing was ever written under the key
    /// - [`StoreError::Io`] on any other read failure
    async fn get(&self, collection: &str, id: &str) -> Result<Vec<u8>, StoreError>;

    /// Replaces whatever is stored under `(collection, id)`.
    async fn put(&self, collection: &str, id: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Key segments end up as path components, so only a conservative alphabet is accepted.
fn validate_segment(segment: &str) -> Result<&str, StoreError> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(segment)
    } else {
        Err(StoreError::InvalidKey(segment.to_string()))
    }
}
