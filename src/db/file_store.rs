use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::{KeyValueStore, StoreError, validate_segment};

/// One file per key: `<root>/<collection>/<id>.<extension>`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written entity.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    extension: String,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        let collection = validate_segment(collection)?;
        let id = validate_segment(id)?;
        Ok(self
            .root
            .join(collection)
            .join(format!("{id}.{}", self.extension)))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(collection, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(collection, id))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn put(&self, collection: &str, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(collection, id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!("{}.tmp-{}", self.extension, uuid::Uuid::new_v4()));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io(e));
        }

        debug!(path = %path.display(), size = bytes.len(), "Stored entity");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileStore {
        let root = std::env::temp_dir().join(format!("animenya-store-{}", uuid::Uuid::new_v4()));
        FileStore::new(root, "animenya")
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = temp_store();
        store.put("anime", "42", b"{\"id\":42}").await.unwrap();

        let bytes = store.get("anime", "42").await.unwrap();
        assert_eq!(bytes, b"{\"id\":42}");
        assert!(store.root().join("anime").join("42.animenya").exists());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let store = temp_store();
        store.put("anime", "1", b"first").await.unwrap();
        store.put("anime", "1", b"second").await.unwrap();

        assert_eq!(store.get("anime", "1").await.unwrap(), b"second");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = temp_store();
        let err = store.get("anime", "7").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let store = temp_store();
        let err = store.put("anime", "../escape", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
