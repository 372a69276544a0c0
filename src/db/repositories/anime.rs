use std::sync::Arc;

use crate::db::{KeyValueStore, StoreError};
use crate::domain::AnimeId;
use crate::models::anime::Anime;

/// Namespace tag for anime records in the key/value store.
pub const ANIME_COLLECTION: &str = "anime";

/// Serializes whole `Anime` records to JSON under `("anime", "<id>")`.
///
/// There is no in-process cache: every read deserializes from the store and
/// every write replaces the stored record.
#[derive(Clone)]
pub struct AnimeRepository {
    store: Arc<dyn KeyValueStore>,
}

impl AnimeRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns `Ok(None)` when nothing has been cached for `id` yet.
    pub async fn get(&self, id: AnimeId) -> Result<Option<Anime>, StoreError> {
        match self.store.get(ANIME_COLLECTION, &id.to_string()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, anime: &Anime) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(anime)?;
        self.store
            .put(ANIME_COLLECTION, &anime.id.to_string(), &bytes)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn save_then_get() {
        let store = Arc::new(MemoryStore::new());
        let repo = AnimeRepository::new(store.clone());

        let mut anime = Anime::new(AnimeId::new(12));
        anime.title = "Title".to_string();
        anime.synopsis = Some(String::new());
        repo.save(&anime).await.unwrap();

        let loaded = repo.get(AnimeId::new(12)).await.unwrap().unwrap();
        assert_eq!(loaded, anime);

        let raw = store.get(ANIME_COLLECTION, "12").await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["title"], "Title");
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let repo = AnimeRepository::new(Arc::new(MemoryStore::new()));
        assert!(repo.get(AnimeId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_a_codec_error() {
        let store = Arc::new(MemoryStore::new());
        store.put(ANIME_COLLECTION, "5", b"not json").await.unwrap();

        let repo = AnimeRepository::new(store);
        let err = repo.get(AnimeId::new(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }
}
