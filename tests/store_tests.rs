use animenya::db::{ANIME_COLLECTION, AnimeRepository, FileStore, KeyValueStore};
use animenya::domain::{AnimeId, EpisodeId};
use animenya::models::{Anime, Episode};
use animenya::services::{CacheLifecycle, TouchMode};
use chrono::TimeDelta;
use std::path::PathBuf;
use std::sync::Arc;

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("animenya-it-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_record_survives_a_new_store_instance() {
    let root = temp_root();

    let mut anime = Anime::new(AnimeId::new(5));
    anime.title = "Sousou no Frieren".to_string();
    anime.synopsis = Some(String::new());
    anime.episodes = vec![Episode {
        id: EpisodeId::new(101),
        slug: "sousou-no-frieren-episode-1".to_string(),
        episode: "1".to_string(),
        ..Episode::default()
    }];

    {
        let store = Arc::new(FileStore::new(&root, "animenya"));
        let lifecycle = CacheLifecycle::new(AnimeRepository::new(store), TimeDelta::days(3));
        lifecycle.touch(&mut anime, TouchMode::Refresh).await.unwrap();
    }

    assert!(root.join(ANIME_COLLECTION).join("5.animenya").exists());

    let store = Arc::new(FileStore::new(&root, "animenya"));
    let lifecycle = CacheLifecycle::new(AnimeRepository::new(store), TimeDelta::days(3));
    let loaded = lifecycle.load(AnimeId::new(5)).await.unwrap().unwrap();

    assert_eq!(loaded, anime);
    assert_eq!(loaded.synopsis.as_deref(), Some(""));
    assert!(!loaded.is_cache_expired());

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_stored_form_omits_absent_fields() {
    let root = temp_root();
    let store = Arc::new(FileStore::new(&root, "animenya"));
    let repo = AnimeRepository::new(store.clone());

    repo.save(&Anime::new(AnimeId::new(9))).await.unwrap();

    let bytes = store.get(ANIME_COLLECTION, "9").await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let obj = json.as_object().unwrap();
    assert!(!obj.contains_key("synopsis"));
    assert!(!obj.contains_key("cache_expire_at"));
    assert!(obj.values().all(|v| !v.is_null()));

    std::fs::remove_dir_all(&root).unwrap();
}
