//! Merging freshly fetched partial records into the cached entity.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::StoreError;
use crate::models::Anime;
use crate::services::episodes;
use crate::services::lifecycle::{CacheLifecycle, TouchMode};

/// Overwrites `target` with every field `fetched` actually carries.
///
/// Options overwrite when `Some`, including `Some("")`. The plain string
/// fields only overwrite when non-empty, so a partial fetch never erases
/// data learned earlier. Episodes are not touched here.
pub fn merge_fields(target: &mut Anime, fetched: &Anime) {
    if !target.id.is_assigned() && fetched.id.is_assigned() {
        target.id = fetched.id;
    }

    for (dst, src) in [
        (&mut target.title, &fetched.title),
        (&mut target.slug, &fetched.slug),
        (&mut target.cover_url, &fetched.cover_url),
    ] {
        if !src.is_empty() {
            dst.clone_from(src);
        }
    }

    if fetched.post_id.is_some() {
        target.post_id = fetched.post_id;
    }

    for (dst, src) in [
        (&mut target.synopsis, &fetched.synopsis),
        (&mut target.trailer_url, &fetched.trailer_url),
        (&mut target.total_episodes, &fetched.total_episodes),
        (&mut target.studio, &fetched.studio),
        (&mut target.season, &fetched.season),
        (&mut target.release_date, &fetched.release_date),
        (&mut target.status, &fetched.status),
        (&mut target.score, &fetched.score),
        (&mut target.duration, &fetched.duration),
    ] {
        if src.is_some() {
            dst.clone_from(src);
        }
    }

    if fetched.genres.is_some() {
        target.genres.clone_from(&fetched.genres);
    }
}

/// Combines the two detail fetches: `second` is layered on top of `first`.
#[must_use]
pub fn layer(mut first: Anime, second: &Anime) -> Anime {
    merge_fields(&mut first, second);
    episodes::replace(&mut first.episodes, &second.episodes);
    first
}

#[derive(Clone)]
pub struct Reconciler {
    lifecycle: CacheLifecycle,
}

impl Reconciler {
    #[must_use]
    pub const fn new(lifecycle: CacheLifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn update(&self, cached: Option<Anime>, fetched: Anime) -> Result<Anime, StoreError> {
        self.update_at(cached, fetched, Utc::now()).await
    }

    /// Produces the record to persist and return.
    ///
    /// A cached record that is complete and fresh is returned untouched and
    /// nothing is written. Otherwise the fetched fields are merged in, a
    /// non-empty fetched episode list replaces the cached one, and the result
    /// is persisted as a full refresh.
    pub async fn update_at(
        &self,
        cached: Option<Anime>,
        fetched: Anime,
        now: DateTime<Utc>,
    ) -> Result<Anime, StoreError> {
        if let Some(cached) = &cached
            && cached.is_data_complete()
            && !cached.is_cache_expired_at(now)
        {
            debug!(anime_id = %cached.id, "Cached anime complete and fresh, skipping merge");
            return Ok(cached.clone());
        }

        let mut anime = cached.unwrap_or_else(|| Anime::new(fetched.id));
        merge_fields(&mut anime, &fetched);
        if episodes::replace(&mut anime.episodes, &fetched.episodes) {
            anime.episodes = episodes::reorder(std::mem::take(&mut anime.episodes));
        }

        self.lifecycle
            .touch_at(&mut anime, TouchMode::Refresh, now)
            .await?;

        debug!(
            anime_id = %anime.id,
            complete = anime.is_data_complete(),
            episodes = anime.episodes.len(),
            "Anime reconciled"
        );
        Ok(anime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AnimeRepository, KeyValueStore, MemoryStore};
    use crate::domain::{AnimeId, EpisodeId};
    use crate::models::{Episode, Watch};
    use crate::services::lifecycle::tests::complete_anime;
    use chrono::TimeDelta;
    use std::sync::Arc;

    struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }

        async fn put(&self, _: &str, _: &str, _: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    fn reconciler() -> (Reconciler, AnimeRepository) {
        let repo = AnimeRepository::new(Arc::new(MemoryStore::new()));
        let lifecycle = CacheLifecycle::new(repo.clone(), TimeDelta::days(3));
        (Reconciler::new(lifecycle), repo)
    }

    fn episode(id: i64) -> Episode {
        Episode {
            id: EpisodeId::new(id),
            slug: format!("x-episode-{id}"),
            episode: id.to_string(),
            ..Episode::default()
        }
    }

    #[tokio::test]
    async fn fresh_fetch_into_empty_cache_is_complete_and_persisted() {
        let (reconciler, repo) = reconciler();
        let now = Utc::now();

        let anime = reconciler
            .update_at(None, complete_anime(5), now)
            .await
            .unwrap();

        assert_eq!(anime.id, AnimeId::new(5));
        assert!(anime.is_data_complete());
        assert!(!anime.is_cache_expired_at(now));
        assert_eq!(anime.cache_expire_at, Some(now + TimeDelta::days(3)));

        let stored = repo.get(AnimeId::new(5)).await.unwrap().unwrap();
        assert_eq!(stored, anime);
    }

    #[tokio::test]
    async fn reapplying_the_same_fetch_is_idempotent() {
        let (reconciler, _) = reconciler();
        let now = Utc::now();

        let mut partial = Anime::new(AnimeId::new(5));
        partial.title = "X".to_string();
        partial.synopsis = Some("s".to_string());
        partial.episodes = vec![episode(1), episode(2)];

        let first = reconciler
            .update_at(None, partial.clone(), now)
            .await
            .unwrap();
        let second = reconciler
            .update_at(Some(first.clone()), partial, now)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn partial_fetch_never_erases_known_fields() {
        let (reconciler, _) = reconciler();

        let mut cached = complete_anime(5);
        cached.post_id = None;
        cached.episodes = vec![episode(3)];

        let mut fetched = Anime::new(AnimeId::new(5));
        fetched.status = Some("Ongoing".to_string());
        fetched.synopsis = Some(String::new());

        let anime = reconciler.update(Some(cached), fetched).await.unwrap();

        assert_eq!(anime.title, "X");
        assert_eq!(anime.slug, "x");
        assert_eq!(anime.cover_url, "c");
        assert_eq!(anime.studio.as_deref(), Some("St"));
        assert_eq!(anime.status.as_deref(), Some("Ongoing"));
        assert_eq!(anime.synopsis.as_deref(), Some(""));
        assert_eq!(anime.episodes.len(), 1);
    }

    #[tokio::test]
    async fn complete_and_fresh_cache_short_circuits() {
        let (reconciler, repo) = reconciler();
        let now = Utc::now();

        let mut cached = complete_anime(5);
        cached.cache_expire_at = Some(now + TimeDelta::days(1));

        let mut fetched = complete_anime(5);
        fetched.title = "Renamed".to_string();

        let anime = reconciler
            .update_at(Some(cached.clone()), fetched, now)
            .await
            .unwrap();

        assert_eq!(anime, cached);
        assert!(repo.get(AnimeId::new(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_complete_cache_is_refreshed() {
        let (reconciler, _) = reconciler();
        let now = Utc::now();

        let mut cached = complete_anime(5);
        cached.cache_expire_at = Some(now - TimeDelta::minutes(1));

        let mut fetched = Anime::new(AnimeId::new(5));
        fetched.title = "Renamed".to_string();

        let anime = reconciler
            .update_at(Some(cached), fetched, now)
            .await
            .unwrap();

        assert_eq!(anime.title, "Renamed");
        assert_eq!(anime.cache_expire_at, Some(now + TimeDelta::days(3)));
    }

    #[tokio::test]
    async fn detail_episode_list_replaces_stub_list() {
        let (reconciler, _) = reconciler();

        let mut cached = Anime::new(AnimeId::new(5));
        let mut seven = episode(7);
        seven.watches = Some(vec![Watch {
            id: 1,
            source: "Mirror".to_string(),
            stream_url: "https://m.test/7".to_string(),
        }]);
        cached.episodes = vec![seven, episode(6)];

        let mut fetched = Anime::new(AnimeId::new(5));
        fetched.episodes = vec![episode(6), episode(8), episode(7)];

        let anime = reconciler.update(Some(cached), fetched).await.unwrap();

        let ids: Vec<i64> = anime.episodes.iter().map(|e| e.id.value()).collect();
        assert_eq!(ids, vec![8, 7, 6]);
        assert!(anime.episode(EpisodeId::new(7)).unwrap().watches.is_none());
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let repo = AnimeRepository::new(Arc::new(BrokenStore));
        let reconciler = Reconciler::new(CacheLifecycle::new(repo, TimeDelta::days(3)));

        let result = reconciler.update(None, complete_anime(5)).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn layer_puts_second_step_on_top() {
        let mut first = Anime::new(AnimeId::new(5));
        first.slug = "x".to_string();
        first.post_id = Some(77);
        first.studio = Some("St".to_string());

        let mut second = Anime::default();
        second.title = "X".to_string();
        second.studio = Some("Other".to_string());
        second.episodes = vec![episode(1)];

        let layered = layer(first, &second);
        assert_eq!(layered.id, AnimeId::new(5));
        assert_eq!(layered.slug, "x");
        assert_eq!(layered.post_id, Some(77));
        assert_eq!(layered.title, "X");
        assert_eq!(layered.studio.as_deref(), Some("Other"));
        assert_eq!(layered.episodes.len(), 1);
    }
}
