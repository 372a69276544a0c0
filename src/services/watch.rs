//! Lazy resolution of an episode's streaming mirrors.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::ContentFetcher;
use crate::domain::EpisodeId;
use crate::models::{Anime, Watch};
use crate::services::catalog_service::CatalogError;
use crate::services::lifecycle::{CacheLifecycle, TouchMode};

#[derive(Clone)]
pub struct WatchResolver {
    fetcher: Arc<dyn ContentFetcher>,
    lifecycle: CacheLifecycle,
}

impl WatchResolver {
    #[must_use]
    pub fn new(fetcher: Arc<dyn ContentFetcher>, lifecycle: CacheLifecycle) -> Self {
        Self { fetcher, lifecycle }
    }

    pub async fn resolve(
        &self,
        anime: &mut Anime,
        episode_id: EpisodeId,
    ) -> Result<Vec<Watch>, CatalogError> {
        self.resolve_at(anime, episode_id, Utc::now()).await
    }

    /// Returns the episode's watches, fetching them when absent or when the
    /// anime has expired.
    ///
    /// Fetched watches are attached and persisted as an incremental write, so
    /// the anime's own expiry is not renewed. On any failure the episode keeps
    /// whatever watches it had before.
    pub async fn resolve_at(
        &self,
        anime: &mut Anime,
        episode_id: EpisodeId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Watch>, CatalogError> {
        let expired = anime.is_cache_expired_at(now);
        let anime_id = anime.id;

        let episode = anime
            .episode(episode_id)
            .ok_or(CatalogError::EpisodeNotFound {
                anime_id,
                episode_id,
            })?;

        if !expired
            && let Some(watches) = episode.watches.as_ref().filter(|w| !w.is_empty())
        {
            return Ok(watches.clone());
        }

        let slug = episode.slug.clone();
        let watches = self.fetcher.episode_watches(episode_id, &slug).await?;
        if watches.is_empty() {
            return Err(CatalogError::NoWatchFound(episode_id));
        }

        let previous = anime
            .episode_mut(episode_id)
            .and_then(|e| e.watches.replace(watches.clone()));

        if let Err(e) = self.lifecycle.touch(anime, TouchMode::Incremental).await {
            if let Some(episode) = anime.episode_mut(episode_id) {
                episode.watches = previous;
            }
            return Err(e.into());
        }

        info!(%anime_id, %episode_id, count = watches.len(), "Resolved watch sources");
        Ok(watches)
    }

    /// Resolves each episode in turn. One episode failing does not stop the rest.
    pub async fn resolve_batch(
        &self,
        anime: &mut Anime,
        episode_ids: &[EpisodeId],
    ) -> Vec<(EpisodeId, Result<Vec<Watch>, CatalogError>)> {
        let mut results = Vec::with_capacity(episode_ids.len());

        for &episode_id in episode_ids {
            let result = self.resolve(anime, episode_id).await;
            if let Err(e) = &result {
                warn!(anime_id = %anime.id, %episode_id, error = %e, "Watch resolution failed");
            }
            results.push((episode_id, result));
        }

        results
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clients::{CoverImage, FetchError};
    use crate::db::{AnimeRepository, KeyValueStore, MemoryStore, StoreError};
    use crate::domain::AnimeId;
    use crate::models::{AnimeRef, Episode};
    use chrono::TimeDelta;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted fetcher that records every call it receives.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pub latest: Vec<Episode>,
        pub by_anime: HashMap<AnimeId, Vec<Episode>>,
        pub by_slug: HashMap<String, Anime>,
        pub by_post_id: HashMap<i64, Anime>,
        pub watches: HashMap<EpisodeId, Vec<Watch>>,
        pub search_hits: Vec<AnimeRef>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl ContentFetcher for FakeFetcher {
        async fn latest_episodes(&self, page: Option<u32>) -> Result<Vec<Episode>, FetchError> {
            self.record(format!("latest:{page:?}"));
            Ok(self.latest.clone())
        }

        async fn episodes_by_anime(&self, anime_id: AnimeId) -> Result<Vec<Episode>, FetchError> {
            self.record(format!("episodes:{anime_id}"));
            self.by_anime
                .get(&anime_id)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(format!("categories={anime_id}")))
        }

        async fn anime_by_slug(&self, slug: &str) -> Result<Anime, FetchError> {
            self.record(format!("slug:{slug}"));
            self.by_slug
                .get(slug)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(format!("anime/{slug}")))
        }

        async fn anime_by_post_id(&self, post_id: i64) -> Result<Anime, FetchError> {
            self.record(format!("post:{post_id}"));
            self.by_post_id
                .get(&post_id)
                .cloned()
                .ok_or(FetchError::Status {
                    status: 500,
                    url: format!("apk/anime/?id={post_id}"),
                })
        }

        async fn episode_watches(
            &self,
            episode_id: EpisodeId,
            _episode_slug: &str,
        ) -> Result<Vec<Watch>, FetchError> {
            self.record(format!("watches:{episode_id}"));
            Ok(self.watches.get(&episode_id).cloned().unwrap_or_default())
        }

        async fn search(&self, query: &str) -> Result<Vec<AnimeRef>, FetchError> {
            self.record(format!("search:{query}"));
            Ok(self.search_hits.clone())
        }

        async fn cover(&self, url: &str) -> Result<CoverImage, FetchError> {
            self.record(format!("cover:{url}"));
            Ok(CoverImage {
                bytes: b"jpeg".to_vec(),
                content_type: "image/jpeg".to_string(),
            })
        }
    }

    pub(crate) fn watch(id: u32, source: &str) -> Watch {
        Watch {
            id,
            source: source.to_string(),
            stream_url: format!("https://{}.test/stream", source.to_lowercase()),
        }
    }

    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }

        async fn put(&self, _: &str, _: &str, _: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
    }

    fn anime_with_episode(expire_at: Option<DateTime<Utc>>) -> Anime {
        let mut anime = Anime::new(AnimeId::new(5));
        anime.cache_expire_at = expire_at;
        anime.episodes = vec![Episode {
            id: EpisodeId::new(7),
            slug: "x-episode-7".to_string(),
            episode: "7".to_string(),
            ..Episode::default()
        }];
        anime
    }

    fn resolver(fetcher: Arc<FakeFetcher>) -> (WatchResolver, AnimeRepository) {
        let repo = AnimeRepository::new(Arc::new(MemoryStore::new()));
        let lifecycle = CacheLifecycle::new(repo.clone(), TimeDelta::days(3));
        (WatchResolver::new(fetcher, lifecycle), repo)
    }

    #[tokio::test]
    async fn second_resolution_uses_cached_watches() {
        let mut fake = FakeFetcher::default();
        fake.watches
            .insert(EpisodeId::new(7), vec![watch(1, "A"), watch(2, "B")]);
        let fetcher = Arc::new(fake);
        let (resolver, repo) = resolver(fetcher.clone());

        let now = Utc::now();
        let expire_at = now + TimeDelta::days(1);
        let mut anime = anime_with_episode(Some(expire_at));

        let first = resolver
            .resolve_at(&mut anime, EpisodeId::new(7), now)
            .await
            .unwrap();
        let second = resolver
            .resolve_at(&mut anime, EpisodeId::new(7), now)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), vec!["watches:7"]);
        assert_eq!(anime.cache_expire_at, Some(expire_at));

        let stored = repo.get(AnimeId::new(5)).await.unwrap().unwrap();
        assert_eq!(stored.episode(EpisodeId::new(7)).unwrap().watches, Some(first));
    }

    #[tokio::test]
    async fn expired_anime_refetches_watches() {
        let mut fake = FakeFetcher::default();
        fake.watches.insert(EpisodeId::new(7), vec![watch(1, "New")]);
        let fetcher = Arc::new(fake);
        let (resolver, _) = resolver(fetcher.clone());

        let mut anime = anime_with_episode(None);
        anime.episodes[0].watches = Some(vec![watch(1, "Old")]);

        let watches = resolver.resolve(&mut anime, EpisodeId::new(7)).await.unwrap();

        assert_eq!(watches[0].source, "New");
        assert_eq!(fetcher.calls().len(), 1);
        assert!(anime.cache_expire_at.is_none());
    }

    #[tokio::test]
    async fn zero_watches_is_an_error_and_leaves_state() {
        let fetcher = Arc::new(FakeFetcher::default());
        let (resolver, repo) = resolver(fetcher);

        let mut anime = anime_with_episode(None);
        let result = resolver.resolve(&mut anime, EpisodeId::new(7)).await;

        assert!(matches!(result, Err(CatalogError::NoWatchFound(id)) if id == EpisodeId::new(7)));
        assert!(anime.episodes[0].watches.is_none());
        assert!(repo.get(AnimeId::new(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_episode_is_not_found() {
        let fetcher = Arc::new(FakeFetcher::default());
        let (resolver, _) = resolver(fetcher.clone());

        let mut anime = anime_with_episode(None);
        let result = resolver.resolve(&mut anime, EpisodeId::new(99)).await;

        assert!(matches!(result, Err(CatalogError::EpisodeNotFound { .. })));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_restores_previous_watches() {
        let mut fake = FakeFetcher::default();
        fake.watches.insert(EpisodeId::new(7), vec![watch(1, "New")]);
        let repo = AnimeRepository::new(Arc::new(ReadOnlyStore));
        let resolver = WatchResolver::new(
            Arc::new(fake),
            CacheLifecycle::new(repo, TimeDelta::days(3)),
        );

        let mut anime = anime_with_episode(None);
        anime.episodes[0].watches = Some(vec![watch(1, "Old")]);

        let result = resolver.resolve(&mut anime, EpisodeId::new(7)).await;

        assert!(matches!(result, Err(CatalogError::Persistence(_))));
        assert_eq!(anime.episodes[0].watches, Some(vec![watch(1, "Old")]));
    }

    #[tokio::test]
    async fn batch_continues_past_failures() {
        let mut fake = FakeFetcher::default();
        fake.watches.insert(EpisodeId::new(8), vec![watch(1, "A")]);
        let (resolver, _) = resolver(Arc::new(fake));

        let mut anime = anime_with_episode(None);
        anime.episodes.insert(
            0,
            Episode {
                id: EpisodeId::new(8),
                slug: "x-episode-8".to_string(),
                episode: "8".to_string(),
                ..Episode::default()
            },
        );

        let results = resolver
            .resolve_batch(&mut anime, &[EpisodeId::new(7), EpisodeId::new(8)])
            .await;

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].1, Err(CatalogError::NoWatchFound(_))));
        assert!(results[1].1.is_ok());
        assert!(anime.episode(EpisodeId::new(8)).unwrap().has_watches());
    }
}
