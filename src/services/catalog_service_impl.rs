use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::clients::ContentFetcher;
use crate::db::AnimeRepository;
use crate::domain::{AnimeId, EpisodeId};
use crate::models::{Anime, AnimeRef, Episode, SimpleAnime};
use crate::services::catalog_service::{CatalogError, CatalogService, Cover, WatchReport};
use crate::services::episodes;
use crate::services::lifecycle::{CacheLifecycle, TouchMode};
use crate::services::reconcile::{Reconciler, layer};
use crate::services::watch::WatchResolver;

/// Folds a denormalized anime stub into a record.
///
/// Title and cover only fill gaps, the detail fetch owns them. The slug is
/// taken whenever the stub has one, since category links carry the corrected slug.
fn absorb_ref(anime: &mut Anime, anime_ref: &AnimeRef) {
    if !anime.id.is_assigned() {
        anime.id = anime_ref.id;
    }
    if anime.title.is_empty() {
        anime.title.clone_from(&anime_ref.title);
    }
    if anime.cover_url.is_empty() {
        anime.cover_url.clone_from(&anime_ref.cover_url);
    }
    if !anime_ref.slug.is_empty() {
        anime.slug.clone_from(&anime_ref.slug);
    }
}

/// Feed entries grouped per anime, in order of first appearance.
fn group_by_anime(feed: &[Episode]) -> Vec<(&AnimeRef, Vec<&Episode>)> {
    let mut groups: Vec<(&AnimeRef, Vec<&Episode>)> = Vec::new();
    let mut index: HashMap<AnimeId, usize> = HashMap::new();

    for stub in feed {
        let Some(anime_ref) = stub.anime.as_ref().filter(|a| a.id.is_assigned()) else {
            continue;
        };
        let slot = *index.entry(anime_ref.id).or_insert_with(|| {
            groups.push((anime_ref, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(stub);
    }

    groups
}

fn record_lookup(cached: Option<&Anime>) {
    let outcome = match cached {
        None => "missing",
        Some(a) if a.is_data_complete() && !a.is_cache_expired() => "fresh",
        Some(_) => "stale",
    };
    metrics::counter!("cache_lookups_total", "outcome" => outcome).increment(1);
}

pub struct DefaultCatalogService {
    fetcher: Arc<dyn ContentFetcher>,
    lifecycle: CacheLifecycle,
    reconciler: Reconciler,
    watches: WatchResolver,
}

impl DefaultCatalogService {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        repo: AnimeRepository,
        ttl: chrono::TimeDelta,
    ) -> Self {
        let lifecycle = CacheLifecycle::new(repo, ttl);
        Self {
            reconciler: Reconciler::new(lifecycle.clone()),
            watches: WatchResolver::new(fetcher.clone(), lifecycle.clone()),
            fetcher,
            lifecycle,
        }
    }

    /// Two-step detail fetch. The slug step is required; the post-id step
    /// only runs when the first yielded an id, and its failure degrades to
    /// the first step's partial.
    async fn fetch_detail(&self, anime_id: AnimeId, slug: &str) -> Result<Anime, CatalogError> {
        let first = self.fetcher.anime_by_slug(slug).await?;

        let Some(post_id) = first.post_id else {
            return Ok(first);
        };

        match self.fetcher.anime_by_post_id(post_id).await {
            Ok(second) => Ok(layer(first, &second)),
            Err(e) => {
                warn!(%anime_id, post_id, error = %e, "Detail fetch by post id failed, keeping page data");
                Ok(first)
            }
        }
    }

    /// Loads, merges the current episode listing and refreshes when needed.
    /// The returned record still carries its expiry.
    async fn refresh(&self, anime_id: AnimeId) -> Result<Anime, CatalogError> {
        let cached = self.lifecycle.load(anime_id).await?;
        record_lookup(cached.as_ref());

        let stubs = match self.fetcher.episodes_by_anime(anime_id).await {
            Ok(stubs) => stubs,
            Err(e) if e.is_not_found() => return Err(CatalogError::AnimeNotFound(anime_id)),
            Err(e) => return Err(e.into()),
        };

        let mut anime = cached.unwrap_or_else(|| Anime::new(anime_id));
        if let Some(anime_ref) = stubs.first().and_then(|s| s.anime.as_ref()) {
            absorb_ref(&mut anime, anime_ref);
        }

        if anime.slug.is_empty() {
            debug!(%anime_id, "No episodes listed and no cached slug");
            return Err(CatalogError::AnimeNotFound(anime_id));
        }

        episodes::merge_stubs(&mut anime.episodes, &stubs);
        anime.episodes = episodes::reorder(std::mem::take(&mut anime.episodes));

        if anime.is_data_complete() && !anime.is_cache_expired() {
            self.lifecycle.touch(&mut anime, TouchMode::Incremental).await?;
            return Ok(anime);
        }

        info!(
            %anime_id,
            slug = %anime.slug,
            missing = ?anime.missing_fields(),
            "Refreshing anime from upstream"
        );
        let slug = anime.slug.clone();
        let fetched = self.fetch_detail(anime_id, &slug).await?;
        Ok(self.reconciler.update(Some(anime), fetched).await?)
    }

    /// Cached record if it already lists `episode_id`, else a refreshed one.
    async fn load_for_episode(
        &self,
        anime_id: AnimeId,
        episode_id: EpisodeId,
    ) -> Result<Anime, CatalogError> {
        if let Some(anime) = self.lifecycle.load(anime_id).await?
            && anime.episode(episode_id).is_some()
        {
            return Ok(anime);
        }
        self.refresh(anime_id).await
    }

    async fn upsert_stub(&self, anime_ref: &AnimeRef, stubs: &[&Episode]) -> Result<(), CatalogError> {
        let mut anime = self
            .lifecycle
            .load(anime_ref.id)
            .await?
            .unwrap_or_else(|| Anime::new(anime_ref.id));

        absorb_ref(&mut anime, anime_ref);
        if episodes::merge_stubs(&mut anime.episodes, stubs.iter().copied()) > 0 {
            anime.episodes = episodes::reorder(std::mem::take(&mut anime.episodes));
        }

        self.lifecycle.touch(&mut anime, TouchMode::Incremental).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogService for DefaultCatalogService {
    #[instrument(skip(self))]
    async fn latest(&self, page: Option<u32>) -> Result<Vec<Episode>, CatalogError> {
        let feed = self.fetcher.latest_episodes(page).await?;

        for (anime_ref, stubs) in group_by_anime(&feed) {
            if let Err(e) = self.upsert_stub(anime_ref, &stubs).await {
                warn!(anime_id = %anime_ref.id, error = %e, "Failed to merge feed entries, skipping anime");
            }
        }

        Ok(feed)
    }

    #[instrument(skip(self))]
    async fn anime(&self, id: AnimeId) -> Result<Anime, CatalogError> {
        Ok(self.refresh(id).await?.into_public())
    }

    #[instrument(skip(self))]
    async fn episode(
        &self,
        anime_id: AnimeId,
        episode_id: EpisodeId,
    ) -> Result<Episode, CatalogError> {
        let mut anime = self.load_for_episode(anime_id, episode_id).await?;
        self.watches.resolve(&mut anime, episode_id).await?;

        let episode = anime
            .episode(episode_id)
            .ok_or(CatalogError::EpisodeNotFound {
                anime_id,
                episode_id,
            })?;

        Ok(Episode {
            anime: Some(anime.to_ref()),
            ..episode.clone()
        })
    }

    #[instrument(skip(self))]
    async fn resolve_watches(&self, anime_id: AnimeId) -> Result<WatchReport, CatalogError> {
        let mut anime = self.refresh(anime_id).await?;
        let ids: Vec<EpisodeId> = anime.episodes.iter().map(|e| e.id).collect();

        let mut report = WatchReport::default();
        for (episode_id, result) in self.watches.resolve_batch(&mut anime, &ids).await {
            match result {
                Ok(_) => report.resolved.push(episode_id),
                Err(e) => report.failed.push((episode_id, e.to_string())),
            }
        }

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SimpleAnime>, CatalogError> {
        let hits = self.fetcher.search(query).await?;

        for hit in &hits {
            if let Err(e) = self.upsert_stub(hit, &[]).await {
                warn!(anime_id = %hit.id, error = %e, "Failed to cache search hit");
            }
        }

        Ok(hits
            .into_iter()
            .map(|hit| SimpleAnime {
                id: hit.id,
                cover_url: hit.cover_url,
                title: hit.title,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn cover(&self, anime_id: AnimeId) -> Result<Cover, CatalogError> {
        let anime = match self.lifecycle.load(anime_id).await? {
            Some(anime) if !anime.cover_url.is_empty() => anime,
            _ => self.refresh(anime_id).await?,
        };

        if anime.cover_url.is_empty() {
            return Err(CatalogError::UpstreamNotFound(format!("cover of anime {anime_id}")));
        }

        let image = self.fetcher.cover(&anime.cover_url).await?;
        Ok(Cover {
            image,
            complete: anime.is_data_complete(),
        })
    }
}
