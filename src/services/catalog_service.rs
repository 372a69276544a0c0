//! Domain service for the anime catalog.
//!
//! This module provides the [`CatalogService`] trait: the request-level flows
//! that combine cache lookups, upstream fetches and reconciliation.

use thiserror::Error;

use crate::clients::{CoverImage, FetchError};
use crate::db::StoreError;
use crate::domain::{AnimeId, EpisodeId};
use crate::models::{Anime, Episode, SimpleAnime};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Anime {0} not found")]
    AnimeNotFound(AnimeId),

    #[error("Episode {episode_id} of anime {anime_id} not found")]
    EpisodeNotFound {
        anime_id: AnimeId,
        episode_id: EpisodeId,
    },

    #[error("No watch source found for episode {0}")]
    NoWatchFound(EpisodeId),

    #[error("Upstream resource not found: {0}")]
    UpstreamNotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(#[source] FetchError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<FetchError> for CatalogError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(resource) => Self::UpstreamNotFound(resource),
            other => Self::Upstream(other),
        }
    }
}

/// Cover bytes plus whether the owning record is complete, which decides how
/// long clients may cache the image.
#[derive(Debug, Clone)]
pub struct Cover {
    pub image: CoverImage,
    pub complete: bool,
}

/// Outcome of resolving the watches of every episode of one anime.
#[derive(Debug, Clone, Default)]
pub struct WatchReport {
    pub resolved: Vec<EpisodeId>,
    pub failed: Vec<(EpisodeId, String)>,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// Newest episodes across all anime. Every stub is folded into its
    /// anime's cached record; a failure for one anime only skips that anime.
    ///
    /// # Errors
    ///
    /// - Returns [`CatalogError::Upstream`] when the feed itself cannot be fetched
    async fn latest(&self, page: Option<u32>) -> Result<Vec<Episode>, CatalogError>;

    /// Full record of one anime, refreshed from upstream when incomplete or expired.
    ///
    /// # Errors
    ///
    /// - Returns [`CatalogError::AnimeNotFound`] if upstream has no such anime
    /// - Returns [`CatalogError::Upstream`] if the detail fetch fails
    /// - Returns [`CatalogError::Persistence`] if the store cannot be read or written
    async fn anime(&self, id: AnimeId) -> Result<Anime, CatalogError>;

    /// One episode with its watches resolved and an anime back-reference.
    ///
    /// # Errors
    ///
    /// - Returns [`CatalogError::EpisodeNotFound`] if the anime has no such episode
    /// - Returns [`CatalogError::NoWatchFound`] if upstream lists no mirror
    async fn episode(
        &self,
        anime_id: AnimeId,
        episode_id: EpisodeId,
    ) -> Result<Episode, CatalogError>;

    /// Resolves watches for every episode of an anime; per-episode failures
    /// are reported, not raised.
    async fn resolve_watches(&self, anime_id: AnimeId) -> Result<WatchReport, CatalogError>;

    async fn search(&self, query: &str) -> Result<Vec<SimpleAnime>, CatalogError>;

    async fn cover(&self, anime_id: AnimeId) -> Result<Cover, CatalogError>;
}
