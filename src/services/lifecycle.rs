//! Freshness and completeness policy for cached anime records.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::db::{AnimeRepository, StoreError};
use crate::domain::AnimeId;
use crate::models::Anime;

/// How a write affects the record's expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    /// A full refresh: starts a new TTL window unless the current one is still running.
    Refresh,
    /// An incremental merge (stubs, watches): expiry is left as is.
    Incremental,
}

impl Anime {
    /// Every enrichment field is present and the upstream detail id is known.
    #[must_use]
    pub fn is_data_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of the fields that keep this record from being complete.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.post_id.is_none() {
            missing.push("post_id");
        }
        if !self.id.is_assigned() {
            missing.push("id");
        }

        for (name, value) in [
            ("title", &self.title),
            ("slug", &self.slug),
            ("cover_url", &self.cover_url),
        ] {
            if value.is_empty() {
                missing.push(name);
            }
        }

        for (name, value) in [
            ("synopsis", &self.synopsis),
            ("trailer_url", &self.trailer_url),
            ("total_episodes", &self.total_episodes),
            ("studio", &self.studio),
            ("season", &self.season),
            ("release_date", &self.release_date),
            ("status", &self.status),
            ("score", &self.score),
            ("duration", &self.duration),
        ] {
            if value.is_none() {
                missing.push(name);
            }
        }

        if self.genres.is_none() {
            missing.push("genres");
        }

        missing
    }

    #[must_use]
    pub fn is_cache_expired(&self) -> bool {
        self.is_cache_expired_at(Utc::now())
    }

    /// Unset counts as expired so never-refreshed records are always stale.
    #[must_use]
    pub fn is_cache_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.cache_expire_at.is_none_or(|at| at <= now)
    }
}

/// Loads records and persists them together with their expiry bookkeeping.
#[derive(Clone)]
pub struct CacheLifecycle {
    repo: AnimeRepository,
    ttl: TimeDelta,
}

impl CacheLifecycle {
    #[must_use]
    pub const fn new(repo: AnimeRepository, ttl: TimeDelta) -> Self {
        Self { repo, ttl }
    }

    pub async fn load(&self, id: AnimeId) -> Result<Option<Anime>, StoreError> {
        self.repo.get(id).await
    }

    pub async fn touch(&self, anime: &mut Anime, mode: TouchMode) -> Result<(), StoreError> {
        self.touch_at(anime, mode, Utc::now()).await
    }

    /// Updates the expiry per `mode`, then writes the whole record.
    ///
    /// A still-valid expiry is never shortened.
    pub async fn touch_at(
        &self,
        anime: &mut Anime,
        mode: TouchMode,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if mode == TouchMode::Refresh && anime.is_cache_expired_at(now) {
            anime.cache_expire_at = Some(now + self.ttl);
        }

        self.repo.save(anime).await?;
        debug!(anime_id = %anime.id, ?mode, expire_at = ?anime.cache_expire_at, "Anime persisted");
        Ok(())
    }
}
