use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnimeId, EpisodeId};
use crate::models::episode::Episode;

/// Canonical cached record for one title.
///
/// Every enrichment field is an `Option` so that "never fetched" (`None`) and
/// "fetched, upstream value is empty" (`Some(String::new())`) stay distinct.
/// Absent options are omitted from the serialized form instead of being
/// written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anime {
    pub id: AnimeId,

    /// Upstream detail identifier (the anime page's post id), needed for the
    /// second detail fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub cover_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, alias = "genre", skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,

    /// Unique by episode id. Embedded episodes never carry an anime back-reference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<Episode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_expire_at: Option<DateTime<Utc>>,
}

impl Anime {
    #[must_use]
    pub fn new(id: AnimeId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn episode(&self, id: EpisodeId) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == id)
    }

    pub fn episode_mut(&mut self, id: EpisodeId) -> Option<&mut Episode> {
        self.episodes.iter_mut().find(|e| e.id == id)
    }

    /// Short reference used as the back-pointer on a standalone episode.
    #[must_use]
    pub fn to_ref(&self) -> AnimeRef {
        AnimeRef {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            cover_url: self.cover_url.clone(),
        }
    }

    /// Copy safe to hand to API consumers: the cache bookkeeping is removed.
    #[must_use]
    pub fn into_public(mut self) -> Self {
        self.cache_expire_at = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    pub slug: String,
}

/// Minimal, denormalized view of an anime.
///
/// List endpoints attach one to every stub episode, and a standalone episode
/// returned to a caller uses one as its (non-owning) back-reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeRef {
    pub id: AnimeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub cover_url: String,
}

/// Search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleAnime {
    pub id: AnimeId,
    pub cover_url: String,
    pub title: String,
}
