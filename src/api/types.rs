use serde::Serialize;

use crate::models::{AnimeRef, Episode, SimpleAnime};

/// Envelope every JSON endpoint answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Rewrites upstream cover URLs so clients load covers through this API.
#[derive(Debug, Clone)]
pub struct CoverLinks {
    base: String,
}

impl CoverLinks {
    #[must_use]
    pub fn new(public_url: &str) -> Self {
        Self {
            base: public_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn url(&self, anime_id: impl std::fmt::Display) -> String {
        format!("{}/anime/{anime_id}/cover", self.base)
    }

    #[must_use]
    pub fn anime_ref(&self, mut anime: AnimeRef) -> AnimeRef {
        anime.cover_url = self.url(anime.id);
        anime
    }

    #[must_use]
    pub fn episode(&self, mut episode: Episode) -> Episode {
        episode.anime = episode.anime.map(|a| self.anime_ref(a));
        episode
    }

    #[must_use]
    pub fn simple(&self, mut anime: SimpleAnime) -> SimpleAnime {
        anime.cover_url = self.url(anime.id);
        anime
    }
}
