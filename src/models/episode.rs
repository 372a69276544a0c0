use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EpisodeId;
use crate::models::anime::AnimeRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,

    #[serde(default)]
    pub slug: String,

    /// Only set when the episode leaves the service on its own (feed entries,
    /// single-episode responses). Never stored inside `Anime::episodes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anime: Option<AnimeRef>,

    /// Display label; not always numeric ("OVA", "12.5").
    #[serde(default)]
    pub episode: String,

    /// `None` until the streaming mirrors have been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watches: Option<Vec<Watch>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Episode {
    /// Copy of this episode suitable for embedding in its anime's collection.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            anime: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn has_watches(&self) -> bool {
        self.watches.as_ref().is_some_and(|w| !w.is_empty())
    }
}

/// One streaming mirror of an episode.
///
/// `id` is the 1-based position among the episode's mirrors, not a global id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub id: u32,
    pub source: String,
    pub stream_url: String,
}
