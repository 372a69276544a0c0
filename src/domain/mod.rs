//! Strongly typed identifiers shared by the model, storage and API layers.
//!
//! Anime and episode ids both come from the upstream taxonomy as plain
//! integers, so they are wrapped to keep them from being swapped by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an anime: the upstream category id.
///
/// Stable for the lifetime of the upstream taxonomy entry.
///
/// # Examples
///
/// ```rust
/// use animenya::domain::AnimeId;
///
/// let id = AnimeId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AnimeId(i64);

impl AnimeId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Zero is what upstream reports for a post without a category.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AnimeId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl From<AnimeId> for i64 {
    fn from(id: AnimeId) -> Self {
        id.0
    }
}

/// Identity of an episode: the upstream post id.
///
/// Globally unique across anime, and newer episodes get larger ids, which is
/// what the newest-first ordering relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EpisodeId(i64);

impl EpisodeId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EpisodeId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl From<EpisodeId> for i64 {
    fn from(id: EpisodeId) -> Self {
        id.0
    }
}
