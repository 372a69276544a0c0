//! Parsing of the feed's per-episode posts.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::{clean, get_regex};

/// Anime title and episode label from a post title.
///
/// Posts read `"<Anime> Episode <label>"`; upstream sometimes misspells it as
/// "Epsiode". Returns `None` for posts without a label (movies, announcements).
#[must_use]
pub fn parse_post_title(rendered: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)^(.*\S)\s+(?:episode|epsiode)\s+(.+)$");

    let decoded = clean(rendered);
    let caps = re.captures(&decoded)?;
    let title = caps.get(1)?.as_str().trim().to_string();
    let label = caps.get(2)?.as_str().trim().to_string();

    if title.is_empty() || label.is_empty() {
        return None;
    }
    Some((title, label))
}

/// Anime slug from an episode post slug (`frieren-episode-12` → `frieren`).
#[must_use]
pub fn anime_slug_from_post_slug(slug: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^(.*?)-(?:episode|epsiode)(?:-.*)?$");

    re.captures(slug)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// Last non-empty path segment of a category or anime link.
#[must_use]
pub fn slug_from_link(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Feed dates carry no zone and are treated as UTC.
#[must_use]
pub fn parse_post_date(date: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|d| d.and_utc())
}
