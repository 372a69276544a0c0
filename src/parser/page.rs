//! Extractors for the HTML pages and embedded player snippets.

use regex::Regex;
use std::sync::OnceLock;

use super::{all_captures, first_capture, get_regex};

/// Fields scraped from an anime's landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimePage {
    pub post_id: Option<i64>,
    pub trailer_url: Option<String>,
    pub total_episodes: Option<String>,
    pub studio: Option<String>,
    pub season: Option<String>,
    pub release_date: Option<String>,
}

#[must_use]
pub fn parse_anime_page(html: &str) -> AnimePage {
    static POST_ID: OnceLock<Regex> = OnceLock::new();
    static TRAILER: OnceLock<Regex> = OnceLock::new();
    static TOTAL: OnceLock<Regex> = OnceLock::new();
    static STUDIO: OnceLock<Regex> = OnceLock::new();
    static SEASON: OnceLock<Regex> = OnceLock::new();
    static RELEASED: OnceLock<Regex> = OnceLock::new();

    let post_id = first_capture(get_regex(&POST_ID, r#"id="post-(\d+)""#), html)
        .and_then(|id| id.parse().ok());

    AnimePage {
        post_id,
        trailer_url: first_capture(
            get_regex(&TRAILER, r#"(?s)player-embed.*?<iframe[^>]*\bsrc="([^"]*)""#),
            html,
        ),
        total_episodes: first_capture(
            get_regex(&TOTAL, r"(?s)Total Episode\s*</b>\s*:?\s*([^<]*)<"),
            html,
        ),
        studio: first_capture(
            get_regex(&STUDIO, r#"(?s)Studio\s*</b>.*?rel="tag"[^>]*>([^<]*)</a"#),
            html,
        ),
        season: first_capture(
            get_regex(&SEASON, r#"(?s)Season\s*</b>.*?href="[^"]*season[^"]*"[^>]*>([^<]*)</a"#),
            html,
        ),
        release_date: first_capture(
            get_regex(&RELEASED, r"(?s)Rilis\s*:?\s*</b>\s*:?\s*([^<]*)</span"),
            html,
        ),
    }
}

/// Labels of the streaming mirrors listed on an episode page, in page order.
#[must_use]
pub fn parse_mirror_labels(html: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r#"(?s)data-nume="[^"]*"[^>]*>.*?<span>([^<]*)</span"#);
    all_captures(re, html)
}

/// Stream URL of an embedded player iframe.
#[must_use]
pub fn parse_player_src(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r#"(?s)<iframe[^>]*\bsrc="([^"]+)""#);
    first_capture(re, html).filter(|s| !s.is_empty())
}

/// Value of a query parameter in a (possibly relative) link.
#[must_use]
pub fn query_param(link: &str, name: &str) -> Option<String> {
    let query = link.split_once('?').map_or(link, |(_, q)| q);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
