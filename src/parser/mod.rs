//! Field extraction from upstream pages and feed entries.

pub mod page;
pub mod post;

use regex::Regex;
use std::sync::OnceLock;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// First capture group of the first match, HTML entities decoded and trimmed.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| clean(m.as_str()))
}

/// First capture group of every match, in document order.
fn all_captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| clean(m.as_str()))
        .collect()
}

fn clean(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim()).to_string()
}
