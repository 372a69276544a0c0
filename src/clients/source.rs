//! Client for the upstream content site.
//!
//! The site is a WordPress install: episode posts and anime categories come
//! from its JSON API, while anime details and streaming mirrors have to be
//! scraped from rendered pages. Every operation returns a partial record that
//! the reconciliation layer merges into the cached entity.

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::SourceConfig;
use crate::domain::{AnimeId, EpisodeId};
use crate::models::{Anime, AnimeRef, Episode, Genre, Watch};
use crate::parser::page::{parse_anime_page, parse_mirror_labels, parse_player_src, query_param};
use crate::parser::post::{
    anime_slug_from_post_slug, parse_post_date, parse_post_title, slug_from_link,
};

const POST_FIELDS: &str = "id,title,date,slug,categories,yoast_head_json.og_image";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream resource not found: {0}")]
    NotFound(String),

    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("upstream returned an empty body for {0}")]
    EmptyBody(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not extract {field} from {url}")]
    Extraction { field: &'static str, url: String },
}

impl FetchError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Cover image bytes as served upstream.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// One operation per upstream data shape the catalog needs.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Newest episode posts across all anime (list-by-recency). Each stub
    /// carries an `AnimeRef` for its anime.
    async fn latest_episodes(&self, page: Option<u32>) -> Result<Vec<Episode>, FetchError>;

    /// Episode stubs of one anime (list-by-parent-id).
    async fn episodes_by_anime(&self, anime_id: AnimeId) -> Result<Vec<Episode>, FetchError>;

    /// First detail step: the anime page, yielding `post_id` and the page-only fields.
    async fn anime_by_slug(&self, slug: &str) -> Result<Anime, FetchError>;

    /// Second detail step: full enrichment plus episodes with their watches.
    async fn anime_by_post_id(&self, post_id: i64) -> Result<Anime, FetchError>;

    /// Streaming mirrors of one episode, in mirror order. May be empty.
    async fn episode_watches(
        &self,
        episode_id: EpisodeId,
        episode_slug: &str,
    ) -> Result<Vec<Watch>, FetchError>;

    /// Anime matching a free-text query; hits without a resolvable id are dropped.
    async fn search(&self, query: &str) -> Result<Vec<AnimeRef>, FetchError>;

    async fn cover(&self, url: &str) -> Result<CoverImage, FetchError>;
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: i64,
    #[serde(default)]
    date: String,
    #[serde(default)]
    slug: String,
    title: Rendered,
    #[serde(default)]
    categories: Vec<i64>,
    #[serde(default)]
    yoast_head_json: Option<YoastHead>,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct YoastHead {
    #[serde(default)]
    og_image: Vec<OgImage>,
}

#[derive(Debug, Deserialize)]
struct OgImage {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    id: i64,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnimeDetail {
    title: String,
    cover: String,
    duration: Option<String>,
    synopsis: Option<String>,
    released: Option<String>,
    status: Option<String>,
    score: Option<String>,
    genre: Option<Vec<RawGenre>>,
    data: Vec<RawDetailEpisode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGenre {
    name: String,
    slug: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDetailEpisode {
    episode: String,
    url: String,
    player: Vec<RawPlayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlayer {
    title: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    img: String,
}

/// Turns feed posts into stub episodes, skipping posts that are not episodes.
fn episodes_from_posts(posts: Vec<RawPost>) -> Vec<Episode> {
    posts
        .into_iter()
        .filter_map(|post| {
            let Some((title, label)) = parse_post_title(&post.title.rendered) else {
                debug!(post_id = post.id, title = %post.title.rendered, "Skipping post without episode label");
                return None;
            };

            let anime = AnimeRef {
                id: AnimeId::new(post.categories.first().copied().unwrap_or_default()),
                title,
                slug: anime_slug_from_post_slug(&post.slug).unwrap_or_default(),
                cover_url: post
                    .yoast_head_json
                    .and_then(|y| y.og_image.into_iter().next())
                    .map(|i| i.url)
                    .unwrap_or_default(),
            };

            Some(Episode {
                id: EpisodeId::new(post.id),
                slug: post.slug,
                anime: Some(anime),
                episode: label,
                watches: None,
                created_at: parse_post_date(&post.date),
            })
        })
        .collect()
}

/// Category links carry the canonical anime slug, which can differ from the
/// one derived from the post slug. Only non-empty values overwrite.
fn apply_category_slugs(episodes: &mut [Episode], categories: &[RawCategory]) {
    let slugs: HashMap<i64, String> = categories
        .iter()
        .filter_map(|c| slug_from_link(&c.link).map(|s| (c.id, s)))
        .collect();

    for anime in episodes.iter_mut().filter_map(|e| e.anime.as_mut()) {
        if let Some(slug) = slugs.get(&anime.id.value())
            && !slug.is_empty()
        {
            anime.slug.clone_from(slug);
        }
    }
}

fn anime_from_detail(raw: RawAnimeDetail) -> Anime {
    let genres: Option<Vec<Genre>> = raw.genre.map(|genres| {
        genres
            .into_iter()
            .filter_map(|g| {
                let slug = query_param(&g.slug, "val")?;
                Some(Genre { name: g.name, slug })
            })
            .collect()
    });

    let episodes = raw
        .data
        .into_iter()
        .filter_map(|ep| {
            let Some(id) = query_param(&ep.url, "id").and_then(|id| id.parse().ok()) else {
                warn!(url = %ep.url, "Skipping detail episode without id");
                return None;
            };

            let watches: Vec<Watch> = ep
                .player
                .into_iter()
                .enumerate()
                .filter_map(|(i, player)| {
                    let stream_url = parse_player_src(&player.url)?;
                    Some(Watch {
                        id: u32::try_from(i + 1).ok()?,
                        source: player.title,
                        stream_url,
                    })
                })
                .collect();

            Some(Episode {
                id: EpisodeId::new(id),
                episode: ep.episode,
                watches: (!watches.is_empty()).then_some(watches),
                ..Episode::default()
            })
        })
        .collect();

    Anime {
        title: raw.title,
        cover_url: raw.cover,
        duration: raw.duration,
        synopsis: raw.synopsis,
        release_date: raw.released,
        status: raw.status,
        score: raw.score,
        genres,
        episodes,
        ..Anime::default()
    }
}

#[derive(Clone)]
pub struct SourceClient {
    client: Client,
    base_url: Url,
    latest_page_size: u32,
    episodes_page_size: u32,
    search_nonce: String,
    watch_concurrency: usize,
}

impl SourceClient {
    /// `base_url` is the upstream host; nothing here reads process state.
    #[must_use]
    pub fn new(client: Client, base_url: Url) -> Self {
        let defaults = SourceConfig::default();
        Self {
            client,
            base_url,
            latest_page_size: defaults.latest_page_size,
            episodes_page_size: defaults.episodes_page_size,
            search_nonce: defaults.search_nonce,
            watch_concurrency: defaults.watch_concurrency,
        }
    }

    pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid source base_url {}: {e}", config.base_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build source HTTP client: {e}"))?;

        Ok(Self {
            latest_page_size: config.latest_page_size,
            episodes_page_size: config.episodes_page_size,
            search_nonce: config.search_nonce.clone(),
            watch_concurrency: config.watch_concurrency.max(1),
            ..Self::new(client, base_url)
        })
    }

    fn endpoint(&self, path_and_query: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path_and_query.trim_start_matches('/')
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(url.to_string())),
            status => Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.send(self.client.get(url), url).await?.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        Ok(self.send(self.client.get(url), url).await?.json().await?)
    }

    async fn post_form_text(&self, url: &str, form: &[(&str, String)]) -> Result<String, FetchError> {
        let body = self
            .send(self.client.post(url).form(form), url)
            .await?
            .text()
            .await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        Ok(body)
    }

    async fn fetch_posts(&self, query: &str) -> Result<Vec<Episode>, FetchError> {
        let url = self.endpoint(&format!("wp-json/wp/v2/posts?_fields={POST_FIELDS}&{query}"));
        let posts: Vec<RawPost> = self.get_json(&url).await?;
        let mut episodes = episodes_from_posts(posts);

        let mut category_ids: Vec<String> = episodes
            .iter()
            .filter_map(|e| e.anime.as_ref())
            .filter(|a| a.id.is_assigned())
            .map(|a| a.id.to_string())
            .collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        if !category_ids.is_empty() {
            let url = self.endpoint(&format!(
                "wp-json/wp/v2/categories?type=anime&_fields=id,link&include={}",
                category_ids.join(",")
            ));
            let categories: Vec<RawCategory> = self.get_json(&url).await?;
            apply_category_slugs(&mut episodes, &categories);
        }

        Ok(episodes)
    }

    async fn fetch_mirror(&self, episode_id: EpisodeId, nume: usize, source: String) -> Option<Watch> {
        let url = self.endpoint("wp-admin/admin-ajax.php");
        let form = [
            ("action", "player_ajax".to_string()),
            ("post", episode_id.to_string()),
            ("nume", nume.to_string()),
            ("type", "schtml".to_string()),
        ];

        let body = match self.post_form_text(&url, &form).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%episode_id, nume, error = %e, "Failed to fetch mirror");
                return None;
            }
        };

        let Some(stream_url) = parse_player_src(&body) else {
            warn!(%episode_id, nume, "Mirror response has no player");
            return None;
        };

        Some(Watch {
            id: u32::try_from(nume).ok()?,
            source,
            stream_url,
        })
    }
}

fn record(operation: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("source_fetch_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

#[async_trait::async_trait]
impl ContentFetcher for SourceClient {
    async fn latest_episodes(&self, page: Option<u32>) -> Result<Vec<Episode>, FetchError> {
        let mut query = format!("per_page={}&status=publish", self.latest_page_size);
        if let Some(page) = page {
            query.push_str(&format!("&page={page}"));
        }

        let result = self.fetch_posts(&query).await;
        record("latest_episodes", result.is_ok());
        result
    }

    async fn episodes_by_anime(&self, anime_id: AnimeId) -> Result<Vec<Episode>, FetchError> {
        let query = format!("per_page={}&categories={anime_id}", self.episodes_page_size);
        let result = self.fetch_posts(&query).await;
        record("episodes_by_anime", result.is_ok());
        result
    }

    async fn anime_by_slug(&self, slug: &str) -> Result<Anime, FetchError> {
        let url = self.endpoint(&format!("anime/{}", urlencoding::encode(slug)));
        let result = async {
            let html = self.get_text(&url).await?;
            let page = parse_anime_page(&html);

            let post_id = page.post_id.ok_or_else(|| FetchError::Extraction {
                field: "post id",
                url: url.clone(),
            })?;

            Ok::<_, FetchError>(Anime {
                slug: slug.to_string(),
                post_id: Some(post_id),
                trailer_url: page.trailer_url,
                total_episodes: page.total_episodes,
                studio: page.studio,
                season: page.season,
                release_date: page.release_date,
                ..Anime::default()
            })
        }
        .await;

        record("anime_by_slug", result.is_ok());
        result
    }

    async fn anime_by_post_id(&self, post_id: i64) -> Result<Anime, FetchError> {
        let url = self.endpoint(&format!("wp-json/apk/anime/?id={post_id}"));
        let result = async {
            let details: Vec<RawAnimeDetail> = self.get_json(&url).await?;
            let raw = details
                .into_iter()
                .next()
                .ok_or_else(|| FetchError::NotFound(url.clone()))?;
            Ok::<_, FetchError>(anime_from_detail(raw))
        }
        .await;

        record("anime_by_post_id", result.is_ok());
        result
    }

    async fn episode_watches(
        &self,
        episode_id: EpisodeId,
        episode_slug: &str,
    ) -> Result<Vec<Watch>, FetchError> {
        let url = self.endpoint(&urlencoding::encode(episode_slug));
        let html = match self.get_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                record("episode_watches", false);
                return Err(e);
            }
        };

        let labels = parse_mirror_labels(&html);
        let watches: Vec<Watch> = stream::iter(labels.into_iter().enumerate())
            .map(|(i, label)| self.fetch_mirror(episode_id, i + 1, label))
            .buffered(self.watch_concurrency)
            .filter_map(|w| async move { w })
            .collect()
            .await;

        record("episode_watches", true);
        Ok(watches)
    }

    async fn search(&self, query: &str) -> Result<Vec<AnimeRef>, FetchError> {
        let encoded = urlencoding::encode(query);
        let result = async {
            let search_url = self.endpoint(&format!(
                "wp-json/eastheme/search?nonce={}&keyword={encoded}",
                self.search_nonce
            ));
            let items: HashMap<String, RawSearchItem> = self.get_json(&search_url).await?;

            let categories_url = self.endpoint(&format!(
                "wp-json/wp/v2/categories?type=anime&_fields=id,link&search={encoded}"
            ));
            let categories: Vec<RawCategory> = self.get_json(&categories_url).await?;

            let mut hits: Vec<AnimeRef> = items
                .into_values()
                .filter_map(|item| {
                    let link = item.url.replacen("/anime", "", 1);
                    let category = categories.iter().find(|c| c.link == link)?;
                    Some(AnimeRef {
                        id: AnimeId::new(category.id),
                        title: html_escape::decode_html_entities(&item.title).to_string(),
                        slug: slug_from_link(&link).unwrap_or_default(),
                        cover_url: item.img,
                    })
                })
                .filter(|a| a.id.is_assigned())
                .collect();

            hits.sort_by(|a, b| a.title.cmp(&b.title));
            Ok::<_, FetchError>(hits)
        }
        .await;

        record("search", result.is_ok());
        result
    }

    async fn cover(&self, url: &str) -> Result<CoverImage, FetchError> {
        let result = async {
            let request = self
                .client
                .get(url)
                .header(header::REFERER, self.base_url.as_str());
            let response = self.send(request, url).await?;

            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = response.bytes().await?.to_vec();

            Ok::<_, FetchError>(CoverImage {
                bytes,
                content_type,
            })
        }
        .await;

        record("cover", result.is_ok());
        result
    }
}
