use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::validation::{
    validate_anime_id, validate_episode_id, validate_page, validate_search_query,
};
use crate::models::{Anime, Episode, SimpleAnime};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::internal(e.to_string()))
}

pub async fn ping() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("pong"))
}

pub async fn latest_episodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = query.page.map(validate_page).transpose()?;
    let episodes = state.catalog().latest(page).await?;

    let episodes: Vec<Episode> = episodes
        .into_iter()
        .map(|e| state.links.episode(e))
        .collect();

    let max_age = state.config().cache.latest_response_seconds;
    let cache = header_value(&format!("public, max-age={max_age}"))?;

    Ok((
        [(header::CACHE_CONTROL, cache)],
        Json(ApiResponse::success(episodes)),
    )
        .into_response())
}

pub async fn search_anime(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SimpleAnime>>>, ApiError> {
    let q = validate_search_query(&query.q)?;
    let hits = state.catalog().search(q).await?;

    Ok(Json(ApiResponse::success(
        hits.into_iter().map(|h| state.links.simple(h)).collect(),
    )))
}

pub async fn get_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Anime>>, ApiError> {
    let id = validate_anime_id(id)?;
    let mut anime = state.catalog().anime(id).await?;
    anime.cover_url = state.links.url(anime.id);

    Ok(Json(ApiResponse::success(anime)))
}

pub async fn get_cover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let id = validate_anime_id(id)?;
    let cover = state.catalog().cover(id).await?;

    let cache = if cover.complete {
        let seconds = u64::from(state.config().cache.cover_max_age_days) * 24 * 60 * 60;
        format!("public, max-age={seconds}")
    } else {
        "no-cache".to_string()
    };

    Ok((
        [
            (header::CONTENT_TYPE, header_value(&cover.image.content_type)?),
            (header::CACHE_CONTROL, header_value(&cache)?),
        ],
        cover.image.bytes,
    )
        .into_response())
}

pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path((anime_id, episode_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<Episode>>, ApiError> {
    let anime_id = validate_anime_id(anime_id)?;
    let episode_id = validate_episode_id(episode_id)?;

    let episode = state.catalog().episode(anime_id, episode_id).await?;
    Ok(Json(ApiResponse::success(state.links.episode(episode))))
}
