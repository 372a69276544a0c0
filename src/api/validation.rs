use super::ApiError;
use crate::domain::{AnimeId, EpisodeId};

pub fn validate_anime_id(id: i64) -> Result<AnimeId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid anime ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(AnimeId::new(id))
}

pub fn validate_episode_id(id: i64) -> Result<EpisodeId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid episode ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(EpisodeId::new(id))
}

pub fn validate_page(page: u32) -> Result<u32, ApiError> {
    if page == 0 {
        return Err(ApiError::validation("Page numbers start at 1"));
    }
    Ok(page)
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }

    if trimmed.chars().count() > 100 {
        return Err(ApiError::validation(
            "Search query must be 100 characters or less",
        ));
    }

    Ok(trimmed)
}
