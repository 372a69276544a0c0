use axum::{Router, http::HeaderValue, http::Method, middleware, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::CatalogService;
use crate::state::SharedState;

mod anime;
mod error;
mod observability;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub links: CoverLinks,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(shared: Arc<SharedState>, prometheus_handle: Option<PrometheusHandle>) -> Self {
        let links = CoverLinks::new(&shared.config.server.public_url);
        Self {
            shared,
            links,
            prometheus_handle,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogService> {
        &self.shared.catalog
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();
    let timeout = Duration::from_secs(state.config().server.request_timeout_seconds);

    let api_router = Router::new()
        .route("/ping", get(anime::ping))
        .route("/anime", get(anime::latest_episodes))
        .route("/anime/search", get(anime::search_anime))
        .route("/anime/{id}", get(anime::get_anime))
        .route("/anime/{id}/cover", get(anime::get_cover))
        .route(
            "/anime/{id}/episode/{episode_id}",
            get(anime::get_episode),
        )
        .route("/metrics", get(observability::get_metrics))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer.allow_methods([Method::GET]).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}
