use std::path::PathBuf;
use std::sync::Arc;

use crate::clients::{ContentFetcher, SourceClient};
use crate::config::Config;
use crate::db::{AnimeRepository, FileStore, KeyValueStore, MemoryStore};
use crate::services::{CatalogService, DefaultCatalogService};

/// Everything a command or request handler needs, built once per process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Arc<dyn KeyValueStore>,

    pub catalog: Arc<dyn CatalogService>,
}

impl SharedState {
    /// Flat-file store under `storage.data_dir`, live upstream client.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(FileStore::new(
            PathBuf::from(&config.storage.data_dir),
            &config.storage.file_extension,
        ));
        Self::with_store(config, store)
    }

    /// Same as [`SharedState::new`] but nothing outlives the process.
    pub fn ephemeral(config: Config) -> anyhow::Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let fetcher = Arc::new(SourceClient::from_config(&config.source)?);
        Ok(Self::from_parts(config, store, fetcher))
    }

    #[must_use]
    pub fn from_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let repo = AnimeRepository::new(store.clone());
        let catalog = Arc::new(DefaultCatalogService::new(fetcher, repo, config.cache.ttl()));

        Self {
            config: Arc::new(config),
            store,
            catalog,
        }
    }
}
