use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub source: SourceConfig,

    pub storage: StorageConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Public base of this API, used when rewriting cover URLs so clients
    /// fetch covers through the proxy instead of hotlinking upstream.
    pub public_url: String,

    pub cors_allowed_origins: Vec<String>,

    /// Upper bound for a whole request, upstream fetches included.
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            public_url: "http://localhost:8080/api".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,

    pub request_timeout_seconds: u64,

    pub user_agent: String,

    /// Nonce the upstream search endpoint expects.
    pub search_nonce: String,

    pub latest_page_size: u32,

    pub episodes_page_size: u32,

    /// Mirrors resolved concurrently for one episode.
    pub watch_concurrency: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://samehadaku.win".to_string(),
            request_timeout_seconds: 20,
            user_agent: format!("animenya/{}", env!("CARGO_PKG_VERSION")),
            search_nonce: "0854d2c17b".to_string(),
            latest_page_size: 20,
            episodes_page_size: 100,
            watch_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,

    pub file_extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./.db".to_string(),
            file_extension: "animenya".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a fully refreshed anime record (default: 72 = 3 days)
    pub ttl_hours: u32,

    /// Browser cache lifetime for covers of complete records.
    pub cover_max_age_days: u32,

    /// Browser cache lifetime for the latest-episodes feed.
    pub latest_response_seconds: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 72,
            cover_max_age_days: 30,
            latest_response_seconds: 600,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(i64::from(self.ttl_hours))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "animenya".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies `.env` / environment overrides.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            warn!(error = %e, "Failed to read .env file");
        }

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// `SOURCE_URL`, `API_URL`, `PORT` and `ANIMENYA_DATA_DIR` win over the file.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("SOURCE_URL").filter(|v| !v.is_empty()) {
            self.source.base_url = url;
        }

        if let Some(url) = var("API_URL").filter(|v| !v.is_empty()) {
            self.server.public_url = url;
        }

        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }

        if let Some(dir) = var("ANIMENYA_DATA_DIR").filter(|v| !v.is_empty()) {
            self.storage.data_dir = dir;
        }

        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("animenya").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".animenya").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.source.base_url)
            .with_context(|| format!("Invalid source base_url: {}", self.source.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("Source base_url must be http(s): {}", self.source.base_url);
        }

        if self.cache.ttl_hours == 0 {
            anyhow::bail!("Cache ttl_hours must be > 0");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.source.watch_concurrency == 0 {
            anyhow::bail!("Source watch_concurrency must be > 0");
        }

        Ok(())
    }
}
