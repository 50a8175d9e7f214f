//! Runtime configuration for the weather client
//!
//! A `Config` is built once (by the CLI, or by an embedding service) and handed
//! to `CacheManager` and `WeatherClient`. Nothing reads settings from global state.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use thiserror::Error;

/// Base URL for the OpenWeather 2.5 API
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Default cache time-to-live in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default upstream request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors detected while assembling a client from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No OpenWeather API key was supplied
    #[error("OpenWeather API key is not configured. Set OPENWEATHER_API_KEY or pass --api-key")]
    MissingApiKey,

    /// No cache directory was given and none could be derived from the home directory
    #[error("Could not determine a cache directory. Set CACHE_DIR or pass --cache-dir")]
    NoCacheDir,
}

/// Settings consumed by the cache and the fetch client
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenWeather API key, sent as `appid` on every request
    pub api_key: String,
    /// Base URL the endpoint name is appended to
    pub base_url: String,
    /// Upper bound for a single upstream request
    pub timeout: Duration,
    /// Directory holding one JSON file per cache entry
    pub cache_dir: PathBuf,
    /// Maximum age before a cache entry is considered stale
    pub cache_ttl: Duration,
}

impl Config {
    /// Creates a configuration with the default base URL, timeout and TTL
    pub fn new(api_key: impl Into<String>, cache_dir: PathBuf) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_dir,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Overrides the upstream base URL (useful for pointing at a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the cache time-to-live
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Whether a usable API key is present
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Returns the XDG-compliant cache directory (`~/.cache/globaltrend/` on Linux)
///
/// Returns `None` if the home directory cannot be determined.
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "globaltrend")?;
    Some(project_dirs.cache_dir().to_path_buf())
}
