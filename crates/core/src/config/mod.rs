//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SCRAPECACHE_*)
//! 2. Legacy `DATABASE_URL` environment variable
//! 3. TOML config file (if SCRAPECACHE_CONFIG_FILE set)
//! 4. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

use crate::store::DatabaseLocation;

/// Browser identification sent with every fetch; some servers reject default client identifiers.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SCRAPECACHE_*)
/// 2. `DATABASE_URL`
/// 3. TOML config file (if SCRAPECACHE_CONFIG_FILE set)
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection string for the page store.
    ///
    /// Accepts `sqlite://<path>`, `sqlite::memory:`, `:memory:` or a bare path.
    /// Set via SCRAPECACHE_DATABASE_URL or DATABASE_URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Socket address the HTTP server binds to.
    ///
    /// Set via SCRAPECACHE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SCRAPECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SCRAPECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read from a response body.
    ///
    /// Set via SCRAPECACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum characters of extracted text kept per page.
    ///
    /// Set via SCRAPECACHE_MAX_CONTENT_CHARS environment variable.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Number of background refresh workers.
    #[serde(default = "default_refresh_workers")]
    pub refresh_workers: usize,

    /// Pending refreshes held before new ones are dropped.
    #[serde(default = "default_refresh_queue_capacity")]
    pub refresh_queue_capacity: usize,

    /// Upper bound on requests handled concurrently.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Whether a failed background refresh replaces stored content with the
    /// error placeholder.
    ///
    /// Set via SCRAPECACHE_OVERWRITE_ON_REFRESH_FAILURE environment variable.
    #[serde(default = "default_true")]
    pub overwrite_on_refresh_failure: bool,
}

fn default_database_url() -> String {
    "sqlite://scrapecache.sqlite".into()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_content_chars() -> usize {
    100_000
}

fn default_refresh_workers() -> usize {
    4
}

fn default_refresh_queue_capacity() -> usize {
    256
}

fn default_max_concurrent_requests() -> usize {
    128
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_content_chars: default_max_content_chars(),
            refresh_workers: default_refresh_workers(),
            refresh_queue_capacity: default_refresh_queue_capacity(),
            max_concurrent_requests: default_max_concurrent_requests(),
            overwrite_on_refresh_failure: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed form of `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the connection string is empty or
    /// names an unsupported scheme.
    pub fn database_location(&self) -> Result<DatabaseLocation, ConfigError> {
        DatabaseLocation::parse(&self.database_url)
            .map_err(|reason| ConfigError::Invalid { field: "database_url".into(), reason })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SCRAPECACHE_`
    /// 2. `DATABASE_URL`
    /// 3. TOML file from `SCRAPECACHE_CONFIG_FILE` (if set)
    /// 4. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SCRAPECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database_url".into()))
            .merge(
                Env::prefixed("SCRAPECACHE_")
                    .ignore(&["CONFIG_FILE"])
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
