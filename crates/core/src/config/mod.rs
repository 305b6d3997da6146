//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TUNEVERSE_SW_*)
//! 2. TOML config file (if TUNEVERSE_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is built once at startup, wrapped in an `Arc` and handed
//! to every component that needs a version token, a prefix or a timeout.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TUNEVERSE_SW_*)
/// 2. TOML config file (if TUNEVERSE_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file backing the cache stores.
    ///
    /// Set via TUNEVERSE_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application. Requests to any other origin are never
    /// intercepted.
    ///
    /// Set via TUNEVERSE_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Prefix shared by every cache store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the current cache generation. Bumping it retires
    /// every store of the previous generation on the next activation.
    ///
    /// Set via TUNEVERSE_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path prefix of the backend's JSON API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Network timeout in milliseconds for every fetch the layer issues.
    ///
    /// Set via TUNEVERSE_SW_NETWORK_TIMEOUT_MS environment variable.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// User-Agent string for outgoing requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Root document served to navigations when everything else failed.
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Application shell assets pre-cached at install time.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Serve HTML documents network-first instead of cache-first.
    #[serde(default)]
    pub network_first_documents: bool,

    /// Activate right after install instead of waiting for `SKIP_WAITING`.
    #[serde(default)]
    pub skip_waiting_on_install: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tuneverse-sw-cache.sqlite")
}

fn default_origin() -> Url {
    Url::parse("http://localhost:5000").expect("static origin parses")
}

fn default_cache_prefix() -> String {
    "tuneverse".into()
}

fn default_cache_version() -> String {
    "v3".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_network_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    "tuneverse-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    52_428_800 // 50MB
}

fn default_app_shell() -> String {
    "/index.html".into()
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/admin.html",
        "/player.html",
        "/user.html",
        "/style.css?v=1.2.0",
        "/logo-styles.css?v=1.2.0",
        "/script.js",
        "/pwa-init.js",
        "/manifest.json",
        "/logo.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            api_prefix: default_api_prefix(),
            network_timeout_ms: default_network_timeout_ms(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            app_shell: default_app_shell(),
            static_manifest: default_static_manifest(),
            network_first_documents: false,
            skip_waiting_on_install: false,
        }
    }
}

impl AppConfig {
    /// Network timeout as Duration for use with reqwest/tokio.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Resolve an origin-relative path (e.g. a manifest entry) to an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the path cannot be joined onto the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "path".into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TUNEVERSE_SW_`
    /// 2. TOML file from `TUNEVERSE_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TUNEVERSE_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TUNEVERSE_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
