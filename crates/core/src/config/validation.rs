//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound for `max_bytes` (200MB).
const MAX_BYTES_CEILING: usize = 200 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL with a host
    /// - `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `api_prefix` or any manifest entry does not start with `/`
    /// - `network_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 200MB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.origin.scheme() {
            "http" | "https" => {}
            scheme => return Err(invalid("origin", format!("unsupported scheme: {scheme}"))),
        }
        if self.origin.host_str().is_none() {
            return Err(invalid("origin", "must have a host"));
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }

        if !self.app_shell.starts_with('/') {
            return Err(invalid("app_shell", "must start with '/'"));
        }

        if let Some(entry) = self.static_manifest.iter().find(|e| !e.starts_with('/')) {
            return Err(invalid("static_manifest", format!("entry must start with '/': {entry}")));
        }

        if self.network_timeout_ms < 100 {
            return Err(invalid("network_timeout_ms", "must be at least 100ms"));
        }
        if self.network_timeout_ms > 300_000 {
            return Err(invalid("network_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > MAX_BYTES_CEILING {
            return Err(invalid("max_bytes", "must not exceed 200MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_manifest.is_empty() {
            tracing::warn!("static_manifest is empty; install will pre-cache nothing");
        }

        Ok(())
    }
}
