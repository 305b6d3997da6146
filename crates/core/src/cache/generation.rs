//! Versioned tier names.
//!
//! A generation is the set of tier stores sharing one version token. Only the
//! generation built from the running configuration is current; activation
//! deletes every other store name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// A cache tier, one per request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Application shell pre-cached at install.
    Static,
    /// Everything that is neither API, image nor shell.
    Runtime,
    /// Backend JSON responses.
    Api,
    /// Images.
    Images,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Static, Tier::Runtime, Tier::Api, Tier::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Static => "static",
            Tier::Runtime => "runtime",
            Tier::Api => "api",
            Tier::Images => "images",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    prefix: String,
    version: String,
}

impl Generation {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.cache_prefix, &config.cache_version)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Store name for `tier`, e.g. `tuneverse-api-v3`.
    pub fn store_name(&self, tier: Tier) -> String {
        format!("{}-{}-{}", self.prefix, tier.as_str(), self.version)
    }

    pub fn store_names(&self) -> Vec<String> {
        Tier::ALL.iter().map(|t| self.store_name(*t)).collect()
    }

    /// Whether `name` is one of this generation's tier stores.
    pub fn is_current(&self, name: &str) -> bool {
        Tier::ALL.iter().any(|t| self.store_name(*t) == name)
    }
}
