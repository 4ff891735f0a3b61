//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [cache]                  # session data cache
//! region = "session"
//! max_sessions = 10000
//! ttl_secs = 3600
//!
//! [links]                  # link graph
//! region = "session-links"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sessiontier::CacheConfig;

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessiontierConfig {
    /// Session data cache configuration.
    pub cache: Option<CacheSection>,

    /// Link graph configuration.
    pub links: Option<LinksSection>,
}

impl SessiontierConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: SessiontierConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.links.is_some() {
            self.links = other.links;
        }
    }

    /// Build the core cache configuration, validating every value.
    ///
    /// Missing sections fall back to the core defaults.
    pub fn to_cache_config(&self) -> Result<CacheConfig> {
        let mut config = match &self.cache {
            Some(section) => section.to_cache_config()?,
            None => CacheConfig::default(),
        };
        if let Some(links) = &self.links {
            if links.region.trim().is_empty() {
                return Err(invalid("links.region", "must not be empty"));
            }
            config = config.with_link_region(links.region.clone());
        }
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session data cache configuration.
///
/// ```toml
/// [cache]
/// region = "session"
/// max_sessions = 10000
/// ttl_secs = 3600
/// enable_cleanup_task = true
/// cleanup_interval_secs = 60
/// max_ended_sessions = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Shared-tier region holding session data maps.
    pub region: String,
    /// Maximum number of session maps in the in-memory store.
    pub max_sessions: usize,
    /// Seconds an untouched map stays in the in-memory store (none = forever).
    pub ttl_secs: Option<u64>,
    /// Whether to sweep expired maps periodically.
    pub enable_cleanup_task: bool,
    /// Interval in seconds between sweeps.
    pub cleanup_interval_secs: u64,
    /// Number of ended session ids remembered.
    pub max_ended_sessions: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            region: defaults.region,
            max_sessions: defaults.max_sessions,
            ttl_secs: defaults.ttl.map(|d| d.as_secs()),
            enable_cleanup_task: defaults.enable_cleanup_task,
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
            max_ended_sessions: defaults.max_ended_sessions,
        }
    }
}

impl CacheSection {
    /// Convert into the core cache configuration.
    pub fn to_cache_config(&self) -> Result<CacheConfig> {
        if self.region.trim().is_empty() {
            return Err(invalid("cache.region", "must not be empty"));
        }
        if self.max_sessions == 0 {
            return Err(invalid("cache.max_sessions", "must be greater than zero"));
        }
        if self.max_ended_sessions == 0 {
            return Err(invalid("cache.max_ended_sessions", "must be greater than zero"));
        }
        if self.ttl_secs == Some(0) {
            return Err(invalid("cache.ttl_secs", "must be greater than zero when set"));
        }
        if self.enable_cleanup_task && self.ttl_secs.is_some() && self.cleanup_interval_secs == 0 {
            return Err(invalid(
                "cache.cleanup_interval_secs",
                "must be greater than zero when the cleanup task is enabled",
            ));
        }

        let mut config = CacheConfig::new()
            .with_region(self.region.clone())
            .with_max_sessions(self.max_sessions)
            .with_cleanup_task(self.enable_cleanup_task)
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval_secs))
            .with_max_ended_sessions(self.max_ended_sessions);
        if let Some(secs) = self.ttl_secs {
            config = config.with_ttl(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Links Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Link graph configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksSection {
    /// Region name the graph is registered under.
    pub region: String,
}

impl Default for LinksSection {
    fn default() -> Self {
        Self {
            region: CacheConfig::default().link_region,
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
