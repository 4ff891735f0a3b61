//! Configuration for the session-scoped caches.

use std::time::Duration;

/// Default region name for session data in the shared tier.
pub const DEFAULT_REGION: &str = "session";

/// Default region name for the link graph.
pub const DEFAULT_LINK_REGION: &str = "session-links";

/// Default maximum number of sessions held by the in-memory shared store.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Default number of ended session ids remembered for fast-path rejection.
pub const DEFAULT_MAX_ENDED_SESSIONS: usize = 10_000;

/// Default sweep period for the in-memory store.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the session-scoped caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name of the shared-tier region holding session data maps.
    pub region: String,

    /// Name of the region the link graph is registered under.
    pub link_region: String,

    /// Maximum number of session maps the in-memory store keeps before LRU
    /// eviction.
    pub max_sessions: usize,

    /// Idle time after which the in-memory store forgets a map. `None`
    /// keeps maps until their session ends.
    pub ttl: Option<Duration>,

    /// Sweep idle maps in the background instead of only on lookup.
    pub enable_cleanup_task: bool,

    /// Period between background sweeps.
    pub cleanup_interval: Duration,

    /// How many ended session ids to remember. Local maps owned by a
    /// remembered id are never served from the fast path.
    pub max_ended_sessions: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            link_region: DEFAULT_LINK_REGION.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: None,
            enable_cleanup_task: true,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_ended_sessions: DEFAULT_MAX_ENDED_SESSIONS,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared-tier region name.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the link graph region name.
    pub fn with_link_region(mut self, region: impl Into<String>) -> Self {
        self.link_region = region.into();
        self
    }

    /// Bound the in-memory store to `sessions` maps.
    pub fn with_max_sessions(mut self, sessions: usize) -> Self {
        self.max_sessions = sessions;
        self
    }

    /// Forget maps idle for longer than `idle`.
    pub fn with_ttl(mut self, idle: Duration) -> Self {
        self.ttl = Some(idle);
        self
    }

    /// Keep maps until their session ends.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Turn the background sweep on or off.
    pub fn with_cleanup_task(mut self, on: bool) -> Self {
        self.enable_cleanup_task = on;
        self
    }

    /// Sweep every `every`.
    pub fn with_cleanup_interval(mut self, every: Duration) -> Self {
        self.cleanup_interval = every;
        self
    }

    /// Set how many ended session ids are remembered.
    pub fn with_max_ended_sessions(mut self, max: usize) -> Self {
        self.max_ended_sessions = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new();
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.link_region, DEFAULT_LINK_REGION);
        assert!(config.ttl.is_none());
        assert_eq!(config.cleanup_interval, DEFAULT_CLEANUP_INTERVAL);
    }

    #[test]
    fn test_builder_chain() {
        let config = CacheConfig::new()
            .with_region("carts")
            .with_ttl(Duration::from_secs(5))
            .with_max_ended_sessions(2)
            .without_ttl();
        assert_eq!(config.region, "carts");
        assert_eq!(config.max_ended_sessions, 2);
        assert!(config.ttl.is_none());
    }
}
