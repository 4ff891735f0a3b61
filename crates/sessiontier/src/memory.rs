//! In-process shared tier with LRU eviction and TTL support.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::data::{SessionData, SessionId};
use crate::error::Result;
use crate::store::SharedStore;
use crate::ttl::TtlTracker;

/// Inner state protected by a mutex.
struct StoreInner {
    /// LRU map of session data.
    lru: LruCache<SessionId, SessionData>,

    /// TTL tracker for expiration.
    ttl: TtlTracker,
}

/// Shared tier kept in process memory.
///
/// Suitable when every execution context lives in the same process. The
/// store is bounded by `max_sessions` (least recently used maps are dropped
/// first) and, when a TTL is configured, forgets maps that were not touched
/// within it.
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
    config: CacheConfig,
}

impl InMemoryStore {
    /// Create a store sized by the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN);

        let inner = StoreInner {
            lru: LruCache::new(cap),
            ttl: TtlTracker::new(config.ttl),
        };

        Self {
            inner: Mutex::new(inner),
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the current number of stored maps.
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Check if a live map is stored for a session (without touching it).
    pub fn contains(&self, session_id: &SessionId) -> bool {
        let inner = self.inner.lock();
        inner.lru.contains(session_id) && !inner.ttl.is_expired(session_id)
    }

    /// Drop every map whose TTL has elapsed. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired = inner.ttl.drain_expired();
        let mut count = 0;

        for session_id in expired {
            if inner.lru.pop(&session_id).is_some() {
                debug!(
                    region = %self.config.region,
                    session_id = %session_id,
                    "Cleaning up expired session map"
                );
                count += 1;
            }
        }

        if count > 0 {
            debug!(
                region = %self.config.region,
                count = count,
                "Cleaned up expired session maps"
            );
        }

        count
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            size: inner.lru.len(),
            capacity: inner.lru.cap().get(),
            ttl_tracked: inner.ttl.len(),
        }
    }

    /// Start the periodic TTL sweep on the current tokio runtime.
    ///
    /// Returns `None` when the cleanup task is disabled, no TTL is set or the
    /// interval is zero. The task holds only a weak reference and ends once
    /// the store is dropped.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.cleanup_interval;
        if !self.config.enable_cleanup_task || self.config.ttl.is_none() || interval.is_zero() {
            return None;
        }

        let store = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.cleanup_expired();
            }
        }))
    }
}

impl SharedStore for InMemoryStore {
    fn get(&self, session_id: &SessionId) -> Result<Option<SessionData>> {
        let mut inner = self.inner.lock();

        if inner.ttl.is_expired(session_id) {
            if inner.lru.pop(session_id).is_some() {
                debug!(session_id = %session_id, "Session map expired, removing from store");
            }
            inner.ttl.remove(session_id);
            return Ok(None);
        }

        let data = inner.lru.get(session_id).cloned();
        if data.is_some() {
            trace!(session_id = %session_id, "Session map found in store");
            inner.ttl.touch(session_id);
        }
        Ok(data)
    }

    fn put(&self, session_id: &SessionId, data: SessionData) -> Result<()> {
        let mut inner = self.inner.lock();

        if let Some((evicted_id, _)) = inner.lru.push(session_id.clone(), data)
            && &evicted_id != session_id
        {
            debug!(session_id = %evicted_id, "Evicted LRU session map to make room");
            inner.ttl.remove(&evicted_id);
        }
        inner.ttl.touch(session_id);

        trace!(
            session_id = %session_id,
            store_size = inner.lru.len(),
            "Session map stored"
        );

        Ok(())
    }

    fn evict(&self, session_id: &SessionId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ttl.remove(session_id);
        if inner.lru.pop(session_id).is_some() {
            debug!(session_id = %session_id, "Session map evicted from store");
        }
        Ok(())
    }
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Current number of stored maps.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of sessions being tracked for TTL.
    pub ttl_tracked: usize,
}
