//! Two-tier session-scoped cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::context::{ExecutionContext, PendingChanges};
use crate::data::{SessionData, SessionId};
use crate::error::Result;
use crate::identity::{SessionIdentity, SessionListener, Subscription};
use crate::store::{NoSharedStore, SharedStore};

/// State shared between the cache and its lifecycle listener.
struct CacheState<S> {
    /// Shared tier.
    store: S,

    /// Recently ended sessions. Local maps they own are never trusted.
    ended: Mutex<LruCache<SessionId, ()>>,

    /// Region name, for logs.
    region: String,
}

impl<S: SharedStore> CacheState<S> {
    fn has_ended(&self, session_id: &SessionId) -> bool {
        self.ended.lock().contains(session_id)
    }

    fn purge(&self, session_id: &SessionId) -> Result<()> {
        self.ended.lock().put(session_id.clone(), ());
        debug!(region = %self.region, session_id = %session_id, "Purging session data");
        self.store.evict(session_id)
    }
}

impl<S: SharedStore> SessionListener for CacheState<S> {
    fn on_expired(&self, session_id: &SessionId) -> Result<()> {
        self.purge(session_id)
    }

    fn on_stopped(&self, session_id: &SessionId) -> Result<()> {
        self.purge(session_id)
    }
}

/// Session-scoped key/value cache with a per-request local tier and a
/// shared tier.
///
/// Reads are served from the [`ExecutionContext`] when the map it holds is
/// tagged with the session resolved for this very call; otherwise the
/// shared tier is consulted and the context refilled. Writes go through to
/// the shared tier immediately.
///
/// Every write stores the session's *whole* map, not just the changed entry.
/// Other contexts of the same session therefore see a consistent snapshot,
/// at the cost of re-storing large maps on each write.
///
/// Shared-tier failures are logged and never returned. While the shared map
/// cannot be read, writes are kept in the context as a change log instead of
/// replacing the stored map; the log is replayed onto the shared map on the
/// first call that can read it again.
pub struct SessionScopedCache<S: SharedStore + 'static, I: SessionIdentity> {
    state: Arc<CacheState<S>>,
    identity: I,
    config: CacheConfig,
    subscription: Subscription,
}

impl<I: SessionIdentity> SessionScopedCache<NoSharedStore, I> {
    /// Create a cache without a shared tier.
    pub fn local_only(config: CacheConfig, identity: I) -> Self {
        Self::new(config, NoSharedStore, identity)
    }
}

impl<S: SharedStore + 'static, I: SessionIdentity> SessionScopedCache<S, I> {
    /// Create a cache and subscribe it to session lifecycle events.
    pub fn new(config: CacheConfig, store: S, identity: I) -> Self {
        let state = Self::build_state(&config, store);
        let subscription = identity.subscribe(state.clone());
        debug!(region = %config.region, "Session cache subscribed to session events");
        Self {
            state,
            identity,
            config,
            subscription,
        }
    }

    /// Create a cache that does not listen for session events.
    ///
    /// Ended sessions are then only purged through
    /// [`purge`](Self::purge) or the `on_session_*` methods.
    pub fn detached(config: CacheConfig, store: S, identity: I) -> Self {
        let state = Self::build_state(&config, store);
        Self {
            state,
            identity,
            config,
            subscription: Subscription::detached(),
        }
    }

    fn build_state(config: &CacheConfig, store: S) -> Arc<CacheState<S>> {
        let cap = NonZeroUsize::new(config.max_ended_sessions).unwrap_or(NonZeroUsize::MIN);
        Arc::new(CacheState {
            store,
            ended: Mutex::new(LruCache::new(cap)),
            region: config.region.clone(),
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The shared tier.
    pub fn store(&self) -> &S {
        &self.state.store
    }

    /// The session identity.
    pub fn identity(&self) -> &I {
        &self.identity
    }

    /// Whether the cache still receives session lifecycle events.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Look up `key` for the current session.
    ///
    /// Returns `Ok(None)` when nothing is stored under the key; a stored
    /// JSON `null` comes back as `Some(Value::Null)`.
    pub fn get(&self, ctx: &mut ExecutionContext, key: &str) -> Result<Option<Value>> {
        let session_id = self.identity.current_session_id()?;
        self.resolve(ctx, &session_id);
        Ok(ctx
            .data()
            .filter(|data| data.is_owned_by(&session_id))
            .and_then(|data| data.get(key).cloned()))
    }

    /// Store `value` under `key` for the current session.
    pub fn set(
        &self,
        ctx: &mut ExecutionContext,
        key: impl Into<String>,
        value: Value,
    ) -> Result<()> {
        let session_id = self.identity.current_session_id()?;
        let lookup = self.resolve(ctx, &session_id);
        self.write(ctx, &session_id, lookup, Change::Set(key.into(), value));
        Ok(())
    }

    /// Remove `key` for the current session, returning the previous value.
    ///
    /// While the shared tier is unreadable only locally held values can be
    /// returned, but the removal is still replayed once it recovers.
    pub fn remove(&self, ctx: &mut ExecutionContext, key: &str) -> Result<Option<Value>> {
        let session_id = self.identity.current_session_id()?;
        let lookup = self.resolve(ctx, &session_id);
        if lookup == Lookup::Missing {
            return Ok(None);
        }
        Ok(self.write(ctx, &session_id, lookup, Change::Remove(key.to_string())))
    }

    /// Serialize `value` and store it under `key`.
    pub fn set_typed<T: Serialize>(
        &self,
        ctx: &mut ExecutionContext,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(ctx, key, value)
    }

    /// Look up `key` and deserialize it.
    pub fn get_typed<T: DeserializeOwned>(
        &self,
        ctx: &mut ExecutionContext,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(ctx, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Drop everything cached for `session_id` and stop trusting local maps
    /// it owns.
    pub fn purge(&self, session_id: &SessionId) -> Result<()> {
        self.state.purge(session_id)
    }

    /// Handle a session expiration. Failures are logged, never returned.
    pub fn on_session_expired(&self, session_id: &SessionId) {
        self.purge_logged(session_id, "expired");
    }

    /// Handle a session stop. Failures are logged, never returned.
    pub fn on_session_stopped(&self, session_id: &SessionId) {
        self.purge_logged(session_id, "stopped");
    }

    /// Whether `session_id` is known to have ended.
    pub fn has_ended(&self, session_id: &SessionId) -> bool {
        self.state.has_ended(session_id)
    }

    fn purge_logged(&self, session_id: &SessionId, event: &str) {
        if let Err(e) = self.state.purge(session_id) {
            warn!(
                region = %self.state.region,
                session_id = %session_id,
                event = event,
                error = %e,
                "Failed to evict session data from shared store"
            );
        }
    }

    /// Make `ctx` hold the current map of `session_id`, if one exists.
    ///
    /// A map owned by anyone else is dropped from the context. A local-only
    /// map left over from an outage is merged into the shared map as soon as
    /// that can be read.
    fn resolve(&self, ctx: &mut ExecutionContext, session_id: &SessionId) -> Lookup {
        if self.state.has_ended(session_id) {
            trace!(session_id = %session_id, "Session has ended, ignoring cached data");
            ctx.clear();
            return Lookup::Missing;
        }

        match ctx.owner() {
            Some(owner) if owner == session_id => {
                if !ctx.has_unsynced_changes() {
                    trace!(session_id = %session_id, "Local session data hit");
                    return Lookup::Current;
                }
                return self.reconcile(ctx, session_id);
            }
            Some(owner) => {
                debug!(
                    session_id = %session_id,
                    previous_owner = %owner,
                    "Local session data belongs to another session, discarding"
                );
                ctx.clear();
            }
            None => {}
        }

        match self.load(session_id) {
            Ok(Some(data)) => {
                trace!(
                    session_id = %session_id,
                    entries = data.len(),
                    "Session data loaded from shared store"
                );
                ctx.install(data);
                Lookup::Current
            }
            Ok(None) => {
                debug!(session_id = %session_id, "Session data miss");
                Lookup::Missing
            }
            Err(_) => Lookup::Unreachable,
        }
    }

    /// Replay the changes held in `ctx` onto the shared map and store the
    /// result. Leaves `ctx` untouched while the shared tier stays unreadable.
    fn reconcile(&self, ctx: &mut ExecutionContext, session_id: &SessionId) -> Lookup {
        let shared = match self.load(session_id) {
            Ok(shared) => shared,
            Err(_) => return Lookup::Unreachable,
        };
        let Some((_, pending)) = ctx.take_unsynced() else {
            return Lookup::Missing;
        };

        let mut data = shared.unwrap_or_else(|| SessionData::new(session_id.clone()));
        debug!(
            session_id = %session_id,
            changes = pending.len(),
            "Replaying local changes onto shared session data"
        );
        for (key, value) in pending {
            match value {
                Some(value) => {
                    data.insert(key, value);
                }
                None => {
                    data.remove(&key);
                }
            }
        }

        self.store_through(session_id, &data);
        ctx.install(data);
        Lookup::Current
    }

    /// Read the shared map of `session_id`. A map tagged for another session
    /// counts as absent; read failures are logged here.
    fn load(&self, session_id: &SessionId) -> Result<Option<SessionData>> {
        match self.state.store.get(session_id) {
            Ok(Some(data)) if data.is_owned_by(session_id) => Ok(Some(data)),
            Ok(Some(data)) => {
                warn!(
                    session_id = %session_id,
                    owner = %data.owner,
                    "Shared store returned data tagged for another session, ignoring"
                );
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(
                    region = %self.state.region,
                    session_id = %session_id,
                    error = %e,
                    "Shared store read failed, using local tier only"
                );
                Err(e)
            }
        }
    }

    /// Apply `change` to the current map and keep the result in `ctx`.
    ///
    /// A complete map is written through to the shared tier. When the shared
    /// map could not be read the change stays local, so a partial map never
    /// replaces the stored one.
    fn write(
        &self,
        ctx: &mut ExecutionContext,
        session_id: &SessionId,
        lookup: Lookup,
        change: Change,
    ) -> Option<Value> {
        if lookup == Lookup::Unreachable {
            let (mut data, mut pending) = ctx
                .take_unsynced()
                .filter(|(data, _)| data.is_owned_by(session_id))
                .unwrap_or_else(|| (SessionData::new(session_id.clone()), PendingChanges::new()));
            change.record(&mut pending);
            let out = change.apply(&mut data);
            debug!(
                session_id = %session_id,
                "Shared store unreadable, keeping change in local tier only"
            );
            ctx.install_unsynced(data, pending);
            return out;
        }

        let existing = match lookup {
            Lookup::Current => ctx.take(),
            _ => None,
        };
        let mut data = existing.unwrap_or_else(|| SessionData::new(session_id.clone()));
        let out = change.apply(&mut data);

        if self.state.has_ended(session_id) {
            debug!(session_id = %session_id, "Session has ended, not writing to shared store");
        } else {
            self.store_through(session_id, &data);
        }

        ctx.install(data);
        out
    }

    fn store_through(&self, session_id: &SessionId, data: &SessionData) {
        if let Err(e) = self.state.store.put(session_id, data.clone()) {
            warn!(
                region = %self.state.region,
                session_id = %session_id,
                error = %e,
                "Shared store write failed, keeping data in local tier only"
            );
        }
    }
}

/// Outcome of looking up the current session's map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// `ctx` holds the session's complete map.
    Current,
    /// The session has no map, or has ended.
    Missing,
    /// The shared tier could not be read.
    Unreachable,
}

/// A single-entry modification.
enum Change {
    Set(String, Value),
    Remove(String),
}

impl Change {
    fn apply(&self, data: &mut SessionData) -> Option<Value> {
        match self {
            Change::Set(key, value) => data.insert(key.clone(), value.clone()),
            Change::Remove(key) => data.remove(key),
        }
    }

    fn record(&self, pending: &mut PendingChanges) {
        match self {
            Change::Set(key, value) => pending.insert(key.clone(), Some(value.clone())),
            Change::Remove(key) => pending.insert(key.clone(), None),
        };
    }
}
