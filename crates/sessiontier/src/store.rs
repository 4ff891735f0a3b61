//! Shared tier abstraction.
//!
//! The shared tier is whatever keyed cache the deployment already runs
//! (an in-process LRU, a distributed cache client, ...). The session cache
//! only needs three operations from it, expressed by [`SharedStore`].
//! Deployments without a shared tier use [`NoSharedStore`], which keeps the
//! session cache on its local tier without any special casing.

use std::sync::Arc;

use crate::data::{SessionData, SessionId};
use crate::error::Result;

/// Keyed store shared by every execution context.
///
/// Implementations must make each call atomic for its key. Returning
/// [`Error::SharedStoreUnavailable`](crate::Error::SharedStoreUnavailable)
/// is the expected way to report an unreachable backend; the session cache
/// degrades to its local tier instead of failing the caller.
pub trait SharedStore: Send + Sync {
    /// Fetch the map stored for a session.
    ///
    /// Return `Ok(None)` when nothing is stored.
    fn get(&self, session_id: &SessionId) -> Result<Option<SessionData>>;

    /// Store the whole map for a session, replacing any previous one.
    fn put(&self, session_id: &SessionId, data: SessionData) -> Result<()>;

    /// Remove whatever is stored for a session. Missing keys are not an error.
    fn evict(&self, session_id: &SessionId) -> Result<()>;
}

impl<S: SharedStore + ?Sized> SharedStore for Arc<S> {
    fn get(&self, session_id: &SessionId) -> Result<Option<SessionData>> {
        (**self).get(session_id)
    }

    fn put(&self, session_id: &SessionId, data: SessionData) -> Result<()> {
        (**self).put(session_id, data)
    }

    fn evict(&self, session_id: &SessionId) -> Result<()> {
        (**self).evict(session_id)
    }
}

/// A no-op shared tier for local-only caching.
///
/// Reads always miss and writes are discarded, so data lives only as long
/// as the execution context holding it.
#[derive(Debug, Clone, Default)]
pub struct NoSharedStore;

impl SharedStore for NoSharedStore {
    fn get(&self, _session_id: &SessionId) -> Result<Option<SessionData>> {
        Ok(None)
    }

    fn put(&self, _session_id: &SessionId, _data: SessionData) -> Result<()> {
        Ok(())
    }

    fn evict(&self, _session_id: &SessionId) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_shared_store_never_hits() {
        let store = NoSharedStore;
        let id = SessionId::from("sess-1");

        store.put(&id, SessionData::new(id.clone())).unwrap();
        assert!(store.get(&id).unwrap().is_none());
        store.evict(&id).unwrap();
    }

    #[test]
    fn test_arc_forwards() {
        let store: Arc<dyn SharedStore> = Arc::new(NoSharedStore);
        let id = SessionId::from("sess-1");
        assert!(store.get(&id).unwrap().is_none());
    }
}
