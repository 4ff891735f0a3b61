//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sessiontier::{
    CacheConfig, Error, InMemoryStore, ListenerRegistry, LocalSessionIdentity, Result,
    SessionData, SessionEvent, SessionId, SessionIdentity, SessionListener, SessionScopedCache,
    SharedStore, Subscription,
};

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared store that can be switched off to simulate an outage.
pub struct FlakyStore {
    inner: InMemoryStore,
    down: AtomicBool,
    reads_down: AtomicBool,
    failed_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(CacheConfig::new()),
            down: AtomicBool::new(false),
            reads_down: AtomicBool::new(false),
            failed_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Fail only `get`, leaving writes and evictions working.
    pub fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    pub fn failed_calls(&self) -> usize {
        self.failed_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
            return Err(Error::SharedStoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl SharedStore for FlakyStore {
    fn get(&self, session_id: &SessionId) -> Result<Option<SessionData>> {
        self.check()?;
        if self.reads_down.load(Ordering::SeqCst) {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
            return Err(Error::SharedStoreUnavailable("read timed out".to_string()));
        }
        self.inner.get(session_id)
    }

    fn put(&self, session_id: &SessionId, data: SessionData) -> Result<()> {
        self.check()?;
        self.inner.put(session_id, data)
    }

    fn evict(&self, session_id: &SessionId) -> Result<()> {
        self.check()?;
        self.inner.evict(session_id)
    }
}

pub type MemoryCache = SessionScopedCache<Arc<InMemoryStore>, Arc<LocalSessionIdentity>>;

pub type FlakyCache = SessionScopedCache<Arc<FlakyStore>, Arc<LocalSessionIdentity>>;

/// Cache over a [`FlakyStore`], with handles to both collaborators.
pub fn flaky_cache() -> (FlakyCache, Arc<FlakyStore>, Arc<LocalSessionIdentity>) {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let identity = Arc::new(LocalSessionIdentity::new());
    let cache = SessionScopedCache::new(CacheConfig::new(), store.clone(), identity.clone());
    (cache, store, identity)
}

/// Cache over an in-memory store, with handles to both collaborators.
pub fn memory_cache() -> (MemoryCache, Arc<InMemoryStore>, Arc<LocalSessionIdentity>) {
    init_tracing();
    let config = CacheConfig::new();
    let store = Arc::new(InMemoryStore::new(config.clone()));
    let identity = Arc::new(LocalSessionIdentity::new());
    let cache = SessionScopedCache::new(config, store.clone(), identity.clone());
    (cache, store, identity)
}

thread_local! {
    static THREAD_SESSION: RefCell<Option<SessionId>> = const { RefCell::new(None) };
}

/// Identity whose current session is tracked per thread, so concurrent
/// workers can act for different sessions at once.
#[derive(Default)]
pub struct ThreadSessionIdentity {
    listeners: ListenerRegistry,
}

impl ThreadSessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Act for `session_id` on the calling thread.
    pub fn enter(&self, session_id: &SessionId) {
        THREAD_SESSION.with_borrow_mut(|current| *current = Some(session_id.clone()));
    }

    pub fn expire(&self, session_id: &SessionId) -> usize {
        self.listeners.notify(SessionEvent::Expired, session_id)
    }
}

impl SessionIdentity for ThreadSessionIdentity {
    fn current_session_id(&self) -> Result<SessionId> {
        THREAD_SESSION
            .with_borrow(|current| current.clone())
            .ok_or(Error::NoActiveSession)
    }

    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        self.listeners.register(listener)
    }
}
