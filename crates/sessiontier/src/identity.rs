//! Session identity and lifecycle notifications.
//!
//! The session framework is an external collaborator. It resolves which
//! session the caller acts for and announces when a session expires or is
//! stopped. [`SessionIdentity`] is the contract the caches rely on;
//! [`ListenerRegistry`] is a ready-made dispatcher for implementations, and
//! [`LocalSessionIdentity`] is a complete in-process implementation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::data::SessionId;
use crate::error::{Error, Result};

/// Terminal session lifecycle events. Both have the same effect on caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The session timed out.
    Expired,
    /// The session was ended explicitly (e.g. logout).
    Stopped,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Expired => write!(f, "expired"),
            SessionEvent::Stopped => write!(f, "stopped"),
        }
    }
}

/// Receiver of session lifecycle events.
///
/// Called on whatever thread the session framework notifies from. Errors
/// are logged by the dispatcher and never reach the framework.
pub trait SessionListener: Send + Sync {
    /// A session timed out.
    fn on_expired(&self, session_id: &SessionId) -> Result<()>;

    /// A session was stopped.
    fn on_stopped(&self, session_id: &SessionId) -> Result<()>;
}

/// Resolves the current session and publishes lifecycle events.
pub trait SessionIdentity: Send + Sync {
    /// Session the caller currently acts for.
    ///
    /// Fails with [`Error::NoActiveSession`] when there is none.
    fn current_session_id(&self) -> Result<SessionId>;

    /// Register a listener for expiration and stop events.
    ///
    /// The listener stays registered until the returned handle is cancelled
    /// or dropped.
    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> Subscription;
}

impl<I: SessionIdentity + ?Sized> SessionIdentity for Arc<I> {
    fn current_session_id(&self) -> Result<SessionId> {
        (**self).current_session_id()
    }

    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        (**self).subscribe(listener)
    }
}

struct RegistryInner {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Arc<dyn SessionListener>)>>,
}

impl RegistryInner {
    fn unregister(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

/// Listener collection with isolated dispatch.
///
/// A failing or panicking listener is logged and skipped; the remaining
/// listeners still run.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Add a listener.
    pub fn register(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.listeners.read().is_empty()
    }

    /// Deliver an event to every listener. Returns how many listeners failed.
    pub fn notify(&self, event: SessionEvent, session_id: &SessionId) -> usize {
        // Snapshot so listeners may subscribe or cancel while being notified.
        let listeners: Vec<Arc<dyn SessionListener>> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        debug!(
            session_id = %session_id,
            event = %event,
            listeners = listeners.len(),
            "Dispatching session event"
        );

        let mut failures = 0;
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
                SessionEvent::Expired => listener.on_expired(session_id),
                SessionEvent::Stopped => listener.on_stopped(session_id),
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!(
                        session_id = %session_id,
                        event = %event,
                        error = %e,
                        "Session listener failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    error!(session_id = %session_id, event = %event, "Session listener panicked");
                }
            }
        }
        failures
    }
}

/// Handle for a registered listener.
///
/// Dropping the handle unsubscribes the listener.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    /// A handle that is not attached to any registry.
    ///
    /// For identities that never publish lifecycle events.
    pub fn detached() -> Self {
        Self {
            id: 0,
            registry: Weak::new(),
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|r| r.listeners.read().iter().any(|(lid, _)| *lid == self.id))
    }

    /// Unsubscribe now.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// In-process session identity.
///
/// Tracks a single current session and fires lifecycle events
/// synchronously on the calling thread. Useful for embedding in a
/// single-user process and as a stand-in for a real session framework.
#[derive(Default)]
pub struct LocalSessionIdentity {
    current: RwLock<Option<SessionId>>,
    listeners: ListenerRegistry,
}

impl LocalSessionIdentity {
    /// Create an identity with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session with a generated id and make it current.
    pub fn begin(&self) -> SessionId {
        let id = SessionId::generate();
        self.switch_to(id.clone());
        id
    }

    /// Make `session_id` the current session.
    pub fn switch_to(&self, session_id: impl Into<SessionId>) {
        *self.current.write() = Some(session_id.into());
    }

    /// Leave the current session without ending it.
    pub fn end_current(&self) {
        *self.current.write() = None;
    }

    /// Expire a session and notify listeners.
    pub fn expire(&self, session_id: &SessionId) -> usize {
        self.finish(SessionEvent::Expired, session_id)
    }

    /// Stop a session and notify listeners.
    pub fn stop(&self, session_id: &SessionId) -> usize {
        self.finish(SessionEvent::Stopped, session_id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn finish(&self, event: SessionEvent, session_id: &SessionId) -> usize {
        {
            let mut current = self.current.write();
            if current.as_ref() == Some(session_id) {
                *current = None;
            }
        }
        self.listeners.notify(event, session_id)
    }
}

impl SessionIdentity for LocalSessionIdentity {
    fn current_session_id(&self) -> Result<SessionId> {
        self.current.read().clone().ok_or(Error::NoActiveSession)
    }

    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> Subscription {
        self.listeners.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(SessionEvent, SessionId)>>,
    }

    impl SessionListener for Recorder {
        fn on_expired(&self, session_id: &SessionId) -> Result<()> {
            self.seen
                .lock()
                .push((SessionEvent::Expired, session_id.clone()));
            Ok(())
        }

        fn on_stopped(&self, session_id: &SessionId) -> Result<()> {
            self.seen
                .lock()
                .push((SessionEvent::Stopped, session_id.clone()));
            Ok(())
        }
    }

    struct Failing;

    impl SessionListener for Failing {
        fn on_expired(&self, _session_id: &SessionId) -> Result<()> {
            Err(Error::Listener("boom".to_string()))
        }

        fn on_stopped(&self, _session_id: &SessionId) -> Result<()> {
            panic!("listener panic");
        }
    }

    #[test]
    fn test_no_active_session() {
        let identity = LocalSessionIdentity::new();
        assert!(matches!(
            identity.current_session_id(),
            Err(Error::NoActiveSession)
        ));
    }

    #[test]
    fn test_begin_and_switch() {
        let identity = LocalSessionIdentity::new();
        let first = identity.begin();
        assert_eq!(identity.current_session_id().unwrap(), first);

        identity.switch_to("sess-2");
        assert_eq!(identity.current_session_id().unwrap().as_str(), "sess-2");

        identity.end_current();
        assert!(identity.current_session_id().is_err());
    }

    #[test]
    fn test_events_reach_listeners() {
        let identity = LocalSessionIdentity::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = identity.subscribe(recorder.clone());

        identity.expire(&SessionId::from("a"));
        identity.stop(&SessionId::from("b"));

        let seen = recorder.seen.lock().clone();
        assert_eq!(
            seen,
            vec![
                (SessionEvent::Expired, SessionId::from("a")),
                (SessionEvent::Stopped, SessionId::from("b")),
            ]
        );
    }

    #[test]
    fn test_ending_current_session_clears_it() {
        let identity = LocalSessionIdentity::new();
        identity.switch_to("a");
        identity.expire(&SessionId::from("other"));
        assert!(identity.current_session_id().is_ok());

        identity.expire(&SessionId::from("a"));
        assert!(identity.current_session_id().is_err());
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let registry = ListenerRegistry::new();
        let _failing = registry.register(Arc::new(Failing));
        let recorder = Arc::new(Recorder::default());
        let _sub = registry.register(recorder.clone());

        let id = SessionId::from("a");
        assert_eq!(registry.notify(SessionEvent::Expired, &id), 1);
        assert_eq!(registry.notify(SessionEvent::Stopped, &id), 1);
        assert_eq!(recorder.seen.lock().len(), 2);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let identity = LocalSessionIdentity::new();
        let recorder = Arc::new(Recorder::default());

        let sub = identity.subscribe(recorder.clone());
        assert!(sub.is_active());
        assert_eq!(identity.listener_count(), 1);

        sub.cancel();
        assert_eq!(identity.listener_count(), 0);

        identity.expire(&SessionId::from("a"));
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn test_detached_subscription_is_inactive() {
        let sub = Subscription::detached();
        assert!(!sub.is_active());
    }
}
