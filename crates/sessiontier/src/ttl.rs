//! TTL tracking for shared-tier entries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::data::SessionId;

/// Tracks per-session expiry deadlines.
///
/// Every access pushes the session's deadline to `now + ttl`. Without a TTL
/// nothing is tracked and nothing expires.
#[derive(Debug)]
pub struct TtlTracker {
    deadlines: HashMap<SessionId, Instant>,
    ttl: Option<Duration>,
}

impl TtlTracker {
    /// Create a tracker. `None` disables expiry.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            deadlines: HashMap::new(),
            ttl,
        }
    }

    /// Extend a session's deadline from now.
    pub fn touch(&mut self, session_id: &SessionId) {
        if let Some(ttl) = self.ttl {
            self.deadlines
                .insert(session_id.clone(), Instant::now() + ttl);
        }
    }

    /// Whether a session's deadline has passed.
    ///
    /// With a TTL configured, a session without a deadline counts as expired.
    pub fn is_expired(&self, session_id: &SessionId) -> bool {
        self.ttl.is_some()
            && self
                .deadlines
                .get(session_id)
                .is_none_or(|deadline| Instant::now() > *deadline)
    }

    /// Forget a session.
    pub fn remove(&mut self, session_id: &SessionId) {
        self.deadlines.remove(session_id);
    }

    /// Forget every session whose deadline has passed and return their ids.
    pub fn drain_expired(&mut self) -> Vec<SessionId> {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.deadlines.retain(|id, deadline| {
            let live = now <= *deadline;
            if !live {
                expired.push(id.clone());
            }
            live
        });
        expired
    }

    /// Number of sessions with a deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether no session has a deadline.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}
