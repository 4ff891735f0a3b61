//! Per-request local tier.

use std::collections::HashMap;

use serde_json::Value;

use crate::data::{SessionData, SessionId};

/// Changes made while the shared tier could not be read, keyed by entry.
/// `None` records a removal.
pub(crate) type PendingChanges = HashMap<String, Option<Value>>;

/// Holding place for at most one session's data map, scoped to a single
/// in-flight request.
///
/// Create one at request start, pass it to every cache call made while
/// serving the request, and [`clear`](Self::clear) (or drop) it when the
/// request completes. A context may be reused for a different session; the
/// session cache re-checks the map's ownership tag on every read.
///
/// A map built while the shared tier was unreadable holds only the changes
/// made since; it is never written through as a whole. The session cache
/// replays those changes onto the shared map once it can be read again.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    slot: Option<SessionData>,
    pending: Option<PendingChanges>,
}

impl ExecutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The map currently held, if any.
    pub fn data(&self) -> Option<&SessionData> {
        self.slot.as_ref()
    }

    /// Session owning the held map, if any.
    pub fn owner(&self) -> Option<&SessionId> {
        self.slot.as_ref().map(|d| &d.owner)
    }

    /// Whether the held map carries changes the shared tier has not seen.
    pub fn has_unsynced_changes(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace the held map with one that mirrors the shared tier.
    pub(crate) fn install(&mut self, data: SessionData) {
        self.slot = Some(data);
        self.pending = None;
    }

    /// Replace the held map with a local-only one and its change log.
    pub(crate) fn install_unsynced(&mut self, data: SessionData, pending: PendingChanges) {
        self.slot = Some(data);
        self.pending = Some(pending);
    }

    /// Take the held map out, leaving the slot empty.
    pub(crate) fn take(&mut self) -> Option<SessionData> {
        self.pending = None;
        self.slot.take()
    }

    /// Take out a local-only map together with its change log.
    pub(crate) fn take_unsynced(&mut self) -> Option<(SessionData, PendingChanges)> {
        let pending = self.pending.take()?;
        self.slot.take().map(|data| (data, pending))
    }

    /// Whether the slot is empty.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Drop the held map. Call at the end of the request.
    pub fn clear(&mut self) {
        self.slot = None;
        self.pending = None;
    }
}
