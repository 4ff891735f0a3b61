//! Session identifiers and the per-session data map.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a logical session, as issued by the session framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing session identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Data map owned by exactly one session.
///
/// `owner` is the ownership tag: a map is only authoritative for reads made
/// on behalf of the session it names. Stored JSON `null` values are kept as
/// `Value::Null` and are distinct from a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session entitled to treat this map as current.
    pub owner: SessionId,

    /// Cached entries.
    pub entries: HashMap<String, Value>,

    /// When the map was first created.
    pub created_at: Option<DateTime<Utc>>,

    /// When an entry was last written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Create an empty map tagged with its owning session.
    pub fn new(owner: SessionId) -> Self {
        Self {
            owner,
            entries: HashMap::new(),
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }

    /// Whether this map belongs to `session_id`.
    pub fn is_owned_by(&self, session_id: &SessionId) -> bool {
        &self.owner == session_id
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.updated_at = Some(Utc::now());
        self.entries.insert(key.into(), value)
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.updated_at = Some(Utc::now());
        }
        removed
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_map_is_tagged() {
        let data = SessionData::new(SessionId::from("sess-1"));
        assert!(data.is_owned_by(&SessionId::from("sess-1")));
        assert!(!data.is_owned_by(&SessionId::from("sess-2")));
        assert!(data.is_empty());
        assert!(data.created_at.is_some());
        assert!(data.updated_at.is_none());
    }

    #[test]
    fn test_null_is_distinct_from_missing() {
        let mut data = SessionData::new(SessionId::from("sess-1"));
        data.insert("nothing", Value::Null);

        assert_eq!(data.get("nothing"), Some(&Value::Null));
        assert_eq!(data.get("absent"), None);
    }

    #[test]
    fn test_insert_and_remove_touch_updated_at() {
        let mut data = SessionData::new(SessionId::from("sess-1"));
        assert_eq!(data.insert("k", json!(1)), None);
        assert!(data.updated_at.is_some());
        assert_eq!(data.insert("k", json!(2)), Some(json!(1)));
        assert_eq!(data.remove("k"), Some(json!(2)));
        assert_eq!(data.remove("k"), None);
        assert_eq!(data.len(), 0);
    }

    #[test]
    fn test_session_id_serializes_transparently() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
