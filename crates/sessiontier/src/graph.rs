//! Directed link graph over opaque identifiers.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::data::SessionId;

/// Graph node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&SessionId> for NodeId {
    fn from(id: &SessionId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl From<SessionId> for NodeId {
    fn from(id: SessionId) -> Self {
        Self::from(&id)
    }
}

#[derive(Debug, Default)]
struct Edges {
    /// Targets per source, in insertion order.
    outgoing: HashMap<NodeId, Vec<NodeId>>,

    /// Sources per target, in insertion order.
    incoming: HashMap<NodeId, Vec<NodeId>>,
}

/// Set of directed edges `(from, to)`.
///
/// Adding an edge that already exists changes nothing, so a single removal
/// always removes the relationship completely. Both directions are indexed
/// under one lock, so every operation is atomic.
#[derive(Debug, Default)]
pub struct LinkGraph {
    edges: RwLock<Edges>,
}

impl LinkGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the edge `from -> to`. Returns false if it already existed.
    pub fn add_edge(&self, from: NodeId, to: NodeId) -> bool {
        let mut edges = self.edges.write();
        let targets = edges.outgoing.entry(from.clone()).or_default();
        if targets.contains(&to) {
            return false;
        }
        targets.push(to.clone());
        edges.incoming.entry(to).or_default().push(from);
        true
    }

    /// Remove the edge `from -> to`. Returns false if there was none.
    pub fn remove_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut edges = self.edges.write();
        if !detach(&mut edges.outgoing, from, to) {
            return false;
        }
        detach(&mut edges.incoming, to, from);
        true
    }

    /// Targets of every edge leaving `from`. Empty when there are none.
    pub fn adjacent_of(&self, from: &NodeId) -> Vec<NodeId> {
        self.edges
            .read()
            .outgoing
            .get(from)
            .cloned()
            .unwrap_or_default()
    }

    /// Sources of every edge entering `to`. Empty when there are none.
    pub fn incoming_of(&self, to: &NodeId) -> Vec<NodeId> {
        self.edges
            .read()
            .incoming
            .get(to)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the edge `from -> to` exists.
    pub fn contains_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        self.edges
            .read()
            .outgoing
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.read().outgoing.values().map(Vec::len).sum()
    }

    /// Number of nodes with at least one edge.
    pub fn node_count(&self) -> usize {
        let edges = self.edges.read();
        let mut count = edges.outgoing.len();
        count += edges
            .incoming
            .keys()
            .filter(|node| !edges.outgoing.contains_key(*node))
            .count();
        count
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.read().outgoing.is_empty()
    }
}

/// Remove `value` from `index[key]`, dropping the key once its list is empty.
fn detach(index: &mut HashMap<NodeId, Vec<NodeId>>, key: &NodeId, value: &NodeId) -> bool {
    let Some(values) = index.get_mut(key) else {
        return false;
    };
    let Some(pos) = values.iter().position(|v| v == value) else {
        return false;
    };
    values.remove(pos);
    if values.is_empty() {
        index.remove(key);
    }
    true
}
