//! Link graph purged by session lifecycle.
//!
//! Records relationships such as "session S touched resource R" and drops
//! every relationship a session originated once that session ends. Edges
//! that merely point *at* the session node are left alone.

use std::sync::Arc;

use tracing::debug;

use crate::config::CacheConfig;
use crate::data::SessionId;
use crate::error::Result;
use crate::graph::{LinkGraph, NodeId};
use crate::identity::{SessionIdentity, SessionListener, Subscription};

struct LinkState {
    graph: LinkGraph,
    region: String,
}

impl LinkState {
    /// Snapshot the adjacency of `from`, then remove each edge.
    ///
    /// Edges present in the snapshot are always removed. Edges added to
    /// `from` after the snapshot was taken survive.
    fn remove_all_from(&self, from: &NodeId) -> usize {
        let targets = self.graph.adjacent_of(from);
        let removed = targets
            .iter()
            .filter(|to| self.graph.remove_edge(from, to))
            .count();
        if removed > 0 {
            debug!(
                region = %self.region,
                node = %from,
                removed = removed,
                "Removed links from node"
            );
        }
        removed
    }

    fn cascade(&self, session_id: &SessionId) -> usize {
        self.remove_all_from(&NodeId::from(session_id))
    }
}

impl SessionListener for LinkState {
    fn on_expired(&self, session_id: &SessionId) -> Result<()> {
        self.cascade(session_id);
        Ok(())
    }

    fn on_stopped(&self, session_id: &SessionId) -> Result<()> {
        self.cascade(session_id);
        Ok(())
    }
}

/// Link graph whose outgoing edges from a session node are removed when
/// that session expires or stops.
pub struct LinkGraphCache {
    state: Arc<LinkState>,
    subscription: Subscription,
}

impl LinkGraphCache {
    /// Create an empty graph and subscribe it to session lifecycle events.
    pub fn new<I: SessionIdentity + ?Sized>(config: &CacheConfig, identity: &I) -> Self {
        let state = Self::build_state(config);
        let subscription = identity.subscribe(state.clone());
        debug!(region = %config.link_region, "Link graph subscribed to session events");
        Self {
            state,
            subscription,
        }
    }

    /// Create an empty graph that does not listen for session events.
    pub fn detached(config: &CacheConfig) -> Self {
        Self {
            state: Self::build_state(config),
            subscription: Subscription::detached(),
        }
    }

    fn build_state(config: &CacheConfig) -> Arc<LinkState> {
        Arc::new(LinkState {
            graph: LinkGraph::new(),
            region: config.link_region.clone(),
        })
    }

    /// Whether the graph still receives session lifecycle events.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Link `from` to `to`.
    pub fn add_link(&self, from: impl Into<NodeId>, to: impl Into<NodeId>) {
        self.state.graph.add_edge(from.into(), to.into());
    }

    /// Remove the single link `from -> to`, if present.
    pub fn remove_link(&self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> bool {
        self.state.graph.remove_edge(&from.into(), &to.into())
    }

    /// Remove every link leaving `from`. Returns how many were removed.
    pub fn remove_all_links_from(&self, from: impl Into<NodeId>) -> usize {
        self.state.remove_all_from(&from.into())
    }

    /// Nodes `from` links to.
    pub fn links_from(&self, from: impl Into<NodeId>) -> Vec<NodeId> {
        self.state.graph.adjacent_of(&from.into())
    }

    /// Nodes linking to `to`.
    pub fn links_to(&self, to: impl Into<NodeId>) -> Vec<NodeId> {
        self.state.graph.incoming_of(&to.into())
    }

    /// Handle a session expiration. Returns how many links were removed.
    pub fn on_session_expired(&self, session_id: &SessionId) -> usize {
        self.state.cascade(session_id)
    }

    /// Handle a session stop. Returns how many links were removed.
    pub fn on_session_stopped(&self, session_id: &SessionId) -> usize {
        self.state.cascade(session_id)
    }

    /// The underlying graph.
    pub fn graph(&self) -> &LinkGraph {
        &self.state.graph
    }
}
