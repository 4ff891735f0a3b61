//! Session-scoped caching for multi-user servers.
//!
//! This crate provides two caches whose contents live exactly as long as
//! the session that owns them:
//! - [`SessionScopedCache`]: per-session key/value data with a per-request
//!   local tier and a write-through shared tier, guarded by an ownership tag
//! - [`LinkGraphCache`]: a directed link graph whose edges leaving a session
//!   node are cascade-purged when the session ends
//!
//! Both subscribe to a [`SessionIdentity`] and purge their state when it
//! reports a session as expired or stopped.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sessiontier::{
//!     CacheConfig, ExecutionContext, InMemoryStore, LocalSessionIdentity, SessionScopedCache,
//! };
//!
//! let config = CacheConfig::default().with_max_sessions(1000);
//! let identity = Arc::new(LocalSessionIdentity::new());
//! let store = InMemoryStore::new(config.clone());
//! let cache = SessionScopedCache::new(config, store, identity.clone());
//!
//! identity.begin();
//! let mut ctx = ExecutionContext::new();
//! cache.set(&mut ctx, "theme", serde_json::json!("dark"))?;
//! ```

mod cache;
mod config;
mod context;
mod data;
mod error;
mod graph;
mod identity;
mod links;
mod memory;
mod store;
mod ttl;

pub use cache::SessionScopedCache;
pub use config::CacheConfig;
pub use context::ExecutionContext;
pub use data::{SessionData, SessionId};
pub use error::{Error, Result};
pub use graph::{LinkGraph, NodeId};
pub use identity::{
    ListenerRegistry, LocalSessionIdentity, SessionEvent, SessionIdentity, SessionListener,
    Subscription,
};
pub use links::LinkGraphCache;
pub use memory::{InMemoryStore, StoreStats};
pub use store::{NoSharedStore, SharedStore};
pub use ttl::TtlTracker;
