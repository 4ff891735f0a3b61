//! Error types for session-scoped cache operations.

/// Error type for session-scoped cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No session could be resolved for the calling context.
    #[error("No active session")]
    NoActiveSession,

    /// The shared tier could not be reached.
    ///
    /// Stores return this; the session cache logs it and keeps serving from
    /// the local tier.
    #[error("Shared store unavailable: {0}")]
    SharedStoreUnavailable(String),

    /// A typed value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A session listener failed while handling a lifecycle event.
    #[error("Listener error: {0}")]
    Listener(String),
}

/// Result type for session-scoped cache operations.
pub type Result<T> = std::result::Result<T, Error>;
