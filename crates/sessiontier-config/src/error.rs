//! Errors raised while loading, saving or converting configuration.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file or its directory could not be written.
    #[error("cannot write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config cannot be rendered as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A parsed value that the cache cannot run with.
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}
