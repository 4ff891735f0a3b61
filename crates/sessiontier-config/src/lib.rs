//! Configuration system for sessiontier caches.
//!
//! Provides TOML-based configuration with:
//! - `[cache]` and `[links]` sections mapping onto [`sessiontier::CacheConfig`]
//! - Config file layering (XDG user config + project-local overrides)
//! - Validation when converting into the core configuration

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, SourceState, load_config, load_config_file,
    load_config_with_options, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
