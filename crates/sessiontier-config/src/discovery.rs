//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/sessiontier/config.toml` (XDG user config)
//! 2. `./sessiontier.toml` (project-local)

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{ConfigError, Result, SessiontierConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "sessiontier.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "sessiontier";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "SESSIONTIER_CONFIG_DIR";

/// Outcome of checking one config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    /// The file was read and merged.
    Loaded,
    /// No file exists at the path.
    Missing,
    /// The file exists but could not be read or parsed.
    Failed(String),
}

/// One config layer that was considered during discovery.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// What happened when the layer was checked.
    pub state: SourceState,
}

impl ConfigSource {
    /// Whether the layer contributed to the merged config.
    pub fn is_loaded(&self) -> bool {
        self.state == SourceState::Loaded
    }
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: SessiontierConfig,
    /// Layers in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
}

impl LoadedConfig {
    /// Paths of layers that were merged.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.is_loaded())
            .map(|s| s.path.as_path())
            .collect()
    }

    /// One message per layer that exists but could not be used.
    pub fn warnings(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|s| match &s.state {
                SourceState::Failed(reason) => {
                    Some(format!("Failed to load {}: {}", s.path.display(), reason))
                }
                _ => None,
            })
            .collect()
    }
}

/// Discover and merge the user and project config layers.
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    load_config_with_options(project_dir, None)
}

/// Discover and merge config layers with an explicit user config directory.
///
/// `config_dir` overrides both `SESSIONTIER_CONFIG_DIR` and the platform
/// default. Unusable layers are skipped and reported through
/// [`LoadedConfig::warnings`].
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> LoadedConfig {
    let user_layer = config_dir
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .or_else(xdg_config_path);
    let project_layer = project_dir.map_or_else(
        || PathBuf::from(PROJECT_CONFIG_FILE),
        |dir| dir.join(PROJECT_CONFIG_FILE),
    );

    let mut config = SessiontierConfig::new();
    let sources = user_layer
        .into_iter()
        .chain(std::iter::once(project_layer))
        .map(|path| merge_layer(&mut config, path))
        .collect();

    LoadedConfig { config, sources }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<SessiontierConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    SessiontierConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &SessiontierConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Get the user config file path.
///
/// Checks `SESSIONTIER_CONFIG_DIR` first, then falls back to the platform
/// config directory.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the user config directory.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge the file at `path` into `config` if it exists and parses.
fn merge_layer(config: &mut SessiontierConfig, path: PathBuf) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path,
            state: SourceState::Missing,
        };
    }

    let state = match load_config_file(&path) {
        Ok(layer) => {
            debug!(path = %path.display(), "Loaded config layer");
            config.merge(layer);
            SourceState::Loaded
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unusable config layer");
            SourceState::Failed(e.to_string())
        }
    };
    ConfigSource { path, state }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
