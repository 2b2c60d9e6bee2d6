//! Configuration loading and management
//!
//! Handles parsing of `.taskmaster.toml` files and resolution of the task
//! root directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Config file looked up in the current directory.
pub const CONFIG_FILE: &str = ".taskmaster.toml";

/// Root used when neither the command line nor a config file names one.
pub const DEFAULT_TASKS_DIR: &str = "./tasks";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the task tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_dir: Option<PathBuf>,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Folder of the file this config was loaded from
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

/// Search-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result cap used when a caller does not pass one
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Characters of context on each side of a snippet match
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,
}

fn default_max_results() -> usize {
    50
}

fn default_snippet_radius() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            snippet_radius: default_snippet_radius(),
        }
    }
}

/// Store-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long a mutation waits for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        config.source_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Load configuration the way the CLI does
    ///
    /// An explicit path must load. Otherwise `.taskmaster.toml` in `cwd` is
    /// tried, then the per-user config file; a broken implicit file falls back
    /// to defaults with a warning.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidates = std::iter::once(cwd.join(CONFIG_FILE)).chain(user_config_file());
        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            return Ok(match Self::load(&candidate) {
                Ok(config) => {
                    tracing::debug!(path = %candidate.display(), "loaded config");
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %err,
                        "ignoring invalid config"
                    );
                    Self::default()
                }
            });
        }
        Ok(Self::default())
    }

    /// Resolve the task root: override, then config, then `./tasks`.
    ///
    /// A relative `tasks_dir` is taken relative to the config file's folder.
    pub fn resolve_tasks_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = override_dir {
            return dir.to_path_buf();
        }
        match (&self.tasks_dir, &self.source_dir) {
            (Some(dir), Some(base)) if dir.is_relative() => base.join(dir),
            (Some(dir), _) => dir.clone(),
            (None, _) => PathBuf::from(DEFAULT_TASKS_DIR),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.search.default_max_results == 0 {
            return Err(Error::InvalidConfig(
                "search.default_max_results must be >= 1".to_string(),
            ));
        }
        if self.search.snippet_radius == 0 || self.search.snippet_radius > 10_000 {
            return Err(Error::InvalidConfig(
                "search.snippet_radius must be between 1 and 10000".to_string(),
            ));
        }
        if self.store.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.lock_timeout_ms must be >= 1".to_string(),
            ));
        }
        if let Some(dir) = &self.tasks_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "tasks_dir cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "taskmaster")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
