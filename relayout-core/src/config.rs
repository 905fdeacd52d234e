//! Configuration management for Relayout
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (RELAYOUT_*)
//! 3. Config file (~/.config/relayout/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::migrate::MigrationOptions;
use crate::{Error, Result};

/// Default worktree path template: worktrees nested in the repository root
pub const DEFAULT_WORKTREE_FORMAT: &str = "{branch}";

/// Migration-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// Worktree path template (`{repo}`, `{branch}`, `{origin}`)
    pub worktree_format: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            worktree_format: DEFAULT_WORKTREE_FORMAT.to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Migration configuration
    pub migrate: MigrateConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/relayout/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("relayout").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - RELAYOUT_WORKTREE_FORMAT: worktree path template
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(format) = std::env::var("RELAYOUT_WORKTREE_FORMAT") {
            self.migrate.worktree_format = format;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, worktree_format: Option<String>) -> Self {
        if let Some(format) = worktree_format {
            self.migrate.worktree_format = format;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(worktree_format: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(worktree_format))
    }

    /// Migration options for this configuration
    pub fn migration_options(&self, repo_name: Option<String>) -> MigrationOptions {
        MigrationOptions {
            worktree_format: self.migrate.worktree_format.clone(),
            repo_name: repo_name.unwrap_or_default(),
        }
    }
}
