use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::loader::config::ToolbeltConfig;

/// File looked up in the workspace when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "toolbelt.toml";

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

/// Loads and validates a [`ToolbeltConfig`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ToolbeltConfig,
    source: ConfigSource,
}

impl ConfigManager {
    /// Load from `explicit` when given, otherwise from the current directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => {
                let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
                Self::load_from_workspace(cwd)
            }
        }
    }

    /// Use `toolbelt.toml` in `workspace` if present, defaults otherwise.
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let candidate = workspace.as_ref().join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Self::load_from_file(&candidate);
        }

        debug!(workspace = %workspace.as_ref().display(), "no config file found; using defaults");
        let config = ToolbeltConfig::default();
        config
            .validate()
            .context("Default configuration failed validation")?;
        Ok(Self {
            config,
            source: ConfigSource::Defaults,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = ToolbeltConfig::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Failed to validate config file: {}", path.display()))?;

        debug!(path = %path.display(), "loaded configuration");
        Ok(Self {
            config,
            source: ConfigSource::File(path.to_path_buf()),
        })
    }

    pub fn config(&self) -> &ToolbeltConfig {
        &self.config
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub fn into_config(self) -> ToolbeltConfig {
        self.config
    }
}
