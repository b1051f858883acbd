use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Persistent shell settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BashConfig {
    /// Program started as the persistent shell.
    #[serde(default = "BashConfig::default_shell")]
    pub shell: String,
    /// Extra arguments passed to the shell.
    #[serde(default)]
    pub shell_args: Vec<String>,
    /// Per-command budget in seconds.
    #[serde(default = "BashConfig::default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Delay between checks for command completion, in milliseconds.
    #[serde(default = "BashConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Initial working directory; empty inherits the tool's own.
    #[serde(default)]
    pub working_dir: String,
}

impl Default for BashConfig {
    fn default() -> Self {
        Self {
            shell: Self::default_shell(),
            shell_args: Vec::new(),
            timeout_seconds: Self::default_timeout_seconds(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            working_dir: String::new(),
        }
    }
}

impl BashConfig {
    const MIN_POLL_INTERVAL_MS: u64 = 10;
    const MAX_POLL_INTERVAL_MS: u64 = 5_000;

    fn default_shell() -> String {
        "/bin/bash".to_string()
    }

    const fn default_timeout_seconds() -> u64 {
        120
    }

    const fn default_poll_interval_ms() -> u64 {
        200
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        let trimmed = self.working_dir.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.shell.trim().is_empty(), "bash.shell must not be empty");
        ensure!(
            self.timeout_seconds >= 1,
            "bash.timeout_seconds must be at least 1 second"
        );
        ensure!(
            (Self::MIN_POLL_INTERVAL_MS..=Self::MAX_POLL_INTERVAL_MS)
                .contains(&self.poll_interval_ms),
            "bash.poll_interval_ms must be between {} and {}",
            Self::MIN_POLL_INTERVAL_MS,
            Self::MAX_POLL_INTERVAL_MS
        );
        Ok(())
    }
}
