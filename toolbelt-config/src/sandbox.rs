use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Identity and limits for spawned processes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Unprivileged account used for children when running as root; empty disables.
    #[serde(default = "SandboxConfig::default_demote_user")]
    pub demote_user: String,
    #[serde(default = "SandboxConfig::default_one_shot_timeout_seconds")]
    pub one_shot_timeout_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            demote_user: Self::default_demote_user(),
            one_shot_timeout_seconds: Self::default_one_shot_timeout_seconds(),
        }
    }
}

impl SandboxConfig {
    fn default_demote_user() -> String {
        "ubuntu".to_string()
    }

    const fn default_one_shot_timeout_seconds() -> u64 {
        120
    }

    pub fn demote_user(&self) -> Option<&str> {
        let trimmed = self.demote_user.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn one_shot_timeout(&self) -> Duration {
        Duration::from_secs(self.one_shot_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.one_shot_timeout_seconds >= 1,
            "sandbox.one_shot_timeout_seconds must be at least 1 second"
        );
        Ok(())
    }
}
