use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bash::BashConfig;
use crate::debug::DebugConfig;
use crate::editor::EditorConfig;
use crate::sandbox::SandboxConfig;

/// The full `toolbelt.toml` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolbeltConfig {
    #[serde(default)]
    pub bash: BashConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl ToolbeltConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Failed to parse configuration")?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        self.bash.validate()?;
        self.editor.validate()?;
        self.sandbox.validate()?;
        Ok(())
    }
}
