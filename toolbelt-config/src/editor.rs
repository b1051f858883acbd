use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EditorConfig {
    /// Context lines shown around an edit.
    #[serde(default = "EditorConfig::default_snippet_lines")]
    pub snippet_lines: usize,
    /// Truncation threshold applied to views and command output.
    #[serde(default = "EditorConfig::default_max_response_chars")]
    pub max_response_chars: usize,
    #[serde(default = "EditorConfig::default_directory_depth")]
    pub directory_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snippet_lines: Self::default_snippet_lines(),
            max_response_chars: Self::default_max_response_chars(),
            directory_depth: Self::default_directory_depth(),
        }
    }
}

impl EditorConfig {
    const MIN_RESPONSE_CHARS: usize = 256;
    const MAX_DIRECTORY_DEPTH: usize = 8;

    const fn default_snippet_lines() -> usize {
        4
    }

    const fn default_max_response_chars() -> usize {
        16_000
    }

    const fn default_directory_depth() -> usize {
        2
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_response_chars >= Self::MIN_RESPONSE_CHARS,
            "editor.max_response_chars must be at least {}",
            Self::MIN_RESPONSE_CHARS
        );
        ensure!(
            (1..=Self::MAX_DIRECTORY_DEPTH).contains(&self.directory_depth),
            "editor.directory_depth must be between 1 and {}",
            Self::MAX_DIRECTORY_DEPTH
        );
        Ok(())
    }
}
