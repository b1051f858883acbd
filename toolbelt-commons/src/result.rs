//! The value every tool operation hands back to the adapter layer.

use serde::{Deserialize, Serialize};

use crate::errors::ToolError;

/// Captured outcome of a tool invocation.
///
/// `output` carries success text, `error` carries failure text written by the
/// tool itself (for example a command's stderr), and `system` carries
/// side-channel status such as "tool has been restarted." A shell command
/// that ran but printed nothing still has `exit_code` set, which keeps it
/// distinguishable from a result that never ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

impl ToolResult {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            system: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, text: impl Into<String>) -> Self {
        self.error = Some(text.into());
        self
    }

    pub fn with_system(mut self, text: impl Into<String>) -> Self {
        self.system = Some(text.into());
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// True when no field carries anything, i.e. the tool did not run.
    pub fn is_empty(&self) -> bool {
        self.output.is_none()
            && self.error.is_none()
            && self.system.is_none()
            && self.exit_code.is_none()
            && self.base64_image.is_none()
    }

    /// Concatenate two results, `self` first.
    ///
    /// Text fields present on both sides are joined with a newline. The first
    /// known exit code wins. Two images cannot be merged.
    pub fn combine(self, other: Self) -> Result<Self, ToolError> {
        if self.base64_image.is_some() && other.base64_image.is_some() {
            return Err(ToolError::invalid_argument(
                "cannot combine two tool results that both carry an image",
            ));
        }

        Ok(Self {
            output: join_field(self.output, other.output),
            error: join_field(self.error, other.error),
            system: join_field(self.system, other.system),
            exit_code: self.exit_code.or(other.exit_code),
            base64_image: self.base64_image.or(other.base64_image),
        })
    }
}

fn join_field(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(mut a), Some(b)) => {
            a.push('\n');
            a.push_str(&b);
            Some(a)
        }
        (a, b) => a.or(b),
    }
}
