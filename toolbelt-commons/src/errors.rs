use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure conditions reported by the shell and editor tools.
///
/// Every variant renders into a message that is safe to hand back to the
/// calling agent verbatim; the adapter layer prefixes it with `Error: `.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required field is missing or the fields given do not fit the command.
    #[error("{0}")]
    InvalidArgument(String),

    /// A path or pattern does not exist.
    #[error("{0}")]
    NotFound(String),

    /// `old_str` matched more than once, so no replacement was made.
    #[error(
        "No replacement was performed. Multiple occurrences of old_str `{pattern}` in lines {} of {}. Please ensure it is unique",
        format_line_numbers(.lines),
        .path.display()
    )]
    Ambiguous {
        path: PathBuf,
        pattern: String,
        lines: Vec<usize>,
    },

    /// A line range or insert position lies outside the file.
    #[error("{0}")]
    InvalidRange(String),

    /// Undo requested for a path with no recorded edits.
    #[error("No edit history found for {}.", .path.display())]
    NoHistory { path: PathBuf },

    /// A previous command exceeded its budget; the session needs a restart.
    #[error("timed out: bash has not returned in time and must be restarted (call again with restart=true)")]
    SessionTimedOut,

    /// The current command exceeded its budget.
    #[error("timed out: bash has not returned in {} seconds and must be restarted", format_seconds(.timeout))]
    CommandTimedOut { timeout: Duration },

    /// The shell process went away on its own.
    #[error("bash has exited{} and must be restarted (call again with restart=true)", format_status(.status))]
    SessionExited { status: Option<i32> },

    /// The tool layer was called before setup finished or after shutdown.
    #[error("{tool} tool not initialized")]
    NotInitialized { tool: &'static str },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// True when the shell session must be restarted before it is usable again.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            Self::SessionTimedOut | Self::CommandTimedOut { .. } | Self::SessionExited { .. }
        )
    }
}

fn format_line_numbers(lines: &[usize]) -> String {
    let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

fn format_seconds(timeout: &Duration) -> String {
    if timeout.subsec_millis() == 0 {
        timeout.as_secs().to_string()
    } else {
        format!("{:.1}", timeout.as_secs_f64())
    }
}

fn format_status(status: &Option<i32>) -> String {
    match *status {
        Some(code) => format!(" with returncode {code}"),
        None => String::new(),
    }
}
