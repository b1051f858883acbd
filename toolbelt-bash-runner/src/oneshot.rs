//! One-shot command execution outside the persistent session.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use toolbelt_commons::{DEFAULT_MAX_RESPONSE_CHARS, ToolError, maybe_truncate};
use tracing::{debug, warn};

use crate::demote;
use crate::process_group::{self, KillSignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotOptions {
    pub timeout: Duration,
    pub max_output_chars: usize,
    pub working_dir: Option<PathBuf>,
    pub demote_user: Option<String>,
}

impl Default for OneShotOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_output_chars: DEFAULT_MAX_RESPONSE_CHARS,
            working_dir: None,
            demote_user: None,
        }
    }
}

/// Captured result of [`run_once`]; both streams are already truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl OneShotOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `command` through `sh -c` once, with stdin closed.
///
/// The child gets its own process group and the same demotion as the
/// persistent shell. On timeout the whole group is killed and
/// [`ToolError::CommandTimedOut`] is returned.
pub async fn run_once(command: &str, options: &OneShotOptions) -> Result<OneShotOutput, ToolError> {
    let mut process = Command::new("sh");
    process
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &options.working_dir {
        process.current_dir(dir);
    }
    process_group::isolate(&mut process);
    demote::demote(&mut process, options.demote_user.as_deref());

    let child = process.spawn().map_err(|source| ToolError::Spawn {
        program: "sh".to_string(),
        source,
    })?;
    let pid = child.id();
    debug!(command, pid = ?pid, "running one-shot command");

    let output = match tokio::time::timeout(options.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ToolError::Spawn {
                program: "sh".to_string(),
                source,
            });
        }
        Err(_) => {
            if let Some(pid) = pid
                && let Err(error) = process_group::signal_process_group(pid, KillSignal::Kill)
            {
                warn!(pid, %error, "failed to kill timed-out command group");
            }
            return Err(ToolError::CommandTimedOut {
                timeout: options.timeout,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(OneShotOutput {
        exit_code: output.status.code(),
        stdout: maybe_truncate(&stdout, options.max_output_chars).into_owned(),
        stderr: maybe_truncate(&stderr, options.max_output_chars).into_owned(),
    })
}
