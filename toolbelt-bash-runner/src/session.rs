//! Persistent shell session with sentinel-based completion detection.
//!
//! The session keeps one shell process alive across commands so state such
//! as the working directory and exported variables carries over. Each
//! command is followed by an `echo` of a random token plus `$?` on stdout and
//! of the bare token on stderr. Once both markers have arrived the command is
//! done, its exit status is known, and both streams are complete, even when
//! it printed nothing.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use toolbelt_commons::{DEFAULT_MAX_RESPONSE_CHARS, ToolError, ToolResult, truncate_with_dropped};
use tracing::{debug, info, warn};

use crate::capture::{Captured, OutputBuffer};
use crate::demote;
use crate::process_group::{self, DEFAULT_GRACEFUL_TIMEOUT_MS, KillSignal};

pub const DEFAULT_SHELL: &str = "/bin/bash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bytes retained per stream, as a multiple of `max_output_chars`.
const RETAIN_FACTOR: usize = 4;

/// How the shell is launched and how long commands may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub shell: String,
    pub shell_args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_output_chars: usize,
    /// Unprivileged account to run the shell as when the tool is root.
    pub demote_user: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            shell_args: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_output_chars: DEFAULT_MAX_RESPONSE_CHARS,
            demote_user: None,
        }
    }
}

impl SessionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn with_demote_user(mut self, user: Option<String>) -> Self {
        self.demote_user = user;
        self
    }
}

/// Per-command completion marker.
#[derive(Debug)]
struct Sentinel {
    token: String,
}

impl Sentinel {
    fn new() -> Self {
        Self {
            token: format!("__TOOLBELT_DONE_{:016x}__", rand::random::<u64>()),
        }
    }

    /// Shell line printing the token plus the previous exit status to
    /// stdout, then the bare token to stderr.
    fn echo_line(&self) -> String {
        format!("echo \"{token}$?\"; echo \"{token}\" >&2", token = self.token)
    }
}

/// The shell child together with its pipes and reader tasks.
struct ShellProcess {
    child: Child,
    stdin: ChildStdin,
    pid: Option<u32>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    readers: Vec<JoinHandle<()>>,
}

impl ShellProcess {
    fn spawn(options: &SessionOptions) -> Result<Self, ToolError> {
        let mut command = Command::new(&options.shell);
        command
            .args(&options.shell_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("PAGER", "cat")
            .env("GIT_PAGER", "cat")
            .kill_on_drop(true);
        if let Some(dir) = &options.working_dir {
            command.current_dir(dir);
        }

        process_group::isolate(&mut command);
        let demotion = demote::demote(&mut command, options.demote_user.as_deref());

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            program: options.shell.clone(),
            source,
        })?;

        let missing_pipe = |name: &str| ToolError::Spawn {
            program: options.shell.clone(),
            source: std::io::Error::other(format!("{name} pipe was not captured")),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout_pipe = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let retain = options.max_output_chars.saturating_mul(RETAIN_FACTOR);
        let stdout = OutputBuffer::new(retain);
        let stderr = OutputBuffer::new(retain);
        let readers = vec![
            stdout.spawn_reader(stdout_pipe),
            stderr.spawn_reader(stderr_pipe),
        ];

        let pid = child.id();
        info!(
            shell = %options.shell,
            pid = ?pid,
            demoted_to = demotion.as_ref().map(|d| d.user.as_str()),
            "started shell session"
        );

        Ok(Self {
            child,
            stdin,
            pid,
            stdout,
            stderr,
            readers,
        })
    }

    /// `Some(status)` once the shell has exited; the inner code is absent
    /// when it was killed by a signal.
    fn exit_status(&mut self) -> Option<Option<i32>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code()),
            Ok(None) => None,
            Err(error) => {
                debug!(%error, "failed to poll shell status");
                None
            }
        }
    }

    async fn write(&mut self, payload: &str) -> std::io::Result<()> {
        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.flush().await
    }

    /// Non-graceful teardown: kill the whole group, then reap.
    async fn kill(mut self) {
        if let Some(pid) = self.pid
            && let Err(error) = process_group::signal_process_group(pid, KillSignal::Kill)
        {
            warn!(pid, %error, "failed to kill shell process group");
        }
        if let Err(error) = self.child.start_kill() {
            debug!(%error, "shell already gone");
        }
        if let Err(error) = self.child.wait().await {
            warn!(%error, "failed to reap shell process");
        }
        self.abort_readers();
    }

    /// Ask the group to exit, escalating to a kill after `grace`.
    async fn terminate(mut self, grace: Duration) {
        if let Some(pid) = self.pid
            && let Err(error) = process_group::signal_process_group(pid, KillSignal::Term)
        {
            debug!(pid, %error, "failed to signal shell process group");
        }
        let exited = tokio::time::timeout(grace, self.child.wait()).await.is_ok();
        if exited {
            self.abort_readers();
        } else {
            self.kill().await;
        }
    }

    fn abort_readers(&mut self) {
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}

impl Drop for ShellProcess {
    fn drop(&mut self) {
        self.abort_readers();
        if let (Some(pid), Ok(None)) = (self.pid, self.child.try_wait()) {
            let _ = process_group::signal_process_group(pid, KillSignal::Kill);
        }
    }
}

/// A long-lived shell that runs one command at a time.
///
/// The process is started lazily by the first command and replaced only on
/// an explicit restart. Once a command overruns the timeout the session
/// refuses further work until restarted; the overrunning process is left
/// alone until then.
pub struct CommandSession {
    options: SessionOptions,
    process: Option<ShellProcess>,
    timed_out: bool,
}

impl CommandSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            process: None,
            timed_out: false,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// True while a shell process is owned by this session.
    pub fn is_started(&self) -> bool {
        self.process.is_some()
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// Spawn the shell if none is running.
    pub fn start(&mut self) -> Result<(), ToolError> {
        if self.process.is_none() {
            self.process = Some(ShellProcess::spawn(&self.options)?);
        }
        Ok(())
    }

    /// Run `command`, or restart the session when `restart` is set.
    ///
    /// A restart ignores `command` and only reports that it happened. A
    /// non-zero exit status is returned in [`ToolResult::exit_code`] rather
    /// than as an error.
    pub async fn run(
        &mut self,
        command: Option<&str>,
        restart: bool,
    ) -> Result<ToolResult, ToolError> {
        if restart {
            self.restart().await;
            return Ok(ToolResult::system("tool has been restarted."));
        }

        if self.timed_out {
            return Err(ToolError::SessionTimedOut);
        }

        let Some(command) = command.filter(|text| !text.trim().is_empty()) else {
            return Err(ToolError::invalid_argument("no command provided."));
        };

        self.start()?;
        self.execute(command).await
    }

    async fn execute(&mut self, command: &str) -> Result<ToolResult, ToolError> {
        let timeout = self.options.timeout;
        let poll_interval = self.options.poll_interval;
        let max_chars = self.options.max_output_chars;

        let Some(process) = self.process.as_mut() else {
            return Err(ToolError::NotInitialized { tool: "Bash" });
        };

        if let Some(status) = process.exit_status() {
            return Err(ToolError::SessionExited { status });
        }

        let sentinel = Sentinel::new();
        process.stdout.arm(&sentinel.token);
        process.stderr.arm(&sentinel.token);

        let payload = format!("{command}\n{}\n", sentinel.echo_line());
        debug!(command, "running shell command");
        if let Err(error) = process.write(&payload).await {
            debug!(%error, "failed to write to shell stdin");
            return Err(ToolError::SessionExited {
                status: process.exit_status().flatten(),
            });
        }

        let waited = tokio::time::timeout(
            timeout,
            wait_for_completion(&process.stdout, &process.stderr, poll_interval),
        )
        .await;

        let exit_code = match waited {
            Err(_) => {
                self.timed_out = true;
                warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    "shell command timed out; session requires restart"
                );
                return Err(ToolError::CommandTimedOut { timeout });
            }
            Ok(None) => {
                let status = process.exit_status().flatten();
                warn!(?status, "shell exited while running a command");
                return Err(ToolError::SessionExited { status });
            }
            Ok(Some(done)) => done,
        };

        let stdout = process.stdout.take();
        let stderr = process.stderr.take();
        debug!(
            ?exit_code,
            stdout_len = stdout.text.len(),
            stdout_dropped = stdout.dropped_chars,
            stderr_len = stderr.text.len(),
            stderr_dropped = stderr.dropped_chars,
            "shell command finished"
        );

        let mut result = ToolResult::output(render(&stdout, max_chars));
        if let Some(code) = exit_code {
            result = result.with_exit_code(code);
        }
        if !stderr.text.is_empty() || stderr.dropped_chars > 0 {
            result = result.with_error(render(&stderr, max_chars));
        }
        Ok(result)
    }

    /// Kill the current shell (if any) and clear the timed-out state.
    ///
    /// The next command starts a fresh shell.
    pub async fn restart(&mut self) {
        if let Some(process) = self.process.take() {
            process.kill().await;
        }
        self.timed_out = false;
        info!("shell session restarted");
    }

    /// Send the shell a termination signal. Safe to call when nothing runs.
    pub async fn stop(&mut self) {
        if let Some(process) = self.process.take() {
            process
                .terminate(Duration::from_millis(DEFAULT_GRACEFUL_TIMEOUT_MS))
                .await;
            info!("shell session stopped");
        }
    }
}

/// Poll until both streams have shown their marker.
///
/// Yields the exit status from the stdout marker, or `None` when stdout
/// closed first (the shell went away). A closed stderr counts as complete.
async fn wait_for_completion(
    stdout: &OutputBuffer,
    stderr: &OutputBuffer,
    poll_interval: Duration,
) -> Option<Option<i32>> {
    loop {
        tokio::time::sleep(poll_interval).await;
        let stdout_closed = stdout.is_closed();
        let stderr_closed = stderr.is_closed();
        match stdout.completion() {
            Some(done) if stderr_closed || stderr.completion().is_some() => {
                return Some(done.exit_code);
            }
            Some(_) => {}
            None if stdout_closed => return None,
            None => {}
        }
    }
}

fn render(captured: &Captured, max_chars: usize) -> String {
    let text = strip_trailing_newline(&captured.text);
    truncate_with_dropped(text, max_chars, captured.dropped_chars).into_owned()
}

fn strip_trailing_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}
