//! The tool context handed to the protocol layer.
//!
//! One [`ToolRuntime`] owns the shell session and the editor for the life of
//! the process. The `bash` and `editor` adapters never fail: every error is
//! rendered as `Error: <message>` text for the calling agent.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use toolbelt_bash_runner::{CommandSession, OneShotOptions, SessionOptions};
use toolbelt_commons::{ToolError, ToolResult};
use toolbelt_config::ToolbeltConfig;
use toolbelt_editor::{EditCommand, EditRequest, EditorOptions, FileEditor};
use tracing::{debug, info};

/// Arguments of the `bash` tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BashArgs {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub restart: bool,
}

impl BashArgs {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            restart: false,
        }
    }

    pub fn restart() -> Self {
        Self {
            command: None,
            restart: true,
        }
    }
}

/// Arguments of the `editor` tool, as sent by the agent.
///
/// `command` stays a plain string so an unknown name can be answered with
/// the list of valid ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorArgs {
    pub command: String,
    pub path: String,
    #[serde(default)]
    pub file_text: Option<String>,
    #[serde(default)]
    pub view_range: Option<Vec<i64>>,
    #[serde(default)]
    pub old_str: Option<String>,
    #[serde(default)]
    pub new_str: Option<String>,
    #[serde(default)]
    pub insert_line: Option<i64>,
}

impl EditorArgs {
    pub fn new(command: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    fn into_request(self) -> Result<EditRequest, ToolError> {
        let command: EditCommand = self.command.parse()?;
        Ok(EditRequest {
            command,
            path: PathBuf::from(self.path),
            file_text: self.file_text,
            view_range: self.view_range,
            old_str: self.old_str,
            new_str: self.new_str,
            insert_line: self.insert_line,
        })
    }
}

pub fn session_options(config: &ToolbeltConfig) -> SessionOptions {
    let mut options = SessionOptions {
        shell: config.bash.shell.clone(),
        shell_args: config.bash.shell_args.clone(),
        ..SessionOptions::default()
    }
    .with_timeout(config.bash.timeout())
    .with_poll_interval(config.bash.poll_interval())
    .with_max_output_chars(config.editor.max_response_chars)
    .with_demote_user(config.sandbox.demote_user().map(str::to_owned));
    if let Some(dir) = config.bash.working_dir() {
        options = options.with_working_dir(dir);
    }
    options
}

pub fn editor_options(config: &ToolbeltConfig) -> EditorOptions {
    EditorOptions {
        snippet_lines: config.editor.snippet_lines,
        max_response_chars: config.editor.max_response_chars,
        directory_depth: config.editor.directory_depth,
    }
}

pub fn one_shot_options(config: &ToolbeltConfig) -> OneShotOptions {
    OneShotOptions {
        timeout: config.sandbox.one_shot_timeout(),
        max_output_chars: config.editor.max_response_chars,
        working_dir: config.bash.working_dir(),
        demote_user: config.sandbox.demote_user().map(str::to_owned),
    }
}

/// Owner of the process-wide shell session and editor.
///
/// Calls into the shell are serialized by the session mutex; editor calls
/// run concurrently with them.
#[derive(Default)]
pub struct ToolRuntime {
    session: Option<Mutex<CommandSession>>,
    editor: Option<FileEditor>,
}

impl ToolRuntime {
    /// A runtime with no tools; every call reports "not initialized".
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Build both tools from `config`. The shell itself starts on first use.
    pub fn initialize(config: &ToolbeltConfig) -> Self {
        info!(
            shell = %config.bash.shell,
            timeout_secs = config.bash.timeout_seconds,
            "initializing tools"
        );
        Self {
            session: Some(Mutex::new(CommandSession::new(session_options(config)))),
            editor: Some(FileEditor::new(editor_options(config))),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some() && self.editor.is_some()
    }

    /// Stop the shell and drop both tools, including all edit history.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.into_inner().stop().await;
        }
        if let Some(editor) = self.editor.take() {
            editor.clear_history();
        }
        info!("tools shut down");
    }

    /// Run the `bash` tool and render its result as text.
    pub async fn bash(&self, args: BashArgs) -> String {
        let Some(session) = &self.session else {
            return render_error(&ToolError::NotInitialized { tool: "Bash" });
        };

        let mut session = session.lock().await;
        match session.run(args.command.as_deref(), args.restart).await {
            Ok(result) => render_bash(&result),
            Err(error) => {
                debug!(%error, "bash tool call failed");
                render_error(&error)
            }
        }
    }

    /// Run the `editor` tool and render its result as text.
    pub async fn editor(&self, args: EditorArgs) -> String {
        let Some(editor) = &self.editor else {
            return render_error(&ToolError::NotInitialized { tool: "Editor" });
        };

        let outcome = match args.into_request() {
            Ok(request) => editor.execute(&request).await,
            Err(error) => Err(error),
        };
        match outcome {
            Ok(result) => render_editor(result),
            Err(error) => {
                debug!(%error, "editor tool call failed");
                render_error(&error)
            }
        }
    }
}

fn render_error(error: &ToolError) -> String {
    format!("Error: {error}")
}

/// Output, then stderr on its own line, falling back to the system message.
/// A non-zero exit status is appended as a note.
fn render_bash(result: &ToolResult) -> String {
    let output = result.output.as_deref().unwrap_or_default();
    let mut text = match result.error.as_deref() {
        Some(error) if output.is_empty() => error.to_string(),
        Some(error) => format!("{output}\n{error}").trim().to_string(),
        None => output.to_string(),
    };
    if text.is_empty() {
        text = result.system.clone().unwrap_or_default();
    }

    if let Some(code) = result.exit_code.filter(|&code| code != 0) {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("[exit code: {code}]"));
    }
    text
}

fn render_editor(result: ToolResult) -> String {
    match result.error {
        Some(error) => format!("Error: {error}"),
        None => result.output.unwrap_or_default(),
    }
}
