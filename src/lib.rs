//! # toolbelt
//!
//! Two tools for autonomous coding agents, served over a small JSON-lines
//! protocol:
//!
//! - **bash**: a persistent shell session with per-command timeouts and an
//!   explicit restart to recover from a hung or exited shell
//!   ([`toolbelt_bash_runner::CommandSession`]).
//! - **editor**: view, create, replace, insert and undo on text files, with
//!   strict preconditions and per-file undo history
//!   ([`toolbelt_editor::FileEditor`]).
//!
//! Both are owned by a [`ToolRuntime`] built once at startup from
//! `toolbelt.toml` and torn down at shutdown. Adapter calls always return
//! text; failures come back as `Error: ...`.
//!
//! ```bash
//! echo '{"id":1,"tool":"bash","args":{"command":"uname -s"}}' | toolbelt serve
//! ```

pub mod cli;
pub mod runtime;
pub mod server;
pub mod startup;

pub use runtime::{BashArgs, EditorArgs, ToolRuntime};
pub use server::{Response, handle_line, serve};
pub use startup::StartupContext;
