//! Configuration for the toolbelt binary.
//!
//! Every section deserializes with defaults, so an empty `toolbelt.toml` (or
//! no file at all) yields a working configuration. [`ConfigManager`] resolves
//! which file to read and validates the result.

pub mod bash;
pub mod debug;
pub mod editor;
pub mod loader;
pub mod sandbox;

pub use bash::BashConfig;
pub use debug::{DebugConfig, TraceLevel};
pub use editor::EditorConfig;
pub use loader::{CONFIG_FILE_NAME, ConfigManager, ConfigSource, ToolbeltConfig};
pub use sandbox::SandboxConfig;
