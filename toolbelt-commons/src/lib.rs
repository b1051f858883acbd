//! Shared contracts for the toolbelt tool crates.
//!
//! The shell runner and the file editor are independent of each other, but
//! both report through the same [`ToolResult`] value and the same
//! [`ToolError`] taxonomy so the adapter layer can render either one without
//! knowing which tool produced it.

pub mod errors;
pub mod result;
pub mod text;
pub mod truncate;

pub use errors::ToolError;
pub use result::ToolResult;
pub use text::{number_lines, split_lines};
pub use truncate::{DEFAULT_MAX_RESPONSE_CHARS, maybe_truncate, truncate_with_dropped};
