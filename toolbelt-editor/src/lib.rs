//! File viewing and editing for the toolbelt `editor` tool.
//!
//! [`FileEditor`] implements `view`, `create`, `str_replace`, `insert` and
//! `undo_edit` over absolute paths. Mutations answer with a numbered snippet
//! of the changed region and record the previous content so the most recent
//! edit of each path can be undone. History is in-memory only.

pub mod command;
pub mod editor;
pub mod history;
mod listing;

pub use command::{EditCommand, EditRequest};
pub use editor::{DEFAULT_DIRECTORY_DEPTH, DEFAULT_SNIPPET_LINES, EditorOptions, FileEditor};
pub use history::EditHistory;
