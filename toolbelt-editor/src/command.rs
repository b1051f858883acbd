//! Editor commands and the request shape the adapter layer decodes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toolbelt_commons::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditCommand {
    View,
    Create,
    StrReplace,
    Insert,
    UndoEdit,
}

impl EditCommand {
    pub const ALL: [Self; 5] = [
        Self::View,
        Self::Create,
        Self::StrReplace,
        Self::Insert,
        Self::UndoEdit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::StrReplace => "str_replace",
            Self::Insert => "insert",
            Self::UndoEdit => "undo_edit",
        }
    }

    /// Whether the command rewrites the file (and therefore records history).
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::View)
    }
}

impl fmt::Display for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditCommand {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str() == value.trim())
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                ToolError::invalid_argument(format!(
                    "Unrecognized command {value}. The allowed commands for the editor tool are: {}",
                    allowed.join(", ")
                ))
            })
    }
}

/// One editor invocation. Which optional fields are required depends on
/// `command`; see [`crate::FileEditor::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub command: EditCommand,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_range: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_line: Option<i64>,
}

impl EditRequest {
    pub fn new(command: EditCommand, path: impl Into<PathBuf>) -> Self {
        Self {
            command,
            path: path.into(),
            file_text: None,
            view_range: None,
            old_str: None,
            new_str: None,
            insert_line: None,
        }
    }

    pub fn view(path: impl Into<PathBuf>) -> Self {
        Self::new(EditCommand::View, path)
    }

    pub fn create(path: impl Into<PathBuf>, file_text: impl Into<String>) -> Self {
        Self::new(EditCommand::Create, path).with_file_text(file_text)
    }

    pub fn str_replace(
        path: impl Into<PathBuf>,
        old_str: impl Into<String>,
        new_str: impl Into<String>,
    ) -> Self {
        let mut request = Self::new(EditCommand::StrReplace, path);
        request.old_str = Some(old_str.into());
        request.new_str = Some(new_str.into());
        request
    }

    pub fn insert(path: impl Into<PathBuf>, insert_line: i64, new_str: impl Into<String>) -> Self {
        let mut request = Self::new(EditCommand::Insert, path);
        request.insert_line = Some(insert_line);
        request.new_str = Some(new_str.into());
        request
    }

    pub fn undo_edit(path: impl Into<PathBuf>) -> Self {
        Self::new(EditCommand::UndoEdit, path)
    }

    pub fn with_file_text(mut self, file_text: impl Into<String>) -> Self {
        self.file_text = Some(file_text.into());
        self
    }

    pub fn with_view_range(mut self, start: i64, end: i64) -> Self {
        self.view_range = Some(vec![start, end]);
        self
    }
}
