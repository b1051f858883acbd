//! The editor itself: precondition checks, file I/O and snippet rendering.

use std::io::ErrorKind;
use std::path::Path;

use toolbelt_commons::{
    DEFAULT_MAX_RESPONSE_CHARS, ToolError, ToolResult, maybe_truncate, number_lines, split_lines,
};
use tracing::{debug, info};

use crate::command::{EditCommand, EditRequest};
use crate::history::EditHistory;
use crate::listing::list_directory;

pub const DEFAULT_SNIPPET_LINES: usize = 4;
pub const DEFAULT_DIRECTORY_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    /// Context lines shown on each side of an edited region.
    pub snippet_lines: usize,
    pub max_response_chars: usize,
    pub directory_depth: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            snippet_lines: DEFAULT_SNIPPET_LINES,
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
            directory_depth: DEFAULT_DIRECTORY_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathKind {
    File,
    Directory,
    Missing,
}

/// Text-file editor with one undo stack per path.
///
/// Every command checks its preconditions before touching the filesystem,
/// and history is recorded only after a write succeeds, so a rejected or
/// failed call leaves both the file and its history as they were.
#[derive(Debug, Default)]
pub struct FileEditor {
    options: EditorOptions,
    history: EditHistory,
}

impl FileEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            options,
            history: EditHistory::new(),
        }
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Number of undo steps recorded for `path`.
    pub fn history_depth(&self, path: &Path) -> usize {
        self.history.depth(path)
    }

    pub fn clear_history(&self) {
        let tracked = self.history.tracked_paths();
        self.history.clear();
        debug!(tracked, "cleared edit history");
    }

    /// Dispatch a decoded request, checking the fields its command needs.
    pub async fn execute(&self, request: &EditRequest) -> Result<ToolResult, ToolError> {
        let path = request.path.as_path();
        match request.command {
            EditCommand::View => self.view(path, request.view_range.as_deref()).await,
            EditCommand::Create => {
                let file_text = required(request.file_text.as_deref(), "file_text", request.command)?;
                self.create(path, file_text).await
            }
            EditCommand::StrReplace => {
                let old_str = required(request.old_str.as_deref(), "old_str", request.command)?;
                let new_str = required(request.new_str.as_deref(), "new_str", request.command)?;
                self.str_replace(path, old_str, new_str).await
            }
            EditCommand::Insert => {
                let insert_line = required(request.insert_line, "insert_line", request.command)?;
                let new_str = required(request.new_str.as_deref(), "new_str", request.command)?;
                self.insert(path, insert_line, new_str).await
            }
            EditCommand::UndoEdit => self.undo_edit(path).await,
        }
    }

    /// Show a file (whole, or a 1-based inclusive line range) or list a directory.
    ///
    /// A whole-file view returns the content exactly as stored; a ranged view
    /// is rendered with line numbers. An end of `-1` means the last line.
    pub async fn view(&self, path: &Path, view_range: Option<&[i64]>) -> Result<ToolResult, ToolError> {
        if check_path(EditCommand::View, path).await? == PathKind::Directory {
            if view_range.is_some() {
                return Err(ToolError::invalid_argument(
                    "The `view_range` parameter is not allowed when `path` points to a directory.",
                ));
            }
            let depth = self.options.directory_depth;
            let listing = list_directory(path, depth).join("\n");
            let rendered = format!(
                "Here's the files and directories up to {depth} levels deep in {}, excluding hidden items:\n{listing}\n",
                path.display()
            );
            return Ok(ToolResult::output(self.clip(&rendered)));
        }

        let content = read_file(path).await?;
        let Some(range) = view_range else {
            return Ok(ToolResult::output(self.clip(&content)));
        };

        let (lines, _) = split_lines(&content);
        let (start, end) = resolve_view_range(range, lines.len())?;
        let rendered = number_lines(lines[start - 1..end].iter().copied(), start);
        Ok(ToolResult::output(self.clip(&rendered)))
    }

    /// Write `file_text` to a path that does not exist yet, creating parent
    /// directories as needed.
    pub async fn create(&self, path: &Path, file_text: &str) -> Result<ToolResult, ToolError> {
        check_path(EditCommand::Create, path).await?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("create directory", parent, e))?;
        }
        write_file(path, file_text).await?;
        self.history.push(path, file_text.to_string());

        info!(path = %path.display(), bytes = file_text.len(), "created file");
        Ok(ToolResult::output(format!(
            "File created successfully at: {}",
            path.display()
        )))
    }

    /// Replace the single occurrence of `old_str` with `new_str`.
    pub async fn str_replace(
        &self,
        path: &Path,
        old_str: &str,
        new_str: &str,
    ) -> Result<ToolResult, ToolError> {
        check_path(EditCommand::StrReplace, path).await?;
        if old_str.is_empty() {
            return Err(ToolError::invalid_argument(
                "Parameter `old_str` must not be empty for command: str_replace",
            ));
        }

        let content = read_file(path).await?;
        let offsets: Vec<usize> = content.match_indices(old_str).map(|(at, _)| at).collect();
        let offset = match offsets.as_slice() {
            [] => {
                return Err(ToolError::not_found(format!(
                    "No replacement was performed, old_str `{old_str}` did not appear verbatim in {}.",
                    path.display()
                )));
            }
            [only] => *only,
            many => {
                let mut lines: Vec<usize> = many
                    .iter()
                    .map(|&at| line_index_at(&content, at) + 1)
                    .collect();
                lines.dedup();
                return Err(ToolError::Ambiguous {
                    path: path.to_path_buf(),
                    pattern: old_str.to_string(),
                    lines,
                });
            }
        };

        let mut updated = String::with_capacity(content.len() + new_str.len());
        updated.push_str(&content[..offset]);
        updated.push_str(new_str);
        updated.push_str(&content[offset + old_str.len()..]);

        write_file(path, &updated).await?;
        let edited_line = line_index_at(&content, offset);
        self.history.push(path, content);
        info!(path = %path.display(), line = edited_line + 1, "replaced text");

        let (lines, _) = split_lines(&updated);
        let span = new_str.matches('\n').count() + 1;
        let snippet = self.snippet(&lines, edited_line, span);
        Ok(ToolResult::output(format!(
            "The file {path} has been edited. Here's the result of running `cat -n` on a snippet of {path}:\n{snippet}\nReview the changes and make sure they are as expected. Edit the file again if necessary.",
            path = path.display()
        )))
    }

    /// Insert `new_str` after line `insert_line` (0 prepends).
    pub async fn insert(
        &self,
        path: &Path,
        insert_line: i64,
        new_str: &str,
    ) -> Result<ToolResult, ToolError> {
        check_path(EditCommand::Insert, path).await?;

        let content = read_file(path).await?;
        let (lines, trailing_newline) = split_lines(&content);
        let at = usize::try_from(insert_line)
            .ok()
            .filter(|&at| at <= lines.len())
            .ok_or_else(|| {
                ToolError::invalid_range(format!(
                    "Invalid `insert_line` parameter: {insert_line}. It should be within the range of lines of the file: [0, {}]",
                    lines.len()
                ))
            })?;

        let (mut inserted, inserted_trailing) = split_lines(new_str);
        if inserted.is_empty() {
            inserted.push("");
        }
        let inserted_len = inserted.len();

        let mut combined = Vec::with_capacity(lines.len() + inserted_len);
        combined.extend_from_slice(&lines[..at]);
        combined.extend(inserted);
        combined.extend_from_slice(&lines[at..]);

        let mut updated = combined.join("\n");
        if trailing_newline || (lines.is_empty() && inserted_trailing) {
            updated.push('\n');
        }

        write_file(path, &updated).await?;
        info!(path = %path.display(), after_line = at, lines = inserted_len, "inserted text");
        let snippet = self.snippet(&combined, at, inserted_len);
        self.history.push(path, content);

        Ok(ToolResult::output(format!(
            "The file {} has been edited. Here's the result of running `cat -n` on a snippet of the edited file:\n{snippet}\nReview the changes and make sure they are as expected (correct indentation, no duplicate lines, etc). Edit the file again if necessary.",
            path.display()
        )))
    }

    /// Restore the content recorded before the most recent edit of `path`.
    pub async fn undo_edit(&self, path: &Path) -> Result<ToolResult, ToolError> {
        check_path(EditCommand::UndoEdit, path).await?;

        let previous = self.history.pop(path).ok_or_else(|| ToolError::NoHistory {
            path: path.to_path_buf(),
        })?;
        if let Err(error) = write_file(path, &previous).await {
            self.history.push(path, previous);
            return Err(error);
        }
        info!(path = %path.display(), remaining = self.history.depth(path), "undid last edit");

        let (lines, _) = split_lines(&previous);
        let rendered = number_lines(lines, 1);
        Ok(ToolResult::output(format!(
            "Last edit to {path} undone successfully. Here's the result of running `cat -n` on {path}:\n{}\n",
            self.clip(&rendered),
            path = path.display()
        )))
    }

    /// Numbered window around `span` lines starting at 0-based `first`.
    fn snippet(&self, lines: &[&str], first: usize, span: usize) -> String {
        let context = self.options.snippet_lines;
        let start = first.saturating_sub(context).min(lines.len());
        let end = first
            .saturating_add(span)
            .saturating_add(context)
            .min(lines.len());
        number_lines(lines[start..end].iter().copied(), start + 1)
    }

    fn clip(&self, text: &str) -> String {
        maybe_truncate(text, self.options.max_response_chars).into_owned()
    }
}

fn required<T>(value: Option<T>, name: &str, command: EditCommand) -> Result<T, ToolError> {
    value.ok_or_else(|| {
        ToolError::invalid_argument(format!("Parameter `{name}` is required for command: {command}"))
    })
}

/// Validate `path` for `command` and report what it points at.
async fn check_path(command: EditCommand, path: &Path) -> Result<PathKind, ToolError> {
    if !path.is_absolute() {
        let suggestion = std::env::current_dir()
            .map(|cwd| cwd.join(path).display().to_string())
            .unwrap_or_else(|_| format!("/{}", path.display()));
        return Err(ToolError::invalid_argument(format!(
            "The path {} is not an absolute path, it should start with `/`. Maybe you meant {suggestion}?",
            path.display()
        )));
    }

    let kind = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => PathKind::Directory,
        Ok(_) => PathKind::File,
        Err(error) if error.kind() == ErrorKind::NotFound => PathKind::Missing,
        Err(error) => return Err(ToolError::io("inspect", path, error)),
    };

    match (command, kind) {
        (EditCommand::Create, PathKind::Missing) => Ok(kind),
        (EditCommand::Create, _) => Err(ToolError::invalid_argument(format!(
            "File already exists at: {}. Cannot overwrite files using command `create`.",
            path.display()
        ))),
        (_, PathKind::Missing) => Err(ToolError::not_found(format!(
            "The path {} does not exist. Please provide a valid path.",
            path.display()
        ))),
        (command, PathKind::Directory) if command.is_mutating() => {
            Err(ToolError::invalid_argument(format!(
                "The path {} is a directory and only the `view` command can be used on directories",
                path.display()
            )))
        }
        _ => Ok(kind),
    }
}

/// Turn a `[start, end]` request into 1-based inclusive bounds within `total` lines.
fn resolve_view_range(range: &[i64], total: usize) -> Result<(usize, usize), ToolError> {
    let &[start, end] = range else {
        return Err(ToolError::invalid_argument(
            "Invalid `view_range`. It should be a list of two integers.",
        ));
    };
    let shown = format!("[{start}, {end}]");

    let first = usize::try_from(start)
        .ok()
        .filter(|&first| first >= 1 && first <= total)
        .ok_or_else(|| {
            ToolError::invalid_range(format!(
                "Invalid `view_range`: {shown}. Its first element `{start}` should be within the range of lines of the file: [1, {total}]"
            ))
        })?;

    if end == -1 {
        return Ok((first, total));
    }
    let last = usize::try_from(end).map_err(|_| {
        ToolError::invalid_range(format!(
            "Invalid `view_range`: {shown}. Its second element `{end}` should be `-1` or a line number"
        ))
    })?;
    if last < first {
        return Err(ToolError::invalid_range(format!(
            "Invalid `view_range`: {shown}. Its second element `{end}` should be larger or equal than its first `{start}`"
        )));
    }
    if last > total {
        return Err(ToolError::invalid_range(format!(
            "Invalid `view_range`: {shown}. Its second element `{end}` should be smaller than the number of lines in the file: `{total}`"
        )));
    }
    Ok((first, last))
}

/// 0-based line containing byte offset `at`.
fn line_index_at(content: &str, at: usize) -> usize {
    content[..at].matches('\n').count()
}

async fn read_file(path: &Path) -> Result<String, ToolError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ToolError::io("read", path, e))
}

async fn write_file(path: &Path, content: &str) -> Result<(), ToolError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ToolError::io("write", path, e))
}
