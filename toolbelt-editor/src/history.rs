//! In-memory per-path undo stacks.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use parking_lot::Mutex;

/// Prior file contents keyed by absolute path, most recent last.
///
/// Lives only as long as the editor that owns it; nothing is persisted.
#[derive(Debug, Default)]
pub struct EditHistory {
    stacks: Mutex<HashMap<PathBuf, Vec<String>>>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &Path, content: String) {
        self.stacks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .push(content);
    }

    pub fn pop(&self, path: &Path) -> Option<String> {
        self.stacks.lock().get_mut(path).and_then(Vec::pop)
    }

    pub fn depth(&self, path: &Path) -> usize {
        self.stacks.lock().get(path).map_or(0, Vec::len)
    }

    /// Number of paths with at least one recorded edit.
    pub fn tracked_paths(&self) -> usize {
        self.stacks
            .lock()
            .values()
            .filter(|stack| !stack.is_empty())
            .count()
    }

    pub fn clear(&self) {
        self.stacks.lock().clear();
    }
}
