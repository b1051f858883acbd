use std::path::Path;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Paths under `root` up to `depth` levels deep, root first, hidden entries
/// (and everything beneath them) skipped, siblings sorted by name.
pub(crate) fn list_directory(root: &Path, depth: usize) -> Vec<String> {
    WalkDir::new(root)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path().display().to_string()),
            Err(error) => {
                debug!(%error, "skipping unreadable directory entry");
                None
            }
        })
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
