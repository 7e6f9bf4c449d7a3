//! Project discovery: which files exist under a scope directory.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use scribe_core::layout::{GIT_DIR, SCRIBE_DIR};

fn is_excluded_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && matches!(entry.file_name().to_str(), Some(GIT_DIR | SCRIBE_DIR))
}

/// Every regular file under `root/dir`, lazily, in file-name order, as paths
/// relative to `root`. `.git` and `.scribe` trees are never entered.
pub fn list_scope_files<'a>(root: &'a Path, dir: &Path) -> impl Iterator<Item = PathBuf> + 'a {
    walk(root, dir, usize::MAX)
}

/// Regular files directly inside `root/dir`.
pub fn list_directory_files<'a>(root: &'a Path, dir: &Path) -> impl Iterator<Item = PathBuf> + 'a {
    walk(root, dir, 1)
}

fn walk<'a>(root: &'a Path, dir: &Path, max_depth: usize) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root.join(dir))
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(move |entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
}
