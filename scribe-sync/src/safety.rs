//! Write-safety primitives shared by every trigger.
//!
//! ## `atomic_write`
//!
//! 1. Ensure the parent directory exists.
//! 2. Write to `.<name>.<pid>.<n>.scribe.tmp` in that same directory.
//! 3. Flush and fsync the temp file.
//! 4. Rename onto the target (atomic on POSIX).
//!
//! On any failure the temp file is removed and the target is left untouched.
//! Concurrent readers see either the old content or the new, never a mix.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{io_err, SyncError};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// atomic_write
// ---------------------------------------------------------------------------

pub fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| io_err(&parent, e))?;
    let tmp = parent.join(tmp_name(path));
    atomic_write_with_tmp(path, content, &tmp)
}

fn tmp_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{name}.{}.{n}.scribe.tmp", std::process::id())
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    let written = File::create(tmp).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(tmp);
        return Err(io_err(tmp, e));
    }

    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Conflict markers
// ---------------------------------------------------------------------------

/// Whether `text` contains an unresolved merge-conflict marker line.
pub fn has_conflict_markers(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_end_matches('\r');
        line.starts_with("<<<<<<< ")
            || line == "======="
            || line.starts_with(">>>>>>> ")
            || line.starts_with("|||||||")
    })
}

// ---------------------------------------------------------------------------
// Directory locks
// ---------------------------------------------------------------------------

/// Registry of per-directory mutexes. Entries are created on first use and
/// never removed, so two holders of the same key always share one mutex.
#[derive(Debug, Default)]
pub struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DirectoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `dir`. Keys are canonicalised when the directory
    /// exists, so `a/./b` and `a/b` resolve to the same lock.
    pub fn for_path(&self, dir: &Path) -> Arc<Mutex<()>> {
        let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Run `f` while holding the lock for `dir`.
    pub fn with_lock<T>(&self, dir: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.for_path(dir);
        let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn leftover_tmp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().ends_with(".scribe.tmp"))
            .collect()
    }

    #[test]
    fn write_creates_parents_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mirror").join("src").join("a.py.md");
        atomic_write(&path, "content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(leftover_tmp_files(path.parent().unwrap()).is_empty());
    }

    #[test]
    fn overwrite_replaces_whole_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        atomic_write(&path, "a much longer first version").unwrap();
        atomic_write(&path, "short").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn readers_never_see_partial_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shared.md");
        let old = "o".repeat(64 * 1024);
        let new = "n".repeat(64 * 1024);
        atomic_write(&path, &old).unwrap();

        let reader_path = path.clone();
        let (old_c, new_c) = (old.clone(), new.clone());
        let reader = thread::spawn(move || {
            for _ in 0..200 {
                let seen = fs::read_to_string(&reader_path).unwrap();
                assert!(seen == old_c || seen == new_c, "torn read of {} bytes", seen.len());
            }
        });
        for i in 0..50 {
            atomic_write(&path, if i % 2 == 0 { &new } else { &old }).unwrap();
        }
        reader.join().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        let root = TempDir::new().unwrap();
        // Renaming a file onto a non-empty directory fails on every unix.
        let target = root.path().join("occupied");
        fs::create_dir_all(target.join("child")).unwrap();
        let tmp_path = root.path().join(".occupied.tmp");

        let err = atomic_write_with_tmp(&target, "new", &tmp_path).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(target.join("child").is_dir(), "target must be untouched");
        assert!(!tmp_path.exists(), "tmp file must be cleaned up");
    }

    #[test]
    fn conflict_markers_detected_per_line() {
        assert!(has_conflict_markers("a\n<<<<<<< HEAD\nb\n"));
        assert!(has_conflict_markers("a\n=======\nb\n"));
        assert!(has_conflict_markers(">>>>>>> feature\n"));
        assert!(has_conflict_markers("||||||| base\n"));
        assert!(!has_conflict_markers("let s = \"<<<<<<< \";\n========\n"));
        assert!(!has_conflict_markers("x == y\n"));
    }

    #[test]
    fn equivalent_paths_share_one_lock() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        let locks = DirectoryLocks::new();
        let a = locks.for_path(&tmp.path().join("src"));
        let b = locks.for_path(&tmp.path().join(".").join("src"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn lock_serializes_holders() {
        let tmp = TempDir::new().unwrap();
        let locks = Arc::new(DirectoryLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (locks, inside, max_seen) = (locks.clone(), inside.clone(), max_seen.clone());
                let dir = tmp.path().to_path_buf();
                thread::spawn(move || {
                    locks.with_lock(&dir, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
