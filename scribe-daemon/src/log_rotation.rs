//! Size-based rotation of `.scribe/logs/hook.log`.
//!
//! The hook appends to the log on every commit. Its script runs
//! `scribe hook rotate-log` before redirecting into the file:
//! `hook.log → hook.log.1 → … → hook.log.<keep>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scribe_core::ProjectLayout;

/// Rotate once the live log reaches this size (1 MiB).
pub const MAX_HOOK_LOG_BYTES: u64 = 1024 * 1024;

/// Rotated copies kept beside the live log.
pub const MAX_ROTATED_FILES: usize = 3;

/// Rotate `log_path` if it is at least `max_bytes` long, keeping `keep`
/// numbered copies and leaving an empty live file behind.
///
/// Returns `Ok(false)` when the file is under the threshold or missing.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, keep: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes {
        return Ok(false);
    }

    if keep == 0 {
        fs::File::create(log_path)?;
        return Ok(true);
    }

    let oldest = numbered_path(log_path, keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let src = numbered_path(log_path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    fs::File::create(log_path)?;
    Ok(true)
}

/// Rotate the project's hook log; failures are logged, never fatal.
pub fn rotate_hook_log(layout: &ProjectLayout) {
    let path = layout.hook_log_path();
    match rotate_if_needed(&path, MAX_HOOK_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!(path = %path.display(), "hook log rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "hook log rotation failed"),
    }
}

fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "hook.log".into());
    name.push(format!(".{n}"));
    base.with_file_name(name)
}
