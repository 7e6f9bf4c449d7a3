//! Skip-if-unchanged gate for scheduled sweeps.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use scribe_core::layout::{GIT_DIR, SCRIBE_DIR};
use scribe_core::{Config, ProjectLayout};

use crate::cursor::CursorStore;
use crate::error::DaemonError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// `skip_if_unchanged` is off.
    Disabled,
    /// No cursor existed before this attempt.
    FirstSweep,
    /// First entry found with an mtime newer than the previous cursor.
    Changed(PathBuf),
    /// Nothing in scope moved since the previous cursor.
    Unchanged,
}

impl GateDecision {
    pub fn should_sweep(&self) -> bool {
        !matches!(self, GateDecision::Unchanged)
    }
}

/// Advance the cursor to `now`, then decide whether a sweep is warranted by
/// comparing mtimes under the scope against the cursor this call replaced.
pub fn check(
    layout: &ProjectLayout,
    config: &Config,
    cursor: &CursorStore,
    now: DateTime<Utc>,
) -> Result<GateDecision, DaemonError> {
    let previous = cursor.advance(now)?;
    if !config.skip_if_unchanged {
        return Ok(GateDecision::Disabled);
    }
    let Some(previous) = previous else {
        return Ok(GateDecision::FirstSweep);
    };
    let since = SystemTime::from(previous.swept_at);
    let artifact_root = layout.artifact_root(config);
    Ok(
        match first_modified_since(&layout.scope_root(config), &artifact_root, since) {
            Some(path) => GateDecision::Changed(path),
            None => GateDecision::Unchanged,
        },
    )
}

fn first_modified_since(scope: &Path, artifact_root: &Path, since: SystemTime) -> Option<PathBuf> {
    let excluded = |entry: &DirEntry| {
        entry.depth() > 0
            && (matches!(entry.file_name().to_str(), Some(GIT_DIR | SCRIBE_DIR))
                || entry.path().starts_with(artifact_root))
    };
    WalkDir::new(scope)
        .into_iter()
        .filter_entry(|entry| !excluded(entry))
        .filter_map(Result::ok)
        .find(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .is_some_and(|mtime| mtime > since)
        })
        .map(|entry| entry.into_path())
}
