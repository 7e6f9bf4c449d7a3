//! Sweep cursor — the instant below which every file modification time is
//! known to have been considered by a sweep.
//!
//! Persisted as `{"swept_at": "<rfc3339>"}` at
//! `<root>/.scribe/state/sweep_cursor.json`, written with the same atomic
//! write the artifacts use.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scribe_sync::atomic_write;

use crate::error::{io_err, DaemonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCursor {
    pub swept_at: DateTime<Utc>,
}

/// Owner of the cursor file. Advancing is serialized so overlapping sweep
/// attempts in one process each observe a distinct previous value.
#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SweepCursor>, DaemonError> {
        load_at(&self.path)
    }

    /// Persist `now` and return the cursor it replaced.
    pub fn advance(&self, now: DateTime<Utc>) -> Result<Option<SweepCursor>, DaemonError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = load_at(&self.path)?;
        save_at(&self.path, &SweepCursor { swept_at: now })?;
        Ok(previous)
    }
}

/// `Ok(None)` when no cursor has been written yet. A corrupt cursor is
/// treated as absent so the next sweep simply runs.
pub fn load_at(path: &Path) -> Result<Option<SweepCursor>, DaemonError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    match serde_json::from_str(&contents) {
        Ok(cursor) => Ok(Some(cursor)),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "discarding unreadable sweep cursor");
            Ok(None)
        }
    }
}

pub fn save_at(path: &Path, cursor: &SweepCursor) -> Result<(), DaemonError> {
    let json = serde_json::to_string_pretty(cursor)?;
    atomic_write(path, &json)?;
    Ok(())
}
