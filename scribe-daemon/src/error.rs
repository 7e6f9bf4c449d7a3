use std::path::PathBuf;

use thiserror::Error;

/// Error surface for triggers: sweeps, watchers, the git hook and the cursor.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] scribe_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] scribe_sync::SyncError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("the real-time watcher is disabled; set `watchdog_enabled: true` in .scribe/config.yaml")]
    WatchdogDisabled,

    #[error("not a git repository (no .git directory under {root})")]
    NotAGitRepo { root: PathBuf },

    #[error("`{command}` failed: {message}")]
    Git { command: String, message: String },

    #[error("refusing to touch {path}: hook was not installed by scribe")]
    ForeignHook { path: PathBuf },

    #[error("callback failed: {0}")]
    Callback(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
