//! Error types for scribe-sync.

use std::path::PathBuf;

use thiserror::Error;

use scribe_codec::CodecError;
use scribe_core::ConfigError;
use scribe_detector::DetectError;

/// Errors from update runs. Only [`SyncError::ScopeNotFound`] aborts a run;
/// everything else is caught per file and counted as `failed`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A requested scope target does not exist.
    #[error("scope target not found: {path}")]
    ScopeNotFound { path: PathBuf },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("generation failed: {0}")]
    Generate(#[from] crate::generator::GenerateError),

    /// Building the ignore matcher failed (bad pattern or unreadable file).
    #[error("ignore rules error: {0}")]
    Ignore(#[from] ignore::Error),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
