//! Error types for scribe-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration and layout operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value parsed but makes no sense (zero interval, empty artifact dir, ...).
    #[error("invalid config: {0}")]
    Invalid(String),

    /// No `.scribe/` or `.git/` directory in `start` or any of its ancestors.
    #[error("no scribe project found at or above {start}; run `scribe init` first")]
    ProjectNotFound { start: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
