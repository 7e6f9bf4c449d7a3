//! Error types for scribe-codec.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from artifact encoding and template rendering.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Frontmatter or footer YAML could not be produced.
    #[error("metadata serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
