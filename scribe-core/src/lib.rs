//! scribe core library — domain types, project layout, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — metadata footer, change levels, per-run statistics
//! - [`layout`] — where a project keeps its config, state and artifacts
//! - [`config`] — load / save / init of `.scribe/config.yaml`
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod layout;
pub mod types;

pub use config::{Config, GeneratorConfig};
pub use error::ConfigError;
pub use layout::ProjectLayout;
pub use types::{
    ArtifactMetadata, ChangeLevel, FileOutcome, GeneratorId, Language, SkipReason, SourceFile,
    UpdateStats,
};
