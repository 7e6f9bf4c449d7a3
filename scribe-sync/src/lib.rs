//! # scribe-sync
//!
//! Change detection and update orchestration.
//!
//! Build an [`Orchestrator`] from a project layout, its config and a set of
//! [`Services`], then call [`Orchestrator::update_scope`] for a full pass or
//! [`Orchestrator::update_changed`] for an explicit file list.

pub mod classifier;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod hashing;
pub mod ignore_oracle;
pub mod orchestrator;
pub mod safety;

pub use classifier::{classify, ExistingArtifact, Fingerprint};
pub use error::SyncError;
pub use generator::{
    ContentGenerator, GenerateError, GeneratedArtifact, GenerationRequest, HttpGenerator,
    UnconfiguredGenerator,
};
pub use ignore_oracle::{GitignoreOracle, IgnoreOracle};
pub use orchestrator::{Orchestrator, Services};
pub use safety::{atomic_write, has_conflict_markers, DirectoryLocks};
