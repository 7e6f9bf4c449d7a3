//! Change classification.
//!
//! Decision precedence:
//! 1. `NewFile` (no artifact on disk)
//! 2. `AgentUpdated` (artifact has no readable footer)
//! 3. `Unchanged` (source hash matches the footer)
//! 4. `AgentUpdated` (artifact body no longer matches its design hash)
//! 5. `ContentChanged` (no interface concept for this file)
//! 6. `ContentOnly` / `InterfaceChanged` (interface hash equal / different)
//!
//! [`classify`] is a pure function of its inputs; the caller reads files.

use std::io::ErrorKind;
use std::path::Path;

use scribe_codec::artifact;
use scribe_core::types::{ArtifactMetadata, ChangeLevel, SourceFile};
use scribe_detector::InterfaceExtractor;

use crate::error::{io_err, SyncError};
use crate::hashing;

/// An artifact as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingArtifact {
    /// Full file text, kept so a footer refresh can preserve it exactly.
    pub text: String,
    pub body: String,
    pub metadata: Option<ArtifactMetadata>,
}

impl ExistingArtifact {
    pub fn parse(text: String) -> Self {
        let parsed = artifact::parse(&text);
        Self {
            body: parsed.body,
            metadata: parsed.metadata,
            text,
        }
    }

    /// `Ok(None)` when no artifact exists at `path`.
    pub fn read(path: &Path) -> Result<Option<Self>, SyncError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(text))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(path, e)),
        }
    }

    pub fn design_hash(&self) -> Option<String> {
        hashing::design_hash(&self.body)
    }
}

/// Hashes of the current source, computed once per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub source_hash: String,
    pub skeleton: Option<String>,
    pub interface_hash: Option<String>,
}

impl Fingerprint {
    pub fn of(source: &SourceFile, extractor: &dyn InterfaceExtractor) -> Self {
        let skeleton = extractor.skeleton(&source.path, &source.content, source.language);
        Self {
            source_hash: hashing::source_hash(&source.content),
            interface_hash: hashing::interface_hash(skeleton.as_deref()),
            skeleton,
        }
    }
}

pub fn classify(
    source: &SourceFile,
    existing: Option<&ExistingArtifact>,
    extractor: &dyn InterfaceExtractor,
) -> ChangeLevel {
    classify_with(&Fingerprint::of(source, extractor), existing)
}

/// [`classify`] with a precomputed fingerprint.
pub fn classify_with(current: &Fingerprint, existing: Option<&ExistingArtifact>) -> ChangeLevel {
    let Some(existing) = existing else {
        return ChangeLevel::NewFile;
    };
    let Some(stored) = &existing.metadata else {
        return ChangeLevel::AgentUpdated;
    };
    if stored.source_hash == current.source_hash {
        return ChangeLevel::Unchanged;
    }
    if existing.design_hash() != stored.design_hash {
        return ChangeLevel::AgentUpdated;
    }
    match &current.interface_hash {
        None => ChangeLevel::ContentChanged,
        Some(hash) if stored.interface_hash.as_ref() == Some(hash) => ChangeLevel::ContentOnly,
        Some(_) => ChangeLevel::InterfaceChanged,
    }
}
