//! Domain types shared by every scribe crate.
//!
//! All path fields use `PathBuf`; source paths are always relative to the
//! project root. Persisted types are serializable via serde.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifies which generator produced an artifact (e.g. `http:default`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorId(pub String);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GeneratorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GeneratorId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Source language, as far as artifact maintenance cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    TypeScript,
    JavaScript,
    Go,
    Java,
    Kotlin,
    Ruby,
    C,
    Cpp,
    CSharp,
    Swift,
    Php,
    Shell,
    Markdown,
    Yaml,
    Json,
    Toml,
}

impl Language {
    /// Whether source in this language has an API shape worth hashing
    /// separately from its content.
    pub fn has_interface(&self) -> bool {
        !matches!(
            self,
            Language::Markdown | Language::Yaml | Language::Json | Language::Toml
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Ruby => "ruby",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Swift => "swift",
            Language::Php => "php",
            Language::Shell => "shell",
            Language::Markdown => "markdown",
            Language::Yaml => "yaml",
            Language::Json => "json",
            Language::Toml => "toml",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What regeneration, if any, a source file needs. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    /// No artifact exists yet.
    NewFile,
    /// Source hash matches the footer.
    Unchanged,
    /// The artifact was written or edited outside scribe; refresh the footer only.
    AgentUpdated,
    /// Source changed, interface hash did not.
    ContentOnly,
    /// Source changed and the language has no interface concept.
    ContentChanged,
    /// Public signatures changed.
    InterfaceChanged,
}

impl ChangeLevel {
    /// Whether this level requires a call to the generation service.
    pub fn needs_generation(&self) -> bool {
        matches!(
            self,
            ChangeLevel::NewFile
                | ChangeLevel::ContentOnly
                | ChangeLevel::ContentChanged
                | ChangeLevel::InterfaceChanged
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeLevel::NewFile => "new_file",
            ChangeLevel::Unchanged => "unchanged",
            ChangeLevel::AgentUpdated => "agent_updated",
            ChangeLevel::ContentOnly => "content_only",
            ChangeLevel::ContentChanged => "content_changed",
            ChangeLevel::InterfaceChanged => "interface_changed",
        }
    }
}

impl fmt::Display for ChangeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a file was not classified at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Matched an ignore rule, or lies outside the configured scope.
    Ignored,
    Binary,
    Oversized,
    /// Contains a merge-conflict marker line.
    Conflict,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Ignored => "ignored",
            SkipReason::Binary => "binary",
            SkipReason::Oversized => "oversized",
            SkipReason::Conflict => "conflict markers",
        };
        f.write_str(label)
    }
}

/// Outcome of processing one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Unchanged,
    /// Footer rewritten; body left as the editor wrote it.
    AgentUpdated,
    /// Artifact regenerated and written.
    Regenerated(ChangeLevel),
    /// Dry run: the artifact *would* have been regenerated.
    WouldRegenerate(ChangeLevel),
    Skipped(SkipReason),
    /// The artifact changed while generation was in flight; result dropped.
    DiscardedRace,
    Failed(String),
}

impl FileOutcome {
    /// Whether the artifact tree was modified.
    pub fn wrote(&self) -> bool {
        matches!(self, FileOutcome::AgentUpdated | FileOutcome::Regenerated(_))
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A source file read from disk, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub content: String,
    pub size: u64,
    pub language: Option<Language>,
}

/// The metadata footer persisted at the end of every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub source_path: PathBuf,
    pub source_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_hash: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub generator_id: GeneratorId,
}

/// Per-run counters. Created fresh for every run and handed back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub new: usize,
    pub unchanged: usize,
    pub agent_updated: usize,
    pub content_only: usize,
    pub content_changed: usize,
    pub interface_changed: usize,
    pub skipped_binary: usize,
    pub skipped_ignored: usize,
    pub skipped_oversized: usize,
    pub skipped_conflict: usize,
    pub discarded_race: usize,
    pub failed: usize,
}

impl UpdateStats {
    /// Count one file outcome.
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::AgentUpdated => self.agent_updated += 1,
            FileOutcome::Regenerated(level) | FileOutcome::WouldRegenerate(level) => {
                self.record_level(*level)
            }
            FileOutcome::Skipped(SkipReason::Ignored) => self.skipped_ignored += 1,
            FileOutcome::Skipped(SkipReason::Binary) => self.skipped_binary += 1,
            FileOutcome::Skipped(SkipReason::Oversized) => self.skipped_oversized += 1,
            FileOutcome::Skipped(SkipReason::Conflict) => self.skipped_conflict += 1,
            FileOutcome::DiscardedRace => self.discarded_race += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }

    fn record_level(&mut self, level: ChangeLevel) {
        match level {
            ChangeLevel::NewFile => self.new += 1,
            ChangeLevel::Unchanged => self.unchanged += 1,
            ChangeLevel::AgentUpdated => self.agent_updated += 1,
            ChangeLevel::ContentOnly => self.content_only += 1,
            ChangeLevel::ContentChanged => self.content_changed += 1,
            ChangeLevel::InterfaceChanged => self.interface_changed += 1,
        }
    }

    /// Add another run's counters into this one.
    pub fn merge(&mut self, other: &UpdateStats) {
        self.new += other.new;
        self.unchanged += other.unchanged;
        self.agent_updated += other.agent_updated;
        self.content_only += other.content_only;
        self.content_changed += other.content_changed;
        self.interface_changed += other.interface_changed;
        self.skipped_binary += other.skipped_binary;
        self.skipped_ignored += other.skipped_ignored;
        self.skipped_oversized += other.skipped_oversized;
        self.skipped_conflict += other.skipped_conflict;
        self.discarded_race += other.discarded_race;
        self.failed += other.failed;
    }

    /// Artifacts regenerated (or, in a dry run, that would be).
    pub fn regenerated(&self) -> usize {
        self.new + self.content_only + self.content_changed + self.interface_changed
    }

    pub fn skipped(&self) -> usize {
        self.skipped_binary + self.skipped_ignored + self.skipped_oversized + self.skipped_conflict
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for UpdateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} regenerated ({} new, {} interface, {} content, {} content-only), \
             {} agent-updated, {} unchanged, {} skipped, {} discarded, {} failed",
            self.regenerated(),
            self.new,
            self.interface_changed,
            self.content_changed,
            self.content_only,
            self.agent_updated,
            self.unchanged,
            self.skipped(),
            self.discarded_race,
            self.failed,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
