//! Update orchestration.
//!
//! ## Per-file protocol
//!
//! 1. Skip out-of-scope, ignored, binary and oversized files.
//! 2. Skip sources containing merge-conflict markers.
//! 3. Classify against the existing artifact.
//! 4. `Unchanged`: nothing to do.
//! 5. `AgentUpdated`: rewrite the footer only; the body is never touched.
//! 6. Otherwise: snapshot the artifact's design hash, call the generator,
//!    re-read the design hash, and write only if it is still the snapshot.
//! 7. After any write, update the directory summary entry under that
//!    directory's lock.
//!
//! One file's failure never aborts a batch. The only fatal error is a scope
//! target that does not exist.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use scribe_codec::artifact::{self, normalize_body};
use scribe_codec::{ArtifactCodec, DirectorySummary, Frontmatter};
use scribe_core::layout::SUMMARY_FILE;
use scribe_core::types::{
    ArtifactMetadata, ChangeLevel, FileOutcome, GeneratorId, SkipReason, SourceFile, UpdateStats,
};
use scribe_core::{Config, ProjectLayout};
use scribe_detector::{load_source, InterfaceExtractor, LoadedSource, SignatureExtractor};

use crate::classifier::{classify_with, ExistingArtifact, Fingerprint};
use crate::discovery::{list_directory_files, list_scope_files};
use crate::error::{io_err, SyncError};
use crate::generator::{self, ContentGenerator, GenerationRequest};
use crate::hashing;
use crate::ignore_oracle::{GitignoreOracle, IgnoreOracle};
use crate::safety::{atomic_write, has_conflict_markers, DirectoryLocks};

/// Summary descriptions are cut to this many characters.
pub const DESCRIPTION_CHARS: usize = 120;

/// `generator_id` recorded when a hand-written artifact gets its first footer.
pub const EXTERNAL_EDIT_ID: &str = "external-edit";

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// External collaborators of the orchestrator.
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn ContentGenerator>,
    pub extractor: Arc<dyn InterfaceExtractor>,
    pub ignore: Arc<dyn IgnoreOracle>,
}

impl Services {
    /// Default implementations wired from `config`.
    pub fn from_config(layout: &ProjectLayout, config: &Config) -> Result<Self, SyncError> {
        Ok(Self {
            generator: generator::from_config(&config.generator)?,
            extractor: Arc::new(SignatureExtractor),
            ignore: Arc::new(GitignoreOracle::new(layout.root(), &config.ignore)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    layout: ProjectLayout,
    config: Config,
    services: Services,
    codec: ArtifactCodec,
    locks: Arc<DirectoryLocks>,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(
        layout: ProjectLayout,
        config: Config,
        services: Services,
        locks: Arc<DirectoryLocks>,
    ) -> Result<Self, SyncError> {
        let codec = ArtifactCodec::with_user_templates(Some(&layout.templates_dir()))?;
        Ok(Self {
            layout,
            config,
            services,
            codec,
            locks,
            dry_run: false,
        })
    }

    /// Classify and count only: no generation calls, no writes.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Batch operations
    // -----------------------------------------------------------------------

    /// Process `targets` (files or directories; empty = the configured scope),
    /// then regenerate the summary of every directory visited.
    pub fn update_scope(
        &self,
        targets: &[PathBuf],
        mut on_progress: impl FnMut(&Path, &FileOutcome),
    ) -> Result<UpdateStats, SyncError> {
        let roots = self.resolve_targets(targets)?;
        let mut stats = UpdateStats::default();
        let mut seen = BTreeSet::new();
        let mut touched_dirs = BTreeSet::new();

        for (rel, is_dir) in roots {
            let files: Box<dyn Iterator<Item = PathBuf> + '_> = if is_dir {
                Box::new(list_scope_files(self.layout.root(), &rel))
            } else {
                Box::new(std::iter::once(rel))
            };
            for file in files {
                if self.is_internal_rel(&file) || !seen.insert(file.clone()) {
                    continue;
                }
                let outcome = self.update_file(&file);
                stats.record(&outcome);
                on_progress(&file, &outcome);
                touched_dirs.insert(parent_dir(&file));
            }
        }

        self.regenerate_summaries(&touched_dirs);
        tracing::info!("update finished: {stats}");
        Ok(stats)
    }

    /// Hook-driven update of explicit paths. Paths that no longer exist are
    /// skipped without being counted. Summaries get per-entry updates only.
    pub fn update_changed(&self, paths: &[PathBuf]) -> UpdateStats {
        let mut stats = UpdateStats::default();
        for path in paths {
            let Some(rel) = self.layout.relative(path) else {
                stats.record(&FileOutcome::Skipped(SkipReason::Ignored));
                continue;
            };
            if !self.layout.root().join(&rel).is_file() {
                tracing::debug!("skipping vanished path {}", rel.display());
                continue;
            }
            stats.record(&self.update_file(&rel));
        }
        stats
    }

    /// Process the files directly inside each of `dirs`, then refresh those
    /// directories' summaries.
    pub fn update_directories(&self, dirs: &[PathBuf]) -> UpdateStats {
        let mut stats = UpdateStats::default();
        let mut touched_dirs = BTreeSet::new();
        for dir in dirs {
            let Some(rel_dir) = self.layout.relative(dir) else {
                continue;
            };
            for file in list_directory_files(self.layout.root(), &rel_dir) {
                if self.is_internal_rel(&file) {
                    continue;
                }
                stats.record(&self.update_file(&file));
            }
            touched_dirs.insert(rel_dir);
        }
        self.regenerate_summaries(&touched_dirs);
        stats
    }

    // -----------------------------------------------------------------------
    // Single file
    // -----------------------------------------------------------------------

    /// Run the per-file protocol for `path` (absolute or root-relative).
    /// Never fails: errors become [`FileOutcome::Failed`].
    pub fn update_file(&self, path: &Path) -> FileOutcome {
        let Some(rel) = self.layout.relative(path) else {
            return FileOutcome::Skipped(SkipReason::Ignored);
        };
        if !self.layout.in_scope(&self.config, &rel)
            || self.is_internal_rel(&rel)
            || self.services.ignore.is_ignored(&rel)
        {
            return FileOutcome::Skipped(SkipReason::Ignored);
        }
        match self.process(&rel) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("failed to update {}: {err}", rel.display());
                FileOutcome::Failed(err.to_string())
            }
        }
    }

    fn process(&self, rel: &Path) -> Result<FileOutcome, SyncError> {
        let source = match load_source(self.layout.root(), rel, self.config.max_file_bytes)? {
            LoadedSource::Text(source) => source,
            LoadedSource::Binary => return Ok(FileOutcome::Skipped(SkipReason::Binary)),
            LoadedSource::Oversized { size } => {
                tracing::debug!("skipping {} ({size} bytes)", rel.display());
                return Ok(FileOutcome::Skipped(SkipReason::Oversized));
            }
        };
        if has_conflict_markers(&source.content) {
            tracing::warn!("skipping {}: unresolved merge conflict", rel.display());
            return Ok(FileOutcome::Skipped(SkipReason::Conflict));
        }

        let artifact_path = self.layout.artifact_path(&self.config, rel);
        let existing = ExistingArtifact::read(&artifact_path)?;
        let fingerprint = Fingerprint::of(&source, self.services.extractor.as_ref());
        let level = classify_with(&fingerprint, existing.as_ref());

        if self.dry_run {
            return Ok(match level {
                ChangeLevel::Unchanged => FileOutcome::Unchanged,
                level => {
                    tracing::info!("[dry-run] {}: {level}", rel.display());
                    FileOutcome::WouldRegenerate(level)
                }
            });
        }

        match (level, existing) {
            (ChangeLevel::Unchanged, _) => Ok(FileOutcome::Unchanged),
            (ChangeLevel::AgentUpdated, Some(existing)) => {
                self.refresh_footer(&source, &fingerprint, &artifact_path, existing)
            }
            (level, existing) => {
                self.regenerate(&source, &fingerprint, level, &artifact_path, existing)
            }
        }
    }

    /// Footer-only rewrite for an artifact edited outside scribe.
    fn refresh_footer(
        &self,
        source: &SourceFile,
        fingerprint: &Fingerprint,
        artifact_path: &Path,
        existing: ExistingArtifact,
    ) -> Result<FileOutcome, SyncError> {
        let generator_id = existing
            .metadata
            .as_ref()
            .map(|m| m.generator_id.clone())
            .unwrap_or_else(|| GeneratorId::from(EXTERNAL_EDIT_ID));
        let metadata = self.metadata_for(source, fingerprint, existing.design_hash(), generator_id);
        let text = artifact::replace_footer(&existing.text, &metadata)?;
        atomic_write(artifact_path, &text)?;
        tracing::info!("refreshed footer of {}", source.path.display());

        self.record_summary_entry_or_warn(
            &source.path,
            &artifact::description(&existing.body, DESCRIPTION_CHARS),
        );
        Ok(FileOutcome::AgentUpdated)
    }

    fn regenerate(
        &self,
        source: &SourceFile,
        fingerprint: &Fingerprint,
        level: ChangeLevel,
        artifact_path: &Path,
        existing: Option<ExistingArtifact>,
    ) -> Result<FileOutcome, SyncError> {
        let snapshot = existing.as_ref().map(ExistingArtifact::design_hash);
        let request = GenerationRequest {
            source_path: source.path.clone(),
            language: source.language,
            change_level: level,
            content: source.content.clone(),
            interface_skeleton: fingerprint.skeleton.clone(),
            existing_body: existing.map(|e| e.body).filter(|b| !b.is_empty()),
            topics: self.config.topics.clone(),
        };

        let generated = match self.services.generator.generate(&request) {
            Ok(generated) => generated,
            Err(err) => {
                tracing::warn!("generation failed for {}: {err}", source.path.display());
                return Ok(FileOutcome::Failed(err.to_string()));
            }
        };

        let current = ExistingArtifact::read(artifact_path)?.map(|a| a.design_hash());
        if current != snapshot {
            tracing::info!(
                "artifact for {} changed during generation; discarding result",
                source.path.display()
            );
            return Ok(FileOutcome::DiscardedRace);
        }

        let body = normalize_body(&generated.body);
        let metadata = self.metadata_for(
            source,
            fingerprint,
            hashing::design_hash(&body),
            self.services.generator.id(),
        );
        let frontmatter = Frontmatter {
            source: source.path.clone(),
            language: source.language,
        };
        let text = self.codec.serialize(&frontmatter, &body, &metadata)?;
        atomic_write(artifact_path, &text)?;
        tracing::info!("regenerated {} ({level})", source.path.display());

        let description = generated
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| artifact::description(&body, DESCRIPTION_CHARS));
        self.record_summary_entry_or_warn(&source.path, &description);
        Ok(FileOutcome::Regenerated(level))
    }

    fn metadata_for(
        &self,
        source: &SourceFile,
        fingerprint: &Fingerprint,
        design_hash: Option<String>,
        generator_id: GeneratorId,
    ) -> ArtifactMetadata {
        ArtifactMetadata {
            source_path: source.path.clone(),
            source_hash: fingerprint.source_hash.clone(),
            interface_hash: fingerprint.interface_hash.clone(),
            design_hash,
            generated_at: Utc::now(),
            generator_id,
        }
    }

    // -----------------------------------------------------------------------
    // Directory summaries
    // -----------------------------------------------------------------------

    /// The artifact is already on disk when this runs, so a summary failure
    /// does not change the file's outcome; the end-of-run summary rebuild
    /// picks the entry up again.
    fn record_summary_entry_or_warn(&self, rel_source: &Path, description: &str) {
        if let Err(err) = self.record_summary_entry(rel_source, description) {
            tracing::warn!(
                "artifact for {} written but its summary entry was not: {err}",
                rel_source.display()
            );
        }
    }

    /// Upsert the summary entry for `rel_source` under its directory lock.
    fn record_summary_entry(&self, rel_source: &Path, description: &str) -> Result<(), SyncError> {
        let rel_dir = parent_dir(rel_source);
        let Some(name) = rel_source.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(());
        };
        let summary_path = self.layout.summary_path(&self.config, &rel_dir);
        let lock_dir = self.layout.artifact_root(&self.config).join(&rel_dir);

        self.locks.with_lock(&lock_dir, || -> Result<(), SyncError> {
            let mut summary = read_summary(&rel_dir, &summary_path)?;
            if summary.upsert(name, description) {
                atomic_write(&summary_path, &self.codec.render_summary(&summary)?)?;
            }
            Ok(())
        })
    }

    fn regenerate_summaries(&self, dirs: &BTreeSet<PathBuf>) {
        if self.dry_run {
            return;
        }
        for dir in dirs {
            if let Err(err) = self.regenerate_summary(dir) {
                tracing::warn!("failed to refresh summary for {}: {err}", dir.display());
            }
        }
    }

    /// Rebuild the summary of `rel_dir` from the artifacts present: drop
    /// entries whose source vanished, add entries for artifacts not yet
    /// listed. Writes only when the rendered text changes.
    pub fn regenerate_summary(&self, rel_dir: &Path) -> Result<(), SyncError> {
        let artifact_dir = self.layout.artifact_root(&self.config).join(rel_dir);
        let summary_path = self.layout.summary_path(&self.config, rel_dir);
        let source_dir = self.layout.root().join(rel_dir);

        self.locks.with_lock(&artifact_dir, || -> Result<(), SyncError> {
            let previous = read_text(&summary_path)?;
            let mut summary = previous
                .as_deref()
                .map(|text| DirectorySummary::parse(rel_dir, text))
                .unwrap_or_else(|| DirectorySummary::new(rel_dir));

            summary.retain(|name| {
                source_dir.join(name).is_file() && artifact_dir.join(format!("{name}.md")).is_file()
            });
            for (name, path) in artifacts_in(&artifact_dir)? {
                if summary.contains(&name) || !source_dir.join(&name).is_file() {
                    continue;
                }
                let body = read_text(&path)?
                    .map(|text| artifact::parse(&text).body)
                    .unwrap_or_default();
                summary.upsert(name, artifact::description(&body, DESCRIPTION_CHARS));
            }

            if summary.is_empty() && previous.is_none() {
                return Ok(());
            }
            let rendered = self.codec.render_summary(&summary)?;
            if previous.as_deref() != Some(rendered.as_str()) {
                atomic_write(&summary_path, &rendered)?;
            }
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Validate every target before any work starts. Returns root-relative
    /// paths paired with "is a directory".
    fn resolve_targets(&self, targets: &[PathBuf]) -> Result<Vec<(PathBuf, bool)>, SyncError> {
        let defaults = [self.config.scope.clone()];
        let targets = if targets.is_empty() { &defaults[..] } else { targets };

        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            let not_found = || SyncError::ScopeNotFound {
                path: target.clone(),
            };
            let rel = self.layout.relative(target).ok_or_else(not_found)?;
            let abs = self.layout.root().join(&rel);
            if abs.is_dir() {
                resolved.push((rel, true));
            } else if abs.is_file() {
                resolved.push((rel, false));
            } else {
                return Err(not_found());
            }
        }
        Ok(resolved)
    }

    fn is_internal_rel(&self, rel: &Path) -> bool {
        self.layout
            .is_internal(&self.config, &self.layout.root().join(rel))
    }
}

fn parent_dir(rel: &Path) -> PathBuf {
    rel.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn read_text(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

fn read_summary(rel_dir: &Path, summary_path: &Path) -> Result<DirectorySummary, SyncError> {
    Ok(read_text(summary_path)?
        .map(|text| DirectorySummary::parse(rel_dir, &text))
        .unwrap_or_else(|| DirectorySummary::new(rel_dir)))
}

/// `(source name, artifact path)` for every artifact directly in `dir`.
fn artifacts_in(dir: &Path) -> Result<Vec<(String, PathBuf)>, SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(dir, e)),
    };
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name == SUMMARY_FILE || !entry.path().is_file() {
            continue;
        }
        if let Some(name) = file_name.strip_suffix(".md") {
            found.push((name.to_string(), entry.path()));
        }
    }
    found.sort();
    Ok(found)
}
