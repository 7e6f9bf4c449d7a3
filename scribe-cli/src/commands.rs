pub mod hook;
pub mod init;
pub mod status;
pub mod sweep;
pub mod update;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use scribe_core::{config, Config, FileOutcome, ProjectLayout, SkipReason, UpdateStats};
use scribe_daemon::TriggerCoordinator;
use scribe_sync::Services;

/// An initialized project: its layout and effective config.
pub struct Project {
    pub layout: ProjectLayout,
    pub config: Config,
}

impl Project {
    /// Resolve the project from `--root` or the current directory and load
    /// its config.
    pub fn open(root: Option<&Path>) -> Result<Self> {
        let layout = resolve_layout(root)?;
        let config = config::load(&layout)
            .with_context(|| format!("failed to load config for {}", layout.root().display()))?;
        Ok(Self { layout, config })
    }

    pub fn services(&self) -> Result<Services> {
        Services::from_config(&self.layout, &self.config)
            .context("failed to set up generator and ignore rules")
    }

    pub fn coordinator(self) -> Result<Arc<TriggerCoordinator>> {
        let services = self.services()?;
        let coordinator = TriggerCoordinator::new(self.layout, self.config, services)
            .context("failed to set up update triggers")?;
        Ok(Arc::new(coordinator))
    }
}

pub fn resolve_layout(root: Option<&Path>) -> Result<ProjectLayout> {
    match root {
        Some(root) => {
            let root = root
                .canonicalize()
                .with_context(|| format!("cannot resolve project root '{}'", root.display()))?;
            Ok(ProjectLayout::new(root))
        }
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            ProjectLayout::discover(&cwd)
                .context("no project found; run `scribe init` at the project root")
        }
    }
}

/// 0 on success, 1 when any file failed.
pub fn exit_code(stats: &UpdateStats) -> ExitCode {
    if stats.has_failures() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Stable snake_case key for JSON output and listings.
pub fn outcome_key(outcome: &FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::Unchanged => "unchanged",
        FileOutcome::AgentUpdated => "agent_updated",
        FileOutcome::Regenerated(level) | FileOutcome::WouldRegenerate(level) => level.as_str(),
        FileOutcome::Skipped(SkipReason::Ignored) => "skipped_ignored",
        FileOutcome::Skipped(SkipReason::Binary) => "skipped_binary",
        FileOutcome::Skipped(SkipReason::Oversized) => "skipped_oversized",
        FileOutcome::Skipped(SkipReason::Conflict) => "skipped_conflict",
        FileOutcome::DiscardedRace => "discarded_race",
        FileOutcome::Failed(_) => "failed",
    }
}

pub fn outcome_symbol(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Regenerated(_) => "✎".green().to_string(),
        FileOutcome::WouldRegenerate(_) => "~".yellow().to_string(),
        FileOutcome::AgentUpdated => "↺".cyan().to_string(),
        FileOutcome::DiscardedRace => "⤫".magenta().to_string(),
        FileOutcome::Failed(_) => "✗".red().bold().to_string(),
        FileOutcome::Unchanged | FileOutcome::Skipped(_) => "·".bright_black().to_string(),
    }
}
