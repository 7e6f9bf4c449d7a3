//! `scribe update` — regenerate artifacts for paths or the whole scope.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use scribe_core::{FileOutcome, UpdateStats};
use scribe_sync::{DirectoryLocks, Orchestrator};

use super::{exit_code, outcome_key, outcome_symbol, Project};

/// Arguments for `scribe update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Files or directories to update. Defaults to the configured scope.
    pub paths: Vec<PathBuf>,

    /// Treat PATHS as a list of changed files: vanished files are skipped
    /// and directory summaries only get per-entry updates.
    #[arg(long, requires = "paths")]
    pub changed: bool,

    /// Classify and report without calling the generator or writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct UpdateReportJson {
    dry_run: bool,
    stats: UpdateStats,
    files: Vec<FileReportJson>,
}

#[derive(Serialize)]
struct FileReportJson {
    path: PathBuf,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl UpdateArgs {
    pub fn run(self, root: Option<&Path>) -> Result<ExitCode> {
        let project = Project::open(root)?;
        let services = project.services()?;
        let orchestrator = Orchestrator::new(
            project.layout,
            project.config,
            services,
            Arc::new(DirectoryLocks::new()),
        )
        .context("failed to set up the update pipeline")?
        .dry_run(self.dry_run);

        let cwd = std::env::current_dir().context("cannot read current directory")?;
        let targets: Vec<PathBuf> = self.paths.iter().map(|p| cwd.join(p)).collect();

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        let mut files = Vec::new();
        let stats = if self.changed {
            orchestrator.update_changed(&targets)
        } else {
            orchestrator
                .update_scope(&targets, |path, outcome| {
                    if !self.json {
                        print_outcome(path, outcome);
                    }
                    files.push(FileReportJson {
                        path: path.to_path_buf(),
                        outcome: outcome_key(outcome).to_string(),
                        error: match outcome {
                            FileOutcome::Failed(reason) => Some(reason.clone()),
                            _ => None,
                        },
                    });
                })
                .context("update failed")?
        };

        if self.json {
            let report = UpdateReportJson {
                dry_run: self.dry_run,
                stats,
                files,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize update JSON")?
            );
        } else {
            let mark = if stats.has_failures() { "✗" } else { "✓" };
            println!("{prefix}{mark} {stats}");
        }
        Ok(exit_code(&stats))
    }
}

/// Only outcomes that did (or would do) something, or went wrong.
fn print_outcome(path: &Path, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Unchanged | FileOutcome::Skipped(_) => {}
        FileOutcome::Failed(reason) => {
            println!("  {}  {} ({reason})", outcome_symbol(outcome), path.display())
        }
        _ => println!(
            "  {}  {} ({})",
            outcome_symbol(outcome),
            path.display(),
            outcome_key(outcome)
        ),
    }
}
