//! `scribe status` — what an update would do, without doing it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use scribe_core::{FileOutcome, UpdateStats};
use scribe_daemon::CursorStore;
use scribe_sync::{DirectoryLocks, Orchestrator};

use super::{exit_code, outcome_key, outcome_symbol, Project};

/// Arguments for `scribe status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

struct PendingFile {
    path: PathBuf,
    outcome: FileOutcome,
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    files: Vec<PendingFileJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    out_of_date: usize,
    unchanged: usize,
    skipped: usize,
    failed: usize,
    last_sweep_at: Option<String>,
}

#[derive(Serialize)]
struct PendingFileJson {
    path: PathBuf,
    status: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "status")]
    status: String,
}

impl StatusArgs {
    pub fn run(self, root: Option<&Path>) -> Result<ExitCode> {
        let project = Project::open(root)?;
        let services = project.services()?;
        let cursor = CursorStore::new(project.layout.cursor_path());
        let last_sweep = cursor
            .load()
            .context("failed to read the sweep cursor")?
            .map(|c| c.swept_at);
        let orchestrator = Orchestrator::new(
            project.layout,
            project.config,
            services,
            Arc::new(DirectoryLocks::new()),
        )
        .context("failed to set up the update pipeline")?
        .dry_run(true);

        let mut pending = Vec::new();
        let stats = orchestrator
            .update_scope(&[], |path, outcome| {
                if matches!(outcome, FileOutcome::WouldRegenerate(_) | FileOutcome::Failed(_)) {
                    pending.push(PendingFile {
                        path: path.to_path_buf(),
                        outcome: outcome.clone(),
                    });
                }
            })
            .context("status check failed")?;

        if self.json {
            print_json(&stats, pending, last_sweep)?;
        } else {
            print_table(&stats, pending, last_sweep);
        }
        Ok(exit_code(&stats))
    }
}

fn print_json(
    stats: &UpdateStats,
    pending: Vec<PendingFile>,
    last_sweep: Option<DateTime<Utc>>,
) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            out_of_date: stats.regenerated() + stats.agent_updated,
            unchanged: stats.unchanged,
            skipped: stats.skipped(),
            failed: stats.failed,
            last_sweep_at: last_sweep.map(|t| t.to_rfc3339()),
        },
        files: pending
            .into_iter()
            .map(|file| PendingFileJson {
                status: outcome_key(&file.outcome).to_string(),
                path: file.path,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(stats: &UpdateStats, pending: Vec<PendingFile>, last_sweep: Option<DateTime<Utc>>) {
    let last = last_sweep.map_or_else(|| "never".to_string(), format_age);
    println!(
        "scribe v{} | {} out of date | {} unchanged | {} skipped | last sweep {}",
        env!("CARGO_PKG_VERSION"),
        stats.regenerated() + stats.agent_updated,
        stats.unchanged,
        stats.skipped(),
        last,
    );

    if pending.is_empty() {
        println!("{}", "All artifacts are up to date.".green());
        return;
    }

    let rows: Vec<StatusTableRow> = pending
        .into_iter()
        .map(|file| StatusTableRow {
            indicator: outcome_symbol(&file.outcome),
            file: file.path.display().to_string(),
            status: match &file.outcome {
                FileOutcome::Failed(reason) => format!("failed: {reason}"),
                other => outcome_key(other).replace('_', " "),
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("Run 'scribe update' to regenerate out-of-date artifacts.");
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
