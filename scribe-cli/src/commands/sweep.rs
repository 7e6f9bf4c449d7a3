//! `scribe run-once`, `scribe watch`, `scribe watchdog`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use super::{exit_code, Project};

pub fn run_once(root: Option<&Path>) -> Result<ExitCode> {
    let coordinator = Project::open(root)?.coordinator()?;
    match coordinator.run_once().context("sweep failed")? {
        Some(stats) => {
            let mark = if stats.has_failures() { "✗" } else { "✓" };
            println!("{mark} {stats}");
            Ok(exit_code(&stats))
        }
        None => {
            println!("✓ Nothing changed since the last sweep");
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub fn watch(root: Option<&Path>) -> Result<ExitCode> {
    let coordinator = Project::open(root)?.coordinator()?;
    scribe_daemon::watch_blocking(coordinator).context("watch loop exited with error")?;
    Ok(ExitCode::SUCCESS)
}

pub fn watchdog(root: Option<&Path>) -> Result<ExitCode> {
    let coordinator = Project::open(root)?.coordinator()?;
    scribe_daemon::watchdog_blocking(coordinator).context("watcher exited with error")?;
    Ok(ExitCode::SUCCESS)
}
