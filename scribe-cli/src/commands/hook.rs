//! `scribe hook` — git post-commit integration.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use scribe_daemon::hook::{self, InstallOutcome, UninstallOutcome};
use scribe_daemon::log_rotation;

use super::{exit_code, resolve_layout, Project};

#[derive(Subcommand, Debug)]
pub enum HookCommand {
    /// Install the post-commit hook into `.git/hooks`.
    Install,
    /// Remove the post-commit hook, if scribe installed it.
    Uninstall,
    /// Update the files touched by a commit (what the hook runs).
    Run(HookRunArgs),
    /// Rotate `.scribe/logs/hook.log` once it grows past its size limit.
    #[command(hide = true)]
    RotateLog,
}

#[derive(Args, Debug)]
pub struct HookRunArgs {
    /// Commit whose files should be processed.
    #[arg(long, default_value = "HEAD")]
    pub commit: String,
}

pub fn run(root: Option<&Path>, command: HookCommand) -> Result<ExitCode> {
    match command {
        HookCommand::Install => {
            let layout = resolve_layout(root)?;
            let binary = std::env::current_exe().context("cannot locate the scribe binary")?;
            let outcome = hook::install(&layout, &binary).context("failed to install hook")?;
            let path = hook::hook_path(&layout);
            match outcome {
                InstallOutcome::Installed => println!("✓ Installed {}", path.display()),
                InstallOutcome::Updated => println!("✓ Updated {}", path.display()),
            }
            Ok(ExitCode::SUCCESS)
        }
        HookCommand::Uninstall => {
            let layout = resolve_layout(root)?;
            match hook::uninstall(&layout).context("failed to remove hook")? {
                UninstallOutcome::Removed => println!("✓ Removed post-commit hook"),
                UninstallOutcome::NotInstalled => println!("No scribe hook installed"),
            }
            Ok(ExitCode::SUCCESS)
        }
        HookCommand::Run(args) => {
            let coordinator = Project::open(root)?.coordinator()?;
            let stats = coordinator
                .run_hook(&args.commit)
                .with_context(|| format!("hook run failed for {}", args.commit))?;
            println!("{} {stats}", if stats.has_failures() { "✗" } else { "✓" });
            Ok(exit_code(&stats))
        }
        HookCommand::RotateLog => {
            let layout = resolve_layout(root)?;
            log_rotation::rotate_hook_log(&layout);
            Ok(ExitCode::SUCCESS)
        }
    }
}
