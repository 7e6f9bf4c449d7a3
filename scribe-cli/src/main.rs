//! scribe — keeps a mirror of per-file documentation in step with the code.
//!
//! # Usage
//!
//! ```text
//! scribe init
//! scribe update [PATHS]... [--changed] [--dry-run] [--json]
//! scribe status [--json]
//! scribe run-once
//! scribe watch
//! scribe watchdog
//! scribe hook install|uninstall|run [--commit REV]
//! ```
//!
//! Every command accepts `--root <DIR>`; otherwise the project is found by
//! walking up from the current directory to the first `.scribe/` or `.git/`.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{hook::HookCommand, init::InitArgs, status::StatusArgs, update::UpdateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    version,
    about = "Keep per-file documentation artifacts in sync with source code",
    long_about = None,
)]
struct Cli {
    /// Project root (defaults to discovery from the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create `.scribe/` with a default config.
    Init(InitArgs),

    /// Regenerate artifacts for the given paths (default: the whole scope).
    Update(UpdateArgs),

    /// Show which artifacts are out of date, without changing anything.
    Status(StatusArgs),

    /// One sweep of the scope, skipped when nothing changed since the last.
    RunOnce,

    /// Sweep periodically until interrupted.
    Watch,

    /// Watch the file system in real time (deprecated; needs `watchdog_enabled`).
    Watchdog,

    /// Manage and run the git post-commit hook.
    Hook {
        #[command(subcommand)]
        command: HookCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    scribe_daemon::init_tracing();
    let cli = Cli::parse();
    let root = cli.root.as_deref();
    match cli.command {
        Commands::Init(args) => args.run(root),
        Commands::Update(args) => args.run(root),
        Commands::Status(args) => args.run(root),
        Commands::RunOnce => commands::sweep::run_once(root),
        Commands::Watch => commands::sweep::watch(root),
        Commands::Watchdog => commands::sweep::watchdog(root),
        Commands::Hook { command } => commands::hook::run(root, command),
    }
}
