//! `scribe init`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use scribe_core::{config, ProjectLayout};

/// Create `.scribe/` at the project root.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self, root: Option<&Path>) -> Result<ExitCode> {
        let layout = match root {
            Some(_) => super::resolve_layout(root)?,
            None => {
                let cwd = std::env::current_dir().context("cannot read current directory")?;
                ProjectLayout::new(cwd)
            }
        };
        let existed = layout.config_path().exists();
        let config = config::init_at(&layout)
            .with_context(|| format!("failed to initialize {}", layout.root().display()))?;

        if existed {
            println!("✓ Already initialized: {}", layout.config_path().display());
        } else {
            println!("✓ Initialized scribe in {}", layout.root().display());
            println!("  Config:    {}", layout.config_path().display());
        }
        println!(
            "  Artifacts: {}",
            layout.artifact_root(&config).display()
        );
        if config.generator.endpoint.is_none() {
            println!("  Set `generator.endpoint` in the config before running `scribe update`.");
        }
        Ok(ExitCode::SUCCESS)
    }
}
