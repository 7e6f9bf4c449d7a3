//! `post-commit` hook management and commit inspection.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use scribe_core::ProjectLayout;

use crate::error::{io_err, DaemonError};

/// Second line of every hook scribe writes; how scribe recognizes its own.
pub const HOOK_MARKER: &str = "# scribe post-commit hook";
pub const HOOK_NAME: &str = "post-commit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// An older scribe hook was replaced.
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    NotInstalled,
}

pub fn hook_path(layout: &ProjectLayout) -> PathBuf {
    layout.git_dir().join("hooks").join(HOOK_NAME)
}

/// Shell script that runs `<binary> hook run` detached, appending its
/// output to `.scribe/logs/hook.log`, so the commit never waits on it.
///
/// The log is rotated synchronously before the redirect opens it; a rotation
/// inside the detached run would leave that run writing to `hook.log.1`.
pub fn generate_script(binary: &Path) -> String {
    let binary = shell_quote(&binary.to_string_lossy());
    format!(
        "#!/bin/sh\n\
         {HOOK_MARKER}\n\
         # Regenerates documentation for the files touched by the new commit.\n\
         rev=$(git rev-parse HEAD 2>/dev/null || echo HEAD)\n\
         mkdir -p .scribe/logs\n\
         {binary} hook rotate-log >/dev/null 2>&1\n\
         nohup {binary} hook run --commit \"$rev\" >> .scribe/logs/hook.log 2>&1 &\n\
         exit 0\n"
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_ours(contents: &str) -> bool {
    contents.lines().take(3).any(|line| line.trim() == HOOK_MARKER)
}

pub fn is_installed(layout: &ProjectLayout) -> bool {
    fs::read_to_string(hook_path(layout)).is_ok_and(|contents| is_ours(&contents))
}

/// Write the hook. An existing hook that scribe did not write is left alone
/// and reported as [`DaemonError::ForeignHook`].
pub fn install(layout: &ProjectLayout, binary: &Path) -> Result<InstallOutcome, DaemonError> {
    if !layout.git_dir().is_dir() {
        return Err(DaemonError::NotAGitRepo {
            root: layout.root().to_path_buf(),
        });
    }
    let path = hook_path(layout);
    let outcome = match fs::read_to_string(&path) {
        Ok(existing) if is_ours(&existing) => InstallOutcome::Updated,
        Ok(_) => return Err(DaemonError::ForeignHook { path }),
        Err(err) if err.kind() == ErrorKind::NotFound => InstallOutcome::Installed,
        Err(err) => return Err(io_err(&path, err)),
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|err| io_err(dir, err))?;
    }
    fs::write(&path, generate_script(binary)).map_err(|err| io_err(&path, err))?;
    make_executable(&path)?;
    tracing::info!(path = %path.display(), "installed post-commit hook");
    Ok(outcome)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|err| io_err(path, err))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

/// Remove the hook only if scribe wrote it.
pub fn uninstall(layout: &ProjectLayout) -> Result<UninstallOutcome, DaemonError> {
    let path = hook_path(layout);
    match fs::read_to_string(&path) {
        Ok(existing) if is_ours(&existing) => {
            fs::remove_file(&path).map_err(|err| io_err(&path, err))?;
            tracing::info!(path = %path.display(), "removed post-commit hook");
            Ok(UninstallOutcome::Removed)
        }
        Ok(_) => Err(DaemonError::ForeignHook { path }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(UninstallOutcome::NotInstalled),
        Err(err) => Err(io_err(&path, err)),
    }
}

/// Root-relative paths touched by commit `rev` (added, modified or deleted).
///
/// A merge commit is diffed against its first parent, so the files brought
/// in by the merged branch and any conflict resolutions are included.
pub fn changed_files(root: &Path, rev: &str) -> Result<Vec<PathBuf>, DaemonError> {
    let parents = git_output(root, &["rev-list", "--parents", "-n", "1", rev])?;
    let is_merge = parents.split_whitespace().count() > 2;
    let listing = if is_merge {
        let first_parent = format!("{rev}^1");
        git_output(root, &["diff", "--name-only", &first_parent, rev])?
    } else {
        git_output(
            root,
            &["diff-tree", "--no-commit-id", "--name-only", "-r", "--root", rev],
        )?
    };
    Ok(listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn git_output(root: &Path, args: &[&str]) -> Result<String, DaemonError> {
    let command = format!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|err| DaemonError::Git {
            command: command.clone(),
            message: err.to_string(),
        })?;
    if !output.status.success() {
        return Err(DaemonError::Git {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
