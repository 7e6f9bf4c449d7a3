//! Project layout — every path scribe reads or writes inside a project.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   .scribe/
//!     config.yaml              (optional; defaults apply when absent)
//!     mirror/                  (default artifact_dir)
//!       src/a.py.md            (artifact for src/a.py)
//!       src/_index.md          (directory summary for src/)
//!     templates/               (optional tera overrides)
//!     state/sweep_cursor.json
//!     logs/hook.log
//! ```

use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;

pub const SCRIBE_DIR: &str = ".scribe";
pub const GIT_DIR: &str = ".git";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SUMMARY_FILE: &str = "_index.md";
pub const ARTIFACT_EXTENSION: &str = "md";

/// Resolved paths for one project rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk up from `start` to the first directory holding `.scribe/` or `.git/`.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        for dir in start.ancestors() {
            if dir.join(SCRIBE_DIR).is_dir() || dir.join(GIT_DIR).exists() {
                return Ok(Self::new(dir));
            }
        }
        Err(ConfigError::ProjectNotFound {
            start: start.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.scribe/`
    pub fn scribe_dir(&self) -> PathBuf {
        self.root.join(SCRIBE_DIR)
    }

    /// `<root>/.scribe/config.yaml`
    pub fn config_path(&self) -> PathBuf {
        self.scribe_dir().join(CONFIG_FILE)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.scribe_dir().join("state")
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.state_dir().join("sweep_cursor.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.scribe_dir().join("logs")
    }

    pub fn hook_log_path(&self) -> PathBuf {
        self.logs_dir().join("hook.log")
    }

    /// `<root>/.scribe/templates/`, user overrides for the embedded templates.
    pub fn templates_dir(&self) -> PathBuf {
        self.scribe_dir().join("templates")
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(GIT_DIR)
    }

    /// Absolute directory the configured scope covers.
    pub fn scope_root(&self, config: &Config) -> PathBuf {
        normalize(&self.root.join(&config.scope))
    }

    /// Absolute root of the artifact mirror.
    pub fn artifact_root(&self, config: &Config) -> PathBuf {
        normalize(&self.root.join(&config.artifact_dir))
    }

    /// Artifact for `rel_source`: `<artifact_root>/<rel_source>.md`.
    pub fn artifact_path(&self, config: &Config, rel_source: &Path) -> PathBuf {
        let mut name = rel_source.as_os_str().to_owned();
        name.push(".");
        name.push(ARTIFACT_EXTENSION);
        self.artifact_root(config).join(PathBuf::from(name))
    }

    /// Directory summary for `rel_dir` (empty path = project root).
    pub fn summary_path(&self, config: &Config, rel_dir: &Path) -> PathBuf {
        self.artifact_root(config).join(rel_dir).join(SUMMARY_FILE)
    }

    /// Express `path` relative to the project root. Relative input is taken
    /// as already root-relative. Returns `None` for paths outside the root.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        if path.is_relative() {
            let cleaned = normalize(path);
            if cleaned.components().any(|c| matches!(c, Component::ParentDir)) {
                return None;
            }
            return Some(cleaned);
        }
        normalize(path)
            .strip_prefix(normalize(&self.root))
            .ok()
            .map(Path::to_path_buf)
    }

    /// Whether `rel_path` lies inside the configured scope.
    pub fn in_scope(&self, config: &Config, rel_path: &Path) -> bool {
        let scope = normalize(&config.scope);
        scope.as_os_str().is_empty() || rel_path.starts_with(&scope)
    }

    /// Whether an absolute path belongs to scribe's own files or git internals.
    pub fn is_internal(&self, config: &Config, path: &Path) -> bool {
        path.starts_with(self.scribe_dir())
            || path.starts_with(self.git_dir())
            || path.starts_with(self.artifact_root(config))
    }
}

/// Lexically drop `.` components and resolve `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
