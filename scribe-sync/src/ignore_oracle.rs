//! Ignore rules.
//!
//! [`GitignoreOracle`] combines, in order of increasing precedence:
//! `.gitignore`, `.scribeignore`, then the `ignore` patterns from config.
//! Only root-level ignore files are read.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::SyncError;

pub const SCRIBEIGNORE_FILE: &str = ".scribeignore";

pub trait IgnoreOracle: Send + Sync {
    /// `rel_path` is relative to the project root.
    fn is_ignored(&self, rel_path: &Path) -> bool;
}

pub struct GitignoreOracle {
    matcher: Gitignore,
}

impl GitignoreOracle {
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self, SyncError> {
        let mut builder = GitignoreBuilder::new(root);
        for name in [".gitignore", SCRIBEIGNORE_FILE] {
            let path = root.join(name);
            if !path.is_file() {
                continue;
            }
            if let Some(err) = builder.add(&path) {
                tracing::warn!("ignoring unreadable rules in {}: {err}", path.display());
            }
        }
        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }
        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Oracle that ignores nothing.
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }
}

impl IgnoreOracle for GitignoreOracle {
    fn is_ignored(&self, rel_path: &Path) -> bool {
        if rel_path.is_absolute() || rel_path.as_os_str().is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(rel_path, false)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn gitignore_scribeignore_and_config_all_apply() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".gitignore"), "target/\n*.log\n").unwrap();
        fs::write(tmp.path().join(".scribeignore"), "vendor/\n").unwrap();
        let oracle =
            GitignoreOracle::new(tmp.path(), &["generated_*.py".to_string()]).unwrap();

        assert!(oracle.is_ignored(Path::new("target/debug/app.rs")));
        assert!(oracle.is_ignored(Path::new("logs/run.log")));
        assert!(oracle.is_ignored(Path::new("vendor/lib/x.go")));
        assert!(oracle.is_ignored(Path::new("src/generated_models.py")));
        assert!(!oracle.is_ignored(Path::new("src/models.py")));
    }

    #[test]
    fn negation_in_config_reincludes() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".gitignore"), "*.md\n").unwrap();
        let oracle = GitignoreOracle::new(tmp.path(), &["!README.md".to_string()]).unwrap();
        assert!(oracle.is_ignored(Path::new("docs/guide.md")));
        assert!(!oracle.is_ignored(Path::new("README.md")));
    }

    #[test]
    fn empty_oracle_ignores_nothing() {
        assert!(!GitignoreOracle::empty().is_ignored(Path::new("anything.py")));
    }
}
