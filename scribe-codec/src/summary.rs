//! Directory summaries (`_index.md`).
//!
//! A summary is a sorted list of `name → description` entries, one per
//! documented file directly inside the directory. It is re-read from disk,
//! edited entry by entry and re-rendered through [`crate::ArtifactCodec`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const ENTRY_PREFIX: &str = "- [";
const DESCRIPTION_SEPARATOR: &str = " — ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Source file name, e.g. `a.py`.
    pub name: String,
    pub description: String,
}

impl SummaryEntry {
    /// Link target relative to the summary file.
    pub fn link(&self) -> String {
        format!("{}.md", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySummary {
    dir: PathBuf,
    entries: BTreeMap<String, String>,
}

impl DirectorySummary {
    /// Empty summary for `dir` (relative to the project root; empty = root).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Recover entries from a previously rendered summary. Lines that are not
    /// entries are ignored, so a hand-edited or custom-templated file degrades
    /// to "fewer entries" rather than an error.
    pub fn parse(dir: impl Into<PathBuf>, text: &str) -> Self {
        let mut summary = Self::new(dir);
        for entry in parse_entries(text) {
            summary.entries.insert(entry.name, entry.description);
        }
        summary
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn title(&self) -> String {
        if self.dir.as_os_str().is_empty() {
            "(root)".to_string()
        } else {
            self.dir.to_string_lossy().replace('\\', "/")
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = SummaryEntry> + '_ {
        self.entries.iter().map(|(name, description)| SummaryEntry {
            name: name.clone(),
            description: description.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace an entry. Returns `true` when the summary changed.
    pub fn upsert(&mut self, name: impl Into<String>, description: impl Into<String>) -> bool {
        let description = description.into();
        let name = name.into();
        if self.entries.get(&name) == Some(&description) {
            return false;
        }
        self.entries.insert(name, description);
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Keep only entries for which `keep(name)` holds. Returns the number
    /// of entries dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name, _| keep(name));
        before - self.entries.len()
    }
}

/// Entries of a rendered summary in file order.
pub fn parse_entries(text: &str) -> Vec<SummaryEntry> {
    text.lines().filter_map(parse_entry_line).collect()
}

fn parse_entry_line(line: &str) -> Option<SummaryEntry> {
    let rest = line.trim_end().strip_prefix(ENTRY_PREFIX)?;
    let (name, rest) = rest.split_once("](")?;
    let (_link, rest) = rest.split_once(')')?;
    let description = rest
        .strip_prefix(DESCRIPTION_SEPARATOR)
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    Some(SummaryEntry {
        name: name.to_string(),
        description,
    })
}
