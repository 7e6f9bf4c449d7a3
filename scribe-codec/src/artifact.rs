//! Artifact text format.
//!
//! ```text
//! ---
//! source: src/a.py
//! language: python
//! ---
//!
//! <editable body>
//!
//! <!-- scribe:meta
//! source_path: src/a.py
//! source_hash: …
//! generated_at: …
//! generator_id: …
//! -->
//! ```
//!
//! Parsing never fails: an unreadable footer is reported as "no footer",
//! which callers treat as a hand-written artifact.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use scribe_core::types::{ArtifactMetadata, Language};

use crate::error::CodecError;

pub const FOOTER_OPEN: &str = "<!-- scribe:meta";
pub const FOOTER_CLOSE: &str = "-->";
const FRONTMATTER_FENCE: &str = "---";

/// YAML block at the top of every generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

/// An artifact split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Raw frontmatter YAML (without fences), if present.
    pub frontmatter: Option<String>,
    /// Editable content, trimmed and LF-normalised.
    pub body: String,
    pub metadata: Option<ArtifactMetadata>,
}

/// Split `text` into frontmatter, body and footer.
pub fn parse(text: &str) -> Artifact {
    let text = text.replace("\r\n", "\n");
    let (frontmatter, rest) = split_frontmatter(&text);
    let (body, metadata) = match find_footer(rest) {
        Some((start, yaml)) => (&rest[..start], serde_yaml::from_str(yaml).ok()),
        None => (rest, None),
    };
    Artifact {
        frontmatter: frontmatter.map(str::to_string),
        body: normalize_body(body),
        metadata,
    }
}

/// Read only the metadata footer.
pub fn parse_footer(text: &str) -> Option<ArtifactMetadata> {
    parse(text).metadata
}

/// Replace the footer of `text` with one built from `metadata`, leaving
/// frontmatter and body byte-for-byte as they were. A text without a footer
/// gets one appended.
pub fn replace_footer(text: &str, metadata: &ArtifactMetadata) -> Result<String, CodecError> {
    let head = match find_footer(text) {
        Some((start, _)) => &text[..start],
        None => text,
    };
    let mut out = head.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&footer_block(metadata)?);
    out.push('\n');
    Ok(out)
}

/// `<!-- scribe:meta\n<yaml>-->`
pub fn footer_block(metadata: &ArtifactMetadata) -> Result<String, CodecError> {
    let yaml = serde_yaml::to_string(metadata)?;
    Ok(format!("{FOOTER_OPEN}\n{yaml}{FOOTER_CLOSE}"))
}

/// Canonical body form used for both writing and design hashing.
pub fn normalize_body(body: &str) -> String {
    body.replace("\r\n", "\n").trim().to_string()
}

/// First line of the body that reads like prose, for directory summaries.
pub fn description(body: &str, max_chars: usize) -> String {
    let line = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .unwrap_or_default();
    let mut out: String = line.chars().take(max_chars).collect();
    if line.chars().count() > max_chars {
        out.push('…');
    }
    out
}

fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(after_open) = text.strip_prefix("---\n") else {
        return (None, text);
    };
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_FENCE {
            let yaml = &after_open[..offset];
            let rest = &after_open[offset + line.len()..];
            return (Some(yaml), rest);
        }
        offset += line.len();
    }
    (None, text)
}

/// Byte offset of the last footer in `text` plus its YAML payload.
fn find_footer(text: &str) -> Option<(usize, &str)> {
    let start = text.rfind(FOOTER_OPEN)?;
    let after = &text[start + FOOTER_OPEN.len()..];
    let close = after.find(FOOTER_CLOSE)?;
    Some((start, after[..close].trim_start_matches('\n')))
}
