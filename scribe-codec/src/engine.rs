//! Tera rendering engine for artifacts and directory summaries.
//!
//! | Template                 | Output                                     |
//! |--------------------------|--------------------------------------------|
//! | `artifact.md.tera`       | `<artifact_dir>/<source>.md`               |
//! | `directory.md.tera`      | `<artifact_dir>/<dir>/_index.md`           |
//!
//! A project may override either template by dropping a file with the same
//! name into `.scribe/templates/`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};

use scribe_core::types::ArtifactMetadata;

use crate::artifact::{footer_block, normalize_body, Frontmatter};
use crate::error::CodecError;
use crate::summary::DirectorySummary;

pub const ARTIFACT_TEMPLATE: &str = "artifact.md.tera";
pub const DIRECTORY_TEMPLATE: &str = "directory.md.tera";

// ---------------------------------------------------------------------------
// Embedded templates — baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (ARTIFACT_TEMPLATE, include_str!("templates/artifact.md.tera")),
    (DIRECTORY_TEMPLATE, include_str!("templates/directory.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CodecError {
    CodecError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, CodecError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let name = normalize_template_name(Path::new(&entry.file_name()));
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents.replace("\r\n", "\n")));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, CodecError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert((*name).to_string(), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Render views
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ArtifactView<'a> {
    frontmatter: String,
    body: &'a str,
    footer: String,
}

#[derive(Serialize)]
struct DirectoryView {
    title: String,
    entries: Vec<EntryView>,
}

#[derive(Serialize)]
struct EntryView {
    name: String,
    link: String,
    description: String,
}

// ---------------------------------------------------------------------------
// ArtifactCodec
// ---------------------------------------------------------------------------

/// Serializes artifacts and directory summaries. Create once and reuse.
pub struct ArtifactCodec {
    tera: Tera,
}

impl ArtifactCodec {
    /// Codec with the embedded templates only.
    pub fn new() -> Result<Self, CodecError> {
        Self::with_user_templates(None)
    }

    /// Codec with embedded templates overridden by any `.tera` files found in
    /// `user_template_dir`.
    pub fn with_user_templates(user_template_dir: Option<&Path>) -> Result<Self, CodecError> {
        Ok(Self {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render a complete artifact: frontmatter, body and metadata footer.
    pub fn serialize(
        &self,
        frontmatter: &Frontmatter,
        body: &str,
        metadata: &ArtifactMetadata,
    ) -> Result<String, CodecError> {
        let body = normalize_body(body);
        let view = ArtifactView {
            frontmatter: serde_yaml::to_string(frontmatter)?,
            body: &body,
            footer: footer_block(metadata)?,
        };
        let rendered = self
            .tera
            .render(ARTIFACT_TEMPLATE, &Context::from_serialize(&view)?)?;
        Ok(ensure_trailing_newline(rendered))
    }

    /// Render a directory summary.
    pub fn render_summary(&self, summary: &DirectorySummary) -> Result<String, CodecError> {
        let view = DirectoryView {
            title: summary.title(),
            entries: summary
                .entries()
                .map(|entry| EntryView {
                    name: entry.name.clone(),
                    link: entry.link(),
                    description: entry.description.clone(),
                })
                .collect(),
        };
        let rendered = self
            .tera
            .render(DIRECTORY_TEMPLATE, &Context::from_serialize(&view)?)?;
        Ok(ensure_trailing_newline(rendered))
    }
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
