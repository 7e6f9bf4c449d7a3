//! Source inspection for `scribe-detector`.
//!
//! - [`detect_language`] maps a path (and, for extensionless scripts, its
//!   shebang) to a [`Language`].
//! - [`load_source`] reads a file for the orchestrator, refusing binary and
//!   oversized files before their content is ever decoded.
//! - [`SignatureExtractor`] is the default [`InterfaceExtractor`]: a
//!   line-based scan for public declarations. It does not parse; it only
//!   needs to change when a file's public surface changes.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use scribe_core::types::{Language, SourceFile};
use thiserror::Error;

/// Bytes inspected when sniffing for binary content.
pub const SNIFF_LEN: usize = 8000;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of [`load_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedSource {
    Text(SourceFile),
    Binary,
    Oversized { size: u64 },
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> DetectError {
    DetectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Produces the structural skeleton of a source file. Two versions of a file
/// with equal skeletons are considered interface-compatible.
pub trait InterfaceExtractor: Send + Sync {
    /// `None` when the file has no interface concept.
    fn skeleton(&self, path: &Path, content: &str, language: Option<Language>) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Language detection
// ---------------------------------------------------------------------------

pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let language = match ext.as_str() {
        "py" | "pyi" => Language::Python,
        "rs" => Language::Rust,
        "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
        "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
        "go" => Language::Go,
        "java" => Language::Java,
        "kt" | "kts" => Language::Kotlin,
        "rb" => Language::Ruby,
        "c" | "h" => Language::C,
        "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
        "cs" => Language::CSharp,
        "swift" => Language::Swift,
        "php" => Language::Php,
        "sh" | "bash" | "zsh" => Language::Shell,
        "md" | "markdown" => Language::Markdown,
        "yaml" | "yml" => Language::Yaml,
        "json" => Language::Json,
        "toml" => Language::Toml,
        _ => return None,
    };
    Some(language)
}

/// Language from a `#!` line, for scripts without an extension.
pub fn detect_shebang(content: &str) -> Option<Language> {
    let first = content.lines().next()?.strip_prefix("#!")?;
    let interpreter = first
        .split_whitespace()
        .flat_map(|word| word.rsplit('/').next())
        .find(|word| *word != "env")?;
    match interpreter {
        "sh" | "bash" | "zsh" | "dash" => Some(Language::Shell),
        i if i.starts_with("python") => Some(Language::Python),
        "node" | "deno" => Some(Language::JavaScript),
        "ruby" => Some(Language::Ruby),
        "php" => Some(Language::Php),
        _ => None,
    }
}

/// NUL byte in the first [`SNIFF_LEN`] bytes, or not UTF-8.
pub fn is_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(bytes).is_err()
}

/// Read `root/rel` unless it is larger than `max_bytes` or binary.
pub fn load_source(root: &Path, rel: &Path, max_bytes: u64) -> Result<LoadedSource, DetectError> {
    let abs = root.join(rel);
    let meta = fs::metadata(&abs).map_err(|e| io_err(&abs, e))?;
    if meta.len() > max_bytes {
        return Ok(LoadedSource::Oversized { size: meta.len() });
    }

    let mut bytes = Vec::with_capacity(meta.len() as usize);
    fs::File::open(&abs)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| io_err(&abs, e))?;
    if is_binary(&bytes) {
        return Ok(LoadedSource::Binary);
    }
    let content = String::from_utf8(bytes).unwrap_or_default();
    let language = detect_language(rel).or_else(|| {
        if rel.extension().is_none() { detect_shebang(&content) } else { None }
    });

    Ok(LoadedSource::Text(SourceFile {
        path: rel.to_path_buf(),
        size: content.len() as u64,
        content,
        language,
    }))
}

// ---------------------------------------------------------------------------
// Signature extraction
// ---------------------------------------------------------------------------

/// Line-based public-declaration scanner.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureExtractor;

impl InterfaceExtractor for SignatureExtractor {
    fn skeleton(&self, _path: &Path, content: &str, language: Option<Language>) -> Option<String> {
        let language = language.filter(Language::has_interface)?;
        let lines: Vec<String> = content
            .lines()
            .filter(|line| is_signature(language, line))
            .map(normalize_signature)
            .collect();
        Some(lines.join("\n"))
    }
}

fn is_signature(language: Language, line: &str) -> bool {
    let indented = line.starts_with(' ') || line.starts_with('\t');
    let t = line.trim();
    if t.is_empty() {
        return false;
    }
    match language {
        Language::Python => {
            let decl = t
                .strip_prefix("async def ")
                .or_else(|| t.strip_prefix("def "))
                .or_else(|| t.strip_prefix("class "));
            matches!(decl, Some(name) if !name.starts_with('_') || name.starts_with("__init__"))
        }
        Language::Rust => {
            t.starts_with("pub ") && !t.starts_with("pub use ") && !t.starts_with("pub mod ")
                || t.starts_with("pub mod ") && !t.ends_with('{')
        }
        Language::Go => {
            if let Some(rest) = t.strip_prefix("func ") {
                // Methods: `func (r *T) Name(`
                let name = match rest.strip_prefix('(') {
                    Some(recv) => recv.split_once(')').map(|(_, n)| n.trim_start()).unwrap_or(""),
                    None => rest,
                };
                name.starts_with(|c: char| c.is_ascii_uppercase())
            } else if let Some(rest) = t.strip_prefix("type ") {
                rest.starts_with(|c: char| c.is_ascii_uppercase())
            } else {
                false
            }
        }
        Language::TypeScript | Language::JavaScript => {
            t.starts_with("export ") || t.starts_with("module.exports")
        }
        Language::Java | Language::CSharp | Language::Php => {
            t.starts_with("public ") || t.starts_with("protected ")
        }
        Language::Kotlin => {
            let private = t.starts_with("private ") || t.starts_with("internal ");
            !private
                && ["fun ", "class ", "interface ", "object ", "data class ", "sealed class ", "enum class "]
                    .iter()
                    .any(|kw| t.starts_with(kw) || t.contains(&format!(" {kw}")))
        }
        Language::Swift => t.starts_with("public ") || t.starts_with("open "),
        Language::Ruby => {
            (t.starts_with("def ") && !t.starts_with("def _"))
                || t.starts_with("class ")
                || t.starts_with("module ")
        }
        Language::C | Language::Cpp => {
            !indented
                && t.contains('(')
                && !t.starts_with("static ")
                && !t.starts_with('#')
                && !t.starts_with("//")
                && !t.starts_with("/*")
                && !t.starts_with('*')
                && !t.starts_with('}')
                && !t.starts_with("return ")
                || t.starts_with("#define ")
        }
        Language::Shell => {
            t.starts_with("function ")
                || (!indented && t.contains("()") && t.split("()").next().is_some_and(is_word))
        }
        Language::Markdown | Language::Yaml | Language::Json | Language::Toml => false,
    }
}

fn is_word(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Collapse whitespace and drop a trailing body opener.
fn normalize_signature(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches('{')
        .trim_end_matches(':')
        .trim_end()
        .to_string()
}
