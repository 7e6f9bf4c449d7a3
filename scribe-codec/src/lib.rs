//! # scribe-codec
//!
//! Artifact codec: splits an artifact into frontmatter, editable body and
//! metadata footer, and renders artifacts and directory summaries through
//! tera templates.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scribe_codec::{artifact, ArtifactCodec};
//!
//! fn show(text: &str) {
//!     let parsed = artifact::parse(text);
//!     match parsed.metadata {
//!         Some(meta) => println!("generated from {}", meta.source_path.display()),
//!         None => println!("hand-written artifact ({} bytes of body)", parsed.body.len()),
//!     }
//!     let _codec = ArtifactCodec::new().expect("embedded templates");
//! }
//! ```

pub mod artifact;
pub mod engine;
pub mod error;
pub mod summary;

pub use artifact::{Artifact, Frontmatter};
pub use engine::ArtifactCodec;
pub use error::CodecError;
pub use summary::{DirectorySummary, SummaryEntry};
