//! SHA-256 fingerprints stored in artifact footers.

use sha2::{Digest, Sha256};

use scribe_codec::artifact::normalize_body;

/// Hex-encoded SHA-256 of `text`, byte for byte.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn source_hash(content: &str) -> String {
    sha256_hex(content)
}

pub fn interface_hash(skeleton: Option<&str>) -> Option<String> {
    skeleton.map(sha256_hex)
}

/// Hash of an artifact's editable body. Line endings and surrounding
/// whitespace do not count; an empty body has no design hash.
pub fn design_hash(body: &str) -> Option<String> {
    let body = normalize_body(body);
    if body.is_empty() {
        None
    } else {
        Some(sha256_hex(&body))
    }
}
