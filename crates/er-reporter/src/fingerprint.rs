//! Fingerprint generation for error occurrences.
//!
//! The fingerprint identifies "the same error at the same place": exception
//! kind plus source location, hashed and truncated to a short tag. Collisions
//! are an accepted tradeoff for short, human-pasteable tags.

use sha2::{Digest, Sha256};

/// Prefix for fingerprint tags in the report tag set.
pub const TAG_PREFIX: &str = "hash-";

/// Derive the fingerprint tag for an occurrence.
///
/// Deterministic and pure: identical (kind, file, line) triples always yield
/// the identical tag. Format: `hash-` plus the first 8 hex characters of
/// SHA-256 over `"{kind}:{file}:{line}"`.
pub fn fingerprint(kind: &str, file: &str, line: u32) -> String {
    let identifier = format!("{kind}:{file}:{line}");
    let digest = Sha256::digest(identifier.as_bytes());
    format!("{TAG_PREFIX}{}", hex::encode(&digest[..4]))
}
