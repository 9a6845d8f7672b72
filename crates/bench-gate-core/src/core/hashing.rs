// crates/bench-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Bench Gate Canonical Hashing
// Description: RFC 8785 canonical JSON hashing, file hashing, and keyed MACs.
// Purpose: Provide the single source of truth for every hash in the system.
// Dependencies: serde, serde_jcs, serde_json, sha2, hmac, subtle, thiserror
// ============================================================================

//! ## Overview
//! All hashes in Bench Gate flow through this module. Canonical JSON bytes are
//! produced via RFC 8785 (lexicographically sorted keys, no insignificant
//! whitespace, normalized number rendering), so structurally equal values hash
//! identically regardless of construction order. Non-finite floats are
//! rejected rather than silently coerced. File hashing streams in fixed-size
//! chunks so large artifacts never load wholesale.
//!
//! Security posture: HMAC verification uses constant-time equality; digest
//! inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default algorithm used for all Bench Gate digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Chunk size for streaming file hashing.
const FILE_HASH_CHUNK_BYTES: usize = 8_192;

// ============================================================================
// SECTION: Algorithm and Digest Types
// ============================================================================

/// Supported hash algorithms.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 (FIPS 180-4).
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable label used in stored records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hash digest with its producing algorithm.
///
/// # Invariants
/// - `value` is lowercase hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hexadecimal digest value.
    pub value: String,
}

impl HashDigest {
    /// Creates a digest from raw bytes, rendering lowercase hex.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: lowercase_hex(bytes),
        }
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Renders bytes as lowercase hexadecimal.
fn lowercase_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hashing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - I/O failures are distinct from canonicalization failures so callers can
///   surface them separately from validation-level errors.
#[derive(Debug, Error)]
pub enum HashError {
    /// Value could not be rendered as canonical JSON.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
    /// Canonical payload exceeded the caller-supplied size limit.
    #[error("canonical payload too large: {actual} bytes (limit {limit})")]
    SizeLimitExceeded {
        /// Maximum allowed canonical bytes.
        limit: usize,
        /// Actual canonical byte length.
        actual: usize,
    },
    /// File could not be read while hashing.
    #[error("file hash io error for {path}: {message}")]
    Io {
        /// Path of the file being hashed.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
}

// ============================================================================
// SECTION: Canonical JSON Hashing
// ============================================================================

/// Renders a serializable value as RFC 8785 canonical JSON bytes.
///
/// Structurally equal values produce byte-identical output regardless of key
/// insertion order. Non-finite floats are rejected.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be rendered
/// (non-finite floats, non-string map keys, serializer failures).
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            HashDigest::new(algorithm, &hasher.finalize())
        }
    }
}

/// Hashes a serializable value via its canonical JSON form.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes a serializable value via canonical JSON, enforcing a byte limit.
///
/// # Errors
///
/// Returns [`HashError::SizeLimitExceeded`] when the canonical form exceeds
/// `max_bytes`, or [`HashError::Canonicalization`] when rendering fails.
pub fn hash_canonical_json_with_limit<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
    max_bytes: usize,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    if bytes.len() > max_bytes {
        return Err(HashError::SizeLimitExceeded {
            limit: max_bytes,
            actual: bytes.len(),
        });
    }
    Ok(hash_bytes(algorithm, &bytes))
}

// ============================================================================
// SECTION: File Hashing
// ============================================================================

/// Hashes a file by streaming its bytes in fixed-size chunks.
///
/// Peak memory is bounded by the chunk size regardless of file size.
///
/// # Errors
///
/// Returns [`HashError::Io`] when the file cannot be opened or read.
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<HashDigest, HashError> {
    let mut file = File::open(path).map_err(|err| HashError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            let mut buffer = [0_u8; FILE_HASH_CHUNK_BYTES];
            loop {
                let read = file.read(&mut buffer).map_err(|err| HashError::Io {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[.. read]);
            }
            Ok(HashDigest::new(algorithm, &hasher.finalize()))
        }
    }
}

// ============================================================================
// SECTION: Keyed MACs
// ============================================================================

/// HMAC-SHA-256 keyed MAC type.
type HmacSha256 = Hmac<Sha256>;

/// Computes HMAC-SHA-256 over the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be rendered
/// as canonical JSON.
pub fn hmac_canonical_json<T: Serialize>(key: &[u8], value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| HashError::Canonicalization(err.to_string()))?;
    mac.update(&bytes);
    Ok(HashDigest::new(HashAlgorithm::Sha256, &mac.finalize().into_bytes()))
}

/// Compares two digest strings in constant time.
///
/// Used for HMAC verification where a short-circuiting comparison would leak
/// a timing side-channel. Length differences still return `false`.
#[must_use]
pub fn constant_time_digest_eq(left: &str, right: &str) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.as_bytes().ct_eq(right.as_bytes()).into()
}
