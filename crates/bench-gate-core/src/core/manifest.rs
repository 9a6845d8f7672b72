// crates/bench-gate-core/src/core/manifest.rs
// ============================================================================
// Module: Bench Gate Integrity Manifest
// Description: Code pinning, manifest lifecycle, seal, and HMAC signature.
// Purpose: Produce and verify tamper-evident manifests for evaluation runs.
// Dependencies: crate::core::{hashing, identifiers, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! The integrity manifest binds a run's identity, code pins, and per-task
//! trajectory hashes under a structural seal and an optional HMAC signature.
//! The lifecycle is state-tagged: a [`ManifestDraft`] accumulates task hashes
//! during a run and [`ManifestDraft::finalize`] is the only way to obtain a
//! [`SealedManifest`], whose fields are write-once. Submitted manifests are
//! untrusted and arrive as [`ManifestRecord`] values over which verification
//! operates.
//!
//! The seal and signature are always computed over a reduced body that
//! structurally excludes `manifest_hash` and `hmac_signature`, so neither
//! field ever participates in its own computation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::constant_time_digest_eq;
use crate::core::hashing::hash_canonical_json;
use crate::core::hashing::hash_file;
use crate::core::hashing::hmac_canonical_json;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TaskId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Signing Key
// ============================================================================

/// Shared-secret HMAC signing key.
///
/// # Invariants
/// - Key material never appears in `Debug` output or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Creates a signing key from raw material.
    #[must_use]
    pub fn new(material: impl Into<Vec<u8>>) -> Self {
        Self(material.into())
    }

    /// Returns the key material bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(redacted)")
    }
}

impl From<&str> for SigningKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

// ============================================================================
// SECTION: Code Pinning
// ============================================================================

/// The four critical evaluation artifacts pinned at run start.
///
/// # Invariants
/// - Variants are stable; labels match the manifest's pin field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeArtifact {
    /// Evaluator logic.
    Evaluator,
    /// Task configuration file.
    TaskConfig,
    /// Environment shim.
    Environment,
    /// Shared helper functions.
    Helpers,
}

impl CodeArtifact {
    /// Returns the manifest field name for this artifact's pin.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Evaluator => "evaluator_sha256",
            Self::TaskConfig => "task_config_sha256",
            Self::Environment => "environment_sha256",
            Self::Helpers => "helpers_sha256",
        }
    }
}

impl fmt::Display for CodeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Relative paths of the critical artifacts under the project root.
///
/// # Invariants
/// - Paths are project-root-relative; hosts supply the layout explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    /// Path to the evaluator logic source.
    pub evaluator: PathBuf,
    /// Path to the task configuration file.
    pub task_config: PathBuf,
    /// Path to the environment shim source.
    pub environment: PathBuf,
    /// Path to the shared helper functions source.
    pub helpers: PathBuf,
}

impl ArtifactLayout {
    /// Returns the layout as ordered (artifact, path) pairs.
    fn entries(&self) -> [(CodeArtifact, &Path); 4] {
        [
            (CodeArtifact::Evaluator, self.evaluator.as_path()),
            (CodeArtifact::TaskConfig, self.task_config.as_path()),
            (CodeArtifact::Environment, self.environment.as_path()),
            (CodeArtifact::Helpers, self.helpers.as_path()),
        ]
    }
}

/// SHA-256 pins of the four critical artifacts.
///
/// # Invariants
/// - Empty strings mean the artifact was absent at pin time; the structural
///   validator later fails such submissions by hash mismatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePins {
    /// Pin of the evaluator logic.
    pub evaluator_sha256: String,
    /// Pin of the task configuration file.
    pub task_config_sha256: String,
    /// Pin of the environment shim.
    pub environment_sha256: String,
    /// Pin of the shared helper functions.
    pub helpers_sha256: String,
}

impl CodePins {
    /// Returns the pin value for an artifact.
    #[must_use]
    pub fn get(&self, artifact: CodeArtifact) -> &str {
        match artifact {
            CodeArtifact::Evaluator => &self.evaluator_sha256,
            CodeArtifact::TaskConfig => &self.task_config_sha256,
            CodeArtifact::Environment => &self.environment_sha256,
            CodeArtifact::Helpers => &self.helpers_sha256,
        }
    }

    /// Sets the pin value for an artifact.
    fn set(&mut self, artifact: CodeArtifact, value: String) {
        match artifact {
            CodeArtifact::Evaluator => self.evaluator_sha256 = value,
            CodeArtifact::TaskConfig => self.task_config_sha256 = value,
            CodeArtifact::Environment => self.environment_sha256 = value,
            CodeArtifact::Helpers => self.helpers_sha256 = value,
        }
    }
}

/// Structured warning for an absent artifact at pin time.
///
/// # Invariants
/// - Absence is evidence, not an error: the pin records an empty string and
///   downstream code-pin comparison fails by mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinWarning {
    /// Which artifact was missing.
    pub artifact: CodeArtifact,
    /// The path that was checked.
    pub path: String,
}

impl fmt::Display for PinWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code artifact not found: {} ({})", self.path, self.artifact)
    }
}

/// Pins the four critical artifacts under `root`.
///
/// Absent files record an empty pin plus a [`PinWarning`]; only I/O failures
/// on files that exist are fatal.
///
/// # Errors
///
/// Returns [`HashError::Io`] when an existing artifact cannot be read.
pub fn pin_code_artifacts(
    root: &Path,
    layout: &ArtifactLayout,
) -> Result<(CodePins, Vec<PinWarning>), HashError> {
    let mut pins = CodePins::default();
    let mut warnings = Vec::new();
    for (artifact, rel_path) in layout.entries() {
        let full_path = root.join(rel_path);
        if full_path.exists() {
            let digest = hash_file(DEFAULT_HASH_ALGORITHM, &full_path)?;
            pins.set(artifact, digest.value);
        } else {
            warnings.push(PinWarning {
                artifact,
                path: full_path.display().to_string(),
            });
            pins.set(artifact, String::new());
        }
    }
    Ok((pins, warnings))
}

// ============================================================================
// SECTION: Manifest Body
// ============================================================================

/// Reduced manifest form over which the seal and HMAC are computed.
///
/// # Invariants
/// - Never contains `manifest_hash` or `hmac_signature`; their exclusion from
///   their own computation is structural, not procedural.
#[derive(Debug, Clone, Serialize)]
struct ManifestBody<'a> {
    /// Run identifier.
    run_id: &'a RunId,
    /// Benchmark semantic version.
    benchmark_version: &'a str,
    /// Run start timestamp.
    timestamp_start: Timestamp,
    /// Run end timestamp; unset until finalization.
    timestamp_end: Option<Timestamp>,
    /// Pin of the evaluator logic.
    evaluator_sha256: &'a str,
    /// Pin of the task configuration file.
    task_config_sha256: &'a str,
    /// Pin of the environment shim.
    environment_sha256: &'a str,
    /// Pin of the shared helper functions.
    helpers_sha256: &'a str,
    /// Per-task trajectory hashes keyed by decimal task id.
    task_hashes: &'a BTreeMap<TaskId, String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest lifecycle errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A trajectory hash was recorded twice for the same task.
    #[error("duplicate trajectory hash for task {task_id}")]
    DuplicateTask {
        /// Task whose hash was recorded twice.
        task_id: TaskId,
    },
    /// Canonicalization or hashing failed while sealing or signing.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Draft Manifest
// ============================================================================

/// Producer-side manifest under construction during an evaluation run.
///
/// # Invariants
/// - Carries no seal and no signature; those exist only on [`SealedManifest`].
/// - `task_hashes` keys are unique; duplicates are rejected at insertion.
#[derive(Debug, Clone)]
pub struct ManifestDraft {
    /// Run identifier assigned at run start.
    run_id: RunId,
    /// Benchmark semantic version pinned at run start.
    benchmark_version: String,
    /// Run start timestamp.
    timestamp_start: Timestamp,
    /// Code pins computed at run start.
    pins: CodePins,
    /// Per-task trajectory hashes accumulated as tasks finish.
    task_hashes: BTreeMap<TaskId, String>,
}

impl ManifestDraft {
    /// Creates a draft manifest at run start.
    #[must_use]
    pub fn new(
        run_id: RunId,
        benchmark_version: impl Into<String>,
        started_at: Timestamp,
        pins: CodePins,
    ) -> Self {
        Self {
            run_id,
            benchmark_version: benchmark_version.into(),
            timestamp_start: started_at,
            pins,
            task_hashes: BTreeMap::new(),
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Records a task's trajectory hash as the task finishes.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateTask`] when a hash for `task_id` was
    /// already recorded.
    pub fn record_task_hash(
        &mut self,
        task_id: TaskId,
        digest: &HashDigest,
    ) -> Result<(), ManifestError> {
        if self.task_hashes.contains_key(&task_id) {
            return Err(ManifestError::DuplicateTask {
                task_id,
            });
        }
        self.task_hashes.insert(task_id, digest.value.clone());
        Ok(())
    }

    /// Finalizes the draft: sets the end timestamp, seals, and optionally signs.
    ///
    /// A manifest finalized without a key is valid but unsigned; acceptance
    /// policy decides how to treat unsigned submissions.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Hash`] when canonicalization fails.
    pub fn finalize(
        self,
        ended_at: Timestamp,
        signing_key: Option<&SigningKey>,
    ) -> Result<SealedManifest, ManifestError> {
        let body = ManifestBody {
            run_id: &self.run_id,
            benchmark_version: &self.benchmark_version,
            timestamp_start: self.timestamp_start,
            timestamp_end: Some(ended_at),
            evaluator_sha256: &self.pins.evaluator_sha256,
            task_config_sha256: &self.pins.task_config_sha256,
            environment_sha256: &self.pins.environment_sha256,
            helpers_sha256: &self.pins.helpers_sha256,
            task_hashes: &self.task_hashes,
        };
        let seal = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &body)?;
        let signature = match signing_key {
            Some(key) => hmac_canonical_json(key.as_bytes(), &body)?.value,
            None => String::new(),
        };
        Ok(SealedManifest {
            record: ManifestRecord {
                run_id: self.run_id,
                benchmark_version: self.benchmark_version,
                timestamp_start: self.timestamp_start,
                timestamp_end: Some(ended_at),
                evaluator_sha256: self.pins.evaluator_sha256,
                task_config_sha256: self.pins.task_config_sha256,
                environment_sha256: self.pins.environment_sha256,
                helpers_sha256: self.pins.helpers_sha256,
                task_hashes: self.task_hashes,
                manifest_hash: seal.value,
                hmac_signature: signature,
            },
        })
    }
}

// ============================================================================
// SECTION: Sealed Manifest
// ============================================================================

/// Finalized, immutable manifest.
///
/// # Invariants
/// - Constructed only by [`ManifestDraft::finalize`]; fields are write-once.
/// - Any later field change is detectable by seal or signature mismatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SealedManifest {
    /// The finalized wire record.
    record: ManifestRecord,
}

impl SealedManifest {
    /// Returns the manifest seal.
    #[must_use]
    pub fn manifest_hash(&self) -> &str {
        &self.record.manifest_hash
    }

    /// Returns the HMAC signature (empty when finalized without a key).
    #[must_use]
    pub fn hmac_signature(&self) -> &str {
        &self.record.hmac_signature
    }

    /// Returns `true` when the manifest was finalized with a signing key.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.record.hmac_signature.is_empty()
    }

    /// Returns the wire record view of this manifest.
    #[must_use]
    pub const fn as_record(&self) -> &ManifestRecord {
        &self.record
    }

    /// Consumes the sealed manifest, yielding its wire record.
    #[must_use]
    pub fn into_record(self) -> ManifestRecord {
        self.record
    }
}

// ============================================================================
// SECTION: Wire Record
// ============================================================================

/// Untrusted wire-side manifest as persisted or submitted.
///
/// # Invariants
/// - Field values are claims, not facts; verification recomputes the seal and
///   signature from the declared fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Run identifier.
    pub run_id: RunId,
    /// Benchmark semantic version.
    pub benchmark_version: String,
    /// Run start timestamp.
    pub timestamp_start: Timestamp,
    /// Run end timestamp; unset until finalization.
    pub timestamp_end: Option<Timestamp>,
    /// Pin of the evaluator logic.
    pub evaluator_sha256: String,
    /// Pin of the task configuration file.
    pub task_config_sha256: String,
    /// Pin of the environment shim.
    pub environment_sha256: String,
    /// Pin of the shared helper functions.
    pub helpers_sha256: String,
    /// Per-task trajectory hashes keyed by decimal task id.
    pub task_hashes: BTreeMap<TaskId, String>,
    /// Structural seal over the manifest body.
    #[serde(default)]
    pub manifest_hash: String,
    /// HMAC-SHA-256 signature; empty when no signing key was configured.
    #[serde(default)]
    pub hmac_signature: String,
}

impl ManifestRecord {
    /// Returns the code pins declared by this record.
    #[must_use]
    pub fn pins(&self) -> CodePins {
        CodePins {
            evaluator_sha256: self.evaluator_sha256.clone(),
            task_config_sha256: self.task_config_sha256.clone(),
            environment_sha256: self.environment_sha256.clone(),
            helpers_sha256: self.helpers_sha256.clone(),
        }
    }

    /// Returns the reduced body over which the seal and HMAC are computed.
    fn body(&self) -> ManifestBody<'_> {
        ManifestBody {
            run_id: &self.run_id,
            benchmark_version: &self.benchmark_version,
            timestamp_start: self.timestamp_start,
            timestamp_end: self.timestamp_end,
            evaluator_sha256: &self.evaluator_sha256,
            task_config_sha256: &self.task_config_sha256,
            environment_sha256: &self.environment_sha256,
            helpers_sha256: &self.helpers_sha256,
            task_hashes: &self.task_hashes,
        }
    }
}

// ============================================================================
// SECTION: Verification Operations
// ============================================================================

/// Recomputes the structural seal from a record's declared fields.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn seal_manifest(record: &ManifestRecord) -> Result<HashDigest, HashError> {
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &record.body())
}

/// Computes the HMAC-SHA-256 signature over a record's reduced body.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn compute_hmac(record: &ManifestRecord, key: &SigningKey) -> Result<HashDigest, HashError> {
    hmac_canonical_json(key.as_bytes(), &record.body())
}

/// Verifies a record's HMAC signature with constant-time comparison.
///
/// An empty signature never verifies. Canonicalization failure is treated as
/// verification failure: an unverifiable manifest is an invalid one.
#[must_use]
pub fn verify_hmac(record: &ManifestRecord, key: &SigningKey) -> bool {
    if record.hmac_signature.is_empty() {
        return false;
    }
    match compute_hmac(record, key) {
        Ok(expected) => constant_time_digest_eq(&record.hmac_signature, &expected.value),
        Err(_) => false,
    }
}
