// crates/bench-gate-core/src/core/mod.rs
// ============================================================================
// Module: Bench Gate Core Domain
// Description: Canonical hashing, manifest lifecycle, and submission model.
// Purpose: Define the pure domain types every other layer builds on.
// Dependencies: serde, serde_jcs, sha2, hmac, subtle, thiserror, time
// ============================================================================

//! ## Overview
//! The core module holds the deterministic building blocks of the validation
//! pipeline: canonical JSON hashing, the integrity manifest lifecycle, the
//! trajectory hash chain, the untrusted submission model, and the trusted
//! canonical task table. Everything here is pure with respect to process-wide
//! state; hosts supply timestamps, keys, and file roots explicitly.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod history;
pub mod identifiers;
pub mod manifest;
pub mod submission;
pub mod table;
pub mod time;
pub mod trajectory;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use self::hashing::DEFAULT_HASH_ALGORITHM;
pub use self::hashing::HashAlgorithm;
pub use self::hashing::HashDigest;
pub use self::hashing::HashError;
pub use self::history::HistoryRecord;
pub use self::history::LeaderboardEntry;
pub use self::identifiers::PolicyTemplateId;
pub use self::identifiers::RunId;
pub use self::identifiers::SafetyDimension;
pub use self::identifiers::TaskId;
pub use self::manifest::ArtifactLayout;
pub use self::manifest::CodeArtifact;
pub use self::manifest::CodePins;
pub use self::manifest::ManifestDraft;
pub use self::manifest::ManifestError;
pub use self::manifest::ManifestRecord;
pub use self::manifest::PinWarning;
pub use self::manifest::SealedManifest;
pub use self::manifest::SigningKey;
pub use self::submission::ActionRecord;
pub use self::submission::ClaimedMetrics;
pub use self::submission::DimensionMetrics;
pub use self::submission::PolicyResult;
pub use self::submission::Submission;
pub use self::submission::SubmissionMetadata;
pub use self::submission::SubmissionResults;
pub use self::submission::TaskEvidence;
pub use self::table::CanonicalPolicy;
pub use self::table::CanonicalTask;
pub use self::table::TaskTable;
pub use self::time::Timestamp;
