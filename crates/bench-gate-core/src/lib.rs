// crates/bench-gate-core/src/lib.rs
// ============================================================================
// Module: Bench Gate Core
// Description: Integrity and validation pipeline for benchmark submissions.
// Purpose: Provide the deterministic gate between submitters and the board.
// Dependencies: hmac, serde, serde_jcs, serde_json, sha2, subtle, thiserror, time
// ============================================================================

//! ## Overview
//! Bench Gate core implements the integrity and validation pipeline for a
//! crowd-sourced benchmark leaderboard: canonical JSON hashing, the sealed
//! and HMAC-signed integrity manifest, the per-task trajectory hash chain,
//! structural validation, independent metric recomputation, statistical
//! anomaly detection, and anti-gaming controls over submission history.
//!
//! Everything is deterministic and host-driven: no wall-clock reads, no
//! environment lookups, no ambient state. Hosts inject timestamps, signing
//! keys, canonical task tables, and history stores explicitly, which keeps
//! validation reproducible and testable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::hashing;
pub use crate::core::identifiers;
pub use crate::core::manifest;
pub use crate::core::submission;
pub use crate::core::table;
pub use crate::core::time;
pub use crate::core::trajectory;

pub use crate::core::ActionRecord;
pub use crate::core::ArtifactLayout;
pub use crate::core::ClaimedMetrics;
pub use crate::core::CodeArtifact;
pub use crate::core::CodePins;
pub use crate::core::DimensionMetrics;
pub use crate::core::HashAlgorithm;
pub use crate::core::HashDigest;
pub use crate::core::HashError;
pub use crate::core::HistoryRecord;
pub use crate::core::LeaderboardEntry;
pub use crate::core::ManifestDraft;
pub use crate::core::ManifestError;
pub use crate::core::ManifestRecord;
pub use crate::core::PinWarning;
pub use crate::core::PolicyResult;
pub use crate::core::PolicyTemplateId;
pub use crate::core::RunId;
pub use crate::core::SafetyDimension;
pub use crate::core::SealedManifest;
pub use crate::core::SigningKey;
pub use crate::core::Submission;
pub use crate::core::SubmissionMetadata;
pub use crate::core::SubmissionResults;
pub use crate::core::TaskEvidence;
pub use crate::core::TaskId;
pub use crate::core::TaskTable;
pub use crate::core::Timestamp;
pub use crate::interfaces::AdmitOutcome;
pub use crate::interfaces::HistoryStoreError;
pub use crate::interfaces::SubmissionHistoryStore;
pub use crate::runtime::AnomalyFlag;
pub use crate::runtime::AntiGamingIssue;
pub use crate::runtime::AntiGamingPolicy;
pub use crate::runtime::GateDecision;
pub use crate::runtime::InMemoryHistoryStore;
pub use crate::runtime::MetricDiscrepancy;
pub use crate::runtime::StructuralError;
pub use crate::runtime::StructuralValidator;
pub use crate::runtime::SubmissionGate;
pub use crate::runtime::ValidationReport;
pub use crate::runtime::WireReport;
