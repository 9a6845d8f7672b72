// crates/bench-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Bench Gate Interfaces
// Description: Backend-agnostic interface for submission history storage.
// Purpose: Define the contract surface the validation pipeline persists through.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The submission history store is the one stateful seam in the validation
//! pipeline. Rate-limit, replay, and run-id checks read history that is also
//! appended to on acceptance, so the check-and-insert must be one atomic
//! operation in the backend rather than two separate steps. Implementations
//! must be deterministic and fail closed on backend errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::HistoryRecord;
use crate::core::LeaderboardEntry;

// ============================================================================
// SECTION: Submission History Store
// ============================================================================

/// Submission history store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HistoryStoreError {
    /// Store I/O error.
    #[error("history store io error: {0}")]
    Io(String),
    /// Store data is invalid.
    #[error("history store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("history store error: {0}")]
    Store(String),
}

/// Result of an atomic admission attempt.
///
/// # Invariants
/// - Exactly one variant per attempt; duplicates never insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmitOutcome {
    /// The record was inserted.
    Admitted,
    /// A prior submission already carries this manifest hash.
    DuplicateManifest,
    /// A prior submission already carries this run id.
    DuplicateRunId,
}

/// Store of accepted submissions and leaderboard standings.
pub trait SubmissionHistoryStore {
    /// Returns every accepted submission record.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError`] when the store cannot be read.
    fn snapshot(&self) -> Result<Vec<HistoryRecord>, HistoryStoreError>;

    /// Returns the current leaderboard standings, best first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError`] when the store cannot be read.
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, HistoryStoreError>;

    /// Atomically checks uniqueness and inserts an accepted submission.
    ///
    /// The manifest-hash and run-id uniqueness checks and the insert must be
    /// one operation; two concurrent admissions of the same record must not
    /// both report [`AdmitOutcome::Admitted`].
    ///
    /// # Errors
    ///
    /// Returns [`HistoryStoreError`] when the store cannot be written.
    fn admit(&self, record: &HistoryRecord) -> Result<AdmitOutcome, HistoryStoreError>;
}
