// crates/bench-gate-core/src/core/history.rs
// ============================================================================
// Module: Bench Gate Submission History Records
// Description: Prior-submission and leaderboard snapshot types.
// Purpose: Give the anti-gaming controller the state it reasons over.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! The anti-gaming controller operates against externally supplied state: the
//! list of prior accepted submissions and the current leaderboard standings.
//! These are plain records; the storage layer decides how they persist.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One prior accepted submission.
///
/// # Invariants
/// - `manifest_hash` and `run_id` are unique across accepted submissions;
///   the history store enforces this at insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Contact email of the submitter.
    pub contact_email: String,
    /// Acceptance timestamp.
    pub submitted_at: Timestamp,
    /// Seal of the accepted manifest.
    pub manifest_hash: String,
    /// Run identifier of the accepted submission.
    pub run_id: RunId,
    /// Submitting team or organization.
    pub organization: String,
}

/// One ranked entry of the live leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Agent identifier as displayed.
    pub agent_id: String,
    /// Completion-under-policy score the entry is ranked by.
    pub cup: f64,
}
