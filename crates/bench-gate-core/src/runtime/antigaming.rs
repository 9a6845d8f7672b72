// crates/bench-gate-core/src/runtime/antigaming.rs
// ============================================================================
// Module: Bench Gate Anti-Gaming Controller
// Description: Rate limits, replay detection, and multi-run requirements.
// Purpose: Keep leaderboard standings resistant to submission gaming.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Anti-gaming checks run against externally supplied state: the accepted
//! submission history and the current leaderboard. The controller itself is
//! pure; the host passes the observation time explicitly and the storage
//! layer enforces the same uniqueness constraints atomically at admission.
//! The multi-run check is advisory unless server policy treats it as
//! blocking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::HistoryRecord;
use crate::core::LeaderboardEntry;
use crate::core::RunId;
use crate::core::Submission;
use crate::core::TaskId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Policy Constants
// ============================================================================

/// Milliseconds in one hour.
const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Milliseconds in one day.
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Submission throttling and ranking policy knobs.
///
/// # Invariants
/// - Shared immutably across validations; never mutated after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiGamingPolicy {
    /// Maximum accepted submissions per contact email in the trailing window.
    pub max_submissions_per_window: usize,
    /// Trailing rate-limit window in days.
    pub window_days: i64,
    /// Minimum hours between submissions from the same contact email.
    pub min_interval_hours: i64,
    /// Leaderboard rank depth that triggers the multi-run requirement.
    pub multi_run_top_k: usize,
    /// Independent runs required for a top-rank submission.
    pub multi_run_count: u32,
}

impl Default for AntiGamingPolicy {
    fn default() -> Self {
        Self {
            max_submissions_per_window: 5,
            window_days: 30,
            min_interval_hours: 24,
            multi_run_top_k: 3,
            multi_run_count: 3,
        }
    }
}

// ============================================================================
// SECTION: Issues
// ============================================================================

/// An anti-gaming policy violation or advisory.
///
/// # Invariants
/// - Variants are stable for programmatic handling; `Display` strings are the
///   wire-facing issue list entries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AntiGamingIssue {
    /// Fewer distinct tasks than the canonical total.
    #[error("must submit all {expected} tasks, got {submitted}")]
    IncompleteTaskSet {
        /// Canonical task count.
        expected: usize,
        /// Distinct submitted task count.
        submitted: usize,
    },
    /// Too many submissions inside the trailing window.
    #[error(
        "rate limit exceeded: {recent} submissions in the last {window_days} days (max {max})"
    )]
    RateLimitExceeded {
        /// Accepted submissions inside the window.
        recent: usize,
        /// Trailing window in days.
        window_days: i64,
        /// Maximum allowed inside the window.
        max: usize,
    },
    /// The most recent prior submission is too fresh.
    #[error(
        "must wait {required_hours}h between submissions, last submission was {hours_ago:.1}h ago"
    )]
    IntervalTooShort {
        /// Required minimum interval in hours.
        required_hours: i64,
        /// Hours since the most recent prior submission.
        hours_ago: f64,
    },
    /// Byte-identical manifest resubmission.
    #[error("duplicate submission: manifest hash matches submission from {prior_submitted_at}")]
    ReplayedManifest {
        /// Acceptance time of the matching prior submission.
        prior_submitted_at: Timestamp,
    },
    /// Run identifier already accepted, independent of hash equality.
    #[error("run id {run_id} already submitted by {organization}")]
    ReusedRunId {
        /// Reused run identifier.
        run_id: RunId,
        /// Organization that submitted it first.
        organization: String,
    },
    /// Top-rank submission without the required independent run count.
    #[error(
        "submission (CuP={cup}) would rank in the top {top_k}, top-{top_k} positions require \
         {required_runs} independent runs"
    )]
    MultiRunRequired {
        /// Claimed completion under policy.
        cup: f64,
        /// Rank depth that triggers the requirement.
        top_k: usize,
        /// Runs required at that depth.
        required_runs: u32,
    },
}

// ============================================================================
// SECTION: History Checks
// ============================================================================

/// Runs completeness, rate-limit, interval, replay, and run-id checks.
///
/// `now` is the host-supplied observation time; `history` is the accepted
/// submission history. An empty result means the submission is acceptable.
#[must_use]
pub fn validate_anti_gaming(
    submission: &Submission,
    history: &[HistoryRecord],
    policy: &AntiGamingPolicy,
    expected_task_count: usize,
    now: Timestamp,
) -> Vec<AntiGamingIssue> {
    let mut issues = Vec::new();

    let submitted: BTreeSet<TaskId> =
        submission.task_evidence.iter().map(|evidence| evidence.task_id).collect();
    if submitted.len() < expected_task_count {
        issues.push(AntiGamingIssue::IncompleteTaskSet {
            expected: expected_task_count,
            submitted: submitted.len(),
        });
    }

    let email = &submission.metadata.contact_email;
    let window_millis = policy.window_days.saturating_mul(MILLIS_PER_DAY);
    let recent: Vec<&HistoryRecord> = history
        .iter()
        .filter(|record| {
            record.contact_email == *email && now.millis_since(record.submitted_at) <= window_millis
        })
        .collect();
    if recent.len() >= policy.max_submissions_per_window {
        issues.push(AntiGamingIssue::RateLimitExceeded {
            recent: recent.len(),
            window_days: policy.window_days,
            max: policy.max_submissions_per_window,
        });
    }

    if let Some(last) = recent.iter().max_by_key(|record| record.submitted_at) {
        let hours_ago = now.millis_since(last.submitted_at) as f64 / MILLIS_PER_HOUR as f64;
        if hours_ago < policy.min_interval_hours as f64 {
            issues.push(AntiGamingIssue::IntervalTooShort {
                required_hours: policy.min_interval_hours,
                hours_ago,
            });
        }
    }

    if let Some(prior) = history
        .iter()
        .find(|record| record.manifest_hash == submission.integrity.manifest_hash)
    {
        issues.push(AntiGamingIssue::ReplayedManifest {
            prior_submitted_at: prior.submitted_at,
        });
    }

    if let Some(prior) = history.iter().find(|record| record.run_id == submission.integrity.run_id)
    {
        issues.push(AntiGamingIssue::ReusedRunId {
            run_id: prior.run_id.clone(),
            organization: prior.organization.clone(),
        });
    }

    issues
}

// ============================================================================
// SECTION: Multi-Run Requirement
// ============================================================================

/// Requires multi-run data when a submission would place at or above the
/// top-K threshold.
///
/// Returns `None` when the submission would not rank that high or already
/// declares enough runs.
#[must_use]
pub fn multi_run_requirement(
    submission: &Submission,
    leaderboard: &[LeaderboardEntry],
    policy: &AntiGamingPolicy,
) -> Option<AntiGamingIssue> {
    // A rank depth of zero disables the advisory entirely.
    let threshold_index = policy.multi_run_top_k.checked_sub(1)?;
    let new_cup = submission.results.metrics.cup;
    let mut existing: Vec<f64> = leaderboard.iter().map(|entry| entry.cup).collect();
    existing.sort_by(|a, b| b.total_cmp(a));

    if existing.len() >= policy.multi_run_top_k && new_cup <= existing[threshold_index] {
        return None;
    }
    if submission.metadata.num_runs < policy.multi_run_count {
        return Some(AntiGamingIssue::MultiRunRequired {
            cup: new_cup,
            top_k: policy.multi_run_top_k,
            required_runs: policy.multi_run_count,
        });
    }
    None
}
