// crates/bench-gate-core/src/core/trajectory.rs
// ============================================================================
// Module: Bench Gate Trajectory Hash Chain
// Description: Per-task hash binding actions, safety verdicts, and reward.
// Purpose: Make any post-hoc edit of a task's outcome detectable.
// Dependencies: crate::core::{hashing, identifiers, submission}, serde
// ============================================================================

//! ## Overview
//! Each task's trajectory hash commits to the full action trace, the full set
//! of safety verdicts, and the reward at once; altering any one of the three
//! invalidates it. Safety verdicts are first normalized down to their
//! outcome-bearing fields so the hash is stable against cosmetic report
//! changes (descriptions, free text) but sensitive to any change in the
//! evaluated outcome. The run-time evaluator computes this hash once per task
//! and records it in the manifest; the validator recomputes it from evidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::TaskId;
use crate::core::submission::ActionRecord;
use crate::core::submission::PolicyResult;

// ============================================================================
// SECTION: Canonical Forms
// ============================================================================

/// One action in the canonical trajectory object.
#[derive(Debug, Serialize)]
struct CanonicalAction<'a> {
    /// Zero-based position of the action in the trace.
    step: usize,
    /// Action type label.
    action_type: &'a str,
    /// Ordered action arguments.
    action_args: &'a [Value],
}

/// A safety verdict stripped to its outcome-bearing fields.
#[derive(Debug, Serialize)]
struct NormalizedVerdict<'a> {
    /// Whether the policy was violated.
    violated: bool,
    /// Whether the policy's trigger condition never arose.
    dormant: bool,
    /// Step index at which the violation occurred, if any.
    violating_step: Option<u64>,
    /// Evaluation method label.
    eval_type: &'a str,
}

/// Canonical object the trajectory hash is computed over.
#[derive(Debug, Serialize)]
struct TrajectoryObject<'a> {
    /// Task identifier.
    task_id: TaskId,
    /// Ordered action trace with explicit step indices.
    action_sequence: Vec<CanonicalAction<'a>>,
    /// Normalized safety verdicts in report order.
    safety_report: Vec<NormalizedVerdict<'a>>,
    /// Full-completion reward.
    total_reward: f64,
}

// ============================================================================
// SECTION: Hash Computation
// ============================================================================

/// Computes the trajectory hash for one task.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when an action argument cannot be
/// canonicalized, which only happens for non-finite numbers.
pub fn trajectory_hash(
    task_id: TaskId,
    actions: &[ActionRecord],
    safety_report: &[PolicyResult],
    total_reward: f64,
) -> Result<HashDigest, HashError> {
    let object = TrajectoryObject {
        task_id,
        action_sequence: actions
            .iter()
            .enumerate()
            .map(|(step, action)| CanonicalAction {
                step,
                action_type: &action.action_type,
                action_args: &action.action_args,
            })
            .collect(),
        safety_report: safety_report
            .iter()
            .map(|verdict| NormalizedVerdict {
                violated: verdict.violated,
                dormant: verdict.dormant,
                violating_step: verdict.violating_step,
                eval_type: &verdict.eval_type,
            })
            .collect(),
        total_reward,
    };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &object)
}
