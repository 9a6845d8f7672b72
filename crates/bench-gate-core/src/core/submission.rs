// crates/bench-gate-core/src/core/submission.rs
// ============================================================================
// Module: Bench Gate Submission Model
// Description: Wire-side types for leaderboard submission bundles.
// Purpose: Deserialize untrusted submission bundles for validation.
// Dependencies: crate::core::{identifiers, manifest}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Submission`] is the full bundle a participant presents for validation:
//! submitter metadata, claimed aggregate metrics with per-dimension
//! breakdowns, per-task evidence, and the integrity manifest. Every field is
//! a claim until the validation pipeline has checked it; these types impose
//! shape only, never trust.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::PolicyTemplateId;
use crate::core::identifiers::SafetyDimension;
use crate::core::identifiers::TaskId;
use crate::core::manifest::ManifestRecord;

// ============================================================================
// SECTION: Submission Bundle
// ============================================================================

/// Full submission bundle presented for validation.
///
/// # Invariants
/// - Untrusted input; shape is enforced by serde, semantics by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Submitter identity and declared run parameters.
    pub metadata: SubmissionMetadata,
    /// Claimed aggregate and per-dimension metrics.
    pub results: SubmissionResults,
    /// One evidence record per task actually run.
    #[serde(default)]
    pub task_evidence: Vec<TaskEvidence>,
    /// Integrity manifest produced by the run-time evaluator.
    pub integrity: ManifestRecord,
}

/// Submitter identity and declared run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    /// Agent identifier as displayed on the leaderboard.
    pub agent_id: String,
    /// Submitting team or organization.
    #[serde(default)]
    pub team: String,
    /// Underlying model name.
    #[serde(default)]
    pub model_name: String,
    /// Contact email used for rate limiting and review follow-up.
    #[serde(default)]
    pub contact_email: String,
    /// Free-text description of the agent.
    #[serde(default)]
    pub description: String,
    /// Declared number of independent evaluation runs.
    #[serde(default = "default_num_runs")]
    pub num_runs: u32,
}

impl Default for SubmissionMetadata {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            team: String::new(),
            model_name: String::new(),
            contact_email: String::new(),
            description: String::new(),
            num_runs: default_num_runs(),
        }
    }
}

/// Returns the declared run count for bundles that omit the field.
const fn default_num_runs() -> u32 {
    1
}

/// Claimed metrics block of a submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionResults {
    /// Claimed aggregate metrics.
    pub metrics: ClaimedMetrics,
    /// Claimed per-safety-dimension metrics.
    #[serde(default)]
    pub dimensions: Vec<DimensionMetrics>,
}

/// Claimed aggregate metrics.
///
/// # Invariants
/// - Advisory values; the recomputer rederives each from raw evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimedMetrics {
    /// Completion rate.
    #[serde(rename = "CR")]
    pub cr: f64,
    /// Completion under policy.
    #[serde(rename = "CuP")]
    pub cup: f64,
    /// Partial-credit completion rate.
    #[serde(rename = "semi_CR")]
    pub semi_cr: f64,
    /// Partial-credit completion under policy.
    #[serde(rename = "semi_CuP")]
    pub semi_cup: f64,
    /// Total number of policy instances evaluated.
    #[serde(default)]
    pub policies_evaluated: u64,
}

/// Claimed metrics for one safety dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionMetrics {
    /// Safety dimension (policy category) name.
    pub dimension: SafetyDimension,
    /// Violated policy count in this dimension.
    #[serde(default)]
    pub failures: u64,
    /// Total policy instance count in this dimension.
    #[serde(default)]
    pub total_instances: u64,
    /// Non-dormant policy instance count in this dimension.
    #[serde(default)]
    pub active_instances: u64,
    /// Dormant policy instance count in this dimension.
    #[serde(default)]
    pub dormant_count: u64,
    /// Failures over total instances.
    #[serde(default)]
    pub risk_ratio: f64,
    /// Failures over active instances.
    #[serde(default)]
    pub active_risk_ratio: f64,
}

// ============================================================================
// SECTION: Task Evidence
// ============================================================================

/// Raw per-task evidence record.
///
/// # Invariants
/// - `trajectory_hash` must match the manifest entry for `task_id`; the
///   validator enforces this, not the type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskEvidence {
    /// Task identifier.
    pub task_id: TaskId,
    /// Ordered action trace.
    #[serde(default)]
    pub action_sequence: Vec<ActionRecord>,
    /// Ordered per-policy safety verdicts.
    #[serde(default)]
    pub safety_report: Vec<PolicyResult>,
    /// Full-completion reward, 0 or 1.
    #[serde(default)]
    pub total_reward: f64,
    /// Number of task requirements the agent satisfied.
    #[serde(default)]
    pub satisfied_requirements: u64,
    /// Total number of task requirements.
    #[serde(default)]
    pub total_requirements: u64,
    /// Trajectory hash computed by the run-time evaluator.
    #[serde(default)]
    pub trajectory_hash: String,
    /// Declared step count.
    #[serde(default)]
    pub num_steps: u64,
    /// Task start time, ISO-8601.
    #[serde(default)]
    pub start_time: String,
    /// Task end time, ISO-8601.
    #[serde(default)]
    pub end_time: String,
    /// URLs visited during the trajectory.
    #[serde(default)]
    pub visited_urls: Vec<String>,
}

/// One action in a task's trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action type label, e.g. `click` or `answer`.
    #[serde(default)]
    pub action_type: String,
    /// Ordered action arguments.
    #[serde(default)]
    pub action_args: Vec<Value>,
}

/// Verdict for one policy evaluated against a task.
///
/// # Invariants
/// - `dormant` and `violated` are mutually exclusive by definition; the
///   recomputer flags any record claiming both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Whether the policy was violated.
    #[serde(default)]
    pub violated: bool,
    /// Whether the policy's trigger condition never arose.
    #[serde(default)]
    pub dormant: bool,
    /// Step index at which the violation occurred, if any.
    #[serde(default)]
    pub violating_step: Option<u64>,
    /// Evaluation method label.
    #[serde(default)]
    pub eval_type: String,
    /// Safety dimension (policy category) this policy belongs to.
    #[serde(default)]
    pub policy_category: SafetyDimension,
    /// Canonical policy template identifier.
    #[serde(default)]
    pub policy_template_id: PolicyTemplateId,
    /// Position of this policy in the task's canonical policy list.
    #[serde(default)]
    pub policy_index: u64,
}
