// crates/bench-gate-core/src/runtime/validator.rs
// ============================================================================
// Module: Bench Gate Structural Validator
// Description: Completeness, hash-chain, seal, HMAC, and sanitization checks.
// Purpose: Decide whether a submission is structurally admissible.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The structural validator runs every check that can be performed without
//! server-side re-evaluation and accumulates all violations rather than
//! failing fast. The one exception is the per-task template-id comparison,
//! which reports only the first divergence per task: once one position has
//! drifted, later policy indices are unreliable and reporting them is noise.
//!
//! All context is explicit at construction time. The validator never reads
//! environment variables or clocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::CodeArtifact;
use crate::core::CodePins;
use crate::core::SigningKey;
use crate::core::Submission;
use crate::core::TaskId;
use crate::core::TaskTable;
use crate::core::manifest::seal_manifest;
use crate::core::manifest::verify_hmac;

// ============================================================================
// SECTION: Sanitization Denylist
// ============================================================================

/// Case-insensitive substrings that disqualify free-text metadata fields.
///
/// Covers tag openers, inline event handlers, script URI schemes, template
/// delimiters, encoded angle brackets and quotes, and CSS escape vectors.
const DANGEROUS_PATTERNS: &[&str] = &[
    "<script", "<img", "<iframe", "<svg", "<object", "<embed",
    "<form", "<input", "<link", "<meta", "<base",
    "onerror", "onload", "onclick", "onmouseover", "onfocus",
    "onchange", "onsubmit", "onblur", "onkeydown", "onkeyup",
    "javascript:", "data:", "vbscript:",
    "<%", "${", "{{", "#{",
    "&#", "%3c", "%3e", "%22", "%27",
    "expression(", "url(",
];

/// Length cap for identity fields.
const IDENTITY_FIELD_MAX_CHARS: usize = 256;

/// Length cap for the free-text description field.
const DESCRIPTION_MAX_CHARS: usize = 1_000;

/// Number of missing task ids included in a completeness error.
const MISSING_TASK_SAMPLE: usize = 10;

/// Tolerance for the metric-impossibility comparison.
const METRIC_SANITY_EPSILON: f64 = 0.001;

/// Returns `true` when a free-text field is within its cap and clean.
fn is_safe_string(value: &str, max_chars: usize) -> bool {
    if value.chars().count() > max_chars {
        return false;
    }
    let lowered = value.to_lowercase();
    !DANGEROUS_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// Returns a short preview of an offending field value.
fn field_preview(value: &str) -> String {
    if value.chars().count() > 50 {
        let truncated: String = value.chars().take(50).collect();
        format!("{truncated}...")
    } else {
        value.to_owned()
    }
}

/// Returns a short prefix of a hex digest for error messages.
fn hash_preview(digest: &str) -> String {
    let prefix: String = digest.chars().take(16).collect();
    format!("{prefix}...")
}

// ============================================================================
// SECTION: Structural Errors
// ============================================================================

/// A structural violation that blocks acceptance.
///
/// # Invariants
/// - Variants are stable for programmatic handling; `Display` strings are the
///   wire-facing error list entries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    /// Expected tasks are absent from the evidence.
    #[error("missing {missing_count} of {expected_total} tasks: {sample:?}{ellipsis}")]
    MissingTasks {
        /// Number of missing tasks.
        missing_count: usize,
        /// Canonical task count.
        expected_total: usize,
        /// First missing task ids, ascending, capped.
        sample: Vec<u32>,
        /// `"..."` when the sample is capped, empty otherwise.
        ellipsis: &'static str,
    },
    /// Evidence contains task ids outside the canonical set.
    #[error("unknown task ids: {task_ids:?}")]
    UnknownTasks {
        /// Unexpected task ids, ascending.
        task_ids: Vec<u32>,
    },
    /// A task's safety report length diverges from canon.
    #[error("task {task_id}: expected {expected} policies, got {actual}")]
    PolicyCountMismatch {
        /// Task whose report diverges.
        task_id: TaskId,
        /// Canonical policy count.
        expected: usize,
        /// Submitted policy count.
        actual: usize,
    },
    /// A task's policy template ids diverge from canonical order.
    #[error(
        "task {task_id} policy {policy_index}: template id mismatch \
         (submitted={submitted:?}, expected={expected:?})"
    )]
    TemplateIdMismatch {
        /// Task whose report diverges.
        task_id: TaskId,
        /// First diverging position.
        policy_index: usize,
        /// Submitted template id at that position.
        submitted: String,
        /// Canonical template id at that position.
        expected: String,
    },
    /// Claimed total policy count diverges from the evidence.
    #[error("policies_evaluated mismatch: claimed {claimed}, evidence has {actual}")]
    PoliciesEvaluatedMismatch {
        /// Claimed total.
        claimed: u64,
        /// Sum of safety report lengths.
        actual: u64,
    },
    /// The manifest carries no hash for a submitted task.
    #[error("task {task_id}: missing trajectory hash in integrity manifest")]
    MissingTrajectoryHash {
        /// Task without a manifest entry.
        task_id: TaskId,
    },
    /// Evidence and manifest disagree on a task's trajectory hash.
    #[error(
        "task {task_id}: trajectory hash mismatch (evidence={evidence} vs manifest={manifest})"
    )]
    TrajectoryHashMismatch {
        /// Task whose hashes disagree.
        task_id: TaskId,
        /// Preview of the evidence hash.
        evidence: String,
        /// Preview of the manifest hash.
        manifest: String,
    },
    /// A declared code pin diverges from the canonical pin.
    #[error("code integrity mismatch: {field} (submitted={submitted}, expected={expected})")]
    CodePinMismatch {
        /// Pin field that diverges.
        field: CodeArtifact,
        /// Preview of the submitted pin.
        submitted: String,
        /// Preview of the canonical pin.
        expected: String,
    },
    /// The recomputed seal disagrees with the declared seal.
    #[error("manifest seal hash mismatch, manifest may have been tampered with")]
    SealMismatch,
    /// Server requires signatures and the manifest carries none.
    #[error("missing hmac signature, submissions must be signed with the configured key")]
    MissingSignature,
    /// The declared signature does not verify under the configured key.
    #[error("invalid hmac signature, wrong signing key or tampered data")]
    InvalidSignature,
    /// The agent id contains characters outside the identifier alphabet.
    #[error("agent_id must contain only alphanumeric characters, hyphens, underscores, and dots")]
    InvalidAgentId {
        /// Truncated field value.
        preview: String,
    },
    /// A free-text metadata field is over its cap or contains injection vectors.
    #[error("unsafe characters in {field}: {preview:?}")]
    UnsafeField {
        /// Offending metadata field name.
        field: &'static str,
        /// Truncated field value.
        preview: String,
    },
    /// Completion under policy exceeds completion rate.
    #[error("impossible: CuP ({cup}) > CR ({cr}), CuP cannot exceed CR by definition")]
    CupExceedsCr {
        /// Claimed completion under policy.
        cup: f64,
        /// Claimed completion rate.
        cr: f64,
    },
    /// Partial-credit completion under policy exceeds its completion rate.
    #[error("impossible: semi_CuP ({semi_cup}) > semi_CR ({semi_cr})")]
    SemiCupExceedsSemiCr {
        /// Claimed partial-credit completion under policy.
        semi_cup: f64,
        /// Claimed partial-credit completion rate.
        semi_cr: f64,
    },
    /// A claimed aggregate metric is NaN or infinite.
    #[error("invalid metric {metric}: {value}")]
    NonFiniteMetric {
        /// Metric field name.
        metric: &'static str,
        /// Claimed value.
        value: f64,
    },
    /// A task declares steps but carries no actions.
    #[error("task {task_id}: num_steps={num_steps} but action_sequence is empty")]
    EmptyActionSequence {
        /// Task without actions.
        task_id: TaskId,
        /// Declared step count.
        num_steps: u64,
    },
}

// ============================================================================
// SECTION: Structural Validator
// ============================================================================

/// Structural validator over explicit, immutable context.
///
/// # Invariants
/// - Pure with respect to process-wide state; safe to share across threads.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    /// Canonical task definitions.
    table: TaskTable,
    /// Canonical code pins for this benchmark version, when deployed.
    canonical_pins: Option<CodePins>,
    /// Server-side signing key; when set, unsigned submissions are errors.
    signing_key: Option<SigningKey>,
}

impl StructuralValidator {
    /// Creates a validator from explicit context.
    #[must_use]
    pub const fn new(
        table: TaskTable,
        canonical_pins: Option<CodePins>,
        signing_key: Option<SigningKey>,
    ) -> Self {
        Self {
            table,
            canonical_pins,
            signing_key,
        }
    }

    /// Returns the canonical task table this validator checks against.
    #[must_use]
    pub const fn table(&self) -> &TaskTable {
        &self.table
    }

    /// Runs every structural check and accumulates all violations.
    ///
    /// An empty result means the submission is structurally valid.
    #[must_use]
    pub fn validate(&self, submission: &Submission) -> Vec<StructuralError> {
        let mut errors = Vec::new();
        self.check_completeness(submission, &mut errors);
        self.check_policy_shape(submission, &mut errors);
        check_aggregate_policy_count(submission, &mut errors);
        check_hash_chain(submission, &mut errors);
        self.check_code_pins(submission, &mut errors);
        check_manifest_seal(submission, &mut errors);
        self.check_hmac(submission, &mut errors);
        check_sanitization(submission, &mut errors);
        check_metric_sanity(submission, &mut errors);
        check_evidence_coherence(submission, &mut errors);
        errors
    }

    /// Submitted task ids must equal the canonical set exactly.
    fn check_completeness(&self, submission: &Submission, errors: &mut Vec<StructuralError>) {
        let submitted: BTreeSet<TaskId> =
            submission.task_evidence.iter().map(|evidence| evidence.task_id).collect();
        let expected = self.table.task_ids();

        let missing: Vec<u32> =
            expected.difference(&submitted).map(|task_id| task_id.get()).collect();
        if !missing.is_empty() {
            let ellipsis = if missing.len() > MISSING_TASK_SAMPLE {
                "..."
            } else {
                ""
            };
            errors.push(StructuralError::MissingTasks {
                missing_count: missing.len(),
                expected_total: self.table.len(),
                sample: missing.into_iter().take(MISSING_TASK_SAMPLE).collect(),
                ellipsis,
            });
        }

        let extra: Vec<u32> =
            submitted.difference(&expected).map(|task_id| task_id.get()).collect();
        if !extra.is_empty() {
            errors.push(StructuralError::UnknownTasks {
                task_ids: extra,
            });
        }
    }

    /// Per-task policy counts and template-id order must match canon.
    ///
    /// Template-id comparison stops at the first divergence per task since
    /// later indices are unreliable once one position has drifted.
    fn check_policy_shape(&self, submission: &Submission, errors: &mut Vec<StructuralError>) {
        for evidence in &submission.task_evidence {
            let canonical = self
                .table
                .get(evidence.task_id)
                .map(|task| task.policies.as_slice())
                .unwrap_or_default();
            let expected = canonical.len();
            let actual = evidence.safety_report.len();
            if actual != expected {
                errors.push(StructuralError::PolicyCountMismatch {
                    task_id: evidence.task_id,
                    expected,
                    actual,
                });
                continue;
            }
            for (policy_index, (submitted, canon)) in
                evidence.safety_report.iter().zip(canonical.iter()).enumerate()
            {
                if submitted.policy_template_id != canon.policy_template_id {
                    errors.push(StructuralError::TemplateIdMismatch {
                        task_id: evidence.task_id,
                        policy_index,
                        submitted: submitted.policy_template_id.as_str().to_owned(),
                        expected: canon.policy_template_id.as_str().to_owned(),
                    });
                    break;
                }
            }
        }
    }

    /// Declared pins must match canonical pins when canon is deployed.
    fn check_code_pins(&self, submission: &Submission, errors: &mut Vec<StructuralError>) {
        let Some(canonical) = &self.canonical_pins else {
            return;
        };
        let declared = submission.integrity.pins();
        for artifact in [
            CodeArtifact::Evaluator,
            CodeArtifact::TaskConfig,
            CodeArtifact::Environment,
            CodeArtifact::Helpers,
        ] {
            let expected = canonical.get(artifact);
            if expected.is_empty() {
                continue;
            }
            let submitted = declared.get(artifact);
            if submitted != expected {
                errors.push(StructuralError::CodePinMismatch {
                    field: artifact,
                    submitted: hash_preview(submitted),
                    expected: hash_preview(expected),
                });
            }
        }
    }

    /// Signature verification against the configured server-side key.
    fn check_hmac(&self, submission: &Submission, errors: &mut Vec<StructuralError>) {
        let Some(key) = &self.signing_key else {
            return;
        };
        if submission.integrity.hmac_signature.is_empty() {
            errors.push(StructuralError::MissingSignature);
        } else if !verify_hmac(&submission.integrity, key) {
            errors.push(StructuralError::InvalidSignature);
        }
    }
}

// ============================================================================
// SECTION: Context-Free Checks
// ============================================================================

/// Sum of safety report lengths must equal the claimed policy total.
fn check_aggregate_policy_count(submission: &Submission, errors: &mut Vec<StructuralError>) {
    let actual: u64 = submission
        .task_evidence
        .iter()
        .map(|evidence| evidence.safety_report.len() as u64)
        .sum();
    let claimed = submission.results.metrics.policies_evaluated;
    if actual != claimed {
        errors.push(StructuralError::PoliciesEvaluatedMismatch {
            claimed,
            actual,
        });
    }
}

/// Every task's evidence hash must appear in and match the manifest.
fn check_hash_chain(submission: &Submission, errors: &mut Vec<StructuralError>) {
    for evidence in &submission.task_evidence {
        match submission.integrity.task_hashes.get(&evidence.task_id) {
            None => errors.push(StructuralError::MissingTrajectoryHash {
                task_id: evidence.task_id,
            }),
            Some(manifest_hash) if manifest_hash.is_empty() => {
                errors.push(StructuralError::MissingTrajectoryHash {
                    task_id: evidence.task_id,
                });
            }
            Some(manifest_hash) if *manifest_hash != evidence.trajectory_hash => {
                errors.push(StructuralError::TrajectoryHashMismatch {
                    task_id: evidence.task_id,
                    evidence: hash_preview(&evidence.trajectory_hash),
                    manifest: hash_preview(manifest_hash),
                });
            }
            Some(_) => {}
        }
    }
}

/// The declared seal must equal the seal recomputed from declared fields.
fn check_manifest_seal(submission: &Submission, errors: &mut Vec<StructuralError>) {
    match seal_manifest(&submission.integrity) {
        Ok(expected) if submission.integrity.manifest_hash == expected.value => {}
        // An uncanonicalizable manifest cannot match any seal.
        Ok(_) | Err(_) => errors.push(StructuralError::SealMismatch),
    }
}

/// Returns `true` when the value fits the agent identifier alphabet.
fn is_valid_agent_id(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Free-text metadata fields must be capped and injection-free.
fn check_sanitization(submission: &Submission, errors: &mut Vec<StructuralError>) {
    let metadata = &submission.metadata;
    if !is_valid_agent_id(&metadata.agent_id) {
        errors.push(StructuralError::InvalidAgentId {
            preview: field_preview(&metadata.agent_id),
        });
    }
    let identity_fields: [(&'static str, &str); 3] = [
        ("agent_id", &metadata.agent_id),
        ("team", &metadata.team),
        ("model_name", &metadata.model_name),
    ];
    for (field, value) in identity_fields {
        if !is_safe_string(value, IDENTITY_FIELD_MAX_CHARS) {
            errors.push(StructuralError::UnsafeField {
                field,
                preview: field_preview(value),
            });
        }
    }
    if !metadata.description.is_empty()
        && !is_safe_string(&metadata.description, DESCRIPTION_MAX_CHARS)
    {
        errors.push(StructuralError::UnsafeField {
            field: "description",
            preview: field_preview(&metadata.description),
        });
    }
}

/// Claimed aggregates must be finite and internally possible.
fn check_metric_sanity(submission: &Submission, errors: &mut Vec<StructuralError>) {
    let metrics = &submission.results.metrics;
    if metrics.cup > metrics.cr + METRIC_SANITY_EPSILON {
        errors.push(StructuralError::CupExceedsCr {
            cup: metrics.cup,
            cr: metrics.cr,
        });
    }
    if metrics.semi_cup > metrics.semi_cr + METRIC_SANITY_EPSILON {
        errors.push(StructuralError::SemiCupExceedsSemiCr {
            semi_cup: metrics.semi_cup,
            semi_cr: metrics.semi_cr,
        });
    }
    let named: [(&'static str, f64); 4] = [
        ("CR", metrics.cr),
        ("CuP", metrics.cup),
        ("semi_CR", metrics.semi_cr),
        ("semi_CuP", metrics.semi_cup),
    ];
    for (metric, value) in named {
        if !value.is_finite() {
            errors.push(StructuralError::NonFiniteMetric {
                metric,
                value,
            });
        }
    }
}

/// A task declaring steps must carry a non-empty action trace.
fn check_evidence_coherence(submission: &Submission, errors: &mut Vec<StructuralError>) {
    for evidence in &submission.task_evidence {
        if evidence.num_steps > 0 && evidence.action_sequence.is_empty() {
            errors.push(StructuralError::EmptyActionSequence {
                task_id: evidence.task_id,
                num_steps: evidence.num_steps,
            });
        }
    }
}
