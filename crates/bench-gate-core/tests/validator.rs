// crates/bench-gate-core/tests/validator.rs
// ============================================================================
// Module: Structural Validator Tests
// Description: Verifies every structural check family over a real bundle.
// ============================================================================
//! ## Overview
//! Builds a fully consistent submission through the manifest lifecycle and
//! then breaks it one invariant at a time, asserting the matching error is
//! reported and that violations accumulate instead of failing fast.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use bench_gate_core::ActionRecord;
use bench_gate_core::ClaimedMetrics;
use bench_gate_core::CodePins;
use bench_gate_core::DimensionMetrics;
use bench_gate_core::ManifestDraft;
use bench_gate_core::PolicyResult;
use bench_gate_core::PolicyTemplateId;
use bench_gate_core::RunId;
use bench_gate_core::SafetyDimension;
use bench_gate_core::SigningKey;
use bench_gate_core::StructuralError;
use bench_gate_core::StructuralValidator;
use bench_gate_core::Submission;
use bench_gate_core::SubmissionMetadata;
use bench_gate_core::SubmissionResults;
use bench_gate_core::TaskEvidence;
use bench_gate_core::TaskId;
use bench_gate_core::TaskTable;
use bench_gate_core::Timestamp;
use bench_gate_core::table::CanonicalPolicy;
use bench_gate_core::table::CanonicalTask;
use bench_gate_core::trajectory::trajectory_hash;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn canonical_table() -> TaskTable {
    let mut tasks = BTreeMap::new();
    for task_id in [1_u32, 2] {
        tasks.insert(
            TaskId::new(task_id),
            CanonicalTask {
                policies: vec![
                    CanonicalPolicy {
                        policy_template_id: PolicyTemplateId::new(format!("t{task_id}-consent")),
                        policy_category: SafetyDimension::new("user_consent"),
                    },
                    CanonicalPolicy {
                        policy_template_id: PolicyTemplateId::new(format!("t{task_id}-boundary")),
                        policy_category: SafetyDimension::new("boundary"),
                    },
                ],
            },
        );
    }
    TaskTable::new(tasks)
}

fn evidence_for(task_id: u32) -> TaskEvidence {
    let actions = vec![
        ActionRecord {
            action_type: "click".to_owned(),
            action_args: vec![json!("#go")],
        },
        ActionRecord {
            action_type: "answer".to_owned(),
            action_args: vec![json!("ok")],
        },
    ];
    let report = vec![
        PolicyResult {
            violated: false,
            dormant: true,
            violating_step: None,
            eval_type: "program".to_owned(),
            policy_category: SafetyDimension::new("user_consent"),
            policy_template_id: PolicyTemplateId::new(format!("t{task_id}-consent")),
            policy_index: 0,
        },
        PolicyResult {
            violated: false,
            dormant: false,
            violating_step: None,
            eval_type: "program".to_owned(),
            policy_category: SafetyDimension::new("boundary"),
            policy_template_id: PolicyTemplateId::new(format!("t{task_id}-boundary")),
            policy_index: 1,
        },
    ];
    let hash = trajectory_hash(TaskId::new(task_id), &actions, &report, 1.0).expect("hash");
    TaskEvidence {
        task_id: TaskId::new(task_id),
        action_sequence: actions,
        safety_report: report,
        total_reward: 1.0,
        satisfied_requirements: 2,
        total_requirements: 2,
        trajectory_hash: hash.value,
        num_steps: 2,
        start_time: "2026-03-01T10:00:00+00:00".to_owned(),
        end_time: "2026-03-01T10:01:00+00:00".to_owned(),
        visited_urls: vec!["https://shop.example/cart".to_owned()],
    }
}

fn clean_submission(signing_key: Option<&SigningKey>) -> Submission {
    let task_evidence = vec![evidence_for(1), evidence_for(2)];

    let mut draft = ManifestDraft::new(
        RunId::new("run-basic"),
        "1.2.0",
        Timestamp::from_unix_millis(1_760_000_000_000),
        CodePins::default(),
    );
    for evidence in &task_evidence {
        let digest = trajectory_hash(
            evidence.task_id,
            &evidence.action_sequence,
            &evidence.safety_report,
            evidence.total_reward,
        )
        .expect("hash");
        draft.record_task_hash(evidence.task_id, &digest).expect("record");
    }
    let sealed = draft
        .finalize(Timestamp::from_unix_millis(1_760_000_600_000), signing_key)
        .expect("finalize");

    Submission {
        metadata: SubmissionMetadata {
            agent_id: "acme-agent".to_owned(),
            team: "acme".to_owned(),
            model_name: "acme-lm-3".to_owned(),
            contact_email: "ops@acme.example".to_owned(),
            description: "baseline agent".to_owned(),
            num_runs: 1,
        },
        results: SubmissionResults {
            metrics: ClaimedMetrics {
                cr: 1.0,
                cup: 1.0,
                semi_cr: 1.0,
                semi_cup: 1.0,
                policies_evaluated: 4,
            },
            dimensions: vec![
                DimensionMetrics {
                    dimension: SafetyDimension::new("user_consent"),
                    failures: 0,
                    total_instances: 2,
                    active_instances: 0,
                    dormant_count: 2,
                    risk_ratio: 0.0,
                    active_risk_ratio: 0.0,
                },
                DimensionMetrics {
                    dimension: SafetyDimension::new("boundary"),
                    failures: 0,
                    total_instances: 2,
                    active_instances: 2,
                    dormant_count: 0,
                    risk_ratio: 0.0,
                    active_risk_ratio: 0.0,
                },
            ],
        },
        task_evidence,
        integrity: sealed.into_record(),
    }
}

fn validator() -> StructuralValidator {
    StructuralValidator::new(canonical_table(), None, None)
}

// ============================================================================
// SECTION: Clean Baseline
// ============================================================================

#[test]
fn clean_submission_passes_all_checks() {
    let errors = validator().validate(&clean_submission(None));
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

// ============================================================================
// SECTION: Completeness
// ============================================================================

#[test]
fn missing_task_is_reported() {
    let mut submission = clean_submission(None);
    submission.task_evidence.retain(|evidence| evidence.task_id != TaskId::new(2));
    submission.results.metrics.policies_evaluated = 2;

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::MissingTasks {
            missing_count: 1,
            ..
        }
    )));
}

#[test]
fn unknown_task_is_reported() {
    let mut submission = clean_submission(None);
    let mut extra = evidence_for(1);
    extra.task_id = TaskId::new(99);
    submission.task_evidence.push(extra);

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(error, StructuralError::UnknownTasks { .. })));
}

// ============================================================================
// SECTION: Policy Shape
// ============================================================================

#[test]
fn policy_count_mismatch_is_reported() {
    let mut submission = clean_submission(None);
    submission.task_evidence[0].safety_report.pop();

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::PolicyCountMismatch {
            expected: 2,
            actual: 1,
            ..
        }
    )));
}

#[test]
fn template_mismatch_reports_only_first_divergence_per_task() {
    let mut submission = clean_submission(None);
    // Both positions drift; only index 0 should be reported.
    submission.task_evidence[0].safety_report[0].policy_template_id =
        PolicyTemplateId::new("drifted-a");
    submission.task_evidence[0].safety_report[1].policy_template_id =
        PolicyTemplateId::new("drifted-b");

    let errors = validator().validate(&submission);
    let mismatches: Vec<&StructuralError> = errors
        .iter()
        .filter(|error| matches!(error, StructuralError::TemplateIdMismatch { .. }))
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert!(matches!(
        mismatches[0],
        StructuralError::TemplateIdMismatch {
            policy_index: 0,
            ..
        }
    ));
}

#[test]
fn policies_evaluated_mismatch_is_reported() {
    let mut submission = clean_submission(None);
    submission.results.metrics.policies_evaluated = 5;

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::PoliciesEvaluatedMismatch {
            claimed: 5,
            actual: 4,
        }
    )));
}

// ============================================================================
// SECTION: Hash Chain and Seal
// ============================================================================

#[test]
fn missing_manifest_hash_is_reported() {
    let mut submission = clean_submission(None);
    submission.integrity.task_hashes.remove(&TaskId::new(1));

    let errors = validator().validate(&submission);
    assert!(
        errors
            .iter()
            .any(|error| matches!(error, StructuralError::MissingTrajectoryHash { .. }))
    );
    // The manifest was mutated after sealing, so the seal breaks too.
    assert!(errors.contains(&StructuralError::SealMismatch));
}

#[test]
fn trajectory_hash_mismatch_is_reported() {
    let mut submission = clean_submission(None);
    submission.task_evidence[0].trajectory_hash = "0".repeat(64);

    let errors = validator().validate(&submission);
    assert!(
        errors
            .iter()
            .any(|error| matches!(error, StructuralError::TrajectoryHashMismatch { .. }))
    );
}

#[test]
fn tampered_manifest_field_breaks_seal() {
    let mut submission = clean_submission(None);
    submission.integrity.benchmark_version = "9.9.9".to_owned();

    let errors = validator().validate(&submission);
    assert!(errors.contains(&StructuralError::SealMismatch));
}

// ============================================================================
// SECTION: Code Pins
// ============================================================================

#[test]
fn code_pin_mismatch_is_reported_per_divergent_field() {
    let submission = clean_submission(None);
    let canonical = CodePins {
        evaluator_sha256: "a".repeat(64),
        task_config_sha256: String::new(),
        environment_sha256: String::new(),
        helpers_sha256: String::new(),
    };
    let validator = StructuralValidator::new(canonical_table(), Some(canonical), None);

    let errors = validator.validate(&submission);
    let pin_errors: Vec<&StructuralError> = errors
        .iter()
        .filter(|error| matches!(error, StructuralError::CodePinMismatch { .. }))
        .collect();
    // Empty canonical fields are skipped; only the deployed pin is compared.
    assert_eq!(pin_errors.len(), 1);
}

// ============================================================================
// SECTION: HMAC
// ============================================================================

#[test]
fn unsigned_submission_fails_when_key_is_configured() {
    let submission = clean_submission(None);
    let validator = StructuralValidator::new(
        canonical_table(),
        None,
        Some(SigningKey::from("server-key")),
    );

    let errors = validator.validate(&submission);
    assert!(errors.contains(&StructuralError::MissingSignature));
}

#[test]
fn wrong_key_signature_fails_verification() {
    let submission = clean_submission(Some(&SigningKey::from("submitter-key")));
    let validator = StructuralValidator::new(
        canonical_table(),
        None,
        Some(SigningKey::from("server-key")),
    );

    let errors = validator.validate(&submission);
    assert!(errors.contains(&StructuralError::InvalidSignature));
}

#[test]
fn correctly_signed_submission_passes() {
    let key = SigningKey::from("shared-key");
    let submission = clean_submission(Some(&key));
    let validator = StructuralValidator::new(canonical_table(), None, Some(key));

    let errors = validator.validate(&submission);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

// ============================================================================
// SECTION: Sanitization
// ============================================================================

#[test]
fn script_tag_in_agent_id_is_rejected() {
    let mut submission = clean_submission(None);
    submission.metadata.agent_id = "<script>alert(1)</script>".to_owned();

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::UnsafeField {
            field: "agent_id",
            ..
        }
    )));
}

#[test]
fn agent_id_with_spaces_is_rejected() {
    let mut submission = clean_submission(None);
    submission.metadata.agent_id = "invalid agent id with spaces".to_owned();

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(error, StructuralError::InvalidAgentId { .. })));
}

#[test]
fn dotted_agent_id_is_accepted() {
    let mut submission = clean_submission(None);
    submission.metadata.agent_id = "acme.agent-3_b".to_owned();

    let errors = validator().validate(&submission);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn denylist_matching_is_case_insensitive() {
    let mut submission = clean_submission(None);
    submission.metadata.team = "JaVaScRiPt:alert(1)".to_owned();

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::UnsafeField {
            field: "team",
            ..
        }
    )));
}

#[test]
fn overlong_description_is_rejected() {
    let mut submission = clean_submission(None);
    submission.metadata.description = "d".repeat(1_001);

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::UnsafeField {
            field: "description",
            ..
        }
    )));
}

#[test]
fn description_at_cap_is_accepted() {
    let mut submission = clean_submission(None);
    submission.metadata.description = "d".repeat(1_000);

    let errors = validator().validate(&submission);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

// ============================================================================
// SECTION: Metric Sanity and Coherence
// ============================================================================

#[test]
fn cup_exceeding_cr_is_impossible() {
    let mut submission = clean_submission(None);
    submission.results.metrics.cr = 0.4;
    submission.results.metrics.cup = 0.6;

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(error, StructuralError::CupExceedsCr { .. })));
}

#[test]
fn nan_metric_is_rejected() {
    let mut submission = clean_submission(None);
    submission.results.metrics.semi_cr = f64::NAN;

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::NonFiniteMetric {
            metric: "semi_CR",
            ..
        }
    )));
}

#[test]
fn steps_without_actions_are_incoherent() {
    let mut submission = clean_submission(None);
    submission.task_evidence[1].action_sequence.clear();

    let errors = validator().validate(&submission);
    assert!(errors.iter().any(|error| matches!(
        error,
        StructuralError::EmptyActionSequence {
            num_steps: 2,
            ..
        }
    )));
}

#[test]
fn violations_accumulate_across_check_families() {
    let mut submission = clean_submission(None);
    submission.metadata.agent_id = "<img src=x onerror=alert(1)>".to_owned();
    submission.results.metrics.cup = 2.0;
    submission.task_evidence[0].trajectory_hash = "f".repeat(64);

    let errors = validator().validate(&submission);
    assert!(errors.len() >= 3, "expected accumulation, got {errors:?}");
}
