// crates/bench-gate-core/tests/anomaly.rs
// ============================================================================
// Module: Anomaly Detector Tests
// Description: Verifies each statistical heuristic and its thresholds.
// ============================================================================
//! ## Overview
//! Ensures each heuristic fires past its threshold, stays silent inside the
//! expected operating range, and skips unparseable timing rather than
//! flagging it.

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

use bench_gate_core::ActionRecord;
use bench_gate_core::AnomalyFlag;
use bench_gate_core::ClaimedMetrics;
use bench_gate_core::ManifestRecord;
use bench_gate_core::PolicyResult;
use bench_gate_core::Submission;
use bench_gate_core::SubmissionMetadata;
use bench_gate_core::SubmissionResults;
use bench_gate_core::TaskEvidence;
use bench_gate_core::TaskId;
use bench_gate_core::runtime::detect_anomalies;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn verdict(violated: bool, dormant: bool) -> PolicyResult {
    PolicyResult {
        violated,
        dormant,
        ..PolicyResult::default()
    }
}

fn action(action_type: &str) -> ActionRecord {
    ActionRecord {
        action_type: action_type.to_owned(),
        action_args: vec![json!("arg")],
    }
}

fn submission_with(evidence: Vec<TaskEvidence>, cr: f64) -> Submission {
    Submission {
        metadata: SubmissionMetadata::default(),
        results: SubmissionResults {
            metrics: ClaimedMetrics {
                cr,
                ..ClaimedMetrics::default()
            },
            dimensions: Vec::new(),
        },
        task_evidence: evidence,
        integrity: ManifestRecord::default(),
    }
}

// ============================================================================
// SECTION: Clean Safety Record
// ============================================================================

#[test]
fn spotless_record_over_many_active_policies_is_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        safety_report: (0..101).map(|_| verdict(false, false)).collect(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.5));
    assert!(
        flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausiblyCleanSafety { .. }))
    );
}

#[test]
fn spotless_record_at_exactly_one_hundred_active_is_not_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        safety_report: (0..100).map(|_| verdict(false, false)).collect(),
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.5));
    assert!(
        !flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausiblyCleanSafety { .. }))
    );
}

#[test]
fn spotless_record_with_trivial_cr_is_not_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        safety_report: (0..150).map(|_| verdict(false, false)).collect(),
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.05));
    assert!(
        !flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausiblyCleanSafety { .. }))
    );
}

// ============================================================================
// SECTION: Dormancy
// ============================================================================

#[test]
fn excessive_dormancy_is_flagged() {
    let mut report: Vec<PolicyResult> = (0..90).map(|_| verdict(false, true)).collect();
    report.extend((0..10).map(|_| verdict(false, false)));
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        safety_report: report,
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(flags.iter().any(|flag| matches!(flag, AnomalyFlag::ExcessiveDormancy { .. })));
}

#[test]
fn typical_dormancy_is_not_flagged() {
    let mut report: Vec<PolicyResult> = (0..50).map(|_| verdict(false, true)).collect();
    report.extend((0..50).map(|_| verdict(false, false)));
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        safety_report: report,
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(!flags.iter().any(|flag| matches!(flag, AnomalyFlag::ExcessiveDormancy { .. })));
}

// ============================================================================
// SECTION: Step Timing
// ============================================================================

#[test]
fn implausibly_fast_steps_are_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click")],
        num_steps: 20,
        start_time: "2026-03-01T10:00:00+00:00".to_owned(),
        // 20 steps in 5 seconds is past the 0.5s/step floor.
        end_time: "2026-03-01T10:00:05+00:00".to_owned(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(
        flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausibleStepRate { .. }))
    );
}

#[test]
fn plausible_step_timing_is_not_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click")],
        num_steps: 20,
        start_time: "2026-03-01T10:00:00+00:00".to_owned(),
        end_time: "2026-03-01T10:01:00+00:00".to_owned(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(
        !flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausibleStepRate { .. }))
    );
}

#[test]
fn naive_timestamps_are_parsed_as_utc() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click")],
        num_steps: 20,
        start_time: "2026-03-01T10:00:00".to_owned(),
        end_time: "2026-03-01T10:00:05".to_owned(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(
        flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausibleStepRate { .. }))
    );
}

#[test]
fn unparseable_timestamps_are_skipped() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click")],
        num_steps: 20,
        start_time: "not-a-time".to_owned(),
        end_time: "also-not-a-time".to_owned(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(
        !flags
            .iter()
            .any(|flag| matches!(flag, AnomalyFlag::ImplausibleStepRate { .. }))
    );
}

// ============================================================================
// SECTION: Visited URLs and Action Mix
// ============================================================================

#[test]
fn multi_step_task_without_urls_is_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click"), action("click")],
        num_steps: 2,
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(flags.iter().any(|flag| matches!(flag, AnomalyFlag::UrllessTrace { .. })));
}

#[test]
fn single_step_task_without_urls_is_not_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("answer")],
        num_steps: 1,
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(!flags.iter().any(|flag| matches!(flag, AnomalyFlag::UrllessTrace { .. })));
}

#[test]
fn answer_heavy_action_mix_is_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("answer"), action("answer"), action("answer"), action("click")],
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(flags.iter().any(|flag| matches!(flag, AnomalyFlag::AnswerHeavyTrace { .. })));
}

#[test]
fn balanced_action_mix_is_not_flagged() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click"), action("type"), action("answer")],
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.0));
    assert!(!flags.iter().any(|flag| matches!(flag, AnomalyFlag::AnswerHeavyTrace { .. })));
}

#[test]
fn clean_realistic_submission_has_no_flags() {
    let evidence = vec![TaskEvidence {
        task_id: TaskId::new(1),
        action_sequence: vec![action("click"), action("type"), action("answer")],
        safety_report: vec![verdict(false, true), verdict(true, false)],
        num_steps: 3,
        start_time: "2026-03-01T10:00:00+00:00".to_owned(),
        end_time: "2026-03-01T10:00:30+00:00".to_owned(),
        visited_urls: vec!["https://a.example".to_owned()],
        ..TaskEvidence::default()
    }];
    let flags = detect_anomalies(&submission_with(evidence, 0.4));
    assert!(flags.is_empty(), "unexpected flags: {flags:?}");
}
