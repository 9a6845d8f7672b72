// crates/bench-gate-core/tests/antigaming.rs
// ============================================================================
// Module: Anti-Gaming Controller Tests
// Description: Verifies rate limits, replay detection, and multi-run policy.
// ============================================================================
//! ## Overview
//! Ensures throttling windows, replay and run-id reuse detection, and the
//! top-rank multi-run requirement behave exactly as configured, with the
//! observation time injected rather than read from a clock.

#![allow(
    dead_code,
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

use bench_gate_core::AntiGamingIssue;
use bench_gate_core::AntiGamingPolicy;
use bench_gate_core::ClaimedMetrics;
use bench_gate_core::HistoryRecord;
use bench_gate_core::LeaderboardEntry;
use bench_gate_core::ManifestRecord;
use bench_gate_core::RunId;
use bench_gate_core::Submission;
use bench_gate_core::SubmissionMetadata;
use bench_gate_core::SubmissionResults;
use bench_gate_core::TaskEvidence;
use bench_gate_core::TaskId;
use bench_gate_core::Timestamp;
use bench_gate_core::runtime::multi_run_requirement;
use bench_gate_core::runtime::validate_anti_gaming;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const HOUR_MILLIS: i64 = 3_600_000;
const DAY_MILLIS: i64 = 86_400_000;
const NOW: Timestamp = Timestamp::from_unix_millis(1_770_000_000_000);

fn submission(email: &str, cup: f64, num_runs: u32) -> Submission {
    let integrity = ManifestRecord {
        run_id: RunId::new("run-new"),
        manifest_hash: "hash-new".to_owned(),
        ..ManifestRecord::default()
    };
    Submission {
        metadata: SubmissionMetadata {
            agent_id: "agent".to_owned(),
            team: "acme".to_owned(),
            model_name: "model".to_owned(),
            contact_email: email.to_owned(),
            description: String::new(),
            num_runs,
        },
        results: SubmissionResults {
            metrics: ClaimedMetrics {
                cup,
                ..ClaimedMetrics::default()
            },
            dimensions: Vec::new(),
        },
        task_evidence: (1..=3)
            .map(|task_id| TaskEvidence {
                task_id: TaskId::new(task_id),
                ..TaskEvidence::default()
            })
            .collect(),
        integrity,
    }
}

fn record(email: &str, hours_ago: i64, manifest_hash: &str, run_id: &str) -> HistoryRecord {
    HistoryRecord {
        contact_email: email.to_owned(),
        submitted_at: Timestamp::from_unix_millis(
            NOW.as_unix_millis() - hours_ago * HOUR_MILLIS,
        ),
        manifest_hash: manifest_hash.to_owned(),
        run_id: RunId::new(run_id),
        organization: "someone-else".to_owned(),
    }
}

fn check(submission: &Submission, history: &[HistoryRecord]) -> Vec<AntiGamingIssue> {
    validate_anti_gaming(submission, history, &AntiGamingPolicy::default(), 3, NOW)
}

// ============================================================================
// SECTION: Completeness and Rate Limits
// ============================================================================

#[test]
fn acceptable_submission_has_no_issues() {
    let issues = check(&submission("a@x.example", 0.3, 1), &[]);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn incomplete_task_set_is_rejected() {
    let mut bundle = submission("a@x.example", 0.3, 1);
    bundle.task_evidence.pop();
    let issues = check(&bundle, &[]);
    assert!(issues.iter().any(|issue| matches!(
        issue,
        AntiGamingIssue::IncompleteTaskSet {
            expected: 3,
            submitted: 2,
        }
    )));
}

#[test]
fn rate_limit_counts_only_the_trailing_window() {
    // Five prior submissions, but two are outside the 30-day window.
    let history: Vec<HistoryRecord> = vec![
        record("a@x.example", 31 * 24, "h1", "r1"),
        record("a@x.example", 40 * 24, "h2", "r2"),
        record("a@x.example", 20 * 24, "h3", "r3"),
        record("a@x.example", 10 * 24, "h4", "r4"),
        record("a@x.example", 5 * 24, "h5", "r5"),
    ];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(!issues.iter().any(|issue| matches!(issue, AntiGamingIssue::RateLimitExceeded { .. })));
}

#[test]
fn rate_limit_rejects_at_the_cap() {
    let history: Vec<HistoryRecord> = (0..5)
        .map(|idx| {
            record("a@x.example", 48 + idx * 24, &format!("h{idx}"), &format!("r{idx}"))
        })
        .collect();
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.iter().any(|issue| matches!(
        issue,
        AntiGamingIssue::RateLimitExceeded {
            recent: 5,
            ..
        }
    )));
}

#[test]
fn rate_limit_ignores_other_submitters() {
    let history: Vec<HistoryRecord> = (0..5)
        .map(|idx| record("b@y.example", 48 + idx * 24, &format!("h{idx}"), &format!("r{idx}")))
        .collect();
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn submission_sooner_than_interval_is_rejected() {
    let history = vec![record("a@x.example", 6, "h1", "r1")];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.iter().any(|issue| matches!(
        issue,
        AntiGamingIssue::IntervalTooShort {
            required_hours: 24,
            ..
        }
    )));
}

#[test]
fn interval_measures_the_most_recent_submission() {
    let history = vec![
        record("a@x.example", 26, "h1", "r1"),
        record("a@x.example", 2, "h2", "r2"),
    ];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.iter().any(|issue| matches!(issue, AntiGamingIssue::IntervalTooShort { .. })));
}

#[test]
fn submission_after_interval_is_accepted() {
    let history = vec![record("a@x.example", 30, "h1", "r1")];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

// ============================================================================
// SECTION: Replay and Run-ID Reuse
// ============================================================================

#[test]
fn replayed_manifest_hash_is_rejected() {
    let history = vec![record("b@y.example", 90 * 24, "hash-new", "r1")];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.iter().any(|issue| matches!(issue, AntiGamingIssue::ReplayedManifest { .. })));
}

#[test]
fn reused_run_id_is_rejected_even_with_different_hash() {
    let history = vec![record("b@y.example", 90 * 24, "other-hash", "run-new")];
    let issues = check(&submission("a@x.example", 0.3, 1), &history);
    assert!(issues.iter().any(|issue| matches!(
        issue,
        AntiGamingIssue::ReusedRunId {
            ..
        }
    )));
}

// ============================================================================
// SECTION: Multi-Run Requirement
// ============================================================================

fn leaderboard(cups: &[f64]) -> Vec<LeaderboardEntry> {
    cups.iter()
        .enumerate()
        .map(|(idx, cup)| LeaderboardEntry {
            agent_id: format!("agent-{idx}"),
            cup: *cup,
        })
        .collect()
}

#[test]
fn below_top_k_needs_no_multi_run() {
    let board = leaderboard(&[0.9, 0.8, 0.7, 0.6]);
    let issue = multi_run_requirement(
        &submission("a@x.example", 0.5, 1),
        &board,
        &AntiGamingPolicy::default(),
    );
    assert!(issue.is_none());
}

#[test]
fn top_k_single_run_submission_is_warned() {
    let board = leaderboard(&[0.9, 0.8, 0.7, 0.6]);
    let issue = multi_run_requirement(
        &submission("a@x.example", 0.85, 1),
        &board,
        &AntiGamingPolicy::default(),
    );
    assert!(matches!(
        issue,
        Some(AntiGamingIssue::MultiRunRequired {
            top_k: 3,
            required_runs: 3,
            ..
        })
    ));
}

#[test]
fn top_k_submission_with_enough_runs_passes() {
    let board = leaderboard(&[0.9, 0.8, 0.7, 0.6]);
    let issue = multi_run_requirement(
        &submission("a@x.example", 0.85, 3),
        &board,
        &AntiGamingPolicy::default(),
    );
    assert!(issue.is_none());
}

#[test]
fn sparse_leaderboard_always_requires_multi_run() {
    // Fewer entries than K: every submission would land in the top K.
    let board = leaderboard(&[0.9]);
    let issue = multi_run_requirement(
        &submission("a@x.example", 0.1, 1),
        &board,
        &AntiGamingPolicy::default(),
    );
    assert!(matches!(issue, Some(AntiGamingIssue::MultiRunRequired { .. })));
}

#[test]
fn exactly_at_threshold_is_not_top_k() {
    let board = leaderboard(&[0.9, 0.8, 0.7]);
    let issue = multi_run_requirement(
        &submission("a@x.example", 0.7, 1),
        &board,
        &AntiGamingPolicy::default(),
    );
    assert!(issue.is_none());
}

#[test]
fn zero_rank_depth_disables_the_advisory() {
    let policy = AntiGamingPolicy {
        multi_run_top_k: 0,
        ..AntiGamingPolicy::default()
    };
    let board = leaderboard(&[0.9, 0.8, 0.7]);
    let issue = multi_run_requirement(&submission("a@x.example", 0.95, 1), &board, &policy);
    assert!(issue.is_none());
}

// ============================================================================
// SECTION: Declared Run Count
// ============================================================================

#[test]
fn omitted_run_count_declares_one_run() {
    let metadata: SubmissionMetadata =
        serde_json::from_str(r#"{"agent_id": "acme-agent"}"#).expect("parse metadata");
    assert_eq!(metadata.num_runs, 1);
    assert_eq!(SubmissionMetadata::default().num_runs, 1);
}
