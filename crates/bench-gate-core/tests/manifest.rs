// crates/bench-gate-core/tests/manifest.rs
// ============================================================================
// Module: Integrity Manifest Tests
// Description: Verifies pinning, the draft lifecycle, seal, and HMAC.
// ============================================================================
//! ## Overview
//! Ensures code pinning treats absence as evidence, the draft-to-sealed
//! lifecycle is single-shot, the seal covers every field except itself and
//! the signature, and signatures verify only under the signing key.

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

use std::fs;
use std::path::PathBuf;

use bench_gate_core::CodePins;
use bench_gate_core::HashAlgorithm;
use bench_gate_core::ManifestDraft;
use bench_gate_core::ManifestError;
use bench_gate_core::RunId;
use bench_gate_core::SigningKey;
use bench_gate_core::TaskId;
use bench_gate_core::Timestamp;
use bench_gate_core::hashing::hash_bytes;
use bench_gate_core::manifest::ArtifactLayout;
use bench_gate_core::manifest::CodeArtifact;
use bench_gate_core::manifest::compute_hmac;
use bench_gate_core::manifest::pin_code_artifacts;
use bench_gate_core::manifest::seal_manifest;
use bench_gate_core::manifest::verify_hmac;

fn test_layout() -> ArtifactLayout {
    ArtifactLayout {
        evaluator: PathBuf::from("eval/evaluator.py"),
        task_config: PathBuf::from("config/tasks.json"),
        environment: PathBuf::from("eval/environment.py"),
        helpers: PathBuf::from("eval/helpers.py"),
    }
}

fn draft_with_one_task() -> ManifestDraft {
    let mut draft = ManifestDraft::new(
        RunId::new("run-001"),
        "1.2.0",
        Timestamp::from_unix_millis(1_700_000_000_000),
        CodePins::default(),
    );
    let digest = hash_bytes(HashAlgorithm::Sha256, b"trajectory");
    draft.record_task_hash(TaskId::new(7), &digest).expect("record");
    draft
}

// ============================================================================
// SECTION: Code Pinning
// ============================================================================

#[test]
fn pinning_hashes_present_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = test_layout();
    for rel in [&layout.evaluator, &layout.task_config, &layout.environment, &layout.helpers] {
        let full = dir.path().join(rel);
        fs::create_dir_all(full.parent().expect("parent")).expect("mkdir");
        fs::write(&full, b"artifact body").expect("write");
    }

    let (pins, warnings) = pin_code_artifacts(dir.path(), &layout).expect("pin");
    assert!(warnings.is_empty());
    let expected = hash_bytes(HashAlgorithm::Sha256, b"artifact body").value;
    assert_eq!(pins.evaluator_sha256, expected);
    assert_eq!(pins.task_config_sha256, expected);
    assert_eq!(pins.environment_sha256, expected);
    assert_eq!(pins.helpers_sha256, expected);
}

#[test]
fn pinning_records_empty_pin_and_warning_for_missing_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = test_layout();
    // Only the evaluator exists.
    let evaluator = dir.path().join(&layout.evaluator);
    fs::create_dir_all(evaluator.parent().expect("parent")).expect("mkdir");
    fs::write(&evaluator, b"evaluator").expect("write");

    let (pins, warnings) = pin_code_artifacts(dir.path(), &layout).expect("pin");
    assert!(!pins.evaluator_sha256.is_empty());
    assert!(pins.task_config_sha256.is_empty());
    assert!(pins.environment_sha256.is_empty());
    assert!(pins.helpers_sha256.is_empty());

    let missing: Vec<CodeArtifact> = warnings.iter().map(|warning| warning.artifact).collect();
    assert_eq!(
        missing,
        vec![CodeArtifact::TaskConfig, CodeArtifact::Environment, CodeArtifact::Helpers]
    );
}

// ============================================================================
// SECTION: Draft Lifecycle
// ============================================================================

#[test]
fn duplicate_task_hash_is_rejected() {
    let mut draft = draft_with_one_task();
    let digest = hash_bytes(HashAlgorithm::Sha256, b"other");
    let err = draft.record_task_hash(TaskId::new(7), &digest).unwrap_err();
    assert!(matches!(err, ManifestError::DuplicateTask { .. }));
}

#[test]
fn finalize_without_key_yields_unsigned_manifest() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    assert!(!sealed.is_signed());
    assert!(sealed.hmac_signature().is_empty());
    assert!(!sealed.manifest_hash().is_empty());
}

#[test]
fn finalize_with_key_signs_manifest() {
    let key = SigningKey::from("leaderboard-secret");
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), Some(&key))
        .expect("finalize");
    assert!(sealed.is_signed());
    assert!(verify_hmac(sealed.as_record(), &key));
}

#[test]
fn sealed_manifest_seal_matches_recomputation() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    let record = sealed.into_record();
    let recomputed = seal_manifest(&record).expect("seal");
    assert_eq!(record.manifest_hash, recomputed.value);
}

// ============================================================================
// SECTION: Seal Semantics
// ============================================================================

#[test]
fn seal_ignores_declared_seal_and_signature_fields() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    let mut record = sealed.into_record();
    let original_seal = seal_manifest(&record).expect("seal").value;

    record.manifest_hash = "forged".to_owned();
    record.hmac_signature = "also-forged".to_owned();
    let reseal = seal_manifest(&record).expect("seal");
    assert_eq!(reseal.value, original_seal);
}

#[test]
fn seal_detects_field_tampering() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    let mut record = sealed.into_record();
    record.benchmark_version = "9.9.9".to_owned();
    let reseal = seal_manifest(&record).expect("seal");
    assert_ne!(reseal.value, record.manifest_hash);
}

#[test]
fn seal_detects_task_hash_tampering() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    let mut record = sealed.into_record();
    record
        .task_hashes
        .insert(TaskId::new(7), hash_bytes(HashAlgorithm::Sha256, b"swapped").value);
    let reseal = seal_manifest(&record).expect("seal");
    assert_ne!(reseal.value, record.manifest_hash);
}

// ============================================================================
// SECTION: HMAC Verification
// ============================================================================

#[test]
fn hmac_verification_fails_under_wrong_key() {
    let key = SigningKey::from("correct-key");
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), Some(&key))
        .expect("finalize");
    let record = sealed.into_record();
    assert!(verify_hmac(&record, &key));
    assert!(!verify_hmac(&record, &SigningKey::from("wrong-key")));
}

#[test]
fn hmac_verification_fails_for_empty_signature() {
    let key = SigningKey::from("correct-key");
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    assert!(!verify_hmac(sealed.as_record(), &key));
}

#[test]
fn hmac_verification_fails_after_tampering() {
    let key = SigningKey::from("correct-key");
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), Some(&key))
        .expect("finalize");
    let mut record = sealed.into_record();
    record.run_id = RunId::new("run-002");
    assert!(!verify_hmac(&record, &key));
}

#[test]
fn computed_hmac_matches_stored_signature() {
    let key = SigningKey::from("correct-key");
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), Some(&key))
        .expect("finalize");
    let record = sealed.into_record();
    let computed = compute_hmac(&record, &key).expect("hmac");
    assert_eq!(computed.value, record.hmac_signature);
}

// ============================================================================
// SECTION: Wire Shape
// ============================================================================

#[test]
fn manifest_serializes_task_hashes_with_decimal_string_keys() {
    let sealed = draft_with_one_task()
        .finalize(Timestamp::from_unix_millis(1_700_000_100_000), None)
        .expect("finalize");
    let value = serde_json::to_value(sealed.as_record()).expect("to_value");
    assert!(value["task_hashes"].get("7").is_some());
}
