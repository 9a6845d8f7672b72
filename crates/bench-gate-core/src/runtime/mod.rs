// crates/bench-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Bench Gate Runtime
// Description: Validation, recomputation, detection, and admission logic.
// Purpose: Turn core types into the full submission evaluation pipeline.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime layer holds the active half of the crate: the structural
//! validator, the metric recomputer, the anomaly detector, the anti-gaming
//! controller, and the gate that sequences them over a history store. All of
//! it is pure given explicit inputs; hosts supply time and keys.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod anomaly;
pub mod antigaming;
pub mod history;
pub mod pipeline;
pub mod recompute;
pub mod validator;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use self::anomaly::AnomalyFlag;
pub use self::anomaly::detect_anomalies;
pub use self::antigaming::AntiGamingIssue;
pub use self::antigaming::AntiGamingPolicy;
pub use self::antigaming::multi_run_requirement;
pub use self::antigaming::validate_anti_gaming;
pub use self::history::InMemoryHistoryStore;
pub use self::pipeline::GateDecision;
pub use self::pipeline::SubmissionGate;
pub use self::pipeline::ValidationReport;
pub use self::pipeline::WireReport;
pub use self::recompute::MetricDiscrepancy;
pub use self::recompute::recompute_metrics;
pub use self::validator::StructuralError;
pub use self::validator::StructuralValidator;
