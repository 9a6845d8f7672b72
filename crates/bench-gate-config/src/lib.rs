// crates/bench-gate-config/src/lib.rs
// ============================================================================
// Module: Bench Gate Config
// Description: Canonical gate configuration model, loading, and validation.
// Purpose: Give hosts one explicit, fail-closed source of gate context.
// Dependencies: bench-gate-core, bench-gate-store-sqlite, serde, serde_json,
//               thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration for the submission gate: the canonical task table path, the
//! artifact layout and canonical code pins, the signing key location, the
//! anti-gaming policy knobs, and the history store backend. Loading is strict
//! and fail-closed: overlong paths, oversized files, and non-UTF-8 content
//! are rejected before parsing, and every section is validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod artifacts;
mod load;
mod model;

pub use artifacts::config_docs_markdown;
pub use artifacts::config_toml_example;
pub use model::AntiGamingConfig;
pub use model::ArtifactsConfig;
pub use model::BenchGateConfig;
pub use model::ConfigError;
pub use model::HistoryConfig;
pub use model::HistoryStoreType;
pub use model::PinsConfig;
pub use model::SigningConfig;
pub use model::TaskTableConfig;
