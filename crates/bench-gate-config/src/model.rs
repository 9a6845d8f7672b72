// crates/bench-gate-config/src/model.rs
// ============================================================================
// Module: Config Model
// Description: Typed configuration sections and cross-field validation.
// Purpose: Define the bench-gate.toml shape and its invariants.
// Dependencies: bench-gate-core, bench-gate-store-sqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! The configuration model mirrors the sections of `bench-gate.toml`. Every
//! section has complete defaults so an empty file is a valid configuration;
//! `validate` then enforces the cross-field invariants (positive policy knobs,
//! well-formed pins, a backing store section for the selected backend).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use bench_gate_core::ArtifactLayout;
use bench_gate_core::CodePins;
use bench_gate_core::runtime::AntiGamingPolicy;
use bench_gate_store_sqlite::SqliteHistoryConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Load guard messages are stable; tests match on their substrings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem error while reading configuration inputs.
    #[error("config io error: {0}")]
    Io(String),
    /// Configuration content violates an invariant.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Configuration content could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Canonical task table location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskTableConfig {
    /// Path to the canonical task table JSON file.
    pub path: PathBuf,
}

impl Default for TaskTableConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("task_table.json"),
        }
    }
}

/// Project layout of the four critical code artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Project root the artifact paths are relative to.
    pub root: PathBuf,
    /// Path to the evaluator logic source.
    pub evaluator: PathBuf,
    /// Path to the task configuration file.
    pub task_config: PathBuf,
    /// Path to the environment shim source.
    pub environment: PathBuf,
    /// Path to the shared helper functions source.
    pub helpers: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            evaluator: PathBuf::from("benchmark/evaluators.py"),
            task_config: PathBuf::from("benchmark/task_config.json"),
            environment: PathBuf::from("benchmark/environment.py"),
            helpers: PathBuf::from("benchmark/helper_functions.py"),
        }
    }
}

impl ArtifactsConfig {
    /// Returns the layout the pinner walks.
    #[must_use]
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout {
            evaluator: self.evaluator.clone(),
            task_config: self.task_config.clone(),
            environment: self.environment.clone(),
            helpers: self.helpers.clone(),
        }
    }
}

/// Known-good artifact pins for the deployed benchmark release.
///
/// Empty pins mean the corresponding artifact is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinsConfig {
    /// Known-good pin of the evaluator logic.
    pub evaluator_sha256: String,
    /// Known-good pin of the task configuration file.
    pub task_config_sha256: String,
    /// Known-good pin of the environment shim.
    pub environment_sha256: String,
    /// Known-good pin of the shared helper functions.
    pub helpers_sha256: String,
}

impl PinsConfig {
    /// Returns the canonical pins, or `None` when no pin is configured.
    #[must_use]
    pub fn canonical_pins(&self) -> Option<CodePins> {
        if self.evaluator_sha256.is_empty()
            && self.task_config_sha256.is_empty()
            && self.environment_sha256.is_empty()
            && self.helpers_sha256.is_empty()
        {
            return None;
        }
        Some(CodePins {
            evaluator_sha256: self.evaluator_sha256.clone(),
            task_config_sha256: self.task_config_sha256.clone(),
            environment_sha256: self.environment_sha256.clone(),
            helpers_sha256: self.helpers_sha256.clone(),
        })
    }

    /// Returns the pin fields as ordered (name, value) pairs.
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("pins.evaluator_sha256", &self.evaluator_sha256),
            ("pins.task_config_sha256", &self.task_config_sha256),
            ("pins.environment_sha256", &self.environment_sha256),
            ("pins.helpers_sha256", &self.helpers_sha256),
        ]
    }
}

/// HMAC signing key location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningConfig {
    /// Path to a file holding the HMAC key material, if signing is enforced.
    pub key_path: Option<PathBuf>,
}

/// Anti-gaming policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AntiGamingConfig {
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

impl Default for AntiGamingConfig {
    fn default() -> Self {
        let policy = AntiGamingPolicy::default();
        Self {
            max_submissions_per_window: policy.max_submissions_per_window,
            window_days: policy.window_days,
            min_interval_hours: policy.min_interval_hours,
            multi_run_top_k: policy.multi_run_top_k,
            multi_run_count: policy.multi_run_count,
        }
    }
}

impl AntiGamingConfig {
    /// Returns the runtime policy these knobs configure.
    #[must_use]
    pub const fn policy(&self) -> AntiGamingPolicy {
        AntiGamingPolicy {
            max_submissions_per_window: self.max_submissions_per_window,
            window_days: self.window_days,
            min_interval_hours: self.min_interval_hours,
            multi_run_top_k: self.multi_run_top_k,
            multi_run_count: self.multi_run_count,
        }
    }
}

/// History store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStoreType {
    /// In-memory store; history is lost on restart.
    #[default]
    Memory,
    /// Durable `SQLite` store.
    Sqlite,
}

/// History store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Selected backend.
    pub store_type: HistoryStoreType,
    /// `SQLite` backend settings; required when `store_type = "sqlite"`.
    pub sqlite: Option<SqliteHistoryConfig>,
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the submission gate.
///
/// # Invariants
/// - Every section defaults; an empty TOML document is a valid configuration.
/// - `validate` must pass before the configuration is used to build a gate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchGateConfig {
    /// Canonical task table location.
    pub tasks: TaskTableConfig,
    /// Artifact layout for pinning.
    pub artifacts: ArtifactsConfig,
    /// Known-good artifact pins.
    pub pins: PinsConfig,
    /// Signing key location.
    pub signing: SigningConfig,
    /// Anti-gaming policy knobs.
    pub anti_gaming: AntiGamingConfig,
    /// History store backend.
    pub history: HistoryConfig,
}

impl BenchGateConfig {
    /// Validates cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("tasks.path must be non-empty".to_string()));
        }
        if self.artifacts.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("artifacts.root must be non-empty".to_string()));
        }
        for (name, value) in self.pins.entries() {
            if !value.is_empty() && !is_sha256_hex(value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be 64 lowercase hex characters"
                )));
            }
        }
        if let Some(key_path) = &self.signing.key_path
            && key_path.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("signing.key_path must be non-empty".to_string()));
        }
        self.validate_anti_gaming()?;
        if self.history.store_type == HistoryStoreType::Sqlite && self.history.sqlite.is_none() {
            return Err(ConfigError::Invalid(
                "sqlite history store requires a [history.sqlite] section".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the anti-gaming knobs.
    fn validate_anti_gaming(&self) -> Result<(), ConfigError> {
        let knobs = &self.anti_gaming;
        if knobs.max_submissions_per_window == 0 {
            return Err(ConfigError::Invalid(
                "anti_gaming.max_submissions_per_window must be greater than zero".to_string(),
            ));
        }
        if knobs.window_days <= 0 {
            return Err(ConfigError::Invalid(
                "anti_gaming.window_days must be greater than zero".to_string(),
            ));
        }
        if knobs.min_interval_hours <= 0 {
            return Err(ConfigError::Invalid(
                "anti_gaming.min_interval_hours must be greater than zero".to_string(),
            ));
        }
        if knobs.multi_run_top_k == 0 {
            return Err(ConfigError::Invalid(
                "anti_gaming.multi_run_top_k must be greater than zero".to_string(),
            ));
        }
        if knobs.multi_run_count == 0 {
            return Err(ConfigError::Invalid(
                "anti_gaming.multi_run_count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns `true` for a 64-character lowercase hex digest.
fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_digit() || ('a' ..= 'f').contains(&c))
}
