// crates/bench-gate-config/src/load.rs
// ============================================================================
// Module: Config Loading
// Description: Fail-closed file loading for config, task table, and key.
// Purpose: Guard every configuration input before parsing.
// Dependencies: bench-gate-core, serde_json, toml
// ============================================================================

//! ## Overview
//! Every file the gate reads at startup flows through the same guards: path
//! length and component limits, a hard size cap, and UTF-8 enforcement. The
//! guards run before any parser sees the bytes so malformed or hostile input
//! fails closed with a stable message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use bench_gate_core::SigningKey;
use bench_gate_core::TaskTable;

use crate::model::BenchGateConfig;
use crate::model::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total config path length.
const MAX_CONFIG_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum config file size in bytes.
const MAX_CONFIG_BYTES: usize = 1024 * 1024;
/// Maximum task table file size in bytes.
const MAX_TASK_TABLE_BYTES: usize = 4 * 1024 * 1024;
/// Maximum signing key file size in bytes.
const MAX_KEY_BYTES: usize = 4096;

// ============================================================================
// SECTION: Loading
// ============================================================================

impl BenchGateConfig {
    /// Loads and validates a configuration file.
    ///
    /// With no path, returns the validated default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path violates safety limits, the file
    /// cannot be read, the content is not UTF-8 TOML, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = read_guarded_text(path, MAX_CONFIG_BYTES, "config")?;
                toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the canonical task table named by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file fails the load guards, is not
    /// valid JSON, or describes an empty table.
    pub fn load_task_table(&self) -> Result<TaskTable, ConfigError> {
        let text = read_guarded_text(&self.tasks.path, MAX_TASK_TABLE_BYTES, "task table")?;
        let table: TaskTable =
            serde_json::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        if table.is_empty() {
            return Err(ConfigError::Invalid("task table must not be empty".to_string()));
        }
        Ok(table)
    }

    /// Loads the HMAC signing key when one is configured.
    ///
    /// Surrounding whitespace in the key file is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file fails the load guards or holds
    /// only whitespace.
    pub fn load_signing_key(&self) -> Result<Option<SigningKey>, ConfigError> {
        let Some(key_path) = &self.signing.key_path else {
            return Ok(None);
        };
        let text = read_guarded_text(key_path, MAX_KEY_BYTES, "signing key")?;
        let material = text.trim();
        if material.is_empty() {
            return Err(ConfigError::Invalid("signing key file is empty".to_string()));
        }
        Ok(Some(SigningKey::new(material.as_bytes().to_vec())))
    }
}

// ============================================================================
// SECTION: Guards
// ============================================================================

/// Validates an input path against safety limits.
fn validate_input_path(path: &Path, kind: &str) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(format!("{kind} path must not be empty")));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_CONFIG_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{kind} path exceeds max length")));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{kind} path component too long")));
        }
    }
    Ok(())
}

/// Reads a guarded UTF-8 text file under a size cap.
fn read_guarded_text(path: &Path, max_bytes: usize, kind: &str) -> Result<String, ConfigError> {
    validate_input_path(path, kind)?;
    let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(ConfigError::Invalid(format!("{kind} file exceeds size limit")));
    }
    String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid(format!("{kind} file must be utf-8")))
}
