// crates/bench-gate-cli/src/main.rs
// ============================================================================
// Module: Bench Gate CLI Entry Point
// Description: Command dispatcher for submission validation and release tooling.
// Purpose: Provide the operator surface over the gate, pinning, and seal checks.
// Dependencies: bench-gate-config, bench-gate-core, bench-gate-store-sqlite,
//               clap, serde, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The Bench Gate CLI runs the full validation pipeline over a submission
//! bundle, pins the critical code artifacts of a benchmark release, and
//! rechecks the seal and HMAC signature of an integrity manifest. All inputs
//! are untrusted: files are read under hard size limits and configuration is
//! validated before any pipeline work starts. The wall clock is read only
//! here, never inside the core crate, so every run can be replayed with an
//! explicit timestamp override.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use bench_gate_config::BenchGateConfig;
use bench_gate_config::HistoryStoreType;
use bench_gate_config::config_docs_markdown;
use bench_gate_config::config_toml_example;
use bench_gate_core::GateDecision;
use bench_gate_core::InMemoryHistoryStore;
use bench_gate_core::ManifestRecord;
use bench_gate_core::StructuralValidator;
use bench_gate_core::Submission;
use bench_gate_core::SubmissionGate;
use bench_gate_core::SubmissionHistoryStore;
use bench_gate_core::Timestamp;
use bench_gate_core::hashing::constant_time_digest_eq;
use bench_gate_core::manifest::pin_code_artifacts;
use bench_gate_core::manifest::seal_manifest;
use bench_gate_core::manifest::verify_hmac;
use bench_gate_store_sqlite::SqliteHistoryStore;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a submission bundle JSON input.
const MAX_SUBMISSION_BYTES: usize = 8 * 1024 * 1024;
/// Maximum size of an integrity manifest JSON input.
const MAX_MANIFEST_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "bench-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the validation pipeline over a submission bundle.
    Validate(ValidateCommand),
    /// Pin the critical code artifacts of a benchmark release.
    Pin(PinCommand),
    /// Recheck the seal and HMAC signature of an integrity manifest.
    SealCheck(SealCheckCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for submission validation.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Path to the submission bundle JSON file.
    #[arg(long, value_name = "PATH")]
    submission: PathBuf,
    /// Optional config file path (defaults to built-in settings).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Record the submission in history when it is accepted.
    #[arg(long, action = ArgAction::SetTrue)]
    admit: bool,
    /// Override the evaluation timestamp (unix milliseconds).
    #[arg(long, value_name = "UNIX_MS")]
    at_unix_ms: Option<i64>,
}

/// Arguments for artifact pinning.
#[derive(Args, Debug)]
struct PinCommand {
    /// Optional config file path (defaults to built-in settings).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the artifact root directory from the config.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

/// Arguments for manifest seal checking.
#[derive(Args, Debug)]
struct SealCheckCommand {
    /// Path to the integrity manifest JSON file.
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,
    /// Optional config file path supplying the signing key.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a Bench Gate configuration file.
    Validate(ConfigValidateCommand),
    /// Print a commented example configuration file.
    Example,
    /// Print the configuration reference as Markdown.
    Docs,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Path to the configuration file to validate.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a rendered message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a rendered message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("bench-gate {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Validate(command) => command_validate(&command),
        Commands::Pin(command) => command_pin(&command),
        Commands::SealCheck(command) => command_seal_check(&command),
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

/// Prints top-level help when no subcommand was given.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let validator = build_validator(&config)?;
    let policy = config.anti_gaming.policy();
    let submission: Submission =
        read_json_input(&command.submission, "submission", MAX_SUBMISSION_BYTES)?;
    let now = resolve_now(command.at_unix_ms)?;

    match config.history.store_type {
        HistoryStoreType::Memory => {
            let gate = SubmissionGate::new(validator, policy, InMemoryHistoryStore::new());
            run_gate(&gate, &submission, now, command.admit)
        }
        HistoryStoreType::Sqlite => {
            let Some(sqlite) = config.history.sqlite.as_ref() else {
                return Err(CliError::new(
                    "config selects the sqlite history backend without a [history.sqlite] section"
                        .to_string(),
                ));
            };
            let store = SqliteHistoryStore::new(sqlite)
                .map_err(|err| CliError::new(format!("sqlite history store init failed: {err}")))?;
            let gate = SubmissionGate::new(validator, policy, store);
            run_gate(&gate, &submission, now, command.admit)
        }
    }
}

/// Evaluates or admits a submission and renders the wire report.
fn run_gate<S: SubmissionHistoryStore>(
    gate: &SubmissionGate<S>,
    submission: &Submission,
    now: Timestamp,
    admit: bool,
) -> CliResult<ExitCode> {
    let (report, accepted) = if admit {
        let decision = gate
            .admit(submission, now)
            .map_err(|err| CliError::new(format!("history store failure: {err}")))?;
        let accepted = decision.is_accepted();
        let report = match decision {
            GateDecision::Accepted {
                report,
            }
            | GateDecision::Rejected {
                report,
            } => report,
        };
        (report, accepted)
    } else {
        let report = gate
            .evaluate(submission, now)
            .map_err(|err| CliError::new(format!("history store failure: {err}")))?;
        let acceptable = report.is_acceptable();
        (report, acceptable)
    };

    let rendered = serde_json::to_string_pretty(&report.to_wire())
        .map_err(|err| CliError::new(format!("report serialization failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Builds the structural validator from loaded configuration inputs.
fn build_validator(config: &BenchGateConfig) -> CliResult<StructuralValidator> {
    let table = config
        .load_task_table()
        .map_err(|err| CliError::new(format!("task table load failed: {err}")))?;
    let signing_key = config
        .load_signing_key()
        .map_err(|err| CliError::new(format!("signing key load failed: {err}")))?;
    let pins = config.pins.canonical_pins();
    Ok(StructuralValidator::new(table, pins, signing_key))
}

// ============================================================================
// SECTION: Pin Command
// ============================================================================

/// Executes the `pin` command.
fn command_pin(command: &PinCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let root = command.root.clone().unwrap_or_else(|| config.artifacts.root.clone());
    let layout = config.artifacts.layout();
    let (pins, warnings) = pin_code_artifacts(&root, &layout)
        .map_err(|err| CliError::new(format!("artifact pinning failed: {err}")))?;

    for warning in &warnings {
        write_stderr_line(&warning.to_string())
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    let rendered = serde_json::to_string_pretty(&pins)
        .map_err(|err| CliError::new(format!("pin serialization failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Seal Check Command
// ============================================================================

/// Executes the `seal-check` command.
fn command_seal_check(command: &SealCheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let signing_key = config
        .load_signing_key()
        .map_err(|err| CliError::new(format!("signing key load failed: {err}")))?;
    let record: ManifestRecord =
        read_json_input(&command.manifest, "manifest", MAX_MANIFEST_BYTES)?;

    let seal_ok = check_seal(&record)?;
    write_stdout_line(if seal_ok {
        "seal: ok"
    } else {
        "seal: mismatch"
    })
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    let hmac_line;
    let hmac_ok = match &signing_key {
        Some(key) => {
            let verified = verify_hmac(&record, key);
            hmac_line = if verified {
                "hmac: ok"
            } else {
                "hmac: invalid"
            };
            verified
        }
        None => {
            hmac_line = "hmac: unchecked (no signing key configured)";
            true
        }
    };
    write_stdout_line(hmac_line).map_err(|err| CliError::new(output_error("stdout", &err)))?;

    Ok(if seal_ok && hmac_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Recomputes a manifest seal and compares it in constant time.
///
/// # Errors
///
/// Returns [`CliError`] when canonicalization of the manifest body fails.
fn check_seal(record: &ManifestRecord) -> CliResult<bool> {
    if record.manifest_hash.is_empty() {
        return Ok(false);
    }
    let expected = seal_manifest(record)
        .map_err(|err| CliError::new(format!("seal recomputation failed: {err}")))?;
    Ok(constant_time_digest_eq(&record.manifest_hash, &expected.value))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Docs => {
            write_stdout_line(&config_docs_markdown())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line("configuration is valid")
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates the gate configuration.
fn load_config(path: Option<&Path>) -> CliResult<BenchGateConfig> {
    BenchGateConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Failure modes for size-limited file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
///
/// The metadata size is checked first, then the read itself is capped, so a
/// file growing between the two steps still cannot exceed the limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a JSON input file under a size limit.
fn read_json_input<T: DeserializeOwned>(
    path: &Path,
    kind: &str,
    max_bytes: usize,
) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {kind} file {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{kind} file {} is {size} bytes, exceeding the {limit} byte limit",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("failed to parse {kind} file {}: {err}", path.display()))
    })
}

/// Resolves the evaluation timestamp from an override or the wall clock.
fn resolve_now(override_unix_ms: Option<i64>) -> CliResult<Timestamp> {
    if let Some(value) = override_unix_ms {
        if value < 0 {
            return Err(CliError::new("timestamp override must not be negative".to_string()));
        }
        return Ok(Timestamp::from_unix_millis(value));
    }

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CliError::new(format!("system clock is before the unix epoch: {err}")))?;
    let millis = i64::try_from(duration.as_millis())
        .map_err(|_| CliError::new("system clock overflows the timestamp range".to_string()))?;
    Ok(Timestamp::from_unix_millis(millis))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message for a named stream.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
