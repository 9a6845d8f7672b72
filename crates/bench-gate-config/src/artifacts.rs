// crates/bench-gate-config/src/artifacts.rs
// ============================================================================
// Module: Config Artifacts
// Description: Generated example config and operator documentation.
// Purpose: Keep docs and examples derived from one source of truth.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example TOML and the operator documentation are generated here and
//! exercised by tests against the config model, so the three cannot drift.

/// Returns a complete, commented example `bench-gate.toml`.
#[must_use]
pub const fn config_toml_example() -> &'static str {
    r#"# bench-gate.toml
# Gate configuration for the benchmark submission validator.

[tasks]
# Canonical task table: task id -> ordered policy list.
path = "task_table.json"

[artifacts]
# Project root the artifact paths below are relative to.
root = "."
evaluator = "benchmark/evaluators.py"
task_config = "benchmark/task_config.json"
environment = "benchmark/environment.py"
helpers = "benchmark/helper_functions.py"

[pins]
# Known-good pins for the deployed release. Empty pins are not enforced.
evaluator_sha256 = ""
task_config_sha256 = ""
environment_sha256 = ""
helpers_sha256 = ""

[signing]
# Uncomment to require HMAC-signed manifests.
# key_path = "/etc/bench-gate/hmac.key"

[anti_gaming]
max_submissions_per_window = 5
window_days = 30
min_interval_hours = 24
multi_run_top_k = 3
multi_run_count = 3

[history]
store_type = "sqlite"

[history.sqlite]
path = "bench-gate-history.db"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"
"#
}

/// Returns operator documentation for every configuration section.
#[must_use]
pub fn config_docs_markdown() -> String {
    let mut docs = String::new();
    docs.push_str("# bench-gate.toml Configuration\n\n");
    docs.push_str(
        "Every section has complete defaults; an empty file is a valid \
         configuration that validates submissions against an in-memory history.\n\n",
    );
    docs.push_str("## [tasks]\n\n");
    docs.push_str(
        "- `path`: canonical task table JSON mapping task ids to their \
         ordered policy lists. Must name a non-empty table.\n\n",
    );
    docs.push_str("## [artifacts]\n\n");
    docs.push_str(
        "- `root`: project root for artifact pinning.\n\
         - `evaluator`, `task_config`, `environment`, `helpers`: \
         root-relative paths of the four critical artifacts.\n\n",
    );
    docs.push_str("## [pins]\n\n");
    docs.push_str(
        "- `*_sha256`: known-good pins for the deployed release, 64 lowercase \
         hex characters each. Empty pins are not enforced.\n\n",
    );
    docs.push_str("## [signing]\n\n");
    docs.push_str(
        "- `key_path`: file holding the HMAC key material. When set, \
         unsigned or wrongly signed manifests are rejected.\n\n",
    );
    docs.push_str("## [anti_gaming]\n\n");
    docs.push_str(
        "- `max_submissions_per_window` / `window_days`: trailing rate limit \
         per contact email.\n\
         - `min_interval_hours`: minimum spacing between submissions.\n\
         - `multi_run_top_k` / `multi_run_count`: run requirement for \
         top-rank submissions.\n\n",
    );
    docs.push_str("## [history]\n\n");
    docs.push_str(
        "- `store_type`: `memory` or `sqlite`.\n\
         - `[history.sqlite]`: database path and pragma settings; required \
         for the sqlite backend.\n",
    );
    docs
}
