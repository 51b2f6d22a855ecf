// crates/sql-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for SQL Gate configuration. The output is deterministic
//! and validated by the crate's tests.

/// Returns a canonical example `sql-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
transport = "stdio"
max_body_bytes = 1048576

[gateway]
hint_dialect = "none"
throttle_mode = "queue"
queue_wait_ms = 2000
cost_check_timeout_ms = 5000
fetch_batch_size = 100
allowed_databases = ["analytics", "reporting"]
identifier_quote = "bracket"

[audit]
sink = "file"
directory = "audit"
max_query_chars = 4000
max_detail_chars = 1000

[environments.Int]
cost_threshold = 50.0
command_timeout_ms = 60000

[environments.Prd]
max_concurrency = 5
max_concurrency_per_caller = 2
max_result_rows = 1000
max_payload_bytes = 1048576
max_field_bytes = 1000
cost_threshold = 10.0
command_timeout_ms = 30000
max_dop = 1
max_grant_percent = 10
read_uncommitted = false

[rules]
disabled = ["BP006"]
severity_overrides = { BP001 = "blocking" }

[executor]
type = "sqlite"
busy_timeout_ms = 5000

[executor.databases]
Int = "data/int.db"
Stg = "data/stg.db"
Prd = "data/prd.db"
"#,
    )
}
