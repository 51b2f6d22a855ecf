//! Section validation tests for sql-gate-config.
// crates/sql-gate-config/tests/section_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Validate server, gateway, audit, profile, rule, and executor limits.
// Purpose: Ensure every section fails closed on out-of-range values.
// =============================================================================

use std::path::PathBuf;

use common::TestResult;
use common::assert_invalid;
use sql_gate_config::AuditSinkKind;
use sql_gate_config::EnvironmentOverrides;
use sql_gate_config::ExecutorType;
use sql_gate_config::ServerTransport;
use sql_gate_core::Environment;
use sql_gate_core::HintDialect;

mod common;

#[test]
fn http_transport_requires_bind() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.transport = ServerTransport::Http;
    assert_invalid(config.validate(), "http transport requires bind address")
}

#[test]
fn http_transport_rejects_non_loopback_without_opt_in() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = Some("0.0.0.0:8080".to_string());
    assert_invalid(config.validate(), "non-loopback bind disallowed")?;
    config.server.allow_non_loopback = true;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn zero_body_limit_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes")
}

#[test]
fn gateway_ranges_are_enforced() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.gateway.fetch_batch_size = 0;
    assert_invalid(config.validate(), "gateway.fetch_batch_size")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.gateway.cost_check_timeout_ms = 10;
    assert_invalid(config.validate(), "gateway.cost_check_timeout_ms")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.gateway.allowed_databases = vec!["sales; DROP".to_string()];
    assert_invalid(config.validate(), "not a plain identifier")
}

#[test]
fn audit_directory_must_be_set_for_file_sink() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.directory = PathBuf::from("  ");
    assert_invalid(config.validate(), "audit.directory must be non-empty")?;
    config.audit.sink = AuditSinkKind::Stderr;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn per_caller_limit_cannot_exceed_environment_limit() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.environments.stg = Some(EnvironmentOverrides {
        max_concurrency: Some(2),
        max_concurrency_per_caller: Some(3),
        ..EnvironmentOverrides::default()
    });
    assert_invalid(config.validate(), "environments.Stg.max_concurrency_per_caller")
}

#[test]
fn command_timeout_and_grant_ranges_are_enforced() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.environments.prd = Some(EnvironmentOverrides {
        command_timeout_ms: Some(999),
        ..EnvironmentOverrides::default()
    });
    assert_invalid(config.validate(), "command_timeout_ms")?;

    config.environments.prd = Some(EnvironmentOverrides {
        max_grant_percent: Some(101),
        ..EnvironmentOverrides::default()
    });
    assert_invalid(config.validate(), "max_grant_percent")?;

    config.environments.prd = Some(EnvironmentOverrides {
        cost_threshold: Some(f64::NAN),
        ..EnvironmentOverrides::default()
    });
    assert_invalid(config.validate(), "cost_threshold")
}

#[test]
fn read_uncommitted_is_production_only() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.environments.int = Some(EnvironmentOverrides {
        read_uncommitted: Some(true),
        ..EnvironmentOverrides::default()
    });
    assert_invalid(config.validate(), "read_uncommitted is only supported for Prd")
}

#[test]
fn unknown_rule_ids_are_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rules.disabled = vec!["BP999".to_string()];
    assert_invalid(config.validate(), "unknown rule id: BP999")
}

#[test]
fn sqlite_executor_requires_databases() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.executor.executor_type = ExecutorType::Sqlite;
    assert_invalid(config.validate(), "sqlite executor requires at least one database")?;

    config.executor.executor_type = ExecutorType::None;
    config.executor.databases.insert(Environment::Int, PathBuf::from("int.db"));
    assert_invalid(config.validate(), "executor.databases requires executor type sqlite")
}

#[test]
fn tsql_hints_are_rejected_for_sqlite() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.executor.executor_type = ExecutorType::Sqlite;
    config.executor.databases.insert(Environment::Int, PathBuf::from("int.db"));
    config.gateway.hint_dialect = HintDialect::Tsql;
    assert_invalid(config.validate(), "hint_dialect tsql")
}
