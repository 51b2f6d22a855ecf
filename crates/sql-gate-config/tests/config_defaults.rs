//! Default configuration tests for sql-gate-config.
// crates/sql-gate-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Default Tests
// Description: Validate defaults and profile override resolution.
// Purpose: Ensure an empty config is valid and overrides merge field by field.
// =============================================================================

use std::time::Duration;

use common::TestResult;
use sql_gate_config::AuditSinkKind;
use sql_gate_config::ExecutorType;
use sql_gate_config::ServerTransport;
use sql_gate_config::ThrottleMode;
use sql_gate_core::Environment;
use sql_gate_core::EnvironmentProfile;
use sql_gate_core::HintDialect;
use sql_gate_core::Severity;

mod common;

#[test]
fn empty_config_is_valid_with_safe_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Stdio {
        return Err("default transport should be stdio".to_string());
    }
    if config.gateway.hint_dialect != HintDialect::None {
        return Err("default hint dialect should be none".to_string());
    }
    if config.gateway.throttle_mode != ThrottleMode::Reject {
        return Err("default throttle mode should be reject".to_string());
    }
    if config.audit.sink != AuditSinkKind::File {
        return Err("default audit sink should be file".to_string());
    }
    if config.executor.executor_type != ExecutorType::None {
        return Err("default executor should be none".to_string());
    }
    if config.gateway.cost_check_timeout() != Duration::from_secs(5) {
        return Err("default cost check timeout should be 5s".to_string());
    }
    Ok(())
}

#[test]
fn default_profiles_match_baselines() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    let profiles = config.profiles();
    for environment in Environment::ALL {
        if profiles.get(environment) != &EnvironmentProfile::baseline(environment) {
            return Err(format!("{environment} profile should equal its baseline"));
        }
    }
    Ok(())
}

#[test]
fn overrides_merge_field_by_field() -> TestResult {
    let config = common::config_from_toml(
        r#"
[environments.prd]
max_result_rows = 50
command_timeout_ms = 5000
max_dop = 2
"#,
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let prd = config.profiles().get(Environment::Prd).clone();
    let baseline = EnvironmentProfile::baseline(Environment::Prd);
    if prd.max_result_rows != 50 || prd.command_timeout != Duration::from_secs(5) {
        return Err("overrides should apply".to_string());
    }
    if prd.hints.max_dop != 2 || prd.hints.max_grant_percent != baseline.hints.max_grant_percent {
        return Err("hint overrides should merge with baseline hints".to_string());
    }
    if prd.cost_threshold.to_bits() != baseline.cost_threshold.to_bits() {
        return Err("unset fields should keep baseline values".to_string());
    }
    Ok(())
}

#[test]
fn severity_overrides_reach_the_registry() -> TestResult {
    let config = common::config_from_toml(
        r#"
[rules]
severity_overrides = { BP002 = "blocking" }
"#,
    )
    .map_err(|err| err.to_string())?;
    let registry = config.rule_registry().map_err(|err| err.to_string())?;
    match registry.get("BP002") {
        Some(rule) if rule.severity == Severity::Blocking => Ok(()),
        _ => Err("BP002 should be blocking".to_string()),
    }
}

#[test]
fn database_policy_is_case_insensitive() -> TestResult {
    let config = common::config_from_toml(
        r#"
[gateway]
allowed_databases = ["Analytics"]
"#,
    )
    .map_err(|err| err.to_string())?;
    let policy = config.database_policy();
    if !policy.permits("ANALYTICS") || policy.permits("payroll") {
        return Err("allow-list should match case-insensitively".to_string());
    }
    Ok(())
}
