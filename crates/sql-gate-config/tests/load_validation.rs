//! Config load validation tests for sql-gate-config.
// crates/sql-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use common::TestResult;
use common::assert_invalid;
use sql_gate_config::SqlGateConfig;
use sql_gate_config::config_toml_example;
use tempfile::NamedTempFile;

mod common;

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(SqlGateConfig::load(Some(path)), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(SqlGateConfig::load(Some(path)), "config path component too long")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(SqlGateConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(SqlGateConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[gateway\nthrottle_mode = ").map_err(|err| err.to_string())?;
    assert_invalid(SqlGateConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_rejects_unknown_environment_override_fields() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[environments.Prd]\nmax_rows = 10\n").map_err(|err| err.to_string())?;
    assert_invalid(SqlGateConfig::load(Some(file.path())), "max_rows")
}

#[test]
fn load_accepts_the_canonical_example() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(config_toml_example().as_bytes()).map_err(|err| err.to_string())?;
    let config = SqlGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.executor.databases.len() != 3 {
        return Err("example should configure three sqlite databases".to_string());
    }
    let registry = config.rule_registry().map_err(|err| err.to_string())?;
    if registry.get("BP006").is_some() {
        return Err("BP006 should be disabled by the example".to_string());
    }
    Ok(())
}
