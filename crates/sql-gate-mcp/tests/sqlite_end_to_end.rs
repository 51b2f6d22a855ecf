// crates/sql-gate-mcp/tests/sqlite_end_to_end.rs
// ============================================================================
// Module: SQLite End-to-End Tests
// Description: Tool calls through a server built from configuration.
// Purpose: Ensure the configured executor, audit sink, and tools fit together.
// Dependencies: sql-gate-mcp, sql-gate-config, rusqlite, tempfile, tokio
// ============================================================================

//! ## Overview
//! Builds [`sql_gate_mcp::McpServer`] from TOML pointing at a temporary
//! `SQLite` file and drives the tool router the way a client would.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions are permitted."
)]

mod common;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde_json::Value;
use serde_json::json;
use sql_gate_core::CallerId;
use sql_gate_mcp::AuditRecord;
use sql_gate_mcp::McpServer;
use tempfile::TempDir;

use crate::common::config_from_toml;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn seeded_database(dir: &Path) -> String {
    let path = dir.join("int.db");
    let connection = Connection::open(&path).unwrap();
    connection
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, phone TEXT);
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 40)
             INSERT INTO users (id, name, phone) SELECT n, 'user' || n, '555-010-' || (1000 + n) FROM seq;",
        )
        .unwrap();
    path.to_string_lossy().into_owned()
}

fn server(dir: &TempDir) -> McpServer {
    let database = seeded_database(dir.path());
    let audit = dir.path().join("audit");
    let config = config_from_toml(&format!(
        r#"
[audit]
sink = "file"
directory = "{}"

[environments.Int]
max_result_rows = 25

[executor]
type = "sqlite"

[executor.databases]
Int = "{}"
"#,
        audit.to_string_lossy(),
        database
    ));
    McpServer::from_config(config).expect("server builds")
}

async fn call(server: &McpServer, tool: &str, arguments: Value) -> Value {
    server.router().handle_tool_call(&CallerId::default(), tool, arguments).await.expect("tool call")
}

fn audit_records(dir: &TempDir) -> Vec<AuditRecord> {
    let mut records = Vec::new();
    for entry in fs::read_dir(dir.path().join("audit")).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        records.extend(content.lines().map(|line| serde_json::from_str::<AuditRecord>(line).unwrap()));
    }
    records
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn readonly_query_returns_capped_rows_from_sqlite() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);
    let envelope = call(
        &server,
        "query_readonly",
        json!({"query": "SELECT id, name FROM users ORDER BY id", "environment": "Int"}),
    )
    .await;

    assert_eq!(envelope["success"], true, "{envelope}");
    assert_eq!(envelope["row_count"], 25);
    assert_eq!(envelope["data"][0]["name"], "user1");
    assert_eq!(envelope["truncation"]["row_limit_exceeded"], true);
    assert!(envelope["cost"]["estimate"].as_f64().unwrap() <= 50.0);

    let records = audit_records(&dir);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row_count, 25);
}

#[tokio::test]
async fn engine_write_attempts_never_reach_sqlite() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);
    let envelope = call(
        &server,
        "query_readonly",
        json!({"query": "DELETE FROM users WHERE phone = '555-010-1001'", "environment": "Int"}),
    )
    .await;
    assert_eq!(envelope["error"], "ValidationError");

    let after = call(
        &server,
        "query_readonly",
        json!({"query": "SELECT COUNT(*) AS total FROM users", "environment": "Int"}),
    )
    .await;
    assert_eq!(after["data"][0]["total"], 40);

    let records = audit_records(&dir);
    assert_eq!(records.len(), 2);
    assert!(!records[0].query.contains("1001"), "{}", records[0].query);
}

#[tokio::test]
async fn environments_without_a_database_fail_closed() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);
    let envelope =
        call(&server, "query_readonly", json!({"query": "SELECT 1 AS one", "environment": "Prd"}))
            .await;
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"], "CostCheckUnavailable");
}

#[tokio::test]
async fn list_environments_reports_effective_profiles() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);
    let listed = call(&server, "list_environments", json!({})).await;
    let environments = listed["environments"].as_array().unwrap();
    let names: Vec<&str> =
        environments.iter().map(|profile| profile["environment"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Int", "Stg", "Prd"]);
    assert_eq!(environments[0]["max_result_rows"], 25);
    assert_eq!(environments[2]["cost_threshold"], 10.0);

    let error = server
        .router()
        .handle_tool_call(&CallerId::default(), "list_environments", json!({"verbose": true}))
        .await;
    assert!(error.is_err());
}

#[tokio::test]
async fn review_tool_reports_findings_without_executing() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);
    let review =
        call(&server, "review_query", json!({"query": "SELECT * FROM users", "environment": "Stg"}))
            .await;
    assert_eq!(review["accepted"], true);
    assert_eq!(review["review"]["status"], "warn");
    assert!(!dir.path().join("audit").exists() || audit_records(&dir).is_empty());
}
