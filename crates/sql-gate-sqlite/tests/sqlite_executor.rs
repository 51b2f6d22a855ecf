// crates/sql-gate-sqlite/tests/sqlite_executor.rs
// ============================================================================
// Module: SQLite Executor Tests
// Description: Validate the SQLite QueryExecutor against real database files.
// Purpose: Ensure read-only execution, batching, cost estimates, and cancellation.
// Dependencies: sql-gate-sqlite, sql-gate-core, rusqlite, tempfile, tokio
// ============================================================================

//! ## Overview
//! Exercises the executor against temporary `SQLite` files: batched streaming,
//! plan-cost ordering, write refusal, and interrupt on cursor drop.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use sql_gate_core::Environment;
use sql_gate_core::ExecutorError;
use sql_gate_core::PreparedQuery;
use sql_gate_core::QueryExecutor;
use sql_gate_core::ResourceHints;
use sql_gate_sqlite::SqliteExecutor;
use sql_gate_sqlite::SqliteExecutorConfig;
use sql_gate_sqlite::SqliteExecutorError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn seeded_database(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("int.db");
    let connection = Connection::open(&path).unwrap();
    connection
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, avatar BLOB);
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 250)
             INSERT INTO users (id, name, score, avatar) SELECT n, 'user' || n, n * 1.5, x'0aff' FROM seq;",
        )
        .unwrap();
    path
}

fn executor(path: PathBuf) -> SqliteExecutor {
    let mut config = SqliteExecutorConfig::default();
    config.databases.insert(Environment::Int, path);
    SqliteExecutor::new(config).unwrap()
}

fn prepared(text: &str) -> PreparedQuery {
    PreparedQuery {
        text: text.to_string(),
        environment: Environment::Int,
        database: None,
        hints: ResourceHints {
            max_dop: 1,
            max_grant_percent: 10,
            read_uncommitted: false,
        },
        timeout: Duration::from_secs(5),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn rows_stream_in_requested_batches() {
    let dir = TempDir::new().unwrap();
    let executor = executor(seeded_database(&dir));
    let mut cursor = executor.open(&prepared("SELECT id, name, score, avatar FROM users;")).await.unwrap();
    assert_eq!(cursor.columns(), ["id", "name", "score", "avatar"]);

    let first = cursor.next_batch(100).await.unwrap().unwrap();
    assert_eq!(first.len(), 100);
    assert_eq!(first[0]["name"], "user1");
    assert_eq!(first[0]["avatar"], "0x0aff");
    assert_eq!(first[1]["score"], 3.0);

    let mut total = first.len();
    while let Some(batch) = cursor.next_batch(100).await.unwrap() {
        total += batch.len();
    }
    assert_eq!(total, 250);
    assert!(cursor.next_batch(100).await.unwrap().is_none());
}

#[tokio::test]
async fn full_scans_estimate_higher_than_key_lookups() {
    let dir = TempDir::new().unwrap();
    let executor = executor(seeded_database(&dir));
    let scan = executor.estimate_cost(&prepared("SELECT name FROM users WHERE name = 'x'")).await.unwrap();
    let seek = executor.estimate_cost(&prepared("SELECT name FROM users WHERE id = 7")).await.unwrap();
    assert!(scan > seek, "scan {scan} should exceed seek {seek}");
}

#[tokio::test]
async fn writes_are_refused_by_the_engine() {
    let dir = TempDir::new().unwrap();
    let executor = executor(seeded_database(&dir));
    let outcome = match executor.open(&prepared("DELETE FROM users")).await {
        Ok(mut cursor) => cursor.next_batch(10).await.map(|_| ()),
        Err(error) => Err(error),
    };
    assert!(matches!(outcome, Err(ExecutorError::Query(_))), "{outcome:?}");
    let remaining: i64 = Connection::open(dir.path().join("int.db"))
        .unwrap()
        .query_row("SELECT count(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 250);
}

#[tokio::test]
async fn unconfigured_environment_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let executor = executor(seeded_database(&dir));
    let mut query = prepared("SELECT 1");
    query.environment = Environment::Prd;
    assert!(matches!(executor.estimate_cost(&query).await, Err(ExecutorError::Unavailable(_))));
}

#[tokio::test]
async fn dropping_a_cursor_interrupts_a_running_statement() {
    let dir = TempDir::new().unwrap();
    let executor = executor(seeded_database(&dir));
    let mut cursor = executor
        .open(&prepared(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
        ))
        .await
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_millis(200), cursor.next_batch(1)).await;
    assert!(outcome.is_err(), "unbounded statement should not finish");
    drop(cursor);
}

#[test]
fn missing_database_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteExecutorConfig::default();
    config.databases.insert(Environment::Int, dir.path().join("missing.db"));
    assert!(matches!(SqliteExecutor::new(config), Err(SqliteExecutorError::Io(_))));
}
