// crates/sql-gate-sqlite/src/executor.rs
// ============================================================================
// Module: SQLite Query Executor
// Description: Read-only QueryExecutor backed by SQLite.
// Purpose: Estimate plan cost and stream rows in bounded batches.
// Dependencies: sql-gate-core, rusqlite, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`SqliteExecutor`] maps each environment to one `SQLite` database file.
//! Every call opens a fresh read-only connection with `query_only` set, so the
//! engine refuses writes even if a statement slipped past validation.
//!
//! Execution runs on a blocking thread. The async [`RowCursor`] asks that
//! thread for one batch at a time, so at most one batch is ever buffered.
//! Dropping the cursor interrupts the running statement and closes the request
//! channel, which ends the thread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::InterruptHandle;
use rusqlite::OpenFlags;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde_json::Number;
use serde_json::Value;
use sql_gate_core::Environment;
use sql_gate_core::ExecutorError;
use sql_gate_core::PreparedQuery;
use sql_gate_core::QueryExecutor;
use sql_gate_core::Row;
use sql_gate_core::RowCursor;
use sql_gate_core::sql::TokenKind;
use sql_gate_core::sql::tokenize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Cost of a full table or index scan step.
const SCAN_COST: f64 = 10.0;
/// Cost of an index search step.
const SEARCH_COST: f64 = 1.0;
/// Cost of a temporary b-tree for sorting or grouping.
const TEMP_BTREE_COST: f64 = 2.0;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` executor.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteExecutorConfig {
    /// Database file per environment.
    #[serde(default)]
    pub databases: BTreeMap<Environment, PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for SqliteExecutorConfig {
    fn default() -> Self {
        Self {
            databases: BTreeMap::new(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` executor construction errors.
#[derive(Debug, Error)]
pub enum SqliteExecutorError {
    /// Executor I/O error.
    #[error("sqlite executor io error: {0}")]
    Io(String),
    /// Invalid executor configuration.
    #[error("sqlite executor invalid config: {0}")]
    Invalid(String),
}

/// Maps a `SQLite` error into the executor contract.
fn query_error(error: &rusqlite::Error) -> ExecutorError {
    if error.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
        ExecutorError::Interrupted
    } else {
        ExecutorError::Query(error.to_string())
    }
}

/// Maps a failed blocking task into the executor contract.
fn task_error(error: &tokio::task::JoinError) -> ExecutorError {
    ExecutorError::Unavailable(format!("sqlite task failed: {error}"))
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// `SQLite`-backed read-only query executor.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    /// Executor configuration.
    config: Arc<SqliteExecutorConfig>,
}

impl SqliteExecutor {
    /// Builds an executor after checking every configured database path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteExecutorError`] when a path is unusable.
    pub fn new(config: SqliteExecutorConfig) -> Result<Self, SqliteExecutorError> {
        for path in config.databases.values() {
            validate_database_path(path)?;
        }
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Returns the database path for an environment.
    fn database_path(&self, environment: Environment) -> Result<PathBuf, ExecutorError> {
        self.config.databases.get(&environment).cloned().ok_or_else(|| {
            ExecutorError::Unavailable(format!("no sqlite database configured for {environment}"))
        })
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn estimate_cost(&self, query: &PreparedQuery) -> Result<f64, ExecutorError> {
        let path = self.database_path(query.environment)?;
        let busy_timeout_ms = self.config.busy_timeout_ms;
        let sql = format!("EXPLAIN QUERY PLAN {}", statement_body(&query.text));
        tokio::task::spawn_blocking(move || {
            let connection = open_connection(&path, busy_timeout_ms, false)?;
            let mut statement = connection.prepare(&sql).map_err(|err| query_error(&err))?;
            let details = statement
                .query_map(params![], |row| row.get::<_, String>(3))
                .map_err(|err| query_error(&err))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| query_error(&err))?;
            Ok(plan_cost(&details))
        })
        .await
        .map_err(|err| task_error(&err))?
    }

    async fn open(&self, query: &PreparedQuery) -> Result<Box<dyn RowCursor>, ExecutorError> {
        let path = self.database_path(query.environment)?;
        let job = StatementJob {
            path,
            busy_timeout_ms: self.config.busy_timeout_ms,
            read_uncommitted: query.hints.read_uncommitted,
            sql: statement_body(&query.text).to_string(),
        };
        let (ready_tx, ready_rx) = oneshot::channel();
        let (request_tx, request_rx) = std_mpsc::channel();
        let (batch_tx, batch_rx) = mpsc::channel(1);
        tokio::task::spawn_blocking(move || job.run(ready_tx, &request_rx, &batch_tx));
        let opened = ready_rx.await.map_err(|_| ExecutorError::Interrupted)??;
        tracing::debug!(
            environment = %query.environment,
            columns = opened.columns.len(),
            "sqlite_statement_opened"
        );
        Ok(Box::new(SqliteCursor {
            columns: opened.columns,
            interrupt: opened.interrupt,
            requests: request_tx,
            batches: batch_rx,
            finished: false,
        }))
    }
}

// ============================================================================
// SECTION: Cursor
// ============================================================================

/// Statement metadata sent back once the statement is prepared.
struct Opened {
    /// Result column names.
    columns: Vec<String>,
    /// Handle used to interrupt the running statement.
    interrupt: InterruptHandle,
}

/// Messages from the statement thread to the cursor.
enum BatchEvent {
    /// Rows fetched for one request; `done` marks the end of the result.
    Rows {
        /// Fetched rows.
        rows: Vec<Row>,
        /// No rows remain.
        done: bool,
    },
    /// The engine failed mid-stream.
    Failed(ExecutorError),
}

/// Cursor over a statement running on a blocking thread.
struct SqliteCursor {
    /// Result column names.
    columns: Vec<String>,
    /// Interrupts the statement on drop.
    interrupt: InterruptHandle,
    /// Batch-size requests to the statement thread.
    requests: std_mpsc::Sender<usize>,
    /// Batches from the statement thread.
    batches: mpsc::Receiver<BatchEvent>,
    /// The result has been fully consumed.
    finished: bool,
}

#[async_trait]
impl RowCursor for SqliteCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>, ExecutorError> {
        if self.finished || max_rows == 0 {
            return Ok(None);
        }
        // A closed request channel still leaves any buffered failure to read.
        let _ = self.requests.send(max_rows);
        match self.batches.recv().await {
            Some(BatchEvent::Rows {
                rows,
                done,
            }) => {
                self.finished = done;
                if rows.is_empty() { Ok(None) } else { Ok(Some(rows)) }
            }
            Some(BatchEvent::Failed(error)) => {
                self.finished = true;
                Err(error)
            }
            None => {
                self.finished = true;
                Err(ExecutorError::Interrupted)
            }
        }
    }
}

impl Drop for SqliteCursor {
    fn drop(&mut self) {
        if !self.finished {
            self.interrupt.interrupt();
        }
    }
}

// ============================================================================
// SECTION: Statement Thread
// ============================================================================

/// Everything the statement thread needs to run one query.
struct StatementJob {
    /// Database file.
    path: PathBuf,
    /// Busy timeout in milliseconds.
    busy_timeout_ms: u64,
    /// Read without shared-cache locks.
    read_uncommitted: bool,
    /// Statement text.
    sql: String,
}

impl StatementJob {
    /// Prepares the statement and serves batch requests until done or dropped.
    fn run(
        self,
        ready: oneshot::Sender<Result<Opened, ExecutorError>>,
        requests: &std_mpsc::Receiver<usize>,
        batches: &mpsc::Sender<BatchEvent>,
    ) {
        let connection = match open_connection(&self.path, self.busy_timeout_ms, self.read_uncommitted)
        {
            Ok(connection) => connection,
            Err(error) => {
                let _ = ready.send(Err(error));
                return;
            }
        };
        let mut statement = match connection.prepare(&self.sql) {
            Ok(statement) => statement,
            Err(error) => {
                let _ = ready.send(Err(query_error(&error)));
                return;
            }
        };
        let columns: Vec<String> =
            statement.column_names().into_iter().map(ToString::to_string).collect();
        let opened = Opened {
            columns: columns.clone(),
            interrupt: connection.get_interrupt_handle(),
        };
        if ready.send(Ok(opened)).is_err() {
            return;
        }
        let mut rows = match statement.query(params![]) {
            Ok(rows) => rows,
            Err(error) => {
                let _ = batches.blocking_send(BatchEvent::Failed(query_error(&error)));
                return;
            }
        };
        while let Ok(max_rows) = requests.recv() {
            let mut batch = Vec::with_capacity(max_rows.min(1_024));
            let mut done = false;
            while batch.len() < max_rows {
                match rows.next() {
                    Ok(Some(row)) => batch.push(convert_row(&columns, row)),
                    Ok(None) => {
                        done = true;
                        break;
                    }
                    Err(error) => {
                        let _ = batches.blocking_send(BatchEvent::Failed(query_error(&error)));
                        return;
                    }
                }
            }
            if batches
                .blocking_send(BatchEvent::Rows {
                    rows: batch,
                    done,
                })
                .is_err()
                || done
            {
                return;
            }
        }
    }
}

/// Converts an engine row into a JSON row.
fn convert_row(columns: &[String], row: &rusqlite::Row<'_>) -> Row {
    let mut output = Row::new();
    for (idx, name) in columns.iter().enumerate() {
        let value = row.get_ref(idx).map_or(Value::Null, convert_value);
        output.insert(name.clone(), value);
    }
    output
}

/// Converts an engine value into JSON.
fn convert_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("0x");
            for byte in bytes {
                let _ = write!(hex, "{byte:02x}");
            }
            Value::String(hex)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Sums the cost of `EXPLAIN QUERY PLAN` detail lines.
///
/// Full scans weigh more than index searches; constant rows are free.
#[must_use]
pub fn plan_cost(details: &[String]) -> f64 {
    details
        .iter()
        .map(|detail| {
            let detail = detail.trim_start();
            if detail.contains("CONSTANT ROW") {
                0.0
            } else if detail.starts_with("SCAN") {
                SCAN_COST
            } else if detail.starts_with("SEARCH") {
                SEARCH_COST
            } else if detail.starts_with("USE TEMP B-TREE") {
                TEMP_BTREE_COST
            } else {
                0.0
            }
        })
        .sum()
}

/// Returns the statement text without its trailing semicolon and comments.
fn statement_body(text: &str) -> &str {
    let Ok(tokens) = tokenize(text) else {
        return text;
    };
    tokens
        .iter()
        .rev()
        .find(|token| token.kind == TokenKind::Semicolon)
        .map_or(text, |token| &text[..token.offset])
}

/// Opens a read-only `SQLite` connection.
fn open_connection(
    path: &Path,
    busy_timeout_ms: u64,
    read_uncommitted: bool,
) -> Result<Connection, ExecutorError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| ExecutorError::Unavailable(err.to_string()))?;
    connection
        .execute_batch("PRAGMA query_only = ON;")
        .map_err(|err| ExecutorError::Unavailable(err.to_string()))?;
    if read_uncommitted {
        connection
            .execute_batch("PRAGMA read_uncommitted = ON;")
            .map_err(|err| ExecutorError::Unavailable(err.to_string()))?;
    }
    connection
        .busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(|err| ExecutorError::Unavailable(err.to_string()))?;
    Ok(connection)
}

/// Validates database paths for safety limits.
fn validate_database_path(path: &Path) -> Result<(), SqliteExecutorError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteExecutorError::Invalid("database path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteExecutorError::Invalid(
                "database path contains an overlong component".to_string(),
            ));
        }
    }
    let metadata = std::fs::metadata(path)
        .map_err(|err| SqliteExecutorError::Io(format!("{path_string}: {err}")))?;
    if !metadata.is_file() {
        return Err(SqliteExecutorError::Invalid(format!(
            "database path must be a file: {path_string}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
