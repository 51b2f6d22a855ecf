// crates/sql-gate-mcp/tests/common/mod.rs
// =============================================================================
// Module: Gateway Test Helpers
// Description: Scriptable executor and gateway harness for integration tests.
// Purpose: Drive the gateway pipeline without a database engine.
// =============================================================================

#![allow(
    dead_code,
    clippy::expect_used,
    reason = "Test helpers are selectively used across suites."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use sql_gate_config::SqlGateConfig;
use sql_gate_core::ExecutorError;
use sql_gate_core::PreparedQuery;
use sql_gate_core::QueryExecutor;
use sql_gate_core::Row;
use sql_gate_core::RowCursor;
use sql_gate_mcp::Gateway;
use sql_gate_mcp::MemoryAuditSink;
use tokio::sync::Semaphore;

// ============================================================================
// SECTION: Mock Executor
// ============================================================================

/// Scriptable execution collaborator with call counters.
pub struct MockExecutor {
    /// Cost estimate result.
    cost: Result<f64, ExecutorError>,
    /// Delay before the estimate returns.
    cost_delay: Duration,
    /// Rows returned by every execution.
    rows: Vec<Row>,
    /// Delay before a cursor opens.
    open_delay: Duration,
    /// Error returned instead of a cursor.
    open_error: Option<ExecutorError>,
    /// Gate each execution waits on before opening.
    gate: Option<Arc<Semaphore>>,
    /// Estimate calls made.
    pub estimate_calls: AtomicUsize,
    /// Execution calls made.
    pub open_calls: AtomicUsize,
    /// Executions currently inside `open`.
    active: AtomicUsize,
    /// Highest number of simultaneous executions observed.
    pub peak_active: AtomicUsize,
    /// Last query text seen by the executor.
    pub last_text: std::sync::Mutex<Option<String>>,
}

impl MockExecutor {
    /// Builds an executor returning `rows` at cost 1.0.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            cost: Ok(1.0),
            cost_delay: Duration::ZERO,
            rows,
            open_delay: Duration::ZERO,
            open_error: None,
            gate: None,
            estimate_calls: AtomicUsize::new(0),
            open_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            last_text: std::sync::Mutex::new(None),
        }
    }

    /// Sets the cost estimate.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Ok(cost);
        self
    }

    /// Makes the cost estimate fail.
    pub fn with_cost_error(mut self, error: ExecutorError) -> Self {
        self.cost = Err(error);
        self
    }

    /// Delays the cost estimate.
    pub fn with_cost_delay(mut self, delay: Duration) -> Self {
        self.cost_delay = delay;
        self
    }

    /// Delays execution.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Makes execution fail.
    pub fn with_open_error(mut self, error: ExecutorError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Holds each execution until the gate hands out a permit.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Total collaborator calls.
    pub fn calls(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst) + self.open_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn estimate_cost(&self, _query: &PreparedQuery) -> Result<f64, ExecutorError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.cost_delay.is_zero() {
            tokio::time::sleep(self.cost_delay).await;
        }
        self.cost.clone()
    }

    async fn open(&self, query: &PreparedQuery) -> Result<Box<dyn RowCursor>, ExecutorError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().expect("last text lock") = Some(query.text.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(active, Ordering::SeqCst);
        let held = self.hold().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        held?;
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }
        let columns = self.rows.first().map(|row| row.keys().cloned().collect()).unwrap_or_default();
        Ok(Box::new(MockCursor {
            columns,
            rows: self.rows.iter().cloned().collect(),
        }))
    }
}

impl MockExecutor {
    /// Waits on the gate and the configured delay.
    async fn hold(&self) -> Result<(), ExecutorError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| ExecutorError::Interrupted)?.forget();
        }
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        Ok(())
    }
}

/// Cursor over canned rows.
struct MockCursor {
    /// Column names.
    columns: Vec<String>,
    /// Rows not yet fetched.
    rows: VecDeque<Row>,
}

#[async_trait]
impl RowCursor for MockCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>, ExecutorError> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        let take = max_rows.min(self.rows.len());
        Ok(Some(self.rows.drain(..take).collect()))
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Gateway wired to a mock executor and an in-memory audit sink.
pub struct Harness {
    /// Gateway under test.
    pub gateway: Arc<Gateway>,
    /// Execution collaborator.
    pub executor: Arc<MockExecutor>,
    /// Audit records.
    pub audit: Arc<MemoryAuditSink>,
}

/// Parses a TOML string into a `SqlGateConfig`.
pub fn config_from_toml(toml_str: &str) -> SqlGateConfig {
    toml::from_str(toml_str).expect("test config parses")
}

/// Builds a harness from TOML configuration.
pub fn harness(toml_str: &str, executor: MockExecutor) -> Harness {
    let config = config_from_toml(toml_str);
    let executor = Arc::new(executor);
    let audit = Arc::new(MemoryAuditSink::new());
    let gateway = Gateway::from_config(&config, executor.clone(), Box::new(Arc::clone(&audit)))
        .expect("gateway builds");
    Harness {
        gateway: Arc::new(gateway),
        executor,
        audit,
    }
}

/// Builds `count` rows of `{id, name}`.
pub fn user_rows(count: usize) -> Vec<Row> {
    (1..=count)
        .map(|id| {
            let mut row = Map::new();
            row.insert("id".to_string(), json!(id));
            row.insert("name".to_string(), Value::String(format!("user-{id}")));
            row
        })
        .collect()
}

/// Yields until `check` holds.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(check(), "condition not reached");
}
