// crates/sql-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: SQL Gate Interfaces
// Description: Backend-agnostic execution collaborator contracts.
// Purpose: Define the seam between the gateway and a database engine.
// Dependencies: async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The gateway never talks to a database directly. It hands a
//! [`PreparedQuery`] to a [`QueryExecutor`], which estimates plan cost and
//! opens a [`RowCursor`] that yields rows in bounded batches. Dropping a cursor
//! must cancel any in-flight engine work.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::environment::Environment;
use crate::core::environment::ResourceHints;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Row mapping column names to JSON values.
pub type Row = Map<String, Value>;

/// Query admitted for cost estimation and execution.
///
/// # Invariants
/// - `text` already passed structural validation; hint clauses may be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    /// Final query text sent to the engine.
    pub text: String,
    /// Target environment.
    pub environment: Environment,
    /// Target database when supplied.
    pub database: Option<String>,
    /// Resource hints for the engine.
    pub hints: ResourceHints,
    /// Execution deadline.
    pub timeout: Duration,
}

/// Execution collaborator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// No connection is available for the target.
    #[error("executor unavailable: {0}")]
    Unavailable(String),
    /// The engine rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),
    /// Execution was interrupted.
    #[error("query interrupted")]
    Interrupted,
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Database execution collaborator.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Returns the engine's plan-cost estimate for the query.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the estimate cannot be produced.
    async fn estimate_cost(&self, query: &PreparedQuery) -> Result<f64, ExecutorError>;

    /// Starts executing the query and returns a row cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when execution cannot start.
    async fn open(&self, query: &PreparedQuery) -> Result<Box<dyn RowCursor>, ExecutorError>;
}

/// Incremental row source.
#[async_trait]
pub trait RowCursor: Send {
    /// Returns the column names in result order.
    fn columns(&self) -> &[String];

    /// Fetches up to `max_rows` rows; `None` marks the end of the result.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the engine fails mid-stream.
    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>, ExecutorError>;
}
