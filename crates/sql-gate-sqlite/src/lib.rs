// crates/sql-gate-sqlite/src/lib.rs
// ============================================================================
// Module: SQL Gate SQLite Library
// Description: SQLite-backed execution collaborator for SQL Gate.
// Purpose: Provide a read-only QueryExecutor with plan-cost estimates.
// Dependencies: sql-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate implements [`sql_gate_core::QueryExecutor`] over `SQLite` files,
//! one per environment. Connections are opened read-only, plan cost comes from
//! `EXPLAIN QUERY PLAN`, and rows stream to the gateway in bounded batches.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod executor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use executor::SqliteExecutor;
pub use executor::SqliteExecutorConfig;
pub use executor::SqliteExecutorError;
pub use executor::plan_cost;
