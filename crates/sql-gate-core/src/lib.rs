// crates/sql-gate-core/src/lib.rs
// ============================================================================
// Module: SQL Gate Core Library
// Description: Public API surface for the SQL Gate core.
// Purpose: Expose core types, query checks, redaction, and executor interfaces.
// Dependencies: crate::{core, interfaces, redaction, sql}
// ============================================================================

//! ## Overview
//! SQL Gate core holds the engine-independent half of the query safety
//! gateway: the request and envelope types, environment profiles, the lexer
//! backed structural validator, the rule registry and best-practices analyzer,
//! audit redaction, and the [`QueryExecutor`] seam that database backends
//! implement.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod redaction;
pub mod sql;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ExecutorError;
pub use interfaces::PreparedQuery;
pub use interfaces::QueryExecutor;
pub use interfaces::Row;
pub use interfaces::RowCursor;
pub use redaction::RedactionError;
pub use redaction::Redactor;
pub use sql::Analyzer;
pub use sql::DatabasePolicy;
pub use sql::HintDialect;
pub use sql::QuoteStyle;
pub use sql::RuleRegistry;
pub use sql::StructuralValidator;
pub use sql::ValidatedQuery;
pub use sql::ValidationError;
pub use sql::ValidationVerdict;
pub use sql::ViolationCode;
