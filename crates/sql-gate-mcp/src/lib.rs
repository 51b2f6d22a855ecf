// crates/sql-gate-mcp/src/lib.rs
// ============================================================================
// Module: SQL Gate MCP Library
// Description: Gateway pipeline and MCP server for read-only SQL access.
// Purpose: Gate assistant-issued queries before they reach a database engine.
// Dependencies: sql-gate-core, sql-gate-config, sql-gate-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! `sql-gate-mcp` hosts the [`Gateway`] orchestrator and the JSON-RPC server
//! that exposes it as MCP tools. The gateway sequences structural validation,
//! plan-cost admission, per-environment throttling, best-practices review,
//! execution, and result shaping, and writes one audit record per request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod cost;
pub mod error;
pub mod gateway;
pub mod server;
pub mod shaping;
pub mod telemetry;
pub mod throttle;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditError;
pub use audit::AuditLogger;
pub use audit::AuditOutcome;
pub use audit::AuditRecord;
pub use audit::AuditSink;
pub use audit::DailyFileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use error::GatewayError;
pub use error::GatewayInitError;
pub use error::TimeoutPhase;
pub use gateway::Gateway;
pub use gateway::QueryReview;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::UnconfiguredExecutor;
pub use telemetry::DecisionEvent;
pub use telemetry::GatewayMetrics;
pub use telemetry::NoopMetrics;
pub use throttle::Throttle;
pub use throttle::ThrottleError;
pub use throttle::ThrottlePermit;
pub use throttle::ThrottleStats;
pub use throttle::WaitPolicy;
pub use tools::ToolRouter;
