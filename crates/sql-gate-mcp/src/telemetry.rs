// crates/sql-gate-mcp/src/telemetry.rs
// ============================================================================
// Module: Gateway Telemetry
// Description: Metric hooks for gateway decisions and latency.
// Purpose: Provide decision counters and latency buckets without hard deps.
// Dependencies: sql-gate-core
// ============================================================================

//! ## Overview
//! A thin metrics interface for gateway decision counters and latency
//! histograms. Deployments plug in their own exporter; the default sink
//! discards everything. Labels are closed enums so query text and caller
//! data never reach a metric label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use sql_gate_core::Environment;
use sql_gate_core::ErrorCategory;

use crate::audit::AuditOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for gateway histograms.
pub const LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Events
// ============================================================================

/// Labels for one gateway decision.
///
/// # Invariants
/// - `error` is set iff `outcome` is not [`AuditOutcome::Executed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionEvent {
    /// Target environment.
    pub environment: Environment,
    /// Request outcome.
    pub outcome: AuditOutcome,
    /// Failure category when the request failed.
    pub error: Option<ErrorCategory>,
}

/// Metrics sink interface for gateway decisions.
pub trait GatewayMetrics: Send + Sync {
    /// Records a decision counter event.
    fn record_decision(&self, event: DecisionEvent);
    /// Records the end-to-end latency of the request.
    fn record_latency(&self, event: DecisionEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl GatewayMetrics for NoopMetrics {
    fn record_decision(&self, _event: DecisionEvent) {}

    fn record_latency(&self, _event: DecisionEvent, _latency: Duration) {}
}

/// Returns the upper bound of the latency bucket for `latency`.
///
/// Latencies beyond the last bucket report `None` (the overflow bucket).
#[must_use]
pub fn latency_bucket(latency: Duration) -> Option<u64> {
    let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    LATENCY_BUCKETS_MS.iter().copied().find(|bound| millis <= *bound)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
