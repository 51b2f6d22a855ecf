// crates/sql-gate-mcp/src/error.rs
// ============================================================================
// Module: Gateway Errors
// Description: Stage failures raised while handling a query request.
// Purpose: Map every pipeline failure onto a caller-visible category.
// Dependencies: sql-gate-core, thiserror
// ============================================================================

//! ## Overview
//! [`GatewayError`] is the internal failure type of the request pipeline. It
//! carries the detail needed for audit records; callers only ever see the
//! [`ErrorCategory`] and its generic message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use sql_gate_core::Environment;
use sql_gate_core::ErrorCategory;
use sql_gate_core::RuleId;
use sql_gate_core::ViolationCode;
use thiserror::Error;

use crate::audit::AuditOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Pipeline phase whose deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Waiting for a concurrency slot in queue mode.
    ThrottleWait,
    /// Executing the query and fetching rows.
    Execution,
}

impl TimeoutPhase {
    /// Returns the stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThrottleWait => "throttle_wait",
            Self::Execution => "execution",
        }
    }
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request pipeline failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Structural validation or pagination failed.
    #[error("query rejected: {}", join_codes(.0))]
    Validation(Vec<ViolationCode>),
    /// Plan cost exceeded the environment threshold.
    #[error("plan cost {estimate} exceeds threshold {threshold}")]
    CostExceeded {
        /// Estimate returned by the executor.
        estimate: f64,
        /// Environment threshold.
        threshold: f64,
    },
    /// The cost estimate failed or timed out.
    #[error("cost check unavailable: {0}")]
    CostCheckUnavailable(String),
    /// No concurrency slot was free.
    #[error("concurrency exhausted in {0}")]
    ConcurrencyExhausted(Environment),
    /// The analyzer reported blocking findings.
    #[error("blocking findings: {}", join_rules(.0))]
    BlockingFindings(Vec<RuleId>),
    /// The engine failed while executing.
    #[error("execution failed: {0}")]
    Execution(String),
    /// A deadline elapsed.
    #[error("timed out during {0}")]
    Timeout(TimeoutPhase),
}

impl GatewayError {
    /// Returns the caller-visible category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::ValidationError,
            Self::CostExceeded {
                ..
            } => ErrorCategory::CostExceeded,
            Self::CostCheckUnavailable(_) => ErrorCategory::CostCheckUnavailable,
            Self::ConcurrencyExhausted(_) => ErrorCategory::ConcurrencyExhausted,
            Self::BlockingFindings(_) => ErrorCategory::BlockingFindings,
            Self::Execution(_) => ErrorCategory::ExecutionError,
            Self::Timeout(_) => ErrorCategory::TimeoutError,
        }
    }

    /// Returns the audit outcome for the failure.
    #[must_use]
    pub const fn outcome(&self) -> AuditOutcome {
        match self {
            Self::Validation(_)
            | Self::CostExceeded {
                ..
            }
            | Self::ConcurrencyExhausted(_)
            | Self::BlockingFindings(_) => AuditOutcome::Rejected,
            Self::CostCheckUnavailable(_) | Self::Execution(_) => AuditOutcome::Error,
            Self::Timeout(_) => AuditOutcome::Timeout,
        }
    }

    /// Returns violation codes or blocking rule ids, in reported order.
    #[must_use]
    pub fn violation_codes(&self) -> Vec<String> {
        match self {
            Self::Validation(codes) => codes.iter().map(|code| code.as_str().to_string()).collect(),
            Self::BlockingFindings(rules) => {
                rules.iter().map(|rule| rule.as_str().to_string()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Gateway construction failures.
#[derive(Debug, Error)]
pub enum GatewayInitError {
    /// Configuration was rejected.
    #[error("gateway config error: {0}")]
    Config(String),
    /// Redaction patterns failed to compile.
    #[error("gateway redaction error: {0}")]
    Redaction(String),
}

/// Joins violation codes for display.
fn join_codes(codes: &[ViolationCode]) -> String {
    codes.iter().map(|code| code.as_str()).collect::<Vec<_>>().join(", ")
}

/// Joins rule ids for display.
fn join_rules(rules: &[RuleId]) -> String {
    rules.iter().map(RuleId::as_str).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use sql_gate_core::ErrorCategory;
    use sql_gate_core::RuleId;
    use sql_gate_core::ViolationCode;

    use super::GatewayError;
    use super::TimeoutPhase;
    use crate::audit::AuditOutcome;

    #[test]
    fn throttle_wait_timeout_is_a_timeout_error() {
        let error = GatewayError::Timeout(TimeoutPhase::ThrottleWait);
        assert_eq!(error.category(), ErrorCategory::TimeoutError);
        assert_eq!(error.outcome(), AuditOutcome::Timeout);
        assert_eq!(error.to_string(), "timed out during throttle_wait");
    }

    #[test]
    fn codes_are_reported_in_order() {
        let error = GatewayError::Validation(vec![
            ViolationCode::WriteOperationBlocked,
            ViolationCode::DangerousConstruct,
        ]);
        assert_eq!(error.violation_codes(), vec!["WriteOperationBlocked", "DangerousConstruct"]);
        assert_eq!(error.to_string(), "query rejected: WriteOperationBlocked, DangerousConstruct");

        let blocked = GatewayError::BlockingFindings(vec![RuleId::new("BP017")]);
        assert_eq!(blocked.violation_codes(), vec!["BP017"]);
        assert_eq!(blocked.outcome(), AuditOutcome::Rejected);
    }

    #[test]
    fn collaborator_failures_are_errors() {
        assert_eq!(
            GatewayError::CostCheckUnavailable("down".to_string()).outcome(),
            AuditOutcome::Error
        );
        assert_eq!(
            GatewayError::Execution("deadlock".to_string()).category(),
            ErrorCategory::ExecutionError
        );
    }
}
