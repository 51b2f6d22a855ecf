// crates/sql-gate-core/src/core/envelope.rs
// ============================================================================
// Module: SQL Gate Result Envelope
// Description: Caller-visible response shape for gateway requests.
// Purpose: Serialize success and failure outcomes uniformly.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every gateway invocation produces exactly one [`ResultEnvelope`]. Failures
//! carry an [`ErrorCategory`] and a generic message; raw engine errors never
//! appear here and are only written, redacted, to the audit record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::review::ReviewResult;
use crate::interfaces::Row;

// ============================================================================
// SECTION: Error Categories
// ============================================================================

/// Caller-visible failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Structural validation or pagination failed.
    ValidationError,
    /// Plan cost exceeded the environment threshold.
    CostExceeded,
    /// The cost estimate could not be obtained.
    CostCheckUnavailable,
    /// No concurrency slot was available.
    ConcurrencyExhausted,
    /// The review produced blocking findings.
    BlockingFindings,
    /// The engine reported an error while executing.
    ExecutionError,
    /// A deadline elapsed.
    TimeoutError,
}

impl ErrorCategory {
    /// Returns the stable label for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::CostExceeded => "CostExceeded",
            Self::CostCheckUnavailable => "CostCheckUnavailable",
            Self::ConcurrencyExhausted => "ConcurrencyExhausted",
            Self::BlockingFindings => "BlockingFindings",
            Self::ExecutionError => "ExecutionError",
            Self::TimeoutError => "TimeoutError",
        }
    }

    /// Returns the generic caller-facing message.
    #[must_use]
    pub const fn generic_message(self) -> &'static str {
        match self {
            Self::ValidationError => "query failed validation",
            Self::CostExceeded => "query plan cost exceeds the environment threshold",
            Self::CostCheckUnavailable => "query cost could not be verified",
            Self::ConcurrencyExhausted => "too many concurrent queries; retry later",
            Self::BlockingFindings => "query review found blocking issues",
            Self::ExecutionError => "query execution failed",
            Self::TimeoutError => "query timed out",
        }
    }
}

// ============================================================================
// SECTION: Envelope Parts
// ============================================================================

/// Warning code attached to successful envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCode {
    /// The result was cut at the row cap.
    RowLimitExceeded,
    /// The payload cap forced field truncation.
    PayloadLimitExceeded,
    /// One or more fields exceeded the per-field cap.
    FieldTruncated,
    /// The review produced non-blocking findings.
    ReviewFindings,
}

/// Envelope warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeWarning {
    /// Warning code.
    pub code: WarningCode,
    /// Human-readable message.
    pub message: String,
}

/// Truncation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationFlags {
    /// More rows existed than the row cap allowed.
    pub row_limit_exceeded: bool,
    /// The cumulative payload reached the payload cap.
    pub payload_limit_exceeded: bool,
    /// At least one field was truncated.
    pub fields_truncated: bool,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page number (1-based).
    pub page: u32,
    /// Page size.
    pub page_size: u32,
    /// Row offset of the page within the capped result.
    pub offset: usize,
    /// Rows exist beyond this page.
    pub has_more: bool,
    /// Rows in the capped result.
    pub total_rows: usize,
}

/// Cost gate diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostDiagnostics {
    /// Plan cost estimate when obtained.
    pub estimate: Option<f64>,
    /// Environment threshold.
    pub threshold: f64,
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Gateway response.
///
/// # Invariants
/// - `success == false` implies `error` is set and `data` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Request outcome.
    pub success: bool,
    /// Rows for the requested page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    /// Rows in `data`.
    pub row_count: usize,
    /// Wall time spent in the gateway.
    pub execution_time_ms: u64,
    /// Non-fatal warnings.
    #[serde(default)]
    pub warnings: Vec<EnvelopeWarning>,
    /// Review summary when the analyzer ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_summary: Option<ReviewResult>,
    /// Columns with at least one truncated value, in first-seen order.
    #[serde(default)]
    pub truncated_fields: Vec<String>,
    /// Truncation flags.
    #[serde(default)]
    pub truncation: TruncationFlags,
    /// Pagination metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCategory>,
    /// Generic failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Violation or blocking rule codes.
    #[serde(default)]
    pub blocking_violations: Vec<String>,
    /// Cost diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostDiagnostics>,
}

impl ResultEnvelope {
    /// Builds a failed envelope for a category.
    #[must_use]
    pub fn failure(category: ErrorCategory, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            row_count: 0,
            execution_time_ms,
            warnings: Vec::new(),
            review_summary: None,
            truncated_fields: Vec::new(),
            truncation: TruncationFlags::default(),
            pagination: None,
            error: Some(category),
            message: Some(category.generic_message().to_string()),
            blocking_violations: Vec::new(),
            cost: None,
        }
    }

    /// Builds a successful envelope for the given rows.
    #[must_use]
    pub fn success(rows: Vec<Row>, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            row_count: rows.len(),
            data: Some(rows),
            execution_time_ms,
            warnings: Vec::new(),
            review_summary: None,
            truncated_fields: Vec::new(),
            truncation: TruncationFlags::default(),
            pagination: None,
            error: None,
            message: None,
            blocking_violations: Vec::new(),
            cost: None,
        }
    }
}
