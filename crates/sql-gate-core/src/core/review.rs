// crates/sql-gate-core/src/core/review.rs
// ============================================================================
// Module: SQL Gate Review Types
// Description: Severity, finding, and review result payloads.
// Purpose: Shared output types for the best-practices analyzer.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Review output is deterministic: findings appear in registry order, the risk
//! score is the clipped sum of severity weights, and the status follows the
//! highest severity present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RuleId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound of the risk score.
pub const MAX_RISK_SCORE: u8 = 100;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Finding severity.
///
/// # Invariants
/// - Ordering is `Info < Warning < Blocking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Advisory only.
    Info,
    /// Likely performance or correctness issue.
    Warning,
    /// Query must not execute.
    Blocking,
}

impl Severity {
    /// Returns the risk weight contributed by one finding.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Info => 5,
            Self::Warning => 15,
            Self::Blocking => 100,
        }
    }

    /// Returns the stable label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Blocking => "blocking",
        }
    }
}

/// Rule category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Data exposure or privilege concerns.
    Security,
    /// Plan quality concerns.
    Performance,
    /// Readability and maintainability concerns.
    BestPractice,
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Single rule match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Rule that matched.
    pub rule_id: RuleId,
    /// Rule category.
    pub category: RuleCategory,
    /// Effective severity.
    pub severity: Severity,
    /// Short description of the issue.
    pub title: String,
    /// Suggested remedy.
    pub recommendation: String,
}

/// Overall review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// No findings.
    Pass,
    /// Only info or warning findings.
    Warn,
    /// At least one blocking finding.
    Block,
}

/// Analyzer output.
///
/// # Invariants
/// - `risk_score` is at most [`MAX_RISK_SCORE`].
/// - `status` is [`ReviewStatus::Block`] iff a blocking finding is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Overall status.
    pub status: ReviewStatus,
    /// Clipped risk score.
    pub risk_score: u8,
    /// Findings in registry order.
    pub findings: Vec<Finding>,
}

impl ReviewResult {
    /// Builds a result from ordered findings.
    #[must_use]
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let total: u32 = findings.iter().map(|finding| u32::from(finding.severity.weight())).sum();
        let risk_score = u8::try_from(total.min(u32::from(MAX_RISK_SCORE))).unwrap_or(MAX_RISK_SCORE);
        let status = match findings.iter().map(|finding| finding.severity).max() {
            Some(Severity::Blocking) => ReviewStatus::Block,
            Some(Severity::Warning | Severity::Info) => ReviewStatus::Warn,
            None => ReviewStatus::Pass,
        };
        Self {
            status,
            risk_score,
            findings,
        }
    }

    /// Returns the ids of blocking findings.
    #[must_use]
    pub fn blocking_rules(&self) -> Vec<RuleId> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Blocking)
            .map(|finding| finding.rule_id.clone())
            .collect()
    }

    /// Returns true when the review blocks execution.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status == ReviewStatus::Block
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Finding;
    use super::ReviewResult;
    use super::ReviewStatus;
    use super::RuleCategory;
    use super::Severity;
    use crate::core::identifiers::RuleId;

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding {
            rule_id: RuleId::new(id),
            category: RuleCategory::Performance,
            severity,
            title: String::new(),
            recommendation: String::new(),
        }
    }

    #[test]
    fn empty_review_passes_with_zero_score() {
        let result = ReviewResult::from_findings(Vec::new());
        assert_eq!(result.status, ReviewStatus::Pass);
        assert_eq!(result.risk_score, 0);
    }

    #[test]
    fn info_only_review_warns() {
        let result = ReviewResult::from_findings(vec![finding("I", Severity::Info)]);
        assert_eq!(result.status, ReviewStatus::Warn);
        assert_eq!(result.risk_score, 5);
    }

    #[test]
    fn score_sums_weights_and_clips() {
        let result = ReviewResult::from_findings(vec![
            finding("A", Severity::Warning),
            finding("B", Severity::Info),
        ]);
        assert_eq!(result.risk_score, 20);
        assert_eq!(result.status, ReviewStatus::Warn);

        let many = (0..10).map(|idx| finding(&format!("W{idx}"), Severity::Warning)).collect();
        assert_eq!(ReviewResult::from_findings(many).risk_score, 100);
    }

    #[test]
    fn blocking_finding_sets_block_status() {
        let result = ReviewResult::from_findings(vec![
            finding("A", Severity::Info),
            finding("SEC", Severity::Blocking),
        ]);
        assert!(result.is_blocked());
        assert_eq!(result.blocking_rules(), vec![RuleId::new("SEC")]);
        assert_eq!(result.risk_score, 100);
    }
}
