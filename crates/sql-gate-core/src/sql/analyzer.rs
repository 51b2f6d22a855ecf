// crates/sql-gate-core/src/sql/analyzer.rs
// ============================================================================
// Module: Best-Practices Analyzer
// Description: Deterministic rule evaluation and risk scoring.
// Purpose: Review validated queries and decide pass, warn, or block.
// Dependencies: crate::core, crate::sql::{lexer, rules, shape}
// ============================================================================

//! ## Overview
//! The analyzer evaluates every active rule of a [`RuleRegistry`] against a
//! [`QueryShape`] in registry order. Each rule reports at most one finding.
//! The result is a pure function of the token stream and the registry, so the
//! same query always produces the same findings, score, and status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::review::ReviewResult;
use crate::sql::lexer::LexError;
use crate::sql::lexer::Token;
use crate::sql::lexer::tokenize;
use crate::sql::rules::Rule;
use crate::sql::rules::RuleRegistry;
use crate::sql::shape::QueryShape;

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Best-practices analyzer.
#[derive(Debug, Clone)]
pub struct Analyzer {
    /// Active rules.
    registry: Arc<RuleRegistry>,
}

impl Analyzer {
    /// Builds an analyzer over a registry.
    #[must_use]
    pub const fn new(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Reviews a token stream.
    #[must_use]
    pub fn review(&self, tokens: &[Token<'_>]) -> ReviewResult {
        let shape = QueryShape::new(tokens);
        let findings = self
            .registry
            .rules()
            .iter()
            .filter(|rule| rule.kind.matches(&shape))
            .map(Rule::finding)
            .collect();
        ReviewResult::from_findings(findings)
    }

    /// Tokenizes and reviews query text.
    ///
    /// # Errors
    ///
    /// Returns [`LexError`] when the text cannot be tokenized.
    pub fn review_text(&self, text: &str) -> Result<ReviewResult, LexError> {
        let tokens = tokenize(text)?;
        Ok(self.review(&tokens))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Arc::new(RuleRegistry::builtin()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only review assertions.")]

    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::Analyzer;
    use crate::core::review::ReviewStatus;
    use crate::core::review::Severity;
    use crate::sql::rules::RuleRegistry;

    fn ids(result: &crate::core::review::ReviewResult) -> Vec<&str> {
        result.findings.iter().map(|finding| finding.rule_id.as_str()).collect()
    }

    #[test]
    fn select_star_without_schema_warns() {
        let result = Analyzer::default().review_text("SELECT * FROM Users").expect("review");
        assert_eq!(ids(&result), vec!["BP001", "BP002", "BP021"]);
        assert_eq!(result.status, ReviewStatus::Warn);
        assert_eq!(result.risk_score, 25);
    }

    #[test]
    fn clean_query_passes() {
        let result = Analyzer::default()
            .review_text("SELECT TOP 10 id, name FROM dbo.Users WHERE id = 7")
            .expect("review");
        assert!(result.findings.is_empty());
        assert_eq!(result.status, ReviewStatus::Pass);
        assert_eq!(result.risk_score, 0);
    }

    #[test]
    fn scalar_function_and_info_findings_warn() {
        let result = Analyzer::default().review_text("SELECT dbo.fn(x) FROM dbo.t").expect("review");
        assert_eq!(ids(&result), vec!["BP009", "BP021"]);
        assert_eq!(result.status, ReviewStatus::Warn);
        assert_eq!(result.risk_score, 20);

        let info_only = Analyzer::default().review_text("SELECT id FROM dbo.t").expect("review");
        assert_eq!(ids(&info_only), vec!["BP021"]);
        assert_eq!(info_only.status, ReviewStatus::Warn);
    }

    #[test]
    fn credential_catalog_blocks() {
        let result = Analyzer::default()
            .review_text("SELECT TOP 1 name FROM sys.sql_logins")
            .expect("review");
        assert_eq!(result.status, ReviewStatus::Block);
        assert_eq!(result.risk_score, 100);
    }

    #[test]
    fn review_is_deterministic() {
        let analyzer = Analyzer::default();
        let sql = "SELECT DISTINCT a FROM t1, t2 WHERE a = 'x' OR UPPER(b) = 'Y' UNION SELECT a FROM t3";
        let first = analyzer.review_text(sql).expect("review");
        for _ in 0..10 {
            assert_eq!(analyzer.review_text(sql).expect("review"), first);
        }
        assert_eq!(
            ids(&first),
            vec!["BP002", "BP003", "BP004", "BP005", "BP006", "BP011", "BP012", "BP021"]
        );
    }

    #[test]
    fn severity_overrides_change_status() {
        let mut overrides = BTreeMap::new();
        overrides.insert("BP001".to_string(), Severity::Blocking);
        let registry = RuleRegistry::configured(&[], &overrides).expect("registry");
        let analyzer = Analyzer::new(Arc::new(registry));
        let result = analyzer.review_text("SELECT TOP 1 * FROM dbo.t").expect("review");
        assert_eq!(result.status, ReviewStatus::Block);
    }
}
