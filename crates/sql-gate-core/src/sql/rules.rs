// crates/sql-gate-core/src/sql/rules.rs
// ============================================================================
// Module: Rule Registry
// Description: Closed set of review rules and dangerous-construct patterns.
// Purpose: Single source of truth for what the validator and analyzer detect.
// Dependencies: crate::core, crate::sql::{lexer, shape}
// ============================================================================

//! ## Overview
//! The registry holds two tables:
//! - [`DANGEROUS_PATTERNS`], consulted by the structural validator. A match
//!   rejects the query outright.
//! - Review [`Rule`]s, evaluated in registry order by the analyzer. Each rule
//!   pairs an identifier and severity with a [`RuleKind`] predicate over a
//!   [`QueryShape`].
//!
//! The built-in rule set is fixed at compile time. Deployments may disable
//! rules or override severities by id; unknown ids are rejected so a typo in
//! configuration cannot silently disable nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::identifiers::RuleId;
use crate::core::review::Finding;
use crate::core::review::RuleCategory;
use crate::core::review::Severity;
use crate::sql::lexer::Token;
use crate::sql::lexer::TokenKind;
use crate::sql::shape::Clause;
use crate::sql::shape::QueryShape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum items in an `IN (...)` list before it is flagged.
pub const DEFAULT_MAX_IN_LIST_ITEMS: usize = 100;
/// Default maximum `SELECT` keywords before nesting is flagged.
pub const DEFAULT_MAX_SELECTS: usize = 3;

/// Aggregate functions that bound a select list to few rows.
const AGGREGATES: &[&str] = &["COUNT", "COUNT_BIG", "SUM", "AVG", "MIN", "MAX", "STRING_AGG"];

/// Words that take a parenthesized operand but are not functions.
const NON_FUNCTION_WORDS: &[&str] = &[
    "IN", "EXISTS", "NOT", "AND", "OR", "ANY", "ALL", "SOME", "AS", "ON", "VALUES", "OVER", "WHERE",
    "SELECT", "BETWEEN", "LIKE", "IS", "THEN", "WHEN", "ELSE",
];

/// Words inside function arguments that are not column references.
const ARGUMENT_KEYWORDS: &[&str] = &[
    "AS", "AND", "OR", "NOT", "NULL", "IS", "IN", "CASE", "WHEN", "THEN", "ELSE", "END",
    "DISTINCT", "BETWEEN", "LIKE", "TRUE", "FALSE", "YEAR", "QUARTER", "MONTH", "WEEK", "DAY",
    "HOUR", "MINUTE", "SECOND", "MILLISECOND", "YY", "YYYY", "QQ", "MM", "WK", "DD", "HH", "MI",
    "SS", "INT", "BIGINT", "SMALLINT", "TINYINT", "BIT", "DECIMAL", "NUMERIC", "FLOAT", "REAL",
    "MONEY", "CHAR", "NCHAR", "VARCHAR", "NVARCHAR", "TEXT", "DATE", "TIME", "DATETIME",
    "DATETIME2", "DATETIMEOFFSET", "MAX", "USING",
];

/// Built-in scalar functions that run per row at notable cost.
const COSTLY_SCALARS: &[&str] = &["FORMAT"];

/// System catalog views exposing credentials or login secrets.
const CREDENTIAL_CATALOGS: &[&str] = &[
    "SQL_LOGINS",
    "SYSLOGINS",
    "SYSXLOGINS",
    "CREDENTIALS",
    "DATABASE_SCOPED_CREDENTIALS",
    "LINKED_LOGINS",
    "MASTER_KEY_PASSWORDS",
];

// ============================================================================
// SECTION: Dangerous Patterns
// ============================================================================

/// Dangerous construct classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerKind {
    /// Operating-system or extension command execution.
    CommandExecution,
    /// Reading from or writing to files or external sources.
    ExternalData,
    /// Executing dynamically built SQL.
    DynamicSql,
    /// Reaching another server.
    LinkedServer,
}

/// How a dangerous pattern matches a name token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatcher {
    /// Whole name, case-insensitive.
    Word(&'static str),
    /// Name prefix, case-insensitive.
    WordPrefix(&'static str),
}

/// Entry in the dangerous-construct table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DangerousPattern {
    /// Stable pattern identifier.
    pub id: &'static str,
    /// Construct classification.
    pub kind: DangerKind,
    /// Name matcher.
    pub matcher: PatternMatcher,
}

impl DangerousPattern {
    /// Returns true when the token names this construct.
    #[must_use]
    pub fn matches(&self, token: &Token<'_>) -> bool {
        if !token.is_name() {
            return false;
        }
        let name = token.name_text();
        match self.matcher {
            PatternMatcher::Word(word) => name.eq_ignore_ascii_case(word),
            PatternMatcher::WordPrefix(prefix) => {
                name.len() >= prefix.len()
                    && name.is_char_boundary(prefix.len())
                    && name[..prefix.len()].eq_ignore_ascii_case(prefix)
            }
        }
    }
}

/// Dangerous constructs rejected by the structural validator.
pub const DANGEROUS_PATTERNS: &[DangerousPattern] = &[
    DangerousPattern {
        id: "DGR001",
        kind: DangerKind::CommandExecution,
        matcher: PatternMatcher::Word("XP_CMDSHELL"),
    },
    DangerousPattern {
        id: "DGR002",
        kind: DangerKind::CommandExecution,
        matcher: PatternMatcher::WordPrefix("XP_"),
    },
    DangerousPattern {
        id: "DGR003",
        kind: DangerKind::CommandExecution,
        matcher: PatternMatcher::WordPrefix("SP_OA"),
    },
    DangerousPattern {
        id: "DGR004",
        kind: DangerKind::CommandExecution,
        matcher: PatternMatcher::Word("LOAD_EXTENSION"),
    },
    DangerousPattern {
        id: "DGR010",
        kind: DangerKind::DynamicSql,
        matcher: PatternMatcher::Word("SP_EXECUTESQL"),
    },
    DangerousPattern {
        id: "DGR011",
        kind: DangerKind::DynamicSql,
        matcher: PatternMatcher::Word("SP_EXECUTE"),
    },
    DangerousPattern {
        id: "DGR012",
        kind: DangerKind::DynamicSql,
        matcher: PatternMatcher::Word("SP_PREPEXEC"),
    },
    DangerousPattern {
        id: "DGR020",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("OPENROWSET"),
    },
    DangerousPattern {
        id: "DGR021",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("OPENDATASOURCE"),
    },
    DangerousPattern {
        id: "DGR022",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("OUTFILE"),
    },
    DangerousPattern {
        id: "DGR023",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("DUMPFILE"),
    },
    DangerousPattern {
        id: "DGR024",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("LOAD_FILE"),
    },
    DangerousPattern {
        id: "DGR025",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("READFILE"),
    },
    DangerousPattern {
        id: "DGR026",
        kind: DangerKind::ExternalData,
        matcher: PatternMatcher::Word("WRITEFILE"),
    },
    DangerousPattern {
        id: "DGR030",
        kind: DangerKind::LinkedServer,
        matcher: PatternMatcher::Word("OPENQUERY"),
    },
    DangerousPattern {
        id: "DGR031",
        kind: DangerKind::LinkedServer,
        matcher: PatternMatcher::WordPrefix("SP_ADDLINKEDSERVER"),
    },
];

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Review rule predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `SELECT *` or `t.*` in a select list.
    SelectStar,
    /// Table source without a schema prefix.
    MissingSchemaPrefix,
    /// `CROSS JOIN` or comma-separated table sources.
    CrossJoin,
    /// Function applied to a column in a filter or join condition.
    FunctionOnFilterColumn,
    /// `OR` in a `WHERE` clause.
    OrInFilter,
    /// `SELECT DISTINCT`.
    Distinct,
    /// `IN (SELECT ...)`.
    InSubquery,
    /// Schema-qualified or formatting scalar function in a select list.
    ScalarFunctionInSelect,
    /// `IN (...)` literal list longer than `max_items`.
    LargeInList {
        /// Maximum allowed items.
        max_items: usize,
    },
    /// `UNION` without `ALL`.
    UnionWithoutAll,
    /// Column compared to a string literal.
    ImplicitConversion,
    /// `LEFT`, `RIGHT`, or `FULL` outer join.
    OuterJoin,
    /// More than `max_selects` `SELECT` keywords.
    NestedSubqueries {
        /// Maximum allowed selects.
        max_selects: usize,
    },
    /// Table query without `TOP`, `LIMIT`, or `FETCH`.
    MissingRowLimit,
    /// Reference to a credential-bearing system catalog.
    CredentialCatalogAccess,
    /// `OPTION (MAXRECURSION 0)`.
    UnboundedRecursion,
}

impl RuleKind {
    /// Evaluates the predicate against a query shape.
    #[must_use]
    pub fn matches(&self, shape: &QueryShape<'_>) -> bool {
        match *self {
            Self::SelectStar => select_star(shape),
            Self::MissingSchemaPrefix => missing_schema_prefix(shape),
            Self::CrossJoin => cross_join(shape),
            Self::FunctionOnFilterColumn => function_on_filter_column(shape),
            Self::OrInFilter => shape
                .keyword_indices("OR")
                .any(|idx| shape.clause(idx) == Clause::Where),
            Self::Distinct => shape
                .keyword_indices("DISTINCT")
                .any(|idx| shape.prev(idx).is_some_and(|prev| prev.is_keyword("SELECT"))),
            Self::InSubquery => shape.keyword_indices("IN").any(|idx| {
                shape.is_kind_at(idx + 1, TokenKind::LParen) && shape.is_keyword_at(idx + 2, "SELECT")
            }),
            Self::ScalarFunctionInSelect => scalar_function_in_select(shape),
            Self::LargeInList {
                max_items,
            } => large_in_list(shape, max_items),
            Self::UnionWithoutAll => {
                shape.keyword_indices("UNION").any(|idx| !shape.is_keyword_at(idx + 1, "ALL"))
            }
            Self::ImplicitConversion => implicit_conversion(shape),
            Self::OuterJoin => ["LEFT", "RIGHT", "FULL"].into_iter().any(|side| {
                shape.keyword_indices(side).any(|idx| {
                    shape.is_keyword_at(idx + 1, "JOIN") || shape.is_keyword_at(idx + 1, "OUTER")
                })
            }),
            Self::NestedSubqueries {
                max_selects,
            } => shape.keyword_indices("SELECT").count() > max_selects,
            Self::MissingRowLimit => missing_row_limit(shape),
            Self::CredentialCatalogAccess => credential_catalog_access(shape),
            Self::UnboundedRecursion => shape.keyword_indices("MAXRECURSION").any(|idx| {
                shape.get(idx + 1).is_some_and(|next| {
                    next.kind == TokenKind::Number && next.text.trim_start_matches('0').is_empty()
                })
            }),
        }
    }
}

/// Registered review rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Rule identifier.
    pub id: RuleId,
    /// Rule category.
    pub category: RuleCategory,
    /// Effective severity.
    pub severity: Severity,
    /// Predicate.
    pub kind: RuleKind,
    /// Short description of the issue.
    pub title: &'static str,
    /// Suggested remedy.
    pub recommendation: &'static str,
}

impl Rule {
    /// Builds the finding reported when this rule matches.
    #[must_use]
    pub fn finding(&self) -> Finding {
        Finding {
            rule_id: self.id.clone(),
            category: self.category,
            severity: self.severity,
            title: self.title.to_string(),
            recommendation: self.recommendation.to_string(),
        }
    }
}

/// Compile-time rule definition.
struct BuiltinRule {
    /// Rule identifier.
    id: &'static str,
    /// Rule category.
    category: RuleCategory,
    /// Default severity.
    severity: Severity,
    /// Predicate.
    kind: RuleKind,
    /// Short description.
    title: &'static str,
    /// Suggested remedy.
    recommendation: &'static str,
}

/// Built-in rules in evaluation order.
const BUILTIN_RULES: &[BuiltinRule] = &[
    BuiltinRule {
        id: "BP001",
        category: RuleCategory::Performance,
        severity: Severity::Warning,
        kind: RuleKind::SelectStar,
        title: "SELECT * returns every column",
        recommendation: "List only the columns you need.",
    },
    BuiltinRule {
        id: "BP002",
        category: RuleCategory::BestPractice,
        severity: Severity::Info,
        kind: RuleKind::MissingSchemaPrefix,
        title: "Table referenced without a schema prefix",
        recommendation: "Qualify tables with their schema, for example dbo.Users.",
    },
    BuiltinRule {
        id: "BP003",
        category: RuleCategory::Performance,
        severity: Severity::Warning,
        kind: RuleKind::CrossJoin,
        title: "Cartesian product between table sources",
        recommendation: "Use an explicit JOIN with an ON condition.",
    },
    BuiltinRule {
        id: "BP004",
        category: RuleCategory::Performance,
        severity: Severity::Warning,
        kind: RuleKind::FunctionOnFilterColumn,
        title: "Function applied to a filtered column",
        recommendation: "Rewrite the predicate so the bare column is compared and indexes apply.",
    },
    BuiltinRule {
        id: "BP005",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::OrInFilter,
        title: "OR in WHERE clause",
        recommendation: "Consider IN or UNION ALL so each branch can use an index.",
    },
    BuiltinRule {
        id: "BP006",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::Distinct,
        title: "SELECT DISTINCT forces a sort or hash",
        recommendation: "Check whether duplicates really occur or fix the join producing them.",
    },
    BuiltinRule {
        id: "BP007",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::InSubquery,
        title: "IN with a subquery",
        recommendation: "Consider EXISTS or a JOIN.",
    },
    BuiltinRule {
        id: "BP009",
        category: RuleCategory::Performance,
        severity: Severity::Warning,
        kind: RuleKind::ScalarFunctionInSelect,
        title: "Scalar function in the select list",
        recommendation: "Scalar functions run once per row; consider CROSS APPLY or an inline table-valued function.",
    },
    BuiltinRule {
        id: "BP010",
        category: RuleCategory::Performance,
        severity: Severity::Warning,
        kind: RuleKind::LargeInList {
            max_items: DEFAULT_MAX_IN_LIST_ITEMS,
        },
        title: "Large IN list",
        recommendation: "Load the values into a table and join against it.",
    },
    BuiltinRule {
        id: "BP011",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::UnionWithoutAll,
        title: "UNION removes duplicates",
        recommendation: "Use UNION ALL when duplicates are impossible or acceptable.",
    },
    BuiltinRule {
        id: "BP012",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::ImplicitConversion,
        title: "Column compared to a string literal",
        recommendation: "Match the literal type to the column type to avoid implicit conversion.",
    },
    BuiltinRule {
        id: "BP016",
        category: RuleCategory::BestPractice,
        severity: Severity::Info,
        kind: RuleKind::OuterJoin,
        title: "Outer join",
        recommendation: "Confirm the outer join is needed; inner joins give the optimizer more room.",
    },
    BuiltinRule {
        id: "BP020",
        category: RuleCategory::BestPractice,
        severity: Severity::Warning,
        kind: RuleKind::NestedSubqueries {
            max_selects: DEFAULT_MAX_SELECTS,
        },
        title: "Deeply nested subqueries",
        recommendation: "Flatten the query with common table expressions or joins.",
    },
    BuiltinRule {
        id: "BP021",
        category: RuleCategory::Performance,
        severity: Severity::Info,
        kind: RuleKind::MissingRowLimit,
        title: "No row limit",
        recommendation: "Add TOP, LIMIT, or OFFSET/FETCH to bound the result.",
    },
    BuiltinRule {
        id: "SEC011",
        category: RuleCategory::Security,
        severity: Severity::Blocking,
        kind: RuleKind::CredentialCatalogAccess,
        title: "Query reads a credential catalog",
        recommendation: "Credential and login catalogs are not available through this gateway.",
    },
    BuiltinRule {
        id: "SEC012",
        category: RuleCategory::Security,
        severity: Severity::Blocking,
        kind: RuleKind::UnboundedRecursion,
        title: "Recursion limit disabled",
        recommendation: "Remove MAXRECURSION 0 or set an explicit bound.",
    },
];

/// Rule configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleConfigError {
    /// Configuration named a rule that does not exist.
    #[error("unknown rule id: {0}")]
    UnknownRule(String),
}

/// Ordered set of active review rules.
///
/// # Invariants
/// - Rule order is the built-in order and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRegistry {
    /// Active rules.
    rules: Vec<Rule>,
}

impl RuleRegistry {
    /// Returns the registry with every built-in rule at its default severity.
    #[must_use]
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|rule| Rule {
                id: RuleId::new(rule.id),
                category: rule.category,
                severity: rule.severity,
                kind: rule.kind,
                title: rule.title,
                recommendation: rule.recommendation,
            })
            .collect();
        Self {
            rules,
        }
    }

    /// Returns the built-in registry with rules disabled and severities overridden.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::UnknownRule`] when an id is not built in.
    pub fn configured(
        disabled: &[String],
        severity_overrides: &BTreeMap<String, Severity>,
    ) -> Result<Self, RuleConfigError> {
        let mut registry = Self::builtin();
        let known: BTreeSet<&str> = BUILTIN_RULES.iter().map(|rule| rule.id).collect();
        for id in disabled.iter().chain(severity_overrides.keys()) {
            if !known.contains(id.as_str()) {
                return Err(RuleConfigError::UnknownRule(id.clone()));
            }
        }
        registry.rules.retain(|rule| !disabled.iter().any(|id| id == rule.id.as_str()));
        for rule in &mut registry.rules {
            if let Some(severity) = severity_overrides.get(rule.id.as_str()) {
                rule.severity = *severity;
            }
        }
        Ok(registry)
    }

    /// Returns the active rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns an active rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id.as_str() == id)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when `word` is in `list`, ignoring ASCII case.
fn word_in(word: &str, list: &[&str]) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(word))
}

/// Returns true when the token at `idx` looks like a column reference.
fn is_column_like(shape: &QueryShape<'_>, idx: usize) -> bool {
    let Some(token) = shape.get(idx) else {
        return false;
    };
    match token.kind {
        TokenKind::QuotedIdentifier => true,
        TokenKind::Word => {
            !word_in(token.text, ARGUMENT_KEYWORDS) && !shape.is_kind_at(idx + 1, TokenKind::LParen)
        }
        _ => false,
    }
}

/// Returns true when the comma at `idx` separates table sources of a `FROM`.
fn is_from_list_comma(shape: &QueryShape<'_>, idx: usize) -> bool {
    if !shape.is_kind_at(idx, TokenKind::Comma) || shape.clause(idx) != Clause::From {
        return false;
    }
    let depth = shape.depth(idx);
    for back in (0..idx).rev() {
        if shape.depth(back) < depth {
            return false;
        }
        if shape.depth(back) == depth && shape.is_keyword_at(back, "FROM") {
            return true;
        }
    }
    false
}

/// `SELECT *`, `SELECT t.*`, `SELECT TOP n *`, excluding `COUNT(*)`.
fn select_star(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        if token.kind != TokenKind::Star || shape.clause(idx) != Clause::Select {
            return false;
        }
        let Some(prev) = shape.prev(idx) else {
            return false;
        };
        match prev.kind {
            TokenKind::Comma | TokenKind::Dot => true,
            TokenKind::Word => {
                prev.is_keyword("SELECT") || prev.is_keyword("DISTINCT") || prev.is_keyword("ALL")
            }
            TokenKind::Number => shape.is_keyword_at(idx.wrapping_sub(2), "TOP"),
            TokenKind::RParen => shape
                .partner(idx - 1)
                .is_some_and(|open| shape.is_keyword_at(open.wrapping_sub(1), "TOP")),
            _ => false,
        }
    })
}

/// Table sources named without a schema.
fn missing_schema_prefix(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        if !token.is_name() || shape.clause(idx) != Clause::From {
            return false;
        }
        let introduced = shape.prev(idx).is_some_and(|prev| {
            prev.is_keyword("FROM") || prev.is_keyword("JOIN")
        }) || is_from_list_comma(shape, idx.wrapping_sub(1));
        if !introduced {
            return false;
        }
        let qualified = shape.is_kind_at(idx + 1, TokenKind::Dot);
        let function = shape.is_kind_at(idx + 1, TokenKind::LParen);
        let name = token.name_text();
        let temporary = name.starts_with('#');
        !qualified && !function && !temporary && !shape.is_cte_name(name)
    })
}

/// `CROSS JOIN` or `FROM a, b`.
fn cross_join(shape: &QueryShape<'_>) -> bool {
    let explicit = shape.keyword_indices("CROSS").any(|idx| shape.is_keyword_at(idx + 1, "JOIN"));
    explicit || (0..shape.len()).any(|idx| is_from_list_comma(shape, idx))
}

/// `WHERE f(col) ...` or `ON f(col) ...`.
fn function_on_filter_column(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        if token.kind != TokenKind::Word
            || !matches!(shape.clause(idx), Clause::Where | Clause::JoinCondition)
            || word_in(token.text, NON_FUNCTION_WORDS)
            || !shape.is_kind_at(idx + 1, TokenKind::LParen)
        {
            return false;
        }
        let Some(close) = shape.partner(idx + 1) else {
            return false;
        };
        if shape.is_keyword_at(idx + 2, "SELECT") {
            return false;
        }
        (idx + 2 .. close).any(|inner| is_column_like(shape, inner))
    })
}

/// `SELECT dbo.fn(col)` or `SELECT FORMAT(...)` in any select list.
fn scalar_function_in_select(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        if !token.is_name()
            || shape.clause(idx) != Clause::Select
            || !shape.is_kind_at(idx + 1, TokenKind::LParen)
        {
            return false;
        }
        let qualified = shape.is_kind_at(idx.wrapping_sub(1), TokenKind::Dot);
        qualified || (token.kind == TokenKind::Word && word_in(token.text, COSTLY_SCALARS))
    })
}

/// `IN (...)` with more than `max_items` literal items.
fn large_in_list(shape: &QueryShape<'_>, max_items: usize) -> bool {
    shape.keyword_indices("IN").any(|idx| {
        let open = idx + 1;
        if !shape.is_kind_at(open, TokenKind::LParen) || shape.is_keyword_at(open + 1, "SELECT") {
            return false;
        }
        let Some(close) = shape.partner(open) else {
            return false;
        };
        let item_depth = shape.depth(open) + 1;
        let commas = (open + 1..close)
            .filter(|inner| {
                shape.is_kind_at(*inner, TokenKind::Comma) && shape.depth(*inner) == item_depth
            })
            .count();
        commas + 1 > max_items
    })
}

/// Column compared with `=` to a string literal in a filter or join condition.
fn implicit_conversion(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        if token.kind != TokenKind::Operator
            || token.text != "="
            || !matches!(shape.clause(idx), Clause::Where | Clause::JoinCondition)
        {
            return false;
        }
        let literal_right = shape.is_kind_at(idx + 1, TokenKind::StringLiteral);
        let literal_left = shape.is_kind_at(idx.wrapping_sub(1), TokenKind::StringLiteral);
        (literal_right && is_column_like(shape, idx.wrapping_sub(1)))
            || (literal_left && is_column_like(shape, idx + 1))
    })
}

/// Table query with no row bound and a non-aggregate outer select list.
fn missing_row_limit(shape: &QueryShape<'_>) -> bool {
    let bounded = ["TOP", "LIMIT", "FETCH"]
        .into_iter()
        .any(|keyword| shape.keyword_indices(keyword).next().is_some());
    if bounded {
        return false;
    }
    let Some(select) = shape.keyword_indices("SELECT").find(|idx| shape.depth(*idx) == 0) else {
        return false;
    };
    let Some(from) =
        shape.keyword_indices("FROM").find(|idx| *idx > select && shape.depth(*idx) == 0)
    else {
        return false;
    };
    let aggregate_only = (select + 1..from).any(|idx| {
        shape.depth(idx) == 0
            && shape.get(idx).is_some_and(|token| {
                token.kind == TokenKind::Word && word_in(token.text, AGGREGATES)
            })
            && shape.is_kind_at(idx + 1, TokenKind::LParen)
    });
    !aggregate_only
}

/// `sys.<credential catalog>` references.
fn credential_catalog_access(shape: &QueryShape<'_>) -> bool {
    shape.tokens().iter().enumerate().any(|(idx, token)| {
        token.is_name()
            && word_in(token.name_text(), CREDENTIAL_CATALOGS)
            && shape.is_kind_at(idx.wrapping_sub(1), TokenKind::Dot)
            && shape
                .get(idx.wrapping_sub(2))
                .is_some_and(|schema| schema.is_name() && schema.name_text().eq_ignore_ascii_case("SYS"))
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
