// crates/sql-gate-core/src/sql/shape.rs
// ============================================================================
// Module: Query Shape
// Description: Clause and nesting annotations over significant tokens.
// Purpose: Give review predicates positional context without a full parser.
// Dependencies: crate::sql::lexer
// ============================================================================

//! ## Overview
//! [`QueryShape`] drops comments from a token stream and annotates each
//! remaining token with its parenthesis depth and the clause it belongs to
//! (select list, `FROM`, `WHERE`, join condition, ...). It also pairs
//! parentheses and collects common table expression names. Review predicates
//! read these annotations instead of re-scanning text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::sql::lexer::Token;
use crate::sql::lexer::TokenKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Clause a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// Before any clause keyword, or after a set operator.
    None,
    /// Select list.
    Select,
    /// `FROM` and `JOIN` table sources.
    From,
    /// `ON` join condition.
    JoinCondition,
    /// `WHERE` filter.
    Where,
    /// `GROUP BY` list.
    GroupBy,
    /// `HAVING` filter.
    Having,
    /// `ORDER BY` list.
    OrderBy,
    /// Trailing `OPTION (...)` hints.
    Option,
}

/// Annotated significant tokens.
#[derive(Debug, Clone)]
pub struct QueryShape<'t> {
    /// Tokens without comments.
    tokens: Vec<Token<'t>>,
    /// Clause per token.
    clauses: Vec<Clause>,
    /// Parenthesis depth per token.
    depths: Vec<usize>,
    /// Index of the matching parenthesis, for parenthesis tokens.
    partners: Vec<Option<usize>>,
    /// Upper-cased common table expression names.
    cte_names: BTreeSet<String>,
}

impl<'t> QueryShape<'t> {
    /// Builds a shape from a token stream.
    #[must_use]
    pub fn new(tokens: &[Token<'t>]) -> Self {
        let tokens: Vec<Token<'t>> = tokens.iter().filter(|token| !token.is_trivia()).copied().collect();
        let mut clauses = Vec::with_capacity(tokens.len());
        let mut depths = Vec::with_capacity(tokens.len());
        let mut partners = vec![None; tokens.len()];
        let mut stack: Vec<Clause> = vec![Clause::None];
        let mut open: Vec<usize> = Vec::new();
        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::LParen => {
                    let current = stack.last().copied().unwrap_or(Clause::None);
                    clauses.push(current);
                    depths.push(stack.len() - 1);
                    stack.push(current);
                    open.push(idx);
                }
                TokenKind::RParen => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                    if let Some(start) = open.pop() {
                        partners[start] = Some(idx);
                        partners[idx] = Some(start);
                    }
                    clauses.push(stack.last().copied().unwrap_or(Clause::None));
                    depths.push(stack.len() - 1);
                }
                _ => {
                    if let Some(next) = clause_for_keyword(token)
                        && let Some(slot) = stack.last_mut()
                    {
                        *slot = next;
                    }
                    clauses.push(stack.last().copied().unwrap_or(Clause::None));
                    depths.push(stack.len() - 1);
                }
            }
        }
        let mut shape = Self {
            tokens,
            clauses,
            depths,
            partners,
            cte_names: BTreeSet::new(),
        };
        shape.cte_names = shape.collect_cte_names();
        shape
    }

    /// Returns the significant tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token<'t>] {
        &self.tokens
    }

    /// Returns the number of significant tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true when there are no significant tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the token at `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Token<'t>> {
        self.tokens.get(idx)
    }

    /// Returns the token before `idx`.
    #[must_use]
    pub fn prev(&self, idx: usize) -> Option<&Token<'t>> {
        idx.checked_sub(1).and_then(|prev| self.tokens.get(prev))
    }

    /// Returns true when the token at `idx` is the given keyword.
    #[must_use]
    pub fn is_keyword_at(&self, idx: usize, keyword: &str) -> bool {
        self.tokens.get(idx).is_some_and(|token| token.is_keyword(keyword))
    }

    /// Returns true when the token at `idx` has the given kind.
    #[must_use]
    pub fn is_kind_at(&self, idx: usize, kind: TokenKind) -> bool {
        self.tokens.get(idx).is_some_and(|token| token.kind == kind)
    }

    /// Returns the clause of the token at `idx`.
    #[must_use]
    pub fn clause(&self, idx: usize) -> Clause {
        self.clauses.get(idx).copied().unwrap_or(Clause::None)
    }

    /// Returns the parenthesis depth of the token at `idx`.
    #[must_use]
    pub fn depth(&self, idx: usize) -> usize {
        self.depths.get(idx).copied().unwrap_or(0)
    }

    /// Returns the matching parenthesis index for a parenthesis token.
    #[must_use]
    pub fn partner(&self, idx: usize) -> Option<usize> {
        self.partners.get(idx).copied().flatten()
    }

    /// Returns true when `name` is a common table expression name.
    #[must_use]
    pub fn is_cte_name(&self, name: &str) -> bool {
        self.cte_names.contains(&name.to_ascii_uppercase())
    }

    /// Iterates token indices whose token is the given keyword.
    pub fn keyword_indices<'s>(&'s self, keyword: &'s str) -> impl Iterator<Item = usize> + 's {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(_, token)| token.is_keyword(keyword))
            .map(|(idx, _)| idx)
    }

    /// Collects `WITH name [(cols)] AS (` definitions.
    fn collect_cte_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            if !token.is_name() || token.is_keyword("AS") {
                continue;
            }
            let introduced = self.is_keyword_at(idx.wrapping_sub(1), "WITH")
                || (self.is_kind_at(idx.wrapping_sub(1), TokenKind::Comma)
                    && self.depth(idx) == 0
                    && self.clause(idx) == Clause::None);
            if !introduced {
                continue;
            }
            let mut next = idx + 1;
            if self.is_kind_at(next, TokenKind::LParen) {
                match self.partner(next) {
                    Some(close) => next = close + 1,
                    None => continue,
                }
            }
            if self.is_keyword_at(next, "AS") && self.is_kind_at(next + 1, TokenKind::LParen) {
                names.insert(token.name_text().to_ascii_uppercase());
            }
        }
        names
    }
}

/// Maps clause-opening keywords to their clause.
fn clause_for_keyword(token: &Token<'_>) -> Option<Clause> {
    if token.kind != TokenKind::Word {
        return None;
    }
    let upper = token.text.to_ascii_uppercase();
    let clause = match upper.as_str() {
        "SELECT" => Clause::Select,
        "FROM" | "JOIN" | "APPLY" => Clause::From,
        "ON" => Clause::JoinCondition,
        "WHERE" => Clause::Where,
        "GROUP" => Clause::GroupBy,
        "HAVING" => Clause::Having,
        "ORDER" => Clause::OrderBy,
        "OPTION" => Clause::Option,
        "UNION" | "EXCEPT" | "INTERSECT" => Clause::None,
        _ => return None,
    };
    Some(clause)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only tokenization.")]

    use super::Clause;
    use super::QueryShape;
    use crate::sql::lexer::tokenize;

    #[test]
    fn clauses_follow_keywords_and_restore_after_parens() {
        let tokens = tokenize("SELECT a FROM t WHERE (b = 1 OR c = 2) AND d IN (SELECT e FROM u)")
            .expect("tokenize");
        let shape = QueryShape::new(&tokens);
        let or_idx = shape.keyword_indices("OR").next().expect("or");
        assert_eq!(shape.clause(or_idx), Clause::Where);
        assert_eq!(shape.depth(or_idx), 1);
        let and_idx = shape.keyword_indices("AND").next().expect("and");
        assert_eq!(shape.clause(and_idx), Clause::Where);
        assert_eq!(shape.depth(and_idx), 0);
    }

    #[test]
    fn comments_are_dropped() {
        let tokens = tokenize("SELECT /* x */ a -- y\nFROM t").expect("tokenize");
        let shape = QueryShape::new(&tokens);
        assert_eq!(shape.len(), 4);
    }

    #[test]
    fn cte_names_are_collected() {
        let tokens = tokenize(
            "WITH recent (id) AS (SELECT id FROM dbo.a), other AS (SELECT 1 AS x) SELECT * FROM recent",
        )
        .expect("tokenize");
        let shape = QueryShape::new(&tokens);
        assert!(shape.is_cte_name("RECENT"));
        assert!(shape.is_cte_name("other"));
        assert!(!shape.is_cte_name("a"));
    }
}
