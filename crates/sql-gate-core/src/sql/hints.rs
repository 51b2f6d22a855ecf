// crates/sql-gate-core/src/sql/hints.rs
// ============================================================================
// Module: Resource Hint Rendering
// Description: Renders engine resource hints into validated query text.
// Purpose: Cap parallelism and memory grants for admitted queries.
// Dependencies: crate::core, crate::sql::{shape, validator}, serde
// ============================================================================

//! ## Overview
//! With [`HintDialect::Tsql`], admitted queries get an `OPTION (MAXDOP n,
//! MAX_GRANT_PERCENT = p)` clause. A query that already carries an `OPTION`
//! clause keeps its other hints; its parallelism and memory-grant hints are
//! replaced by the environment's values, so a caller can never raise them.
//! When the profile enables read-uncommitted, each table source also gets a
//! `WITH (NOLOCK)` table hint unless it already has table hints.
//!
//! With [`HintDialect::None`] the text is passed through and the hints travel
//! to the executor as structured data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::environment::ResourceHints;
use crate::sql::lexer::TokenKind;
use crate::sql::shape::Clause;
use crate::sql::shape::QueryShape;
use crate::sql::validator::ValidatedQuery;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Words that end a table source instead of naming its alias.
const SOURCE_TERMINATORS: &[&str] = &[
    "WHERE",
    "JOIN",
    "INNER",
    "LEFT",
    "RIGHT",
    "FULL",
    "CROSS",
    "OUTER",
    "ON",
    "GROUP",
    "ORDER",
    "HAVING",
    "UNION",
    "EXCEPT",
    "INTERSECT",
    "OPTION",
    "WITH",
    "APPLY",
    "FOR",
    "WINDOW",
    "LIMIT",
    "OFFSET",
    "FETCH",
    "PIVOT",
    "UNPIVOT",
    "TABLESAMPLE",
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Dialect used to render hints into query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintDialect {
    /// SQL Server `OPTION` and table hints.
    Tsql,
    /// Leave the text unchanged.
    #[default]
    None,
}

/// Text replacement over a byte range.
struct Splice {
    /// Start byte offset.
    start: usize,
    /// End byte offset (exclusive).
    end: usize,
    /// Replacement text.
    text: String,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders hints into the validated query text.
#[must_use]
pub fn render_hints(query: &ValidatedQuery<'_>, hints: &ResourceHints, dialect: HintDialect) -> String {
    match dialect {
        HintDialect::None => query.text().to_string(),
        HintDialect::Tsql => render_tsql(query, hints),
    }
}

/// Renders T-SQL hints.
fn render_tsql(query: &ValidatedQuery<'_>, hints: &ResourceHints) -> String {
    let shape = QueryShape::new(query.tokens());
    let text = query.text();
    let body_end = shape
        .tokens()
        .last()
        .filter(|token| token.kind == TokenKind::Semicolon)
        .map_or(text.len(), |token| token.offset);
    let body = text[..body_end].trim_end();

    let mut splices = Vec::new();
    if hints.read_uncommitted {
        splices.extend(nolock_positions(&shape).into_iter().map(|at| Splice {
            start: at,
            end: at,
            text: " WITH (NOLOCK)".to_string(),
        }));
    }
    let required = [
        ("MAXDOP", format!("MAXDOP {}", hints.max_dop)),
        ("MAX_GRANT_PERCENT", format!("MAX_GRANT_PERCENT = {}", hints.max_grant_percent)),
    ];
    let option = find_option_clause(&shape);
    let mut output = String::with_capacity(body.len() + 64);
    match option {
        Some((start, open, close)) => {
            let mut items: Vec<String> = option_items(&shape, open, close)
                .into_iter()
                .filter(|item| {
                    !required.iter().any(|(name, _)| first_word(item).eq_ignore_ascii_case(name))
                })
                .collect();
            items.extend(required.iter().map(|(_, rendered)| rendered.clone()));
            let end = shape.get(close).map_or(start, |token| token.end());
            splices.push(Splice {
                start,
                end,
                text: format!("OPTION ({})", items.join(", ")),
            });
            apply_splices(body, &mut splices, &mut output);
        }
        None => {
            apply_splices(body, &mut splices, &mut output);
            let rendered: Vec<String> = required.into_iter().map(|(_, rendered)| rendered).collect();
            output.push_str("\nOPTION (");
            output.push_str(&rendered.join(", "));
            output.push(')');
        }
    }
    output
}

/// Applies ordered, non-overlapping splices to `body`.
fn apply_splices(body: &str, splices: &mut [Splice], output: &mut String) {
    splices.sort_by_key(|splice| splice.start);
    let mut cursor = 0;
    for splice in splices.iter() {
        if splice.start < cursor || splice.end > body.len() {
            continue;
        }
        output.push_str(&body[cursor..splice.start]);
        output.push_str(&splice.text);
        cursor = splice.end;
    }
    output.push_str(&body[cursor..]);
}

/// Returns the first word of an option item.
fn first_word(item: &str) -> &str {
    item.split(|ch: char| ch.is_whitespace() || ch == '=').next().unwrap_or("")
}

/// Locates a top-level `OPTION (...)`: keyword index and parenthesis indices.
fn find_option_clause(shape: &QueryShape<'_>) -> Option<(usize, usize, usize)> {
    let idx = shape
        .keyword_indices("OPTION")
        .filter(|idx| shape.depth(*idx) == 0 && shape.is_kind_at(idx + 1, TokenKind::LParen))
        .last()?;
    let close = shape.partner(idx + 1)?;
    let start = shape.get(idx)?.offset;
    Some((start, idx + 1, close))
}

/// Splits the items of an `OPTION (...)` clause at top-level commas.
fn option_items(shape: &QueryShape<'_>, open: usize, close: usize) -> Vec<String> {
    let item_depth = shape.depth(open) + 1;
    let mut items = Vec::new();
    let mut first: Option<usize> = None;
    let mut last: Option<usize> = None;
    let mut flush = |first: &mut Option<usize>, last: &mut Option<usize>| {
        if let (Some(start), Some(end)) = (first.take(), last.take())
            && let (Some(start), Some(end)) = (shape.get(start), shape.get(end))
        {
            items.push(source_range(shape, start.offset, end.end()));
        }
    };
    for idx in open + 1..close {
        if shape.is_kind_at(idx, TokenKind::Comma) && shape.depth(idx) == item_depth {
            flush(&mut first, &mut last);
            continue;
        }
        if first.is_none() {
            first = Some(idx);
        }
        last = Some(idx);
    }
    flush(&mut first, &mut last);
    items
}

/// Rebuilds source text between two byte offsets from the shape's tokens.
fn source_range(shape: &QueryShape<'_>, start: usize, end: usize) -> String {
    let mut text = String::new();
    let mut prev_end: Option<usize> = None;
    for token in shape.tokens().iter().filter(|token| token.offset >= start && token.end() <= end) {
        if let Some(prev) = prev_end
            && token.offset > prev
        {
            text.push(' ');
        }
        text.push_str(token.text);
        prev_end = Some(token.end());
    }
    text
}

/// Returns byte offsets after each table source that should get `WITH (NOLOCK)`.
fn nolock_positions(shape: &QueryShape<'_>) -> Vec<usize> {
    let mut positions = Vec::new();
    for (idx, token) in shape.tokens().iter().enumerate() {
        if !token.is_name() || shape.clause(idx) != Clause::From {
            continue;
        }
        let introduced = shape.prev(idx).is_some_and(|prev| {
            prev.is_keyword("FROM") || prev.is_keyword("JOIN")
        }) || (shape.is_kind_at(idx.wrapping_sub(1), TokenKind::Comma)
            && shape.depth(idx) == shape.depth(idx.wrapping_sub(1)));
        if !introduced || shape.is_cte_name(token.name_text()) {
            continue;
        }
        let mut last = idx;
        while shape.is_kind_at(last + 1, TokenKind::Dot) {
            last += 1;
            if shape.get(last + 1).is_some_and(|next| next.is_name()) {
                last += 1;
            }
        }
        if shape.is_kind_at(last + 1, TokenKind::LParen) {
            continue;
        }
        if shape.is_keyword_at(last + 1, "AS") {
            last += 1;
            if shape.get(last + 1).is_some_and(|next| next.is_name()) {
                last += 1;
            }
        } else if shape.get(last + 1).is_some_and(|next| {
            next.kind == TokenKind::QuotedIdentifier
                || (next.kind == TokenKind::Word
                    && !SOURCE_TERMINATORS.iter().any(|word| next.text.eq_ignore_ascii_case(word)))
        }) {
            last += 1;
        }
        let hinted =
            shape.is_keyword_at(last + 1, "WITH") && shape.is_kind_at(last + 2, TokenKind::LParen);
        if let Some(end) = shape.get(last).map(|token| token.end())
            && !hinted
        {
            positions.push(end);
        }
    }
    positions
}

// ============================================================================
// SECTION: Tests
// ============================================================================
