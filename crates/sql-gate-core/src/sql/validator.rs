// crates/sql-gate-core/src/sql/validator.rs
// ============================================================================
// Module: Structural Validator
// Description: Fail-closed structural checks for read-only queries.
// Purpose: Reject anything that is not a single bounded read before it costs anything.
// Dependencies: crate::sql::{lexer, rules}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`StructuralValidator::check`] runs an ordered, short-circuiting sequence of
//! checks and returns either a [`ValidatedQuery`] (text plus tokens) or the
//! violation that stopped it:
//! 1. length,
//! 2. structure (null bytes, escapes, unterminated constructs, comments,
//!    multiple statements),
//! 3. read-only statement classification,
//! 4. dangerous constructs and four-part names,
//! 5. database allow-list.
//!
//! Classification works on lexer tokens, so keywords inside string literals or
//! quoted identifiers never trigger a rejection, and case or whitespace tricks
//! never hide one. Violation codes are a closed enum; nothing derived from the
//! input is echoed back.
//!
//! [`quote_identifier`] validates and quotes caller-supplied identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::sql::lexer::Token;
use crate::sql::lexer::TokenKind;
use crate::sql::lexer::tokenize;
use crate::sql::rules::DangerousPattern;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum identifier length.
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 128;

/// Keywords that write, change schema or permissions, or run code.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "MERGE",
    "UPSERT",
    "DROP",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "RENAME",
    "GRANT",
    "REVOKE",
    "DENY",
    "EXEC",
    "EXECUTE",
    "CALL",
    "BACKUP",
    "RESTORE",
    "BULK",
    "DBCC",
    "SHUTDOWN",
    "RECONFIGURE",
    "KILL",
    "INTO",
    "ATTACH",
    "DETACH",
    "VACUUM",
    "PRAGMA",
    "REINDEX",
];

/// Maximum dotted name parts before a reference is treated as cross-server.
const MAX_NAME_PARTS: usize = 3;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structural violation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationCode {
    /// Query exceeds the environment length limit.
    QueryTooLong,
    /// Query is empty or structurally unsafe.
    MalformedQuery,
    /// Query is not a single read statement.
    WriteOperationBlocked,
    /// Query references a dangerous construct.
    DangerousConstruct,
    /// Target database is not allow-listed.
    DatabaseNotAllowed,
    /// Identifier failed validation.
    InvalidIdentifier,
    /// Page or page size out of range.
    InvalidPagination,
}

impl ViolationCode {
    /// Returns the stable label for the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryTooLong => "QueryTooLong",
            Self::MalformedQuery => "MalformedQuery",
            Self::WriteOperationBlocked => "WriteOperationBlocked",
            Self::DangerousConstruct => "DangerousConstruct",
            Self::DatabaseNotAllowed => "DatabaseNotAllowed",
            Self::InvalidIdentifier => "InvalidIdentifier",
            Self::InvalidPagination => "InvalidPagination",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failure carrying one or more violation codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// Violation codes.
    pub codes: Vec<ViolationCode>,
}

impl ValidationError {
    /// Builds an error for a single code.
    #[must_use]
    pub fn single(code: ViolationCode) -> Self {
        Self {
            codes: vec![code],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.codes.iter().map(|code| code.as_str()).collect();
        write!(f, "query rejected: {}", codes.join(", "))
    }
}

/// Validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Query may proceed to cost admission.
    Accepted,
    /// Query was rejected.
    Rejected(Vec<ViolationCode>),
}

/// Query that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery<'t> {
    /// Original query text.
    text: &'t str,
    /// All tokens, including comments.
    tokens: Vec<Token<'t>>,
}

impl<'t> ValidatedQuery<'t> {
    /// Returns the original text.
    #[must_use]
    pub const fn text(&self) -> &'t str {
        self.text
    }

    /// Returns the tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token<'t>] {
        &self.tokens
    }
}

/// Identifier quoting styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// `[name]`.
    Bracket,
    /// `"name"`.
    DoubleQuote,
}

/// Database allow-list policy.
///
/// # Invariants
/// - Names are compared case-insensitively.
/// - An empty list allows every database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabasePolicy {
    /// Lower-cased allowed database names.
    allowed: Vec<String>,
}

impl DatabasePolicy {
    /// Builds a policy from configured names.
    #[must_use]
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed.into_iter().map(|name| name.as_ref().trim().to_lowercase()).collect(),
        }
    }

    /// Returns true when the database may be targeted.
    #[must_use]
    pub fn permits(&self, database: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&database.trim().to_lowercase())
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Structural validator.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    /// Database allow-list.
    databases: DatabasePolicy,
    /// Dangerous-construct table.
    patterns: &'static [DangerousPattern],
}

impl StructuralValidator {
    /// Builds a validator.
    #[must_use]
    pub const fn new(databases: DatabasePolicy, patterns: &'static [DangerousPattern]) -> Self {
        Self {
            databases,
            patterns,
        }
    }

    /// Validates a query and returns the verdict.
    #[must_use]
    pub fn validate(
        &self,
        text: &str,
        database: Option<&str>,
        max_query_length: usize,
    ) -> ValidationVerdict {
        match self.check(text, database, max_query_length) {
            Ok(_) => ValidationVerdict::Accepted,
            Err(error) => ValidationVerdict::Rejected(error.codes),
        }
    }

    /// Validates a query and returns its tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] with the first failing check's code.
    pub fn check<'t>(
        &self,
        text: &'t str,
        database: Option<&str>,
        max_query_length: usize,
    ) -> Result<ValidatedQuery<'t>, ValidationError> {
        if text.chars().count() > max_query_length {
            return Err(ValidationError::single(ViolationCode::QueryTooLong));
        }
        if text.trim().is_empty() {
            return Err(ValidationError::single(ViolationCode::MalformedQuery));
        }
        let tokens = check_structure(text)?;
        check_read_only(&tokens)?;
        self.check_dangerous(&tokens)?;
        if let Some(database) = database
            && !self.databases.permits(database)
        {
            return Err(ValidationError::single(ViolationCode::DatabaseNotAllowed));
        }
        Ok(ValidatedQuery {
            text,
            tokens,
        })
    }

    /// Rejects dangerous constructs and four-part names.
    fn check_dangerous(&self, tokens: &[Token<'_>]) -> Result<(), ValidationError> {
        let significant: Vec<&Token<'_>> = tokens.iter().filter(|token| !token.is_trivia()).collect();
        let dangerous = significant
            .iter()
            .any(|token| self.patterns.iter().any(|pattern| pattern.matches(token)));
        if dangerous || longest_dotted_name(&significant) > MAX_NAME_PARTS {
            return Err(ValidationError::single(ViolationCode::DangerousConstruct));
        }
        Ok(())
    }
}

/// Tokenizes and rejects unsafe structure.
fn check_structure(text: &str) -> Result<Vec<Token<'_>>, ValidationError> {
    let malformed = || ValidationError::single(ViolationCode::MalformedQuery);
    let tokens = tokenize(text).map_err(|_| malformed())?;
    let mut semicolon_seen = false;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::BlockComment => return Err(malformed()),
            TokenKind::LineComment if !text[token.end()..].starts_with('\n') => {
                return Err(malformed());
            }
            TokenKind::Operator if token.text == "\\" => return Err(malformed()),
            TokenKind::Semicolon => {
                if semicolon_seen || idx + 1 != tokens.len() {
                    return Err(malformed());
                }
                semicolon_seen = true;
            }
            _ => {}
        }
    }
    if tokens.iter().all(|token| token.is_trivia() || token.kind == TokenKind::Semicolon) {
        return Err(malformed());
    }
    Ok(tokens)
}

/// Requires a single `SELECT` or `WITH ... SELECT` and no write keywords.
fn check_read_only(tokens: &[Token<'_>]) -> Result<(), ValidationError> {
    let blocked = || ValidationError::single(ViolationCode::WriteOperationBlocked);
    let mut words = tokens.iter().filter(|token| !token.is_trivia() && token.kind != TokenKind::LParen);
    let starts_with_read = match words.next() {
        Some(first) if first.is_keyword("SELECT") => true,
        Some(first) if first.is_keyword("WITH") => tokens.iter().any(|token| token.is_keyword("SELECT")),
        _ => false,
    };
    if !starts_with_read {
        return Err(blocked());
    }
    let writes = tokens.iter().any(|token| {
        token.kind == TokenKind::Word
            && WRITE_KEYWORDS.iter().any(|keyword| token.text.eq_ignore_ascii_case(keyword))
    });
    if writes {
        return Err(blocked());
    }
    Ok(())
}

/// Returns the part count of the longest dotted name chain.
///
/// Empty parts count, so `a.b..c` has four parts.
fn longest_dotted_name(tokens: &[&Token<'_>]) -> usize {
    let mut longest = 0;
    let mut dots = 0;
    let mut in_chain = false;
    let mut prev_dot = false;
    for token in tokens {
        match token.kind {
            TokenKind::Word | TokenKind::QuotedIdentifier => {
                if !prev_dot {
                    dots = 0;
                }
                in_chain = true;
                prev_dot = false;
            }
            TokenKind::Dot => {
                if !in_chain {
                    dots = 0;
                }
                dots += 1;
                in_chain = true;
                prev_dot = true;
                longest = longest.max(dots + 1);
            }
            _ => {
                dots = 0;
                in_chain = false;
                prev_dot = false;
            }
        }
    }
    longest
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Validates an identifier and wraps it in the engine's quoting.
///
/// # Errors
///
/// Returns [`ViolationCode::InvalidIdentifier`] unless the name is 1 to
/// `max_len` characters of ASCII letters, digits, and underscores.
pub fn quote_identifier(
    name: &str,
    style: QuoteStyle,
    max_len: usize,
) -> Result<String, ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= max_len
        && name.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_');
    if !valid {
        return Err(ValidationError::single(ViolationCode::InvalidIdentifier));
    }
    Ok(match style {
        QuoteStyle::Bracket => format!("[{name}]"),
        QuoteStyle::DoubleQuote => format!("\"{name}\""),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
