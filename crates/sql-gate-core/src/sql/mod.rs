// crates/sql-gate-core/src/sql/mod.rs
// ============================================================================
// Module: SQL Inspection
// Description: Lexing, validation, review, and hint rendering for query text.
// Purpose: Group the pure, engine-independent query checks.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Everything in this module is pure: no I/O, no clocks, no shared state.
//! Given the same text and configuration, every function returns the same
//! answer.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod analyzer;
pub mod hints;
pub mod lexer;
pub mod rules;
pub mod shape;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use analyzer::Analyzer;
pub use hints::HintDialect;
pub use hints::render_hints;
pub use lexer::LexError;
pub use lexer::Token;
pub use lexer::TokenKind;
pub use lexer::tokenize;
pub use rules::DANGEROUS_PATTERNS;
pub use rules::DangerKind;
pub use rules::DangerousPattern;
pub use rules::Rule;
pub use rules::RuleConfigError;
pub use rules::RuleKind;
pub use rules::RuleRegistry;
pub use shape::QueryShape;
pub use validator::DEFAULT_MAX_IDENTIFIER_LENGTH;
pub use validator::DatabasePolicy;
pub use validator::QuoteStyle;
pub use validator::StructuralValidator;
pub use validator::ValidatedQuery;
pub use validator::ValidationError;
pub use validator::ValidationVerdict;
pub use validator::ViolationCode;
pub use validator::quote_identifier;
