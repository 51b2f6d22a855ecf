// crates/sql-gate-core/src/sql/lexer.rs
// ============================================================================
// Module: SQL Lexer
// Description: Tokenizer for read-only SQL text.
// Purpose: Classify query text so checks never match inside literals.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The lexer splits query text into [`Token`]s: words, quoted identifiers,
//! string literals, numbers, variables, punctuation, and comments. It is not a
//! parser. Its job is to let keyword and pattern checks ignore text that sits
//! inside string literals or quoted identifiers, and to surface comments so the
//! validator can reject them.
//!
//! Tokens borrow from the input and record their byte offset, which lets later
//! stages splice text (for example when merging `OPTION` hints).
//!
//! Security posture: input is untrusted. Unterminated literals, identifiers,
//! and block comments are errors, never silently closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: keyword, identifier, or function name.
    Word,
    /// Delimited identifier (`[x]`, `"x"`, or backtick-quoted).
    QuotedIdentifier,
    /// String literal, including `N'..'` national literals.
    StringLiteral,
    /// Numeric or binary literal.
    Number,
    /// Variable reference (`@x` or `@@x`).
    Variable,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `;`
    Semicolon,
    /// `*`
    Star,
    /// Any other operator or symbol.
    Operator,
    /// `--` comment running to end of line.
    LineComment,
    /// `/* .. */` comment.
    BlockComment,
}

/// Lexed token borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token classification.
    pub kind: TokenKind,
    /// Exact source text.
    pub text: &'a str,
    /// Byte offset of the token start.
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Returns true for comments.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Returns true when this is a bare word equal to `keyword` (ASCII case-insensitive).
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Returns true for bare words and delimited identifiers.
    #[must_use]
    pub const fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdentifier)
    }

    /// Returns the identifier text without delimiters.
    #[must_use]
    pub fn name_text(&self) -> &'a str {
        match self.kind {
            TokenKind::QuotedIdentifier if self.text.len() >= 2 => {
                &self.text[1..self.text.len() - 1]
            }
            _ => self.text,
        }
    }

    /// Returns the byte offset just past the token.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tokenization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexError {
    /// String literal without a closing quote.
    #[error("unterminated string literal at byte {0}")]
    UnterminatedString(usize),
    /// Delimited identifier without a closing delimiter.
    #[error("unterminated identifier at byte {0}")]
    UnterminatedIdentifier(usize),
    /// Block comment without a closing `*/`.
    #[error("unterminated block comment at byte {0}")]
    UnterminatedComment(usize),
    /// Null byte in the input.
    #[error("null byte at byte {0}")]
    NullByte(usize),
}

// ============================================================================
// SECTION: Tokenizer
// ============================================================================

/// Tokenizes query text, including comment tokens.
///
/// # Errors
///
/// Returns [`LexError`] for null bytes and unterminated constructs.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer {
        src: text,
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Cursor over the source text.
struct Lexer<'a> {
    /// Source text.
    src: &'a str,
    /// Current byte offset.
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Returns the character at the cursor.
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Returns the character `n` positions past the cursor.
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    /// Advances past one character.
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Advances while the predicate holds.
    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    /// Builds a token from `start` to the cursor.
    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.src[start..self.pos],
            offset: start,
        }
    }

    /// Lexes the next token, skipping whitespace.
    fn next_token(&mut self) -> Result<Option<Token<'a>>, LexError> {
        self.bump_while(char::is_whitespace);
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let token = match ch {
            '\0' => return Err(LexError::NullByte(start)),
            '-' if self.peek_nth(1) == Some('-') => {
                self.bump_while(|c| c != '\n');
                self.token(TokenKind::LineComment, start)
            }
            '/' if self.peek_nth(1) == Some('*') => self.block_comment(start)?,
            '\'' => self.delimited('\'', TokenKind::StringLiteral, start)?,
            'N' | 'n' if self.peek_nth(1) == Some('\'') => {
                self.bump();
                self.delimited('\'', TokenKind::StringLiteral, start)?
            }
            '[' => self.delimited(']', TokenKind::QuotedIdentifier, start)?,
            '"' => self.delimited('"', TokenKind::QuotedIdentifier, start)?,
            '`' => self.delimited('`', TokenKind::QuotedIdentifier, start)?,
            '@' => {
                self.bump();
                if self.peek() == Some('@') {
                    self.bump();
                }
                self.bump_while(is_word_char);
                self.token(TokenKind::Variable, start)
            }
            c if c.is_ascii_digit() => self.number(start),
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.number(start),
            c if c.is_alphabetic() || c == '_' || c == '#' => {
                self.bump_while(is_word_char);
                self.token(TokenKind::Word, start)
            }
            '.' => self.single(TokenKind::Dot, start),
            ',' => self.single(TokenKind::Comma, start),
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '*' => self.single(TokenKind::Star, start),
            _ => self.operator(start),
        };
        Ok(Some(token))
    }

    /// Lexes a one-character token.
    fn single(&mut self, kind: TokenKind, start: usize) -> Token<'a> {
        self.bump();
        self.token(kind, start)
    }

    /// Lexes an operator, joining common two-character forms.
    fn operator(&mut self, start: usize) -> Token<'a> {
        let first = self.bump();
        let joined = matches!(
            (first, self.peek()),
            (Some('<' | '>' | '!' | '='), Some('=' | '>')) | (Some('|'), Some('|')) | (Some(':'), Some(':'))
        );
        if joined {
            self.bump();
        }
        self.token(TokenKind::Operator, start)
    }

    /// Lexes a numeric or binary literal.
    fn number(&mut self, start: usize) -> Token<'a> {
        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x' | 'X')) {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit());
            return self.token(TokenKind::Number, start);
        }
        self.bump_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
        self.token(TokenKind::Number, start)
    }

    /// Lexes a delimited literal or identifier; a doubled closer is an escape.
    fn delimited(
        &mut self,
        close: char,
        kind: TokenKind,
        start: usize,
    ) -> Result<Token<'a>, LexError> {
        self.bump();
        loop {
            match self.bump() {
                Some(c) if c == close => {
                    if self.peek() == Some(close) {
                        self.bump();
                    } else {
                        return Ok(self.token(kind, start));
                    }
                }
                Some('\0') => return Err(LexError::NullByte(self.pos - 1)),
                Some(_) => {}
                None => {
                    return Err(match kind {
                        TokenKind::StringLiteral => LexError::UnterminatedString(start),
                        _ => LexError::UnterminatedIdentifier(start),
                    });
                }
            }
        }
    }

    /// Lexes a possibly nested block comment.
    fn block_comment(&mut self, start: usize) -> Result<Token<'a>, LexError> {
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match (self.bump(), self.peek()) {
                (Some('*'), Some('/')) => {
                    self.bump();
                    depth -= 1;
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    depth += 1;
                }
                (Some('\0'), _) => return Err(LexError::NullByte(self.pos - 1)),
                (Some(_), _) => {}
                (None, _) => return Err(LexError::UnterminatedComment(start)),
            }
        }
        Ok(self.token(TokenKind::BlockComment, start))
    }
}

/// Returns true for characters that continue a bare word.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | '#' | '@')
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions on lexer output."
    )]

    use super::LexError;
    use super::TokenKind;
    use super::tokenize;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).expect("tokenize").into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn keywords_inside_literals_stay_literals() {
        let tokens = tokenize("SELECT 'DROP TABLE x' AS [delete]").expect("tokenize");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[3].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[3].name_text(), "delete");
    }

    #[test]
    fn doubled_quotes_escape() {
        let tokens = tokenize("SELECT 'it''s', N'x', [a]]b]").expect("tokenize");
        assert_eq!(tokens[1].text, "'it''s'");
        assert_eq!(tokens[3].text, "N'x'");
        assert_eq!(tokens[5].text, "[a]]b]");
    }

    #[test]
    fn comments_are_tokens() {
        assert_eq!(
            kinds("SELECT 1 -- note\n/* a /* nested */ b */"),
            vec![
                TokenKind::Word,
                TokenKind::Number,
                TokenKind::LineComment,
                TokenKind::BlockComment
            ]
        );
    }

    #[test]
    fn unterminated_constructs_fail() {
        assert_eq!(tokenize("SELECT 'abc"), Err(LexError::UnterminatedString(7)));
        assert_eq!(tokenize("SELECT [abc"), Err(LexError::UnterminatedIdentifier(7)));
        assert_eq!(tokenize("SELECT 1 /* x"), Err(LexError::UnterminatedComment(9)));
        assert_eq!(tokenize("SELECT \0"), Err(LexError::NullByte(7)));
    }

    #[test]
    fn numbers_variables_and_operators() {
        let tokens = tokenize("WHERE a >= 1.5e3 AND b <> @p AND c = 0x1F").expect("tokenize");
        let texts: Vec<&str> = tokens.iter().map(|token| token.text).collect();
        assert_eq!(
            texts,
            vec!["WHERE", "a", ">=", "1.5e3", "AND", "b", "<>", "@p", "AND", "c", "=", "0x1F"]
        );
        assert_eq!(tokens[7].kind, TokenKind::Variable);
    }

    #[test]
    fn offsets_point_into_source() {
        let text = "SELECT  x\nFROM t";
        for token in tokenize(text).expect("tokenize") {
            assert_eq!(&text[token.offset..token.end()], token.text);
        }
    }
}
