// src/lexer.rs

use crate::errors::LexerError;
use crate::{Span, Token, TokenType};

#[derive(Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    current: usize,
    start: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    // Error collection
    errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            current: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors have been collected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token<'src> {
        if let Some(error) = self.skip_whitespace_and_comments() {
            return error;
        }

        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some(b) = self.advance() else {
            return self.make_token(TokenType::Eof);
        };

        match b {
            b'(' => self.make_token(TokenType::LParen),
            b')' => self.make_token(TokenType::RParen),
            b'{' => self.make_token(TokenType::LBrace),
            b'}' => self.make_token(TokenType::RBrace),
            b'[' => self.make_token(TokenType::LBracket),
            b']' => self.make_token(TokenType::RBracket),
            b',' => self.make_token(TokenType::Comma),
            b';' => self.make_token(TokenType::Semicolon),
            b':' => self.make_token(TokenType::Colon),
            b'?' => self.make_token(TokenType::Question),
            b'~' => self.make_token(TokenType::Tilde),
            b'#' => self.directive(),
            b'.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.number()
                } else {
                    self.make_token(TokenType::Dot)
                }
            }
            b'+' => {
                if self.match_byte(b'+') {
                    self.make_token(TokenType::PlusPlus)
                } else if self.match_byte(b'=') {
                    self.make_token(TokenType::PlusEq)
                } else {
                    self.make_token(TokenType::Plus)
                }
            }
            b'-' => {
                if self.match_byte(b'-') {
                    self.make_token(TokenType::MinusMinus)
                } else if self.match_byte(b'=') {
                    self.make_token(TokenType::MinusEq)
                } else {
                    self.make_token(TokenType::Minus)
                }
            }
            b'*' => self.with_eq(TokenType::Star, TokenType::StarEq),
            b'/' => self.with_eq(TokenType::Slash, TokenType::SlashEq),
            b'%' => self.with_eq(TokenType::Percent, TokenType::PercentEq),
            b'=' => self.with_eq(TokenType::Eq, TokenType::EqEq),
            b'!' => self.with_eq(TokenType::Bang, TokenType::BangEq),
            b'&' => {
                if self.match_byte(b'&') {
                    self.make_token(TokenType::AmpAmp)
                } else {
                    self.with_eq(TokenType::Ampersand, TokenType::AmpEq)
                }
            }
            b'|' => {
                if self.match_byte(b'|') {
                    self.make_token(TokenType::PipePipe)
                } else {
                    self.with_eq(TokenType::Pipe, TokenType::PipeEq)
                }
            }
            b'^' => {
                if self.match_byte(b'^') {
                    self.make_token(TokenType::CaretCaret)
                } else {
                    self.with_eq(TokenType::Caret, TokenType::CaretEq)
                }
            }
            b'<' => {
                if self.match_byte(b'<') {
                    self.with_eq(TokenType::LessLess, TokenType::LessLessEq)
                } else {
                    self.with_eq(TokenType::Lt, TokenType::LtEq)
                }
            }
            b'>' => {
                if self.match_byte(b'>') {
                    self.with_eq(TokenType::GreaterGreater, TokenType::GreaterGreaterEq)
                } else {
                    self.with_eq(TokenType::Gt, TokenType::GtEq)
                }
            }
            c if c.is_ascii_digit() => self.number(),
            c if c == b'_' || c.is_ascii_alphabetic() => self.identifier(),
            _ => {
                // Re-decode so multi-byte characters are reported whole.
                let ch = self.source[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.current = self.start + ch.len_utf8();
                self.error_unexpected_char(ch)
            }
        }
    }

    /// Skip whitespace, line comments and block comments.
    ///
    /// Returns an error token for an unterminated block comment.
    fn skip_whitespace_and_comments(&mut self) -> Option<Token<'src>> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    self.start = self.current;
                    self.start_line = self.line;
                    self.start_column = self.column;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some(b'*') if self.peek() == Some(b'/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                            None => return Some(self.error_unterminated_comment()),
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    /// Advance to the next byte and return it
    fn advance(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.current)?;
        self.current += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.current + 1).copied()
    }

    /// Consume the next byte if it matches the expected byte
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// `plain` or, when followed by `=`, `with_eq`.
    fn with_eq(&mut self, plain: TokenType, with_eq: TokenType) -> Token<'src> {
        if self.match_byte(b'=') {
            self.make_token(with_eq)
        } else {
            self.make_token(plain)
        }
    }

    fn span(&self) -> Span {
        Span::new(self.start, self.current, self.start_line, self.start_column)
    }

    /// Create a token from start to current position
    fn make_token(&self, ty: TokenType) -> Token<'src> {
        Token::new(ty, &self.source[self.start..self.current], self.span())
    }

    /// A preprocessor line runs to the end of the line.
    fn directive(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.advance();
        }
        let text = self.source[self.start..self.current].trim_end();
        Token::new(TokenType::Directive, text, self.span())
    }

    /// Scan a number literal: decimal, hex, float with optional exponent, and
    /// the `u`/`U` (unsigned) and `f`/`F` (float) suffixes.
    fn number(&mut self) -> Token<'src> {
        let first = self.bytes[self.start];
        if first == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            let digits_start = self.current;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            if self.current == digits_start {
                return self.error_invalid_number();
            }
            return self.integer_suffix();
        }

        let mut is_float = first == b'.';
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if !is_float && self.peek() == Some(b'.') {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            let exp_start = self.current;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            if self.current == exp_start {
                return self.error_invalid_number();
            }
        }

        if is_float || matches!(self.peek(), Some(b'f' | b'F')) {
            if !self.match_byte(b'f') {
                self.match_byte(b'F');
            }
            if self.peek().is_some_and(is_ident_byte) {
                return self.error_invalid_number();
            }
            return self.make_token(TokenType::FloatLiteral);
        }
        self.integer_suffix()
    }

    fn integer_suffix(&mut self) -> Token<'src> {
        let ty = if self.match_byte(b'u') || self.match_byte(b'U') {
            TokenType::UintLiteral
        } else {
            TokenType::IntLiteral
        };
        if self.peek().is_some_and(is_ident_byte) {
            return self.error_invalid_number();
        }
        self.make_token(ty)
    }

    /// Scan an identifier or keyword
    fn identifier(&mut self) -> Token<'src> {
        while self.peek().is_some_and(is_ident_byte) {
            self.advance();
        }
        let text = &self.source[self.start..self.current];
        let ty = TokenType::keyword_type(text).unwrap_or(TokenType::Identifier);
        self.make_token(ty)
    }

    /// Create an error token and collect an error for an unexpected character.
    fn error_unexpected_char(&mut self, ch: char) -> Token<'src> {
        let span = self.span();
        tracing::debug!(char = %ch, line = span.line, col = span.column, "lexer error: unexpected character");
        self.errors.push(LexerError::UnexpectedCharacter {
            ch,
            span: span.into(),
        });
        Token::new(TokenType::Error, &self.source[self.start..self.current], span)
    }

    fn error_unterminated_comment(&mut self) -> Token<'src> {
        let span = self.span();
        tracing::debug!(line = span.line, col = span.column, "lexer error: unterminated comment");
        self.errors
            .push(LexerError::UnterminatedComment { span: span.into() });
        Token::new(TokenType::Error, &self.source[self.start..self.current], span)
    }

    fn error_invalid_number(&mut self) -> Token<'src> {
        // Swallow the rest of the malformed literal.
        while self.peek().is_some_and(is_ident_byte) {
            self.advance();
        }
        let span = self.span();
        tracing::debug!(line = span.line, col = span.column, "lexer error: invalid number");
        self.errors.push(LexerError::InvalidNumber { span: span.into() });
        Token::new(TokenType::Error, &self.source[self.start..self.current], span)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}
