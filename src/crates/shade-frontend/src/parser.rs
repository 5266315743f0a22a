// src/parser.rs

use crate::ast::TranslationUnit;
use crate::errors::{LexerError, ParserError};
use crate::version::ShadingLanguageVersion;
use crate::{Lexer, Span, Token, TokenType};

pub struct Parser<'src> {
    pub(crate) lexer: Lexer<'src>,
    pub(crate) current: Token<'src>,
    pub(crate) previous: Token<'src>,
    pub(crate) tu: TranslationUnit,
    /// First lexer error seen, reported when the parser reaches its token.
    lex_error: Option<LexerError>,
}

/// A parse error wrapping a miette-enabled ParserError
#[derive(Debug)]
pub struct ParseError {
    pub error: ParserError,
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(error: ParserError, span: Span) -> Self {
        Self { error, span }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.line, self.span.column, self.error)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Parse a complete shader.
pub fn parse(source: &str) -> Result<TranslationUnit, ParseError> {
    Parser::new(source).parse_translation_unit()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let lex_error = lexer.take_errors().into_iter().next();
        Self {
            lexer,
            current,
            previous: Token::new(TokenType::Eof, "", Span::default()),
            tu: TranslationUnit::default(),
            lex_error,
        }
    }

    pub fn parse_translation_unit(mut self) -> Result<TranslationUnit, ParseError> {
        if self.check(TokenType::Directive) && self.current.lexeme.contains("version") {
            let version = ShadingLanguageVersion::from_directive(self.current.lexeme)
                .ok_or_else(|| {
                    self.error(ParserError::MalformedVersion {
                        span: self.current.span.into(),
                    })
                })?;
            self.tu.version = Some(version);
            self.advance();
        }

        while !self.check(TokenType::Eof) {
            self.external_declaration()?;
        }

        tracing::debug!(decls = self.tu.decls.len(), "parsed translation unit");
        Ok(self.tu)
    }

    /// Advance to the next token
    pub(crate) fn advance(&mut self) {
        let next = self.lexer.next_token();
        if next.ty == TokenType::Error
            && self.lex_error.is_none()
            && let Some(error) = self.lexer.take_errors().into_iter().next()
        {
            self.lex_error = Some(error);
        }
        self.previous = std::mem::replace(&mut self.current, next);
    }

    /// Look one token past the current one without consuming anything.
    pub(crate) fn peek_token(&self) -> Token<'src> {
        self.lexer.clone().next_token()
    }

    /// Check if the current token matches the given type
    pub(crate) fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    /// Consume the current token if it matches, otherwise return false
    pub(crate) fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require a token of the given type, or return an error
    pub(crate) fn consume(&mut self, ty: TokenType) -> Result<(), ParseError> {
        if self.check(ty) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(ParserError::ExpectedToken {
                expected: ty.as_str().to_string(),
                found: self.current.lexeme.to_string(),
                span: self.current.span.into(),
            }))
        }
    }

    /// Require an identifier and return its text.
    pub(crate) fn identifier(&mut self) -> Result<String, ParseError> {
        if self.check(TokenType::Identifier) {
            let name = self.current.lexeme.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(ParserError::ExpectedIdentifier {
                span: self.current.span.into(),
            }))
        }
    }

    /// Wrap an error at the current token. If the current token is the
    /// product of a lexer error, that error is reported instead.
    pub(crate) fn error(&self, error: ParserError) -> ParseError {
        if self.current.ty == TokenType::Error
            && let Some(lex) = &self.lex_error
        {
            return ParseError::new(ParserError::Lexer(lex.clone()), self.current.span);
        }
        ParseError::new(error, self.current.span)
    }

    /// Create an unexpected token error at the current position
    pub(crate) fn unexpected_token_error(&self) -> ParseError {
        self.error(ParserError::UnexpectedToken {
            token: self.current.lexeme.to_string(),
            span: self.current.span.into(),
        })
    }
}

#[cfg(test)]
mod tests;
