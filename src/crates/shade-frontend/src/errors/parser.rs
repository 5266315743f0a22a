// src/errors/parser.rs
//! Parser errors (E1xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use super::LexerError;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected expression, found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedExpression {
        found: String,
        #[label("expected expression")]
        span: SourceSpan,
    },

    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}'")]
    #[diagnostic(code(E1003))]
    UnexpectedToken {
        token: String,
        #[label("unexpected")]
        span: SourceSpan,
    },

    #[error("expected type name")]
    #[diagnostic(code(E1004))]
    ExpectedType {
        #[label("expected type")]
        span: SourceSpan,
    },

    #[error("expected identifier")]
    #[diagnostic(code(E1006))]
    ExpectedIdentifier {
        #[label("expected identifier")]
        span: SourceSpan,
    },

    #[error("invalid array size '{text}'")]
    #[diagnostic(code(E1012), help("array sizes must be integer literals"))]
    InvalidArraySize {
        text: String,
        #[label("invalid array size")]
        span: SourceSpan,
    },

    #[error("malformed #version directive")]
    #[diagnostic(code(E1013), help("expected '#version <number>' optionally followed by 'es'"))]
    MalformedVersion {
        #[label("here")]
        span: SourceSpan,
    },

    #[error("statement is not allowed at top level")]
    #[diagnostic(
        code(E1014),
        help("only declarations, precision statements and directives may appear at top level")
    )]
    StatementAtTopLevel {
        #[label("statement at top level")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lexer(#[from] LexerError),
}
