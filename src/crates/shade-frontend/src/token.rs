// src/token.rs

/// Single source of truth for keyword-to-token mapping.
///
/// Each entry `"text" => Variant` generates:
/// - A match arm in `TokenType::keyword_type`: `"text" => Some(TokenType::Variant)`
/// - A match arm in `TokenType::as_str`:       `Self::Variant => "text"`
macro_rules! define_keywords {
    ( $( $text:literal => $variant:ident ),+ $(,)? ) => {
        impl TokenType {
            /// Check if a string is a keyword and return its token type.
            pub fn keyword_type(text: &str) -> Option<TokenType> {
                match text {
                    $( $text => Some(TokenType::$variant), )+
                    _ => None,
                }
            }

            /// String representation for keyword tokens (used by `as_str`).
            fn keyword_as_str(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($text), )+
                    _ => None,
                }
            }
        }
    };
}

define_keywords! {
    // Statements
    "if"        => KwIf,
    "else"      => KwElse,
    "for"       => KwFor,
    "while"     => KwWhile,
    "do"        => KwDo,
    "return"    => KwReturn,
    "break"     => KwBreak,
    "continue"  => KwContinue,
    "discard"   => KwDiscard,
    "struct"    => KwStruct,
    "precision" => KwPrecision,
    "true"      => KwTrue,
    "false"     => KwFalse,
    // Qualifiers
    "const"     => KwConst,
    "uniform"   => KwUniform,
    "in"        => KwIn,
    "out"       => KwOut,
    "inout"     => KwInout,
    "attribute" => KwAttribute,
    "varying"   => KwVarying,
    "flat"      => KwFlat,
    "invariant" => KwInvariant,
    "highp"     => KwHighp,
    "mediump"   => KwMediump,
    "lowp"      => KwLowp,
    "layout"    => KwLayout,
}

/// All token types of the shading language.
///
/// Type names (`float`, `vec4`, `mat2x3`, user structs) are plain identifiers;
/// the parser decides from context whether an identifier names a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,
    UintLiteral,
    FloatLiteral,
    Identifier,
    /// A whole preprocessor line, e.g. `#version 310 es` or `#define X 1`.
    Directive,

    // Keywords
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwDo,
    KwReturn,
    KwBreak,
    KwContinue,
    KwDiscard,
    KwStruct,
    KwPrecision,
    KwTrue,
    KwFalse,
    KwConst,
    KwUniform,
    KwIn,
    KwOut,
    KwInout,
    KwAttribute,
    KwVarying,
    KwFlat,
    KwInvariant,
    KwHighp,
    KwMediump,
    KwLowp,
    KwLayout,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    LessLessEq,
    GreaterGreaterEq,
    AmpEq,
    CaretEq,
    PipeEq,
    EqEq,
    BangEq,
    Bang,
    AmpAmp,
    PipePipe,
    CaretCaret,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,
    Question,
    Colon,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,

    // Special
    Eof,
    Error,
}

impl TokenType {
    /// Get string representation for error messages
    pub fn as_str(&self) -> &'static str {
        if let Some(s) = self.keyword_as_str() {
            return s;
        }
        match self {
            Self::IntLiteral => "integer",
            Self::UintLiteral => "unsigned integer",
            Self::FloatLiteral => "float",
            Self::Identifier => "identifier",
            Self::Directive => "preprocessor directive",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::LessLessEq => "<<=",
            Self::GreaterGreaterEq => ">>=",
            Self::AmpEq => "&=",
            Self::CaretEq => "^=",
            Self::PipeEq => "|=",
            Self::EqEq => "==",
            Self::BangEq => "!=",
            Self::Bang => "!",
            Self::AmpAmp => "&&",
            Self::PipePipe => "||",
            Self::CaretCaret => "^^",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Eq => "=",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::LessLess => "<<",
            Self::GreaterGreater => ">>",
            Self::Question => "?",
            Self::Colon => ":",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::Eof => "end of file",
            Self::Error => "error",
            // Keyword variants are handled by `keyword_as_str()` above.
            _ => "keyword",
        }
    }

    /// Get precedence for binary operators (Pratt parsing).
    ///
    /// Only the operators parsed by the Pratt loop have a precedence here;
    /// assignment, ternary and comma are handled by dedicated parser levels.
    /// The numbers line up with [`crate::ast::BinaryOp::precedence`].
    pub fn precedence(&self) -> u8 {
        match self {
            Self::PipePipe => 4,
            Self::CaretCaret => 5,
            Self::AmpAmp => 6,
            Self::Pipe => 7,
            Self::Caret => 8,
            Self::Ampersand => 9,
            Self::EqEq | Self::BangEq => 10,
            Self::Lt | Self::Gt | Self::LtEq | Self::GtEq => 11,
            Self::LessLess | Self::GreaterGreater => 12,
            Self::Plus | Self::Minus => 13,
            Self::Star | Self::Slash | Self::Percent => 14,
            _ => 0,
        }
    }

    /// Whether this token is a storage, precision or layout qualifier.
    pub fn is_qualifier(&self) -> bool {
        matches!(
            self,
            Self::KwConst
                | Self::KwUniform
                | Self::KwIn
                | Self::KwOut
                | Self::KwInout
                | Self::KwAttribute
                | Self::KwVarying
                | Self::KwFlat
                | Self::KwInvariant
                | Self::KwHighp
                | Self::KwMediump
                | Self::KwLowp
                | Self::KwLayout
        )
    }
}

/// Byte range plus line/column of a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,  // Byte offset
    pub end: usize,    // Byte offset (exclusive)
    pub line: u32,     // 1-indexed
    pub column: u32,   // 1-indexed
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        // miette uses (offset, length)
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

/// A token with its location in source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub ty: TokenType,
    pub lexeme: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(ty: TokenType, lexeme: &'src str, span: Span) -> Self {
        Self { ty, lexeme, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip_through_as_str() {
        for kw in ["if", "uniform", "layout", "precision", "discard"] {
            let ty = TokenType::keyword_type(kw).unwrap();
            assert_eq!(ty.as_str(), kw);
        }
        assert_eq!(TokenType::keyword_type("vec4"), None);
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert!(TokenType::Star.precedence() > TokenType::Plus.precedence());
        assert!(TokenType::AmpAmp.precedence() > TokenType::PipePipe.precedence());
        assert_eq!(TokenType::Eq.precedence(), 0);
    }

    #[test]
    fn span_merge_keeps_start_and_takes_end() {
        let merged = Span::new(0, 5, 1, 1).merge(Span::new(10, 15, 2, 3));
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 15);
        assert_eq!(merged.line, 1);
    }
}
