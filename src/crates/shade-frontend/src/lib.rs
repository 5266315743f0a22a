//! shade-frontend: lexer, parser, arena AST and printer for a GLSL-like
//! shading language.

pub mod ast;
pub mod errors;
pub mod lexer;
mod parse_decl;
mod parse_expr;
mod parse_stmt;
pub mod parser;
pub mod printer;
pub mod token;
pub mod version;
pub mod visit;

pub use ast::{
    BinaryOp, DeclId, DeclKind, Declarator, ExprId, ExprKind, FieldDecl, FunctionDecl, Literal,
    Param, Qualifier, StmtId, StmtKind, StructDecl, TranslationUnit, TypeSpec, UnaryOp, VarDecl,
};
pub use errors::{LexerError, ParserError};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, parse};
pub use printer::{print, print_expr_to_string};
pub use token::{Span, Token, TokenType};
pub use version::ShadingLanguageVersion;
pub use visit::{Visitor, walk_decl, walk_expr, walk_stmt, walk_translation_unit};
