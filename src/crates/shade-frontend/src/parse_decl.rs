// src/parse_decl.rs
//
// Top-level declarations, qualifiers and declarators.

use crate::ast::*;
use crate::errors::ParserError;
use crate::parser::{ParseError, Parser};
use crate::token::TokenType;

impl<'src> Parser<'src> {
    /// Parse one top-level item and append it to the unit.
    pub(crate) fn external_declaration(&mut self) -> Result<(), ParseError> {
        match self.current.ty {
            TokenType::Directive => {
                let text = self.current.lexeme.to_string();
                self.advance();
                self.tu.push_decl(DeclKind::Directive(text));
            }
            TokenType::KwPrecision => {
                let decl = self.precision_decl()?;
                self.tu.push_decl(decl);
            }
            TokenType::KwStruct => {
                let decl = self.struct_decl()?;
                self.tu.push_decl(DeclKind::Struct(decl));
            }
            TokenType::Semicolon => {
                // A stray `;` between declarations carries no meaning.
                self.advance();
            }
            ty if ty == TokenType::Identifier || ty.is_qualifier() => {
                let ty = self.type_spec()?;
                let name = self.identifier()?;
                let decl = if self.check(TokenType::LParen) {
                    DeclKind::Function(self.function_rest(ty, name)?)
                } else {
                    DeclKind::Variables(self.var_decl_rest(ty, name)?)
                };
                self.tu.push_decl(decl);
            }
            TokenType::Eof => {}
            _ => {
                return Err(self.error(ParserError::StatementAtTopLevel {
                    span: self.current.span.into(),
                }));
            }
        }
        Ok(())
    }

    /// `precision highp float;`
    fn precision_decl(&mut self) -> Result<DeclKind, ParseError> {
        self.consume(TokenType::KwPrecision)?;
        let precision = match self.current.ty {
            TokenType::KwHighp => Precision::High,
            TokenType::KwMediump => Precision::Medium,
            TokenType::KwLowp => Precision::Low,
            _ => return Err(self.unexpected_token_error()),
        };
        self.advance();
        let ty = self.type_name()?;
        self.consume(TokenType::Semicolon)?;
        Ok(DeclKind::Precision { precision, ty })
    }

    /// `struct S { float a; vec2 b, c[2]; };`
    fn struct_decl(&mut self) -> Result<StructDecl, ParseError> {
        self.consume(TokenType::KwStruct)?;
        let name = self.identifier()?;
        self.consume(TokenType::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            let ty = self.type_spec()?;
            loop {
                let field_name = self.identifier()?;
                let array_size = self.array_size()?;
                fields.push(FieldDecl {
                    ty: ty.clone(),
                    name: field_name,
                    array_size,
                });
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
            self.consume(TokenType::Semicolon)?;
        }

        self.consume(TokenType::RBrace)?;
        self.consume(TokenType::Semicolon)?;
        Ok(StructDecl { name, fields })
    }

    /// Parameters and optional body after `type name`.
    fn function_rest(&mut self, return_type: TypeSpec, name: String) -> Result<FunctionDecl, ParseError> {
        self.consume(TokenType::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                params.push(self.param()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen)?;

        // `f(void)` is the same as `f()`.
        if let [only] = params.as_slice()
            && only.name.is_none()
            && only.ty.name == "void"
            && only.ty.qualifiers.is_empty()
        {
            params.clear();
        }

        let body = if self.match_token(TokenType::Semicolon) {
            None
        } else if self.check(TokenType::LBrace) {
            Some(self.block()?)
        } else {
            return Err(self.unexpected_token_error());
        };

        Ok(FunctionDecl {
            return_type,
            name,
            params,
            body,
        })
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        let ty = self.type_spec()?;
        let (name, array_size) = if self.check(TokenType::Identifier) {
            let name = self.identifier()?;
            (Some(name), self.array_size()?)
        } else {
            (None, None)
        };
        Ok(Param {
            ty,
            name,
            array_size,
        })
    }

    /// Declarators after `type first_name`, through the closing `;`.
    pub(crate) fn var_decl_rest(&mut self, ty: TypeSpec, first_name: String) -> Result<VarDecl, ParseError> {
        let mut declarators = vec![self.declarator(first_name)?];
        while self.match_token(TokenType::Comma) {
            let name = self.identifier()?;
            declarators.push(self.declarator(name)?);
        }
        self.consume(TokenType::Semicolon)?;
        Ok(VarDecl { ty, declarators })
    }

    fn declarator(&mut self, name: String) -> Result<Declarator, ParseError> {
        let array_size = self.array_size()?;
        let init = if self.match_token(TokenType::Eq) {
            Some(self.assignment()?)
        } else {
            None
        };
        Ok(Declarator {
            name,
            array_size,
            init,
        })
    }

    /// Optional `[N]` suffix with an integer literal size.
    fn array_size(&mut self) -> Result<Option<u32>, ParseError> {
        if !self.match_token(TokenType::LBracket) {
            return Ok(None);
        }
        let token = self.current.clone();
        let size = match token.ty {
            TokenType::IntLiteral | TokenType::UintLiteral => {
                parse_int_literal(token.lexeme.trim_end_matches(['u', 'U']))
            }
            _ => None,
        };
        let Some(size) = size else {
            return Err(self.error(ParserError::InvalidArraySize {
                text: token.lexeme.to_string(),
                span: token.span.into(),
            }));
        };
        self.advance();
        self.consume(TokenType::RBracket)?;
        Ok(Some(size))
    }

    /// Qualifiers followed by a type name.
    pub(crate) fn type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        let qualifiers = self.qualifiers()?;
        let name = self.type_name()?;
        Ok(TypeSpec { qualifiers, name })
    }

    fn type_name(&mut self) -> Result<String, ParseError> {
        if self.check(TokenType::Identifier) {
            self.identifier()
        } else {
            Err(self.error(ParserError::ExpectedType {
                span: self.current.span.into(),
            }))
        }
    }

    fn qualifiers(&mut self) -> Result<Vec<Qualifier>, ParseError> {
        let mut qualifiers = Vec::new();
        while self.current.ty.is_qualifier() {
            let qualifier = match self.current.ty {
                TokenType::KwConst => Qualifier::Const,
                TokenType::KwUniform => Qualifier::Uniform,
                TokenType::KwIn => Qualifier::In,
                TokenType::KwOut => Qualifier::Out,
                TokenType::KwInout => Qualifier::InOut,
                TokenType::KwAttribute => Qualifier::Attribute,
                TokenType::KwVarying => Qualifier::Varying,
                TokenType::KwFlat => Qualifier::Flat,
                TokenType::KwInvariant => Qualifier::Invariant,
                TokenType::KwHighp => Qualifier::Precision(Precision::High),
                TokenType::KwMediump => Qualifier::Precision(Precision::Medium),
                TokenType::KwLowp => Qualifier::Precision(Precision::Low),
                _ => {
                    qualifiers.push(self.layout()?);
                    continue;
                }
            };
            self.advance();
            qualifiers.push(qualifier);
        }
        Ok(qualifiers)
    }

    /// `layout(location = 0, std140)`
    fn layout(&mut self) -> Result<Qualifier, ParseError> {
        self.consume(TokenType::KwLayout)?;
        self.consume(TokenType::LParen)?;
        let mut items = Vec::new();
        loop {
            let key = self.identifier()?;
            let value = if self.match_token(TokenType::Eq) {
                match self.current.ty {
                    TokenType::IntLiteral | TokenType::UintLiteral | TokenType::Identifier => {
                        let text = self.current.lexeme.to_string();
                        self.advance();
                        Some(text)
                    }
                    _ => return Err(self.unexpected_token_error()),
                }
            } else {
                None
            };
            items.push(LayoutItem { key, value });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.consume(TokenType::RParen)?;
        Ok(Qualifier::Layout(items))
    }
}

/// Decimal or `0x` hexadecimal integer text.
pub(crate) fn parse_int_literal(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
