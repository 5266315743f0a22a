// src/parse_stmt.rs
//
// Statement parsing.

use crate::ast::*;
use crate::parser::{ParseError, Parser};
use crate::token::TokenType;

impl<'src> Parser<'src> {
    /// Parse a block: `{ statements }`
    pub(crate) fn block(&mut self) -> Result<StmtId, ParseError> {
        self.consume(TokenType::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            stmts.push(self.statement()?);
        }
        self.consume(TokenType::RBrace)?;
        Ok(self.tu.add_stmt(StmtKind::Block(stmts)))
    }

    /// Parse a statement
    pub(crate) fn statement(&mut self) -> Result<StmtId, ParseError> {
        let kind = match self.current.ty {
            TokenType::LBrace => return self.block(),
            TokenType::KwIf => self.if_stmt()?,
            TokenType::KwFor => self.for_stmt()?,
            TokenType::KwWhile => self.while_stmt()?,
            TokenType::KwDo => self.do_while_stmt()?,
            TokenType::KwReturn => {
                self.advance();
                let value = if self.check(TokenType::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume(TokenType::Semicolon)?;
                StmtKind::Return(value)
            }
            TokenType::KwBreak => self.keyword_stmt(StmtKind::Break)?,
            TokenType::KwContinue => self.keyword_stmt(StmtKind::Continue)?,
            TokenType::KwDiscard => self.keyword_stmt(StmtKind::Discard)?,
            TokenType::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            _ if self.starts_declaration() => self.decl_stmt()?,
            _ => {
                let expr = self.expression()?;
                self.consume(TokenType::Semicolon)?;
                StmtKind::Expr(expr)
            }
        };
        Ok(self.tu.add_stmt(kind))
    }

    /// A qualifier, or `Type name`, starts a declaration; an identifier on
    /// its own starts an expression.
    fn starts_declaration(&self) -> bool {
        if self.current.ty.is_qualifier() {
            return true;
        }
        self.check(TokenType::Identifier) && self.peek_token().ty == TokenType::Identifier
    }

    fn decl_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let ty = self.type_spec()?;
        let name = self.identifier()?;
        Ok(StmtKind::VarDecl(self.var_decl_rest(ty, name)?))
    }

    /// `break;`, `continue;`, `discard;`
    fn keyword_stmt(&mut self, kind: StmtKind) -> Result<StmtKind, ParseError> {
        self.advance();
        self.consume(TokenType::Semicolon)?;
        Ok(kind)
    }

    fn if_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenType::KwIf)?;
        self.consume(TokenType::LParen)?;
        let cond = self.expression()?;
        self.consume(TokenType::RParen)?;
        let then_branch = self.statement()?;
        let else_branch = if self.match_token(TokenType::KwElse) {
            Some(self.statement()?)
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn for_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenType::KwFor)?;
        self.consume(TokenType::LParen)?;

        let init_kind = if self.match_token(TokenType::Semicolon) {
            StmtKind::Empty
        } else if self.starts_declaration() {
            self.decl_stmt()?
        } else {
            let expr = self.expression()?;
            self.consume(TokenType::Semicolon)?;
            StmtKind::Expr(expr)
        };
        let init = self.tu.add_stmt(init_kind);

        let cond = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon)?;

        let step = if self.check(TokenType::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RParen)?;

        let body = self.statement()?;
        Ok(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn while_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenType::KwWhile)?;
        self.consume(TokenType::LParen)?;
        let cond = self.expression()?;
        self.consume(TokenType::RParen)?;
        let body = self.statement()?;
        Ok(StmtKind::While { cond, body })
    }

    fn do_while_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.consume(TokenType::KwDo)?;
        let body = self.statement()?;
        self.consume(TokenType::KwWhile)?;
        self.consume(TokenType::LParen)?;
        let cond = self.expression()?;
        self.consume(TokenType::RParen)?;
        self.consume(TokenType::Semicolon)?;
        Ok(StmtKind::DoWhile { body, cond })
    }
}
