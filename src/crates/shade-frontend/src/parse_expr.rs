// src/parse_expr.rs
//
// Expression parsing: comma, assignment and conditional levels on top of a
// Pratt loop for the binary operators.

use crate::ast::*;
use crate::errors::ParserError;
use crate::parser::{ParseError, Parser};
use crate::token::TokenType;

impl<'src> Parser<'src> {
    /// Full expression, including the comma operator.
    pub(crate) fn expression(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.assignment()?;
        while self.match_token(TokenType::Comma) {
            let rhs = self.assignment()?;
            left = self.tu.add_expr(ExprKind::Binary {
                op: BinaryOp::Comma,
                lhs: left,
                rhs,
            });
        }
        Ok(left)
    }

    /// Assignment expression (right associative).
    pub(crate) fn assignment(&mut self) -> Result<ExprId, ParseError> {
        let lhs = self.conditional()?;
        let Some(op) = assignment_op(self.current.ty) else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.assignment()?;
        Ok(self.tu.add_expr(ExprKind::Binary { op, lhs, rhs }))
    }

    /// `cond ? a : b`
    fn conditional(&mut self) -> Result<ExprId, ParseError> {
        let cond = self.binary(PREC_TERNARY)?;
        if !self.match_token(TokenType::Question) {
            return Ok(cond);
        }
        let then_expr = self.expression()?;
        self.consume(TokenType::Colon)?;
        let else_expr = self.assignment()?;
        Ok(self.tu.add_expr(ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        }))
    }

    /// Pratt loop over binary operators binding tighter than `min_prec`.
    fn binary(&mut self, min_prec: u8) -> Result<ExprId, ParseError> {
        let mut left = self.unary()?;

        while self.current.ty.precedence() > min_prec {
            let op_ty = self.current.ty;
            let op = match op_ty {
                TokenType::Star => BinaryOp::Mul,
                TokenType::Slash => BinaryOp::Div,
                TokenType::Percent => BinaryOp::Mod,
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                TokenType::LessLess => BinaryOp::Shl,
                TokenType::GreaterGreater => BinaryOp::Shr,
                TokenType::Lt => BinaryOp::Lt,
                TokenType::Gt => BinaryOp::Gt,
                TokenType::LtEq => BinaryOp::Le,
                TokenType::GtEq => BinaryOp::Ge,
                TokenType::EqEq => BinaryOp::Eq,
                TokenType::BangEq => BinaryOp::Ne,
                TokenType::Ampersand => BinaryOp::BitAnd,
                TokenType::Caret => BinaryOp::BitXor,
                TokenType::Pipe => BinaryOp::BitOr,
                TokenType::AmpAmp => BinaryOp::And,
                TokenType::CaretCaret => BinaryOp::Xor,
                TokenType::PipePipe => BinaryOp::Or,
                _ => break,
            };

            let prec = op_ty.precedence();
            self.advance();
            let rhs = self.binary(prec)?;
            left = self.tu.add_expr(ExprKind::Binary { op, lhs: left, rhs });
        }

        Ok(left)
    }

    /// Prefix operators.
    fn unary(&mut self) -> Result<ExprId, ParseError> {
        let op = match self.current.ty {
            TokenType::Minus => UnaryOp::Neg,
            TokenType::Plus => UnaryOp::Plus,
            TokenType::Bang => UnaryOp::Not,
            TokenType::Tilde => UnaryOp::BitNot,
            TokenType::PlusPlus => UnaryOp::PreInc,
            TokenType::MinusMinus => UnaryOp::PreDec,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(self.tu.add_expr(ExprKind::Unary { op, operand }))
    }

    /// Indexing, member access and postfix increment/decrement.
    fn postfix(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.primary()?;
        loop {
            let kind = match self.current.ty {
                TokenType::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.consume(TokenType::RBracket)?;
                    ExprKind::Index { base: expr, index }
                }
                TokenType::Dot => {
                    self.advance();
                    let field = self.identifier()?;
                    ExprKind::Member { base: expr, field }
                }
                TokenType::PlusPlus => {
                    self.advance();
                    ExprKind::Unary {
                        op: UnaryOp::PostInc,
                        operand: expr,
                    }
                }
                TokenType::MinusMinus => {
                    self.advance();
                    ExprKind::Unary {
                        op: UnaryOp::PostDec,
                        operand: expr,
                    }
                }
                _ => break,
            };
            expr = self.tu.add_expr(kind);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<ExprId, ParseError> {
        let token = self.current.clone();
        let kind = match token.ty {
            TokenType::IntLiteral => ExprKind::Literal(Literal::Int(token.lexeme.to_string())),
            TokenType::UintLiteral => ExprKind::Literal(Literal::Uint(token.lexeme.to_string())),
            TokenType::FloatLiteral => {
                ExprKind::Literal(Literal::Float(token.lexeme.to_string()))
            }
            TokenType::KwTrue => ExprKind::Literal(Literal::Bool(true)),
            TokenType::KwFalse => ExprKind::Literal(Literal::Bool(false)),
            TokenType::Identifier => {
                self.advance();
                if self.check(TokenType::LParen) {
                    let args = self.call_args()?;
                    return Ok(self.tu.add_expr(ExprKind::Call {
                        callee: token.lexeme.to_string(),
                        args,
                    }));
                }
                return Ok(self.tu.add_expr(ExprKind::Ident(token.lexeme.to_string())));
            }
            TokenType::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenType::RParen)?;
                return Ok(self.tu.add_expr(ExprKind::Paren(inner)));
            }
            _ => {
                return Err(self.error(ParserError::ExpectedExpression {
                    found: token.lexeme.to_string(),
                    span: token.span.into(),
                }));
            }
        };
        self.advance();
        Ok(self.tu.add_expr(kind))
    }

    /// `(a, b, c)` after a callee name.
    fn call_args(&mut self) -> Result<Vec<ExprId>, ParseError> {
        self.consume(TokenType::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                args.push(self.assignment()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen)?;
        Ok(args)
    }
}

fn assignment_op(ty: TokenType) -> Option<BinaryOp> {
    Some(match ty {
        TokenType::Eq => BinaryOp::Assign,
        TokenType::StarEq => BinaryOp::MulAssign,
        TokenType::SlashEq => BinaryOp::DivAssign,
        TokenType::PercentEq => BinaryOp::ModAssign,
        TokenType::PlusEq => BinaryOp::AddAssign,
        TokenType::MinusEq => BinaryOp::SubAssign,
        TokenType::LessLessEq => BinaryOp::ShlAssign,
        TokenType::GreaterGreaterEq => BinaryOp::ShrAssign,
        TokenType::AmpEq => BinaryOp::AndAssign,
        TokenType::CaretEq => BinaryOp::XorAssign,
        TokenType::PipeEq => BinaryOp::OrAssign,
        _ => return None,
    })
}
