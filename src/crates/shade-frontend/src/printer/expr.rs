//! Expression printing.

use pretty::{Arena, DocAllocator, DocBuilder};

use crate::ast::*;

/// Print an expression, parenthesising it if it binds more loosely than
/// `min_prec`.
pub fn print_expr<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    id: ExprId,
    min_prec: u8,
) -> DocBuilder<'a, Arena<'a>> {
    let kind = tu.expr(id);
    let doc = print_expr_inner(arena, tu, kind);
    if kind.precedence() < min_prec {
        arena.text("(").append(doc).append(arena.text(")"))
    } else {
        doc
    }
}

fn print_expr_inner<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    kind: &ExprKind,
) -> DocBuilder<'a, Arena<'a>> {
    match kind {
        ExprKind::Literal(lit) => print_literal(arena, lit),
        ExprKind::Ident(name) => arena.text(name.clone()),
        ExprKind::Paren(inner) => arena
            .text("(")
            .append(print_expr(arena, tu, *inner, 0))
            .append(arena.text(")")),
        ExprKind::Unary { op, operand } => print_unary(arena, tu, *op, *operand),
        ExprKind::Binary { op, lhs, rhs } => print_binary(arena, tu, *op, *lhs, *rhs),
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => print_expr(arena, tu, *cond, PREC_TERNARY + 1)
            .append(arena.text(" ? "))
            .append(print_expr(arena, tu, *then_expr, 2))
            .append(arena.text(" : "))
            .append(print_expr(arena, tu, *else_expr, PREC_TERNARY)),
        ExprKind::Call { callee, args } => arena
            .text(callee.clone())
            .append(print_call_args(arena, tu, args)),
        ExprKind::Member { base, field } => print_expr(arena, tu, *base, PREC_POSTFIX)
            .append(arena.text("."))
            .append(arena.text(field.clone())),
        ExprKind::Index { base, index } => print_expr(arena, tu, *base, PREC_POSTFIX)
            .append(arena.text("["))
            .append(print_expr(arena, tu, *index, 0))
            .append(arena.text("]")),
    }
}

fn print_literal<'a>(arena: &'a Arena<'a>, lit: &Literal) -> DocBuilder<'a, Arena<'a>> {
    match lit {
        Literal::Int(text) | Literal::Uint(text) | Literal::Float(text) => arena.text(text.clone()),
        Literal::Bool(true) => arena.text("true"),
        Literal::Bool(false) => arena.text("false"),
    }
}

fn print_unary<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    op: UnaryOp,
    operand: ExprId,
) -> DocBuilder<'a, Arena<'a>> {
    if op.is_postfix() {
        return print_expr(arena, tu, operand, PREC_POSTFIX).append(arena.text(op.as_str()));
    }

    // `- -x` must not collapse into `--x`.
    let nested_prefix = matches!(
        tu.expr(operand),
        ExprKind::Unary { op: inner, .. } if !inner.is_postfix()
    );
    let operand_doc = if nested_prefix {
        print_expr(arena, tu, operand, PREC_PRIMARY)
    } else {
        print_expr(arena, tu, operand, PREC_UNARY)
    };
    arena.text(op.as_str()).append(operand_doc)
}

fn print_binary<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    op: BinaryOp,
    lhs: ExprId,
    rhs: ExprId,
) -> DocBuilder<'a, Arena<'a>> {
    let prec = op.precedence();
    let (lhs_prec, rhs_prec) = if op.is_assignment() {
        (PREC_UNARY, prec)
    } else {
        (prec, prec + 1)
    };

    let separator = if op == BinaryOp::Comma {
        arena.text(", ")
    } else {
        arena.text(format!(" {} ", op.as_str()))
    };

    print_expr(arena, tu, lhs, lhs_prec)
        .append(separator)
        .append(print_expr(arena, tu, rhs, rhs_prec))
}

/// `(a, b, c)`; arguments are single assignment expressions.
fn print_call_args<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    args: &[ExprId],
) -> DocBuilder<'a, Arena<'a>> {
    let docs: Vec<_> = args.iter().map(|&arg| print_expr(arena, tu, arg, 2)).collect();
    arena
        .text("(")
        .append(arena.intersperse(docs, arena.text(", ")))
        .append(arena.text(")"))
}
