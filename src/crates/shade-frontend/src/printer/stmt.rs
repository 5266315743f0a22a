//! Statement printing.

use pretty::{Arena, DocAllocator, DocBuilder};

use crate::ast::*;

use super::INDENT;
use super::decl::print_var_decl;
use super::expr::print_expr;

pub(super) fn print_stmt<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    id: StmtId,
) -> DocBuilder<'a, Arena<'a>> {
    match tu.stmt(id) {
        StmtKind::Block(stmts) => print_block(arena, tu, stmts),
        StmtKind::VarDecl(vars) => print_var_decl(arena, tu, vars).append(arena.text(";")),
        StmtKind::Expr(expr) => print_expr(arena, tu, *expr, 0).append(arena.text(";")),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut doc = arena
                .text("if (")
                .append(print_expr(arena, tu, *cond, 0))
                .append(arena.text(") "))
                .append(print_body(arena, tu, *then_branch));
            if let Some(else_branch) = else_branch {
                let joiner = if matches!(tu.stmt(*then_branch), StmtKind::Block(_)) {
                    arena.text(" else ")
                } else {
                    arena.hardline().append(arena.text("else "))
                };
                doc = doc.append(joiner).append(print_body(arena, tu, *else_branch));
            }
            doc
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            let cond = match cond {
                Some(cond) => arena.text(" ").append(print_expr(arena, tu, *cond, 0)),
                None => arena.nil(),
            };
            let step = match step {
                Some(step) => arena.text(" ").append(print_expr(arena, tu, *step, 0)),
                None => arena.nil(),
            };
            arena
                .text("for (")
                .append(print_stmt(arena, tu, *init))
                .append(cond)
                .append(arena.text(";"))
                .append(step)
                .append(arena.text(") "))
                .append(print_body(arena, tu, *body))
        }
        StmtKind::While { cond, body } => arena
            .text("while (")
            .append(print_expr(arena, tu, *cond, 0))
            .append(arena.text(") "))
            .append(print_body(arena, tu, *body)),
        StmtKind::DoWhile { body, cond } => arena
            .text("do ")
            .append(print_body(arena, tu, *body))
            .append(arena.text(" while ("))
            .append(print_expr(arena, tu, *cond, 0))
            .append(arena.text(");")),
        StmtKind::Return(Some(value)) => arena
            .text("return ")
            .append(print_expr(arena, tu, *value, 0))
            .append(arena.text(";")),
        StmtKind::Return(None) => arena.text("return;"),
        StmtKind::Break => arena.text("break;"),
        StmtKind::Continue => arena.text("continue;"),
        StmtKind::Discard => arena.text("discard;"),
        StmtKind::Empty => arena.text(";"),
    }
}

/// Loop and branch bodies: blocks stay on the same line, anything else is
/// indented on the next one.
fn print_body<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    id: StmtId,
) -> DocBuilder<'a, Arena<'a>> {
    match tu.stmt(id) {
        StmtKind::Block(stmts) => print_block(arena, tu, stmts),
        _ => arena
            .hardline()
            .append(print_stmt(arena, tu, id))
            .nest(INDENT),
    }
}

pub(super) fn print_block<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    stmts: &[StmtId],
) -> DocBuilder<'a, Arena<'a>> {
    if stmts.is_empty() {
        return arena.text("{}");
    }

    let body: Vec<_> = stmts.iter().map(|&s| print_stmt(arena, tu, s)).collect();
    arena
        .text("{")
        .append(
            arena
                .hardline()
                .append(arena.intersperse(body, arena.hardline()))
                .nest(INDENT),
        )
        .append(arena.hardline())
        .append(arena.text("}"))
}
