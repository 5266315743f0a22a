//! Declaration printing.

use pretty::{Arena, DocAllocator, DocBuilder};

use crate::ast::*;

use super::expr::print_expr;
use super::stmt::print_stmt;
use super::{INDENT, print_array_size, print_type_spec};

pub(super) fn print_decl<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    id: DeclId,
) -> DocBuilder<'a, Arena<'a>> {
    match tu.decl(id) {
        DeclKind::Directive(text) => arena.text(text.clone()),
        DeclKind::Precision { precision, ty } => {
            arena.text(format!("precision {} {};", precision.as_str(), ty))
        }
        DeclKind::Struct(decl) => print_struct_decl(arena, decl),
        DeclKind::Function(func) => print_func_decl(arena, tu, func),
        DeclKind::Variables(vars) => print_var_decl(arena, tu, vars).append(arena.text(";")),
    }
}

fn print_struct_decl<'a>(arena: &'a Arena<'a>, decl: &StructDecl) -> DocBuilder<'a, Arena<'a>> {
    let header = arena.text(format!("struct {} {{", decl.name));
    if decl.fields.is_empty() {
        return header.append(arena.text("};"));
    }

    let fields: Vec<_> = decl
        .fields
        .iter()
        .map(|field| {
            print_type_spec(arena, &field.ty)
                .append(arena.text(" "))
                .append(arena.text(field.name.clone()))
                .append(print_array_size(arena, field.array_size))
                .append(arena.text(";"))
        })
        .collect();

    header
        .append(
            arena
                .hardline()
                .append(arena.intersperse(fields, arena.hardline()))
                .nest(INDENT),
        )
        .append(arena.hardline())
        .append(arena.text("};"))
}

fn print_func_decl<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    func: &FunctionDecl,
) -> DocBuilder<'a, Arena<'a>> {
    let signature = print_type_spec(arena, &func.return_type)
        .append(arena.text(" "))
        .append(arena.text(func.name.clone()))
        .append(print_params(arena, &func.params));

    match func.body {
        Some(body) => signature
            .append(arena.text(" "))
            .append(print_stmt(arena, tu, body)),
        None => signature.append(arena.text(";")),
    }
}

fn print_params<'a>(arena: &'a Arena<'a>, params: &[Param]) -> DocBuilder<'a, Arena<'a>> {
    let docs: Vec<_> = params
        .iter()
        .map(|param| {
            let ty = print_type_spec(arena, &param.ty);
            match &param.name {
                Some(name) => ty
                    .append(arena.text(" "))
                    .append(arena.text(name.clone()))
                    .append(print_array_size(arena, param.array_size)),
                None => ty,
            }
        })
        .collect();

    arena
        .text("(")
        .append(arena.intersperse(docs, arena.text(", ")))
        .append(arena.text(")"))
}

/// `type a, b[2] = ...` without the trailing `;`.
pub(super) fn print_var_decl<'a>(
    arena: &'a Arena<'a>,
    tu: &TranslationUnit,
    vars: &VarDecl,
) -> DocBuilder<'a, Arena<'a>> {
    let declarators: Vec<_> = vars
        .declarators
        .iter()
        .map(|d| {
            let doc = arena
                .text(d.name.clone())
                .append(print_array_size(arena, d.array_size));
            match d.init {
                Some(init) => doc
                    .append(arena.text(" = "))
                    .append(print_expr(arena, tu, init, 2)),
                None => doc,
            }
        })
        .collect();

    print_type_spec(arena, &vars.ty)
        .append(arena.text(" "))
        .append(arena.intersperse(declarators, arena.text(", ")))
}
