// src/printer/mod.rs
//! AST to pretty::Doc conversion.
//!
//! The printer owns operator precedence: it parenthesises any sub-expression
//! that binds more loosely than its position requires, so a tree produced by
//! mutation prints as source that parses back to the same structure.

mod decl;
mod expr;
mod stmt;

use pretty::{Arena, DocAllocator, DocBuilder};

use crate::ast::*;

pub use expr::print_expr;

/// Indent width (4 spaces)
pub(super) const INDENT: isize = 4;

/// Soft line width handed to the renderer.
const LINE_WIDTH: usize = 100;

/// Pretty-print a translation unit to a Doc.
pub fn print_program<'a>(arena: &'a Arena<'a>, tu: &TranslationUnit) -> DocBuilder<'a, Arena<'a>> {
    let decls: Vec<_> = tu
        .decls
        .iter()
        .map(|&decl| decl::print_decl(arena, tu, decl))
        .collect();
    let body = arena.intersperse(decls, arena.hardline().append(arena.hardline()));

    match tu.version {
        Some(version) => arena
            .text(version.to_string())
            .append(arena.hardline())
            .append(arena.hardline())
            .append(body),
        None => body,
    }
}

/// Render a translation unit to source text with a trailing newline.
pub fn print(tu: &TranslationUnit) -> String {
    let arena = Arena::new();
    let doc = print_program(&arena, tu);
    render(doc)
}

/// Render a single expression, mostly for diagnostics and tests.
pub fn print_expr_to_string(tu: &TranslationUnit, id: ExprId) -> String {
    let arena = Arena::new();
    let doc = print_expr(&arena, tu, id, 0);
    render(doc).trim_end().to_string()
}

fn render<'a>(doc: DocBuilder<'a, Arena<'a>>) -> String {
    let mut output = String::new();
    // Formatting into a String cannot fail.
    let _ = doc.render_fmt(LINE_WIDTH, &mut output);

    // Remove trailing whitespace (artifact of nesting with hardlines)
    let mut output = output
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Print qualifiers followed by the type name.
pub(super) fn print_type_spec<'a>(arena: &'a Arena<'a>, ty: &TypeSpec) -> DocBuilder<'a, Arena<'a>> {
    let mut doc = arena.nil();
    for qualifier in &ty.qualifiers {
        doc = doc.append(print_qualifier(arena, qualifier)).append(arena.text(" "));
    }
    doc.append(arena.text(ty.name.clone()))
}

fn print_qualifier<'a>(arena: &'a Arena<'a>, qualifier: &Qualifier) -> DocBuilder<'a, Arena<'a>> {
    let text = match qualifier {
        Qualifier::Const => "const",
        Qualifier::Uniform => "uniform",
        Qualifier::In => "in",
        Qualifier::Out => "out",
        Qualifier::InOut => "inout",
        Qualifier::Attribute => "attribute",
        Qualifier::Varying => "varying",
        Qualifier::Flat => "flat",
        Qualifier::Invariant => "invariant",
        Qualifier::Precision(p) => p.as_str(),
        Qualifier::Layout(items) => {
            let items = items.iter().map(|item| match &item.value {
                Some(value) => arena.text(format!("{} = {}", item.key, value)),
                None => arena.text(item.key.clone()),
            });
            return arena
                .text("layout(")
                .append(arena.intersperse(items, arena.text(", ")))
                .append(arena.text(")"));
        }
    };
    arena.text(text)
}

/// `[N]` array suffix, or nothing.
pub(super) fn print_array_size<'a>(arena: &'a Arena<'a>, size: Option<u32>) -> DocBuilder<'a, Arena<'a>> {
    match size {
        Some(n) => arena.text(format!("[{n}]")),
        None => arena.nil(),
    }
}
