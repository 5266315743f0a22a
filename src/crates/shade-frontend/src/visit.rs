// src/visit.rs
//! Read-only traversal over a [`TranslationUnit`].
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to keep descending. Every hook receives the nesting
//! depth of the node: top-level declarations sit at depth 0 and each step
//! into a child adds one.

use crate::ast::*;

pub trait Visitor {
    fn visit_decl(&mut self, tu: &TranslationUnit, id: DeclId, depth: u32) {
        walk_decl(self, tu, id, depth);
    }

    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        walk_stmt(self, tu, id, depth);
    }

    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        walk_expr(self, tu, id, depth);
    }
}

/// Visit every top-level declaration in order.
pub fn walk_translation_unit<V: Visitor + ?Sized>(visitor: &mut V, tu: &TranslationUnit) {
    for &decl in &tu.decls {
        visitor.visit_decl(tu, decl, 0);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(visitor: &mut V, tu: &TranslationUnit, id: DeclId, depth: u32) {
    match tu.decl(id) {
        DeclKind::Function(func) => {
            if let Some(body) = func.body {
                visitor.visit_stmt(tu, body, depth + 1);
            }
        }
        DeclKind::Variables(vars) => {
            for init in vars.declarators.iter().filter_map(|d| d.init) {
                visitor.visit_expr(tu, init, depth + 1);
            }
        }
        DeclKind::Directive(_) | DeclKind::Precision { .. } | DeclKind::Struct(_) => {}
    }
}

/// Children are visited in source order: a `for` visits its init statement,
/// condition, step and body; a `do`/`while` visits its body before its
/// condition.
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, tu: &TranslationUnit, id: StmtId, depth: u32) {
    let depth = depth + 1;
    match tu.stmt(id) {
        StmtKind::Block(stmts) => {
            for &stmt in stmts {
                visitor.visit_stmt(tu, stmt, depth);
            }
        }
        StmtKind::VarDecl(vars) => {
            for init in vars.declarators.iter().filter_map(|d| d.init) {
                visitor.visit_expr(tu, init, depth);
            }
        }
        StmtKind::Expr(expr) => visitor.visit_expr(tu, *expr, depth),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(tu, *cond, depth);
            visitor.visit_stmt(tu, *then_branch, depth);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(tu, *else_branch, depth);
            }
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            visitor.visit_stmt(tu, *init, depth);
            if let Some(cond) = cond {
                visitor.visit_expr(tu, *cond, depth);
            }
            if let Some(step) = step {
                visitor.visit_expr(tu, *step, depth);
            }
            visitor.visit_stmt(tu, *body, depth);
        }
        StmtKind::While { cond, body } => {
            visitor.visit_expr(tu, *cond, depth);
            visitor.visit_stmt(tu, *body, depth);
        }
        StmtKind::DoWhile { body, cond } => {
            visitor.visit_stmt(tu, *body, depth);
            visitor.visit_expr(tu, *cond, depth);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(tu, *value, depth);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, tu: &TranslationUnit, id: ExprId, depth: u32) {
    for child in tu.expr(id).children() {
        visitor.visit_expr(tu, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[derive(Default)]
    struct Counter {
        stmts: usize,
        exprs: usize,
        max_depth: u32,
        idents: Vec<String>,
    }

    impl Visitor for Counter {
        fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
            self.stmts += 1;
            self.max_depth = self.max_depth.max(depth);
            walk_stmt(self, tu, id, depth);
        }

        fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
            self.exprs += 1;
            self.max_depth = self.max_depth.max(depth);
            if let ExprKind::Ident(name) = tu.expr(id) {
                self.idents.push(name.clone());
            }
            walk_expr(self, tu, id, depth);
        }
    }

    #[test]
    fn visits_in_source_order_with_depth() {
        let tu = parse("void main() { int x = a; x = b + c; }").unwrap();
        let mut counter = Counter::default();
        walk_translation_unit(&mut counter, &tu);

        assert_eq!(counter.stmts, 3);
        // a, x = b + c, x, b + c, b, c
        assert_eq!(counter.exprs, 6);
        assert_eq!(counter.idents, ["a", "x", "b", "c"]);
        // decl 0 -> block 1 -> stmt 2 -> assign 3 -> add 4 -> ident 5
        assert_eq!(counter.max_depth, 5);
    }

    #[test]
    fn global_initializers_are_visited() {
        let tu = parse("const float k = 2.0 * scale;").unwrap();
        let mut counter = Counter::default();
        walk_translation_unit(&mut counter, &tu);
        assert_eq!(counter.stmts, 0);
        assert_eq!(counter.idents, ["scale"]);
    }
}
