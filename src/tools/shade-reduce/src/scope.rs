// scope.rs
//! Which parts of a program the reducer may simplify.
//!
//! Without `--reduce-everywhere` only code that cannot affect the result is
//! fair game: bodies of functions unreachable from `main`, and the
//! then-branches of injected dead-code `if`s.

use rustc_hash::{FxHashMap, FxHashSet};
use shade_frontend::{
    BinaryOp, DeclId, ExprId, ExprKind, StmtId, StmtKind, TranslationUnit, Visitor, walk_expr,
    walk_stmt, walk_translation_unit,
};

/// Name of the uniform whose `(0, 1)` value guards injected dead code.
pub const INJECTION_SWITCH: &str = "injectionSwitch";

/// Macro-style call wrapping injected dead-code conditions.
pub const DEAD_MARKER: &str = "_GLF_DEAD";

#[derive(Debug, Clone, Default)]
pub struct ReductionScope {
    everywhere: bool,
    stmts: FxHashSet<StmtId>,
    exprs: FxHashSet<ExprId>,
    unreachable: FxHashSet<DeclId>,
    dead_ifs: FxHashSet<StmtId>,
}

impl ReductionScope {
    pub fn compute(tu: &TranslationUnit, everywhere: bool) -> Self {
        let mut scope = ReductionScope {
            everywhere,
            ..Default::default()
        };
        scope.unreachable = unreachable_functions(tu);

        for (id, func) in tu.functions() {
            if let Some(body) = func.body
                && scope.unreachable.contains(&id)
            {
                scope.collect_stmt(tu, body);
            }
        }

        let mut finder = DeadIfFinder::default();
        walk_translation_unit(&mut finder, tu);
        for (stmt, then_branch) in finder.found {
            scope.dead_ifs.insert(stmt);
            scope.collect_stmt(tu, then_branch);
        }
        scope
    }

    fn collect_stmt(&mut self, tu: &TranslationUnit, root: StmtId) {
        let mut collector = SubtreeCollector {
            stmts: &mut self.stmts,
            exprs: &mut self.exprs,
        };
        collector.visit_stmt(tu, root, 0);
    }

    pub fn everywhere(&self) -> bool {
        self.everywhere
    }

    pub fn contains_stmt(&self, id: StmtId) -> bool {
        self.everywhere || self.stmts.contains(&id)
    }

    pub fn contains_expr(&self, id: ExprId) -> bool {
        self.everywhere || self.exprs.contains(&id)
    }

    /// An `if` whose condition is an injected always-false guard.
    pub fn is_dead_code_if(&self, id: StmtId) -> bool {
        self.dead_ifs.contains(&id)
    }

    pub fn is_unreachable_function(&self, id: DeclId) -> bool {
        self.unreachable.contains(&id)
    }
}

/// `_GLF_DEAD(...)` or `injectionSwitch.x > injectionSwitch.y`, ignoring
/// parentheses.
pub fn is_dead_code_condition(tu: &TranslationUnit, cond: ExprId) -> bool {
    match tu.expr(tu.strip_parens(cond)) {
        ExprKind::Call { callee, .. } => callee == DEAD_MARKER,
        ExprKind::Binary {
            op: BinaryOp::Gt,
            lhs,
            rhs,
        } => is_switch_component(tu, *lhs, "x") && is_switch_component(tu, *rhs, "y"),
        _ => false,
    }
}

fn is_switch_component(tu: &TranslationUnit, id: ExprId, component: &str) -> bool {
    let ExprKind::Member { base, field } = tu.expr(tu.strip_parens(id)) else {
        return false;
    };
    field == component
        && matches!(tu.expr(tu.strip_parens(*base)), ExprKind::Ident(name) if name == INJECTION_SWITCH)
}

/// Functions with a body that `main` can never reach through calls.
///
/// With no `main` at all every function counts as unreachable.
fn unreachable_functions(tu: &TranslationUnit) -> FxHashSet<DeclId> {
    let mut callees: FxHashMap<&str, FxHashSet<String>> = FxHashMap::default();
    for (_, func) in tu.functions() {
        let Some(body) = func.body else { continue };
        let mut calls = CallCollector::default();
        calls.visit_stmt(tu, body, 0);
        callees
            .entry(func.name.as_str())
            .or_default()
            .extend(calls.names);
    }

    let mut reached: FxHashSet<&str> = FxHashSet::default();
    let mut worklist = vec!["main"];
    while let Some(name) = worklist.pop() {
        if !reached.insert(name) {
            continue;
        }
        if let Some(next) = callees.get(name) {
            worklist.extend(next.iter().map(String::as_str));
        }
    }

    tu.functions()
        .filter(|(_, func)| func.body.is_some() && !reached.contains(func.name.as_str()))
        .map(|(id, _)| id)
        .collect()
}

struct SubtreeCollector<'a> {
    stmts: &'a mut FxHashSet<StmtId>,
    exprs: &'a mut FxHashSet<ExprId>,
}

impl Visitor for SubtreeCollector<'_> {
    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        self.stmts.insert(id);
        walk_stmt(self, tu, id, depth);
    }

    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        self.exprs.insert(id);
        walk_expr(self, tu, id, depth);
    }
}

#[derive(Default)]
struct CallCollector {
    names: FxHashSet<String>,
}

impl Visitor for CallCollector {
    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        if let ExprKind::Call { callee, .. } = tu.expr(id) {
            self.names.insert(callee.clone());
        }
        walk_expr(self, tu, id, depth);
    }
}

/// Collects `(if, then_branch)` pairs guarded by a dead-code condition.
#[derive(Default)]
struct DeadIfFinder {
    found: Vec<(StmtId, StmtId)>,
}

impl Visitor for DeadIfFinder {
    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        if let StmtKind::If {
            cond, then_branch, ..
        } = tu.stmt(id)
            && is_dead_code_condition(tu, *cond)
        {
            self.found.push((id, *then_branch));
        }
        walk_stmt(self, tu, id, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_frontend::parse;

    fn body_stmts(tu: &TranslationUnit, name: &str) -> Vec<StmtId> {
        let (_, func) = tu.functions().find(|(_, f)| f.name == name).unwrap();
        match tu.stmt(func.body.unwrap()) {
            StmtKind::Block(stmts) => stmts.clone(),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_function_bodies_are_in_scope() {
        let tu = parse(
            "void used() {}\n\
             void unused() { int x = 1; x++; }\n\
             void main() { used(); }",
        )
        .unwrap();
        let scope = ReductionScope::compute(&tu, false);

        for stmt in body_stmts(&tu, "unused") {
            assert!(scope.contains_stmt(stmt));
        }
        for stmt in body_stmts(&tu, "main") {
            assert!(!scope.contains_stmt(stmt));
        }
        let unused = tu.functions().find(|(_, f)| f.name == "unused").unwrap().0;
        let used = tu.functions().find(|(_, f)| f.name == "used").unwrap().0;
        assert!(scope.is_unreachable_function(unused));
        assert!(!scope.is_unreachable_function(used));
    }

    #[test]
    fn transitive_calls_are_reachable() {
        let tu = parse("void c() {}\nvoid b() { c(); }\nvoid main() { b(); }").unwrap();
        let scope = ReductionScope::compute(&tu, false);
        for (id, _) in tu.functions() {
            assert!(!scope.is_unreachable_function(id));
        }
    }

    #[test]
    fn dead_code_then_branch_is_in_scope() {
        let tu = parse(
            "uniform vec2 injectionSwitch;\n\
             void main() {\n\
                 if ((injectionSwitch.x > injectionSwitch.y)) { discard; }\n\
                 if (_GLF_DEAD(false)) { return; }\n\
                 if (true) { discard; }\n\
             }",
        )
        .unwrap();
        let scope = ReductionScope::compute(&tu, false);
        let stmts = body_stmts(&tu, "main");

        for &stmt in &stmts[..2] {
            assert!(scope.is_dead_code_if(stmt));
            assert!(!scope.contains_stmt(stmt));
            let StmtKind::If {
                cond, then_branch, ..
            } = tu.stmt(stmt)
            else {
                panic!("expected if");
            };
            assert!(scope.contains_stmt(*then_branch));
            assert!(!scope.contains_expr(*cond));
        }
        assert!(!scope.is_dead_code_if(stmts[2]));
    }

    #[test]
    fn everywhere_contains_everything() {
        let tu = parse("float k = 1.0;\nvoid main() { k = 2.0; }").unwrap();
        let scope = ReductionScope::compute(&tu, true);
        for stmt in body_stmts(&tu, "main") {
            assert!(scope.contains_stmt(stmt));
        }
        assert!(scope.everywhere());
    }
}
