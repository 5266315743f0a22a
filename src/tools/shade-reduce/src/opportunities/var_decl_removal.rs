// opportunities/var_decl_removal.rs
//! Remove a local declarator whose name is never read or written in its
//! function.

use shade_frontend::{DeclId, StmtId, StmtKind, TranslationUnit, Visitor, walk_stmt};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveVariable {
    /// The `VarDecl` statement holding the declarator.
    pub stmt: StmtId,
    /// Enclosing block, or `None` for a `for` initializer.
    pub block: Option<StmtId>,
    pub name: String,
    pub depth: VisitationDepth,
}

impl RemoveVariable {
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        if !tu.is_stmt_live(self.stmt) {
            return false;
        }
        let StmtKind::VarDecl(vars) = tu.stmt(self.stmt) else {
            return false;
        };
        if !vars.declarators.iter().any(|d| d.name == self.name) {
            return false;
        }
        match self.block {
            Some(block) => {
                tu.is_stmt_live(block)
                    && matches!(tu.stmt(block), StmtKind::Block(stmts) if stmts.contains(&self.stmt))
            }
            None => true,
        }
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        let StmtKind::VarDecl(vars) = tu.stmt_mut(self.stmt) else {
            return;
        };
        let Some(pos) = vars.declarators.iter().position(|d| d.name == self.name) else {
            return;
        };
        let removed = vars.declarators.remove(pos);
        let now_empty = vars.declarators.is_empty();
        if let Some(init) = removed.init {
            tu.kill_expr(init);
        }
        if !now_empty {
            return;
        }
        match self.block {
            Some(block) => {
                tu.remove_from_block(block, self.stmt);
            }
            // A `for` keeps its initializer slot.
            None => *tu.stmt_mut(self.stmt) = StmtKind::Empty,
        }
    }
}

pub struct VarDeclRemovalFinder;

impl OpportunityFinder for VarDeclRemovalFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::RemoveVariable
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut found = Vec::new();
        for (function, func) in tu.functions() {
            let Some(body) = func.body else { continue };
            let mut visitor = Finder {
                analysis,
                function,
                found: &mut found,
            };
            visitor.visit_stmt(tu, body, 1);
        }
        found
    }
}

struct Finder<'a> {
    analysis: &'a Analysis,
    function: DeclId,
    found: &'a mut Vec<Opportunity>,
}

impl Finder<'_> {
    fn consider(&mut self, tu: &TranslationUnit, stmt: StmtId, block: Option<StmtId>, depth: u32) {
        let StmtKind::VarDecl(vars) = tu.stmt(stmt) else {
            return;
        };
        let in_scope = self.analysis.scope.contains_stmt(stmt);
        for declarator in &vars.declarators {
            if self.analysis.uses.ident_uses_in(self.function, &declarator.name) != 0 {
                continue;
            }
            let pure = declarator
                .init
                .is_none_or(|init| !self.analysis.has_side_effects(tu, init));
            if !in_scope && !pure {
                continue;
            }
            self.found.push(Opportunity::RemoveVariable(RemoveVariable {
                stmt,
                block,
                name: declarator.name.clone(),
                depth: VisitationDepth(depth),
            }));
        }
    }
}

impl Visitor for Finder<'_> {
    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        match tu.stmt(id) {
            StmtKind::Block(stmts) => {
                for &stmt in stmts {
                    self.consider(tu, stmt, Some(id), depth + 1);
                }
            }
            StmtKind::For { init, .. } => self.consider(tu, *init, None, depth + 1),
            _ => {}
        }
        walk_stmt(self, tu, id, depth);
    }
}
