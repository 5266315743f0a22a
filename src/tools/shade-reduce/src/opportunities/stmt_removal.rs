// opportunities/stmt_removal.rs
//! Remove a statement from its enclosing block.

use shade_frontend::{StmtId, StmtKind, TranslationUnit, Visitor, walk_stmt};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveStmt {
    pub block: StmtId,
    pub stmt: StmtId,
    pub depth: VisitationDepth,
}

impl RemoveStmt {
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        tu.is_stmt_live(self.block)
            && tu.is_stmt_live(self.stmt)
            && matches!(tu.stmt(self.block), StmtKind::Block(stmts) if stmts.contains(&self.stmt))
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        tu.remove_from_block(self.block, self.stmt);
    }
}

pub struct StmtRemovalFinder;

impl OpportunityFinder for StmtRemovalFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::RemoveStmt
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut found = Vec::new();
        for (_, func) in tu.functions() {
            let Some(body) = func.body else { continue };
            let mut visitor = Finder {
                analysis,
                returns_value: func.return_type.name != "void",
                found: &mut found,
            };
            // Function bodies sit one below their declaration.
            visitor.visit_stmt(tu, body, 1);
        }
        found
    }
}

struct Finder<'a> {
    analysis: &'a Analysis,
    returns_value: bool,
    found: &'a mut Vec<Opportunity>,
}

impl Finder<'_> {
    fn removable(&self, tu: &TranslationUnit, stmt: StmtId) -> bool {
        let kind_ok = match tu.stmt(stmt) {
            // Left to variable removal, which knows whether the name is used.
            StmtKind::VarDecl(_) => false,
            StmtKind::Return(Some(_)) => !self.returns_value,
            _ => true,
        };
        let scope = &self.analysis.scope;
        kind_ok && (scope.contains_stmt(stmt) || scope.is_dead_code_if(stmt))
    }
}

impl Visitor for Finder<'_> {
    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        if let StmtKind::Block(stmts) = tu.stmt(id) {
            for &stmt in stmts {
                if self.removable(tu, stmt) {
                    self.found.push(Opportunity::RemoveStmt(RemoveStmt {
                        block: id,
                        stmt,
                        depth: VisitationDepth(depth + 1),
                    }));
                }
            }
        }
        walk_stmt(self, tu, id, depth);
    }
}
