// opportunities/unwrap_stmt.rs
//! Replace a block child with the statements nested inside it: an `if` by one
//! of its branches, a nested block by its children.

use shade_frontend::{StmtId, StmtKind, TranslationUnit, Visitor, walk_stmt};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapKind {
    /// `if (c) A else B` becomes `A`.
    Then,
    /// `if (c) A else B` becomes `B`.
    Else,
    /// `{ A B }` inside a block becomes `A B`.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrapStmt {
    pub parent_block: StmtId,
    pub target: StmtId,
    pub unwrap: UnwrapKind,
    pub depth: VisitationDepth,
}

impl UnwrapStmt {
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        if !tu.is_stmt_live(self.parent_block) || !tu.is_stmt_live(self.target) {
            return false;
        }
        let StmtKind::Block(siblings) = tu.stmt(self.parent_block) else {
            return false;
        };
        siblings.contains(&self.target) && shape_matches(tu, self.target, self.unwrap)
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        let replacement = match tu.stmt(self.target).clone() {
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                tu.kill_expr(cond);
                let (keep, drop) = match (self.unwrap, else_branch) {
                    (UnwrapKind::Else, Some(else_branch)) => (else_branch, Some(then_branch)),
                    _ => (then_branch, else_branch),
                };
                if let Some(drop) = drop {
                    tu.kill_stmt(drop);
                }
                vec![keep]
            }
            StmtKind::Block(children) => children,
            _ => return,
        };
        tu.forget_stmt(self.target);

        let StmtKind::Block(siblings) = tu.stmt_mut(self.parent_block) else {
            return;
        };
        let Some(pos) = siblings.iter().position(|&s| s == self.target) else {
            return;
        };
        let tail = siblings.split_off(pos + 1);
        siblings.pop();
        siblings.extend(replacement);
        siblings.extend(tail);
    }
}

fn shape_matches(tu: &TranslationUnit, target: StmtId, unwrap: UnwrapKind) -> bool {
    match (unwrap, tu.stmt(target)) {
        (UnwrapKind::Then, StmtKind::If { .. }) => true,
        (UnwrapKind::Else, StmtKind::If { else_branch, .. }) => else_branch.is_some(),
        // Splicing declarations would widen their scope.
        (UnwrapKind::Block, StmtKind::Block(children)) => children
            .iter()
            .all(|&child| !matches!(tu.stmt(child), StmtKind::VarDecl(_))),
        _ => false,
    }
}

pub struct UnwrapStmtFinder;

impl OpportunityFinder for UnwrapStmtFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::UnwrapStmt
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut found = Vec::new();
        for (_, func) in tu.functions() {
            let Some(body) = func.body else { continue };
            let mut visitor = Finder {
                analysis,
                found: &mut found,
            };
            visitor.visit_stmt(tu, body, 1);
        }
        found
    }
}

struct Finder<'a> {
    analysis: &'a Analysis,
    found: &'a mut Vec<Opportunity>,
}

impl Visitor for Finder<'_> {
    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        if let StmtKind::Block(stmts) = tu.stmt(id) {
            let scope = &self.analysis.scope;
            for &stmt in stmts {
                // Injected dead code is removed whole, never unwrapped into
                // live code.
                if !scope.contains_stmt(stmt) || scope.is_dead_code_if(stmt) {
                    continue;
                }
                for unwrap in [UnwrapKind::Then, UnwrapKind::Else, UnwrapKind::Block] {
                    if shape_matches(tu, stmt, unwrap) {
                        self.found.push(Opportunity::UnwrapStmt(UnwrapStmt {
                            parent_block: id,
                            target: stmt,
                            unwrap,
                            depth: VisitationDepth(depth + 1),
                        }));
                    }
                }
            }
        }
        walk_stmt(self, tu, id, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::random::IdGenerator;

    fn unwraps(found: &[Opportunity]) -> Vec<UnwrapKind> {
        found
            .iter()
            .map(|op| match op {
                Opportunity::UnwrapStmt(op) => op.unwrap,
                other => panic!("unexpected {other}"),
            })
            .collect()
    }

    #[test]
    fn if_unwraps_to_either_branch() {
        let (tu, found) = find_kind(
            "void unused(int a) { if (a > 0) { a = 1; } else { a = 2; } }\nvoid main() {}",
            false,
            OpportunityKind::UnwrapStmt,
        );
        assert_eq!(unwraps(&found[..2]), [UnwrapKind::Then, UnwrapKind::Else]);

        let then = applied(&tu, &found[0]);
        assert!(!then.contains("if") && then.contains("a = 1;") && !then.contains("a = 2;"));
        let other = applied(&tu, &found[1]);
        assert!(!other.contains("if") && other.contains("a = 2;") && !other.contains("a = 1;"));
    }

    #[test]
    fn nested_block_is_spliced_into_its_parent() {
        let (tu, found) = find_kind(
            "void unused() { int a; { a = 1; a = 2; } a = 3; }\nvoid main() {}",
            false,
            OpportunityKind::UnwrapStmt,
        );
        assert_eq!(unwraps(&found), [UnwrapKind::Block]);
        let printed = applied(&tu, &found[0]);
        let reparsed = shade_frontend::parse(&printed).unwrap();
        assert_eq!(body_stmts(&reparsed, "unused").len(), 4);
    }

    #[test]
    fn blocks_with_declarations_stay_closed() {
        let (_, found) = find_kind(
            "void unused() { { int b; b = 1; } }\nvoid main() {}",
            false,
            OpportunityKind::UnwrapStmt,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn dead_code_and_live_code_are_not_unwrapped() {
        let (_, found) = find_kind(
            "uniform vec2 injectionSwitch;\n\
             void main() { int a; if (injectionSwitch.x > injectionSwitch.y) { a = 1; } if (a > 0) { a = 2; } }",
            false,
            OpportunityKind::UnwrapStmt,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn unwrapped_if_is_stale() {
        let (tu, found) = find_kind(
            "void main() { int a; if (a > 0) { a = 1; } else { a = 2; } }",
            true,
            OpportunityKind::UnwrapStmt,
        );
        let mut candidate = tu.clone();
        assert!(found[0].try_apply(&mut candidate, &mut IdGenerator::new()));
        assert!(!found[0].precondition_holds(&candidate));
        assert!(!found[1].precondition_holds(&candidate));
    }
}
