// opportunities/compound_expr.rs
//! Replace a compound expression with one of its same-typed operands.

use shade_frontend::{ExprId, ExprKind, TranslationUnit, Visitor, walk_expr, walk_translation_unit};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundExprToSubExpr {
    pub target: ExprId,
    pub child: ExprId,
    pub depth: VisitationDepth,
}

impl CompoundExprToSubExpr {
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        tu.is_expr_live(self.target)
            && tu.is_expr_live(self.child)
            && tu.expr(self.target).children().contains(&self.child)
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        tu.replace_with_child(self.target, self.child);
    }
}

pub struct CompoundExprFinder;

impl OpportunityFinder for CompoundExprFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::CompoundExprToSubExpr
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut visitor = Finder {
            analysis,
            found: Vec::new(),
        };
        walk_translation_unit(&mut visitor, tu);
        visitor.found
    }
}

struct Finder<'a> {
    analysis: &'a Analysis,
    found: Vec<Opportunity>,
}

fn is_compound(kind: &ExprKind) -> bool {
    match kind {
        ExprKind::Binary { op, .. } => !op.is_assignment(),
        ExprKind::Unary { op, .. } => !op.is_side_effecting(),
        ExprKind::Ternary { .. } | ExprKind::Call { .. } | ExprKind::Index { .. } => true,
        ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::Paren(_) | ExprKind::Member { .. } => {
            false
        }
    }
}

/// In a written position only the indexed base can stand in for the whole.
fn keeps_storage(kind: &ExprKind, child: ExprId) -> bool {
    matches!(kind, ExprKind::Index { base, .. } if *base == child)
}

impl Visitor for Finder<'_> {
    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        let kind = tu.expr(id);
        if is_compound(kind)
            && !self.analysis.writes_arguments(tu, id)
            && self.analysis.scope.contains_expr(id)
            && let Some(ty) = self.analysis.types.get(id)
        {
            let lvalue = self.analysis.is_lvalue(id);
            for child in kind.children() {
                if self.analysis.types.get(child) != Some(ty) {
                    continue;
                }
                if lvalue && !keeps_storage(kind, child) {
                    continue;
                }
                self.found
                    .push(Opportunity::CompoundExprToSubExpr(CompoundExprToSubExpr {
                        target: id,
                        child,
                        depth: VisitationDepth(depth),
                    }));
            }
        }
        walk_expr(self, tu, id, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::random::IdGenerator;
    use shade_frontend::print_expr_to_string;

    /// Print `watch` after applying each opportunity to its own clone.
    fn outcomes(tu: &TranslationUnit, found: &[Opportunity], watch: ExprId) -> Vec<String> {
        let mut out: Vec<String> = found
            .iter()
            .map(|op| {
                let _ = applied(tu, op);
                let mut candidate = tu.clone();
                op.apply(&mut candidate, &mut IdGenerator::new());
                print_expr_to_string(&candidate, watch)
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn enumerates_every_decomposition_in_unreachable_code() {
        let (tu, found) = find_kind(
            "void unused() { int a, b, c; a + b + c; }\nvoid main() {}",
            false,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let sum = expr_by_text(&tu, "a + b + c");
        assert_eq!(outcomes(&tu, &found, sum), ["a + b", "a + c", "b + c", "c"]);
    }

    #[test]
    fn live_code_is_left_alone_without_everywhere() {
        let source = "void main() { int a, b, c; a + b + c; }";
        let (_, found) = find_kind(source, false, OpportunityKind::CompoundExprToSubExpr);
        assert!(found.is_empty());
        let (_, found) = find_kind(source, true, OpportunityKind::CompoundExprToSubExpr);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn call_arguments_of_the_result_type() {
        let (tu, found) = find_kind(
            "int foo(int a, int b, float c) { return a; }\n\
             void main() { int x = foo(10, 20, 30.0); }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let call = expr_by_text(&tu, "foo(10, 20, 30.0)");
        assert_eq!(outcomes(&tu, &found, call), ["10", "20"]);
    }

    #[test]
    fn matrix_product_keeps_the_matrix() {
        let (tu, found) = find_kind(
            "void main() { mat2 m; mat2 n = m * 2.0; }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let product = expr_by_text(&tu, "m * 2.0");
        assert_eq!(outcomes(&tu, &found, product), ["m"]);
    }

    #[test]
    fn lvalue_positions_need_assignable_replacements() {
        let (tu, found) = find_kind(
            "void main() { int a[3]; int i, j; a[i + j] = 1; }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let index = expr_by_text(&tu, "i + j");
        assert_eq!(found.len(), 2);
        for op in &found {
            let Opportunity::CompoundExprToSubExpr(op) = op else {
                panic!("unexpected {op}");
            };
            assert_eq!(op.target, index);
        }
    }

    #[test]
    fn stale_after_target_removed() {
        let (tu, found) = find_kind(
            "void main() { int a, b; a * b; }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let mut candidate = tu.clone();
        assert!(found[0].try_apply(&mut candidate, &mut IdGenerator::new()));
        assert!(!found[1].precondition_holds(&candidate));
    }

    #[test]
    fn index_never_replaces_a_written_element() {
        let (_, found) = find_kind(
            "uniform int u;\nvoid main() { int a[2]; a[u] = 1; a[u]++; }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn read_elements_may_collapse_to_their_index() {
        let (tu, found) = find_kind(
            "uniform int u;\nvoid main() { int a[2]; int x = a[u]; }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        let element = expr_by_text(&tu, "a[u]");
        assert_eq!(outcomes(&tu, &found, element), ["u"]);
    }

    #[test]
    fn calls_writing_their_arguments_are_kept() {
        let (_, found) = find_kind(
            "void main() { float x; float i; float f = modf(x, i); }",
            true,
            OpportunityKind::CompoundExprToSubExpr,
        );
        assert!(found.is_empty());
    }
}
