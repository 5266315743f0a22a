// opportunities/expr_to_constant.rs
//! Replace a scalar or vector expression with a canonical constant.

use std::fmt;

use shade_frontend::{
    ExprId, ExprKind, Literal, TranslationUnit, Visitor, walk_expr, walk_translation_unit,
};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;
use crate::typer::{BasicType, Type};

/// `1`, `1u`, `1.0`, `true`, or a one-argument vector constructor of one of
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Scalar(Literal),
    Vector { constructor: String, element: Literal },
}

impl Constant {
    fn for_type(ty: &Type, unsigned: bool) -> Option<Constant> {
        let element = |basic: BasicType| match basic {
            BasicType::Int => Some(Literal::Int("1".to_string())),
            BasicType::Uint if unsigned => Some(Literal::Uint("1u".to_string())),
            BasicType::Uint => None,
            BasicType::Float => Some(Literal::Float("1.0".to_string())),
            BasicType::Bool => Some(Literal::Bool(true)),
        };
        match ty {
            Type::Scalar(basic) => element(*basic).map(Constant::Scalar),
            Type::Vector(basic, _) => Some(Constant::Vector {
                constructor: ty.to_string(),
                element: element(*basic)?,
            }),
            _ => None,
        }
    }

    fn matches(&self, tu: &TranslationUnit, id: ExprId) -> bool {
        match (self, tu.expr(id)) {
            (Constant::Scalar(lit), ExprKind::Literal(other)) => lit == other,
            (Constant::Vector { constructor, element }, ExprKind::Call { callee, args }) => {
                callee == constructor
                    && args.len() == 1
                    && matches!(tu.expr(args[0]), ExprKind::Literal(lit) if lit == element)
            }
            _ => false,
        }
    }
}

fn literal_text(lit: &Literal) -> &str {
    match lit {
        Literal::Int(text) | Literal::Uint(text) | Literal::Float(text) => text,
        Literal::Bool(true) => "true",
        Literal::Bool(false) => "false",
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Scalar(lit) => f.write_str(literal_text(lit)),
            Constant::Vector {
                constructor,
                element,
            } => write!(f, "{constructor}({})", literal_text(element)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprToConstant {
    pub target: ExprId,
    pub constant: Constant,
    pub depth: VisitationDepth,
}

impl ExprToConstant {
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        tu.is_expr_live(self.target) && !self.constant.matches(tu, self.target)
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        let leaf = match &self.constant {
            Constant::Scalar(lit) => ExprKind::Literal(lit.clone()),
            Constant::Vector {
                constructor,
                element,
            } => {
                let arg = tu.add_expr(ExprKind::Literal(element.clone()));
                ExprKind::Call {
                    callee: constructor.clone(),
                    args: vec![arg],
                }
            }
        };
        tu.replace_with_leaf(self.target, leaf);
    }
}

pub struct ExprToConstantFinder;

impl OpportunityFinder for ExprToConstantFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::ExprToConstant
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut visitor = Finder {
            analysis,
            unsigned: analysis.version.supports_unsigned(),
            found: Vec::new(),
        };
        walk_translation_unit(&mut visitor, tu);
        visitor.found
    }
}

/// Literals are already constant, parentheses defer to their contents, and
/// writes are left to statement removal.
fn is_replaceable(kind: &ExprKind) -> bool {
    match kind {
        ExprKind::Literal(_) | ExprKind::Paren(_) => false,
        ExprKind::Binary { op, .. } => !op.is_assignment(),
        ExprKind::Unary { op, .. } => !op.is_side_effecting(),
        _ => true,
    }
}

struct Finder<'a> {
    analysis: &'a Analysis,
    unsigned: bool,
    found: Vec<Opportunity>,
}

impl Visitor for Finder<'_> {
    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        let candidate = is_replaceable(tu.expr(id))
            && !self.analysis.is_lvalue(id)
            && !self.analysis.writes_arguments(tu, id)
            && self.analysis.scope.contains_expr(id);
        if candidate
            && let Some(constant) = self
                .analysis
                .types
                .get(id)
                .and_then(|ty| Constant::for_type(ty, self.unsigned))
            && !constant.matches(tu, id)
        {
            self.found.push(Opportunity::ExprToConstant(ExprToConstant {
                target: id,
                constant,
                depth: VisitationDepth(depth),
            }));
        }
        walk_expr(self, tu, id, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn constants(found: &[Opportunity]) -> Vec<String> {
        found
            .iter()
            .map(|op| match op {
                Opportunity::ExprToConstant(op) => op.constant.to_string(),
                other => panic!("unexpected {other}"),
            })
            .collect()
    }

    #[test]
    fn replaces_scalar_expression_and_its_operands() {
        let (tu, found) = find_kind(
            "void main() { float x; float y = x + 1.0; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        assert_eq!(constants(&found), ["1.0", "1.0"]);
        let sum = expr_by_text(&tu, "x + 1.0");
        let whole = found
            .iter()
            .find(|op| matches!(op, Opportunity::ExprToConstant(op) if op.target == sum))
            .unwrap();
        assert!(applied(&tu, whole).contains("float y = 1.0;"));
    }

    #[test]
    fn vectors_become_single_argument_constructors() {
        let (tu, found) = find_kind(
            "void main() { vec3 v; ivec2 i; vec3 w = v * 2.0; i + i; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        let mut seen = constants(&found);
        seen.sort();
        seen.dedup();
        assert_eq!(seen, ["ivec2(1)", "vec3(1.0)"]);
        let product = expr_by_text(&tu, "v * 2.0");
        let op = found
            .iter()
            .find(|op| matches!(op, Opportunity::ExprToConstant(op) if op.target == product))
            .unwrap();
        assert!(applied(&tu, op).contains("vec3 w = vec3(1.0);"));
    }

    #[test]
    fn canonical_constants_writes_and_lvalues_are_skipped() {
        let (_, found) = find_kind(
            "void main() { vec2 w = vec2(1.0); float x; x = 1.0; x++; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        assert!(found.is_empty(), "{:?}", constants(&found));
    }

    #[test]
    fn builtin_out_calls_and_their_variables_are_kept() {
        let (tu, found) = find_kind(
            "void main() { float x; float i; float f = modf(x, i); }",
            true,
            OpportunityKind::ExprToConstant,
        );
        let read = expr_by_text(&tu, "x");
        assert_eq!(found.len(), 1);
        assert!(matches!(&found[0], Opportunity::ExprToConstant(op) if op.target == read));
    }

    #[test]
    fn unsigned_constants_follow_the_dialect() {
        let (_, found) = find_kind(
            "#version 300 es\nvoid main() { uint u; uint v = u + 2u; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        assert_eq!(constants(&found), ["1u", "1u"]);

        let (_, found) = find_kind(
            "#version 100\nvoid main() { uint u; uint v = u + 2u; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn applied_twice_is_stale() {
        let (tu, found) = find_kind(
            "void main() { int a; int b = a * 3; }",
            true,
            OpportunityKind::ExprToConstant,
        );
        let product = expr_by_text(&tu, "a * 3");
        let op = found
            .iter()
            .find(|op| matches!(op, Opportunity::ExprToConstant(op) if op.target == product))
            .unwrap();
        let mut candidate = tu.clone();
        assert!(op.try_apply(&mut candidate, &mut crate::random::IdGenerator::new()));
        assert!(!op.precondition_holds(&candidate));
    }
}
