// opportunities/decl_removal.rs
//! Remove unreferenced top-level functions and structs.

use shade_frontend::{DeclId, DeclKind, TranslationUnit};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveDeclaration {
    pub decl: DeclId,
    pub depth: VisitationDepth,
}

impl RemoveDeclaration {
    /// References only ever disappear, so an unreferenced declaration stays
    /// unreferenced while it is live.
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        tu.is_decl_live(self.decl)
    }

    pub fn apply(&self, tu: &mut TranslationUnit) {
        tu.remove_decl(self.decl);
    }
}

pub struct DeclRemovalFinder;

impl OpportunityFinder for DeclRemovalFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::RemoveDeclaration
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let uses = &analysis.uses;
        tu.decls
            .iter()
            .filter(|&&decl| match tu.decl(decl) {
                DeclKind::Function(func) => func.name != "main" && uses.calls(&func.name) == 0,
                DeclKind::Struct(s) => uses.calls(&s.name) == 0 && uses.type_refs(&s.name) == 0,
                DeclKind::Directive(_) | DeclKind::Precision { .. } | DeclKind::Variables(_) => {
                    false
                }
            })
            .map(|&decl| {
                Opportunity::RemoveDeclaration(RemoveDeclaration {
                    decl,
                    depth: VisitationDepth(0),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    const SOURCE: &str = "struct Used { float a; };\n\
                          struct Unused { int b; };\n\
                          float helper(float x);\n\
                          float helper(float x) { return x; }\n\
                          float orphan() { return 1.0; }\n\
                          void main() { Used u = Used(helper(2.0)); }";

    #[test]
    fn only_unreferenced_declarations_are_offered() {
        let (tu, found) = find_kind(SOURCE, false, OpportunityKind::RemoveDeclaration);
        let names: Vec<String> = found
            .iter()
            .map(|op| {
                let Opportunity::RemoveDeclaration(op) = op else {
                    panic!("unexpected {op}");
                };
                match tu.decl(op.decl) {
                    DeclKind::Function(f) => f.name.clone(),
                    DeclKind::Struct(s) => s.name.clone(),
                    other => panic!("unexpected {other:?}"),
                }
            })
            .collect();
        assert_eq!(names, ["Unused", "orphan"]);
    }

    #[test]
    fn removing_one_declaration_leaves_the_rest() {
        let (tu, found) = find_kind(SOURCE, false, OpportunityKind::RemoveDeclaration);
        let printed = applied(&tu, &found[1]);
        assert!(!printed.contains("orphan"));
        let reparsed = shade_frontend::parse(&printed).unwrap();
        assert_eq!(reparsed.decls.len(), tu.decls.len() - 1);
    }

    #[test]
    fn constructor_use_keeps_a_struct() {
        let (_, found) = find_kind(
            "struct S { float a; };\nvoid main() { S(1.0); }",
            false,
            OpportunityKind::RemoveDeclaration,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn main_is_never_removed() {
        let (_, found) = find_kind("void main() {}", true, OpportunityKind::RemoveDeclaration);
        assert!(found.is_empty());
    }

    #[test]
    fn removed_declaration_is_stale() {
        let (tu, found) = find_kind(SOURCE, false, OpportunityKind::RemoveDeclaration);
        let mut candidate = tu.clone();
        assert!(found[0].try_apply(&mut candidate, &mut crate::random::IdGenerator::new()));
        assert!(!found[0].precondition_holds(&candidate));
        assert!(found[1].precondition_holds(&candidate));
    }
}
