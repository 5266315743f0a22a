// opportunities/mod.rs
//! Reduction opportunities and the finders that discover them.
//!
//! An [`Opportunity`] names one local simplification by the arena ids it
//! touches. It stays valid for the tree it was found on and for any
//! id-preserving clone of that tree; once the tree is compacted every
//! opportunity must be rediscovered. Each kind pairs a payload type with an
//! [`OpportunityFinder`]; [`all`] is the single list of registered finders.

mod compound_expr;
mod decl_removal;
mod expr_to_constant;
mod inline_struct_field;
mod stmt_removal;
mod unwrap_stmt;
mod var_decl_removal;

use std::fmt;

use clap::ValueEnum;
use shade_frontend::TranslationUnit;

use crate::analysis::Analysis;
use crate::random::IdGenerator;

pub use compound_expr::{CompoundExprFinder, CompoundExprToSubExpr};
pub use decl_removal::{DeclRemovalFinder, RemoveDeclaration};
pub use expr_to_constant::{ExprToConstant, ExprToConstantFinder};
pub use inline_struct_field::{InlineStructFieldFinder, InlineStructifiedField};
pub use stmt_removal::{RemoveStmt, StmtRemovalFinder};
pub use unwrap_stmt::{UnwrapKind, UnwrapStmt, UnwrapStmtFinder};
pub use var_decl_removal::{RemoveVariable, VarDeclRemovalFinder};

// ---------------------------------------------------------------------------
// Kinds and depth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum OpportunityKind {
    CompoundExprToSubExpr,
    ExprToConstant,
    RemoveDeclaration,
    InlineStructifiedField,
    RemoveStmt,
    RemoveVariable,
    UnwrapStmt,
}

impl OpportunityKind {
    pub const ALL: [OpportunityKind; 7] = [
        OpportunityKind::CompoundExprToSubExpr,
        OpportunityKind::ExprToConstant,
        OpportunityKind::RemoveDeclaration,
        OpportunityKind::InlineStructifiedField,
        OpportunityKind::RemoveStmt,
        OpportunityKind::RemoveVariable,
        OpportunityKind::UnwrapStmt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityKind::CompoundExprToSubExpr => "compound-expr-to-sub-expr",
            OpportunityKind::ExprToConstant => "expr-to-constant",
            OpportunityKind::RemoveDeclaration => "remove-declaration",
            OpportunityKind::InlineStructifiedField => "inline-structified-field",
            OpportunityKind::RemoveStmt => "remove-stmt",
            OpportunityKind::RemoveVariable => "remove-variable",
            OpportunityKind::UnwrapStmt => "unwrap-stmt",
        }
    }
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nesting depth of an opportunity's target: top-level declarations are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VisitationDepth(pub u32);

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opportunity {
    CompoundExprToSubExpr(CompoundExprToSubExpr),
    ExprToConstant(ExprToConstant),
    RemoveDeclaration(RemoveDeclaration),
    InlineStructifiedField(InlineStructifiedField),
    RemoveStmt(RemoveStmt),
    RemoveVariable(RemoveVariable),
    UnwrapStmt(UnwrapStmt),
}

impl Opportunity {
    pub fn kind(&self) -> OpportunityKind {
        match self {
            Opportunity::CompoundExprToSubExpr(_) => OpportunityKind::CompoundExprToSubExpr,
            Opportunity::ExprToConstant(_) => OpportunityKind::ExprToConstant,
            Opportunity::RemoveDeclaration(_) => OpportunityKind::RemoveDeclaration,
            Opportunity::InlineStructifiedField(_) => OpportunityKind::InlineStructifiedField,
            Opportunity::RemoveStmt(_) => OpportunityKind::RemoveStmt,
            Opportunity::RemoveVariable(_) => OpportunityKind::RemoveVariable,
            Opportunity::UnwrapStmt(_) => OpportunityKind::UnwrapStmt,
        }
    }

    pub fn depth(&self) -> VisitationDepth {
        match self {
            Opportunity::CompoundExprToSubExpr(op) => op.depth,
            Opportunity::ExprToConstant(op) => op.depth,
            Opportunity::RemoveDeclaration(op) => op.depth,
            Opportunity::InlineStructifiedField(op) => op.depth,
            Opportunity::RemoveStmt(op) => op.depth,
            Opportunity::RemoveVariable(op) => op.depth,
            Opportunity::UnwrapStmt(op) => op.depth,
        }
    }

    /// Whether the opportunity's targets are still live and eligible.
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        match self {
            Opportunity::CompoundExprToSubExpr(op) => op.precondition_holds(tu),
            Opportunity::ExprToConstant(op) => op.precondition_holds(tu),
            Opportunity::RemoveDeclaration(op) => op.precondition_holds(tu),
            Opportunity::InlineStructifiedField(op) => op.precondition_holds(tu),
            Opportunity::RemoveStmt(op) => op.precondition_holds(tu),
            Opportunity::RemoveVariable(op) => op.precondition_holds(tu),
            Opportunity::UnwrapStmt(op) => op.precondition_holds(tu),
        }
    }

    /// Perform the rewrite. Assumes [`Opportunity::precondition_holds`].
    pub fn apply(&self, tu: &mut TranslationUnit, ids: &mut IdGenerator) {
        match self {
            Opportunity::CompoundExprToSubExpr(op) => op.apply(tu),
            Opportunity::ExprToConstant(op) => op.apply(tu),
            Opportunity::RemoveDeclaration(op) => op.apply(tu),
            Opportunity::InlineStructifiedField(op) => op.apply(tu, ids),
            Opportunity::RemoveStmt(op) => op.apply(tu),
            Opportunity::RemoveVariable(op) => op.apply(tu),
            Opportunity::UnwrapStmt(op) => op.apply(tu),
        }
    }

    /// Re-check the precondition and apply. Returns `false` for a stale
    /// opportunity, leaving the tree untouched.
    pub fn try_apply(&self, tu: &mut TranslationUnit, ids: &mut IdGenerator) -> bool {
        if !self.precondition_holds(tu) {
            return false;
        }
        self.apply(tu, ids);
        true
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opportunity::CompoundExprToSubExpr(op) => {
                write!(f, "{} {} -> {}", self.kind(), op.target, op.child)
            }
            Opportunity::ExprToConstant(op) => {
                write!(f, "{} {} -> {}", self.kind(), op.target, op.constant)
            }
            Opportunity::RemoveDeclaration(op) => write!(f, "{} {}", self.kind(), op.decl),
            Opportunity::InlineStructifiedField(op) => {
                write!(f, "{} {}.{}", self.kind(), op.outer, op.field)
            }
            Opportunity::RemoveStmt(op) => write!(f, "{} {}", self.kind(), op.stmt),
            Opportunity::RemoveVariable(op) => {
                write!(f, "{} {} in {}", self.kind(), op.name, op.stmt)
            }
            Opportunity::UnwrapStmt(op) => {
                write!(f, "{} {} ({:?})", self.kind(), op.target, op.unwrap)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Finders
// ---------------------------------------------------------------------------

/// Discovers every opportunity of one kind. Finders only read the tree.
pub trait OpportunityFinder {
    fn kind(&self) -> OpportunityKind;

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity>;
}

/// Every registered finder, one per [`OpportunityKind`].
pub fn all() -> Vec<Box<dyn OpportunityFinder>> {
    vec![
        Box::new(CompoundExprFinder),
        Box::new(ExprToConstantFinder),
        Box::new(DeclRemovalFinder),
        Box::new(InlineStructFieldFinder),
        Box::new(StmtRemovalFinder),
        Box::new(VarDeclRemovalFinder),
        Box::new(UnwrapStmtFinder),
    ]
}

/// Run the enabled finders over `tu` and return their results stably sorted
/// by depth, shallowest first.
pub fn find_opportunities(
    tu: &TranslationUnit,
    reduce_everywhere: bool,
    enabled: &[OpportunityKind],
) -> Vec<Opportunity> {
    let analysis = Analysis::compute(tu, reduce_everywhere);
    let mut found = Vec::new();
    for finder in all() {
        if !enabled.contains(&finder.kind()) {
            continue;
        }
        let batch = finder.find(tu, &analysis);
        tracing::trace!(kind = %finder.kind(), count = batch.len(), "finder ran");
        found.extend(batch);
    }
    found.sort_by_key(Opportunity::depth);
    found
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn one_finder_per_kind() {
        let kinds: Vec<OpportunityKind> = all().iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, OpportunityKind::ALL);
    }

    #[test]
    fn kind_names_match_cli_values() {
        for kind in OpportunityKind::ALL {
            let parsed = OpportunityKind::from_str(kind.as_str(), false).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn results_are_sorted_by_depth() {
        let source = "void unused(int a) { if (a > 0) { a = a + 1; } }\nvoid main() {}";
        let tu = shade_frontend::parse(source).unwrap();
        let found = find_opportunities(&tu, false, &OpportunityKind::ALL);
        assert!(!found.is_empty());
        assert!(found.windows(2).all(|w| w[0].depth() <= w[1].depth()));
        assert_eq!(found[0].kind(), OpportunityKind::RemoveDeclaration);
    }

    #[test]
    fn disabled_kinds_are_skipped() {
        let (_, found) = find_kind(
            "void unused() {}\nvoid main() {}",
            false,
            OpportunityKind::RemoveStmt,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn rerunning_on_unchanged_tree_is_stable() {
        let source = "float f(float a, float b) { return a * b + a; }\nvoid main() {}";
        let tu = shade_frontend::parse(source).unwrap();
        let first = find_opportunities(&tu, true, &OpportunityKind::ALL);
        let second = find_opportunities(&tu, true, &OpportunityKind::ALL);
        assert_eq!(first, second);
    }
}
