// opportunities/inline_struct_field.rs
//! Undo structification: splice a synthetic wrapper field's inner struct
//! fields into the enclosing struct.
//!
//! Given
//!
//! ```text
//! struct _GLF_struct_1 { float _f0; int b; };
//! struct _GLF_struct_2 { _GLF_struct_1 _f1; vec2 p; };
//! ```
//!
//! inlining `_GLF_struct_2._f1` yields `{ float _f1_f0; int b; vec2 p; }`,
//! turns `_GLF_struct_2(_GLF_struct_1(x, y), v)` into `_GLF_struct_2(x, y, v)`
//! and `e._f1._f0` into `e._f1_f0`.

use rustc_hash::FxHashSet;
use shade_frontend::{
    DeclId, DeclKind, ExprId, ExprKind, FieldDecl, TranslationUnit, Visitor, walk_expr,
    walk_translation_unit,
};

use super::{Opportunity, OpportunityFinder, OpportunityKind, VisitationDepth};
use crate::analysis::Analysis;
use crate::random::IdGenerator;
use crate::typer::{Type, Types};

/// Name prefix of structs introduced by structification.
pub const SYNTHETIC_STRUCT_PREFIX: &str = "_GLF_struct_";

/// Name prefix of fields introduced by structification.
pub const SYNTHETIC_FIELD_PREFIX: &str = "_f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineStructifiedField {
    pub outer: DeclId,
    pub field: String,
    pub depth: VisitationDepth,
}

impl InlineStructifiedField {
    /// Rebuilds the inlining plan against `tu`, so constructors or accesses
    /// changed by earlier rewrites in the same step are caught here rather
    /// than half-way through [`InlineStructifiedField::apply`].
    pub fn precondition_holds(&self, tu: &TranslationUnit) -> bool {
        tu.is_decl_live(self.outer)
            && Plan::build(tu, &Types::compute(tu), self.outer, &self.field).is_some()
    }

    pub fn apply(&self, tu: &mut TranslationUnit, ids: &mut IdGenerator) {
        let Some(plan) = Plan::build(tu, &Types::compute(tu), self.outer, &self.field) else {
            return;
        };

        let DeclKind::Struct(outer) = tu.decl(self.outer) else {
            return;
        };
        let mut taken: FxHashSet<String> = outer
            .fields
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != plan.index)
            .map(|(_, field)| field.name.clone())
            .collect();

        let mut names = Vec::with_capacity(plan.inner_fields.len());
        let mut spliced = Vec::with_capacity(plan.inner_fields.len());
        for field in &plan.inner_fields {
            let preferred = if field.name.starts_with(SYNTHETIC_FIELD_PREFIX) {
                format!("{}{}", self.field, field.name)
            } else {
                field.name.clone()
            };
            let mut name = preferred.clone();
            while taken.contains(&name) {
                name = format!("{preferred}_{}", ids.fresh_id());
            }
            taken.insert(name.clone());
            names.push(name.clone());
            spliced.push(FieldDecl {
                name,
                ..field.clone()
            });
        }

        if let DeclKind::Struct(outer) = tu.decl_mut(self.outer) {
            let tail = outer.fields.split_off(plan.index + 1);
            outer.fields.pop();
            outer.fields.extend(spliced);
            outer.fields.extend(tail);
        }

        for call in plan.constructors {
            splice_constructor(tu, call, plan.index);
        }

        for access in plan.accesses {
            *tu.expr_mut(access.member) = ExprKind::Member {
                base: access.base,
                field: names[access.inner].clone(),
            };
            tu.forget_expr(access.wrapper);
        }
    }
}

/// `Outer(.., Inner(a, b), ..)` becomes `Outer(.., a, b, ..)`.
fn splice_constructor(tu: &mut TranslationUnit, call: ExprId, index: usize) {
    let ExprKind::Call { args, .. } = tu.expr(call) else {
        return;
    };
    let args = args.clone();
    let Some(&wrapped) = args.get(index) else {
        return;
    };
    let inner = tu.strip_parens(wrapped);
    let ExprKind::Call {
        args: inner_args, ..
    } = tu.expr(inner)
    else {
        return;
    };
    let inner_args = inner_args.clone();

    let mut slot = wrapped;
    while let ExprKind::Paren(next) = *tu.expr(slot) {
        tu.forget_expr(slot);
        slot = next;
    }
    tu.forget_expr(slot);

    let mut spliced = args[..index].to_vec();
    spliced.extend(inner_args);
    spliced.extend_from_slice(&args[index + 1..]);
    if let ExprKind::Call { args, .. } = tu.expr_mut(call) {
        *args = spliced;
    }
}

/// `member` is `base.<wrapper field>.<inner field>`; `wrapper` is the middle
/// node and `inner` the position of the inner field in the inner struct.
#[derive(Debug, Clone, Copy)]
struct Access {
    member: ExprId,
    wrapper: ExprId,
    base: ExprId,
    inner: usize,
}

/// Everything [`InlineStructifiedField::apply`] rewrites, gathered before
/// any mutation.
#[derive(Debug)]
struct Plan {
    index: usize,
    inner_fields: Vec<FieldDecl>,
    constructors: Vec<ExprId>,
    accesses: Vec<Access>,
}

impl Plan {
    fn build(tu: &TranslationUnit, types: &Types, outer: DeclId, field: &str) -> Option<Plan> {
        let DeclKind::Struct(outer_decl) = tu.decl(outer) else {
            return None;
        };
        if !outer_decl.name.starts_with(SYNTHETIC_STRUCT_PREFIX)
            || !field.starts_with(SYNTHETIC_FIELD_PREFIX)
        {
            return None;
        }
        let index = outer_decl.field_index(field)?;
        let wrapper = &outer_decl.fields[index];
        if wrapper.array_size.is_some() || !wrapper.ty.name.starts_with(SYNTHETIC_STRUCT_PREFIX) {
            return None;
        }
        let (_, inner_decl) = tu.find_struct(&wrapper.ty.name)?;

        let mut collector = Collector {
            types,
            outer: Type::Struct(outer_decl.name.clone()),
            outer_name: &outer_decl.name,
            inner_name: &inner_decl.name,
            field,
            index,
            arity: outer_decl.fields.len(),
            eligible: true,
            constructors: Vec::new(),
            accesses: Vec::new(),
            wrappers: Vec::new(),
        };
        walk_translation_unit(&mut collector, tu);

        if !collector.eligible {
            return None;
        }
        let accesses = collector
            .accesses
            .iter()
            .map(|&(member, wrapper, base)| {
                let ExprKind::Member { field, .. } = tu.expr(member) else {
                    return None;
                };
                Some(Access {
                    member,
                    wrapper,
                    base,
                    inner: inner_decl.field_index(field)?,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        let accessed: FxHashSet<ExprId> = accesses.iter().map(|a| a.wrapper).collect();
        if !collector.wrappers.iter().all(|w| accessed.contains(w)) {
            return None;
        }
        Some(Plan {
            index,
            inner_fields: inner_decl.fields.clone(),
            constructors: collector.constructors,
            accesses,
        })
    }
}

struct Collector<'a> {
    types: &'a Types,
    outer: Type,
    outer_name: &'a str,
    inner_name: &'a str,
    field: &'a str,
    index: usize,
    arity: usize,
    eligible: bool,
    constructors: Vec<ExprId>,
    /// `(member, wrapper, base)` for every `base.<field>.<name>`.
    accesses: Vec<(ExprId, ExprId, ExprId)>,
    /// Every `e.<field>` with `e` of the outer struct type.
    wrappers: Vec<ExprId>,
}

impl Collector<'_> {
    fn is_wrapper(&self, tu: &TranslationUnit, id: ExprId) -> Option<ExprId> {
        match tu.expr(id) {
            ExprKind::Member { base, field }
                if field == self.field && self.types.get(*base) == Some(&self.outer) =>
            {
                Some(*base)
            }
            _ => None,
        }
    }
}

impl Visitor for Collector<'_> {
    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        match tu.expr(id) {
            ExprKind::Call { callee, args } if callee == self.outer_name => {
                let wraps_inner = args.len() == self.arity
                    && matches!(
                        tu.expr(tu.strip_parens(args[self.index])),
                        ExprKind::Call { callee, .. } if callee == self.inner_name
                    );
                if wraps_inner {
                    self.constructors.push(id);
                } else {
                    self.eligible = false;
                }
            }
            ExprKind::Member { base, field } => {
                // An untyped base may hide an access through the wrapper.
                if field == self.field && self.types.get(*base).is_none() {
                    self.eligible = false;
                }
                if let Some(outer_base) = self.is_wrapper(tu, *base) {
                    self.accesses.push((id, *base, outer_base));
                }
                if self.is_wrapper(tu, id).is_some() {
                    self.wrappers.push(id);
                }
            }
            _ => {}
        }
        walk_expr(self, tu, id, depth);
    }
}

pub struct InlineStructFieldFinder;

impl OpportunityFinder for InlineStructFieldFinder {
    fn kind(&self) -> OpportunityKind {
        OpportunityKind::InlineStructifiedField
    }

    fn find(&self, tu: &TranslationUnit, analysis: &Analysis) -> Vec<Opportunity> {
        let mut found = Vec::new();
        for (outer, decl) in tu.structs() {
            for field in &decl.fields {
                if Plan::build(tu, &analysis.types, outer, &field.name).is_some() {
                    found.push(Opportunity::InlineStructifiedField(InlineStructifiedField {
                        outer,
                        field: field.name.clone(),
                        depth: VisitationDepth(0),
                    }));
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    const STRUCTS: &str = "struct _GLF_struct_1 { float _f0; int b; };\n\
                           struct _GLF_struct_2 { _GLF_struct_1 _f1; vec2 p; };\n";

    fn inline(body: &str) -> (Vec<Opportunity>, Option<String>) {
        let source = format!("{STRUCTS}void main() {{ {body} }}");
        let (tu, found) = find_kind(&source, false, OpportunityKind::InlineStructifiedField);
        let printed = found.first().map(|op| applied(&tu, op));
        (found, printed)
    }

    #[test]
    fn splices_fields_constructors_and_accesses() {
        let (found, printed) = inline(
            "_GLF_struct_2 s = _GLF_struct_2(_GLF_struct_1(1.0, 2), vec2(0.0));\n\
             float x = s._f1._f0;\n\
             int y = s._f1.b;",
        );
        assert_eq!(found.len(), 1);
        let printed = printed.unwrap();
        assert!(printed.contains(
            "struct _GLF_struct_2 {\n    float _f1_f0;\n    int b;\n    vec2 p;\n};"
        ));
        assert!(printed.contains("_GLF_struct_2 s = _GLF_struct_2(1.0, 2, vec2(0.0));"));
        assert!(printed.contains("float x = s._f1_f0;"));
        assert!(printed.contains("int y = s.b;"));
        assert!(!printed.contains("._f1."));
        assert!(!printed.contains("_GLF_struct_1("));
    }

    #[test]
    fn colliding_names_get_a_fresh_suffix() {
        let source = "struct _GLF_struct_1 { int b; };\n\
                      struct _GLF_struct_2 { _GLF_struct_1 _f0; int b; };\n\
                      void main() { _GLF_struct_2 s = _GLF_struct_2(_GLF_struct_1(1), 2); s._f0.b; }";
        let (tu, found) = find_kind(source, false, OpportunityKind::InlineStructifiedField);
        let printed = applied(&tu, &found[0]);
        assert!(printed.contains("struct _GLF_struct_2 {\n    int b_0;\n    int b;\n};"));
        assert!(printed.contains("s.b_0;"));
    }

    #[test]
    fn whole_wrapper_use_blocks_inlining() {
        let (found, _) = inline(
            "_GLF_struct_2 s;\n\
             _GLF_struct_1 t = s._f1;",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn constructor_without_inner_call_blocks_inlining() {
        let (found, _) = inline(
            "_GLF_struct_1 t = _GLF_struct_1(1.0, 2);\n\
             _GLF_struct_2 s = _GLF_struct_2(t, vec2(0.0));",
        );
        assert!(found.is_empty());
    }

    #[test]
    fn unprefixed_structs_are_not_candidates() {
        let (_, found) = find_kind(
            "struct Inner { float a; };\nstruct Outer { Inner _f0; };\nvoid main() {}",
            false,
            OpportunityKind::InlineStructifiedField,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn inlined_field_is_stale() {
        let source = format!("{STRUCTS}void main() {{}}");
        let (tu, found) = find_kind(&source, false, OpportunityKind::InlineStructifiedField);
        let mut candidate = tu.clone();
        assert!(found[0].try_apply(&mut candidate, &mut IdGenerator::new()));
        assert!(!found[0].precondition_holds(&candidate));
    }

    #[test]
    fn untyped_base_blocks_inlining() {
        let source = format!(
            "{STRUCTS}_GLF_struct_2 make(float x) {{ \
             return _GLF_struct_2(_GLF_struct_1(x, 1), vec2(x)); }}\n\
             void main() {{ float y = make(1)._f1._f0; }}"
        );
        let (_, found) = find_kind(&source, false, OpportunityKind::InlineStructifiedField);
        assert!(found.is_empty());
    }

    #[test]
    fn call_result_base_is_rewritten() {
        let source = format!(
            "{STRUCTS}_GLF_struct_2 make(float x) {{ \
             return _GLF_struct_2(_GLF_struct_1(x, 1), vec2(x)); }}\n\
             void main() {{ float y = make(1.0)._f1._f0; }}"
        );
        let (tu, found) = find_kind(&source, false, OpportunityKind::InlineStructifiedField);
        assert_eq!(found.len(), 1);
        let printed = applied(&tu, &found[0]);
        assert!(printed.contains("return _GLF_struct_2(x, 1, vec2(x));"));
        assert!(printed.contains("float y = make(1.0)._f1_f0;"));
        assert!(!printed.contains("._f1."));
    }

    #[test]
    fn nested_wrappers_inline_one_level_at_a_time() {
        let source = format!(
            "{STRUCTS}struct _GLF_struct_3 {{ _GLF_struct_2 _f0; }};\n\
             void main() {{\n\
                 _GLF_struct_3 a = _GLF_struct_3(_GLF_struct_2(_GLF_struct_1(1.0, 2), vec2(0.0)));\n\
                 float x = a._f0._f1._f0;\n\
             }}"
        );
        let (tu, found) = find_kind(&source, false, OpportunityKind::InlineStructifiedField);
        assert_eq!(found.len(), 2);

        for op in &found {
            let printed = applied(&tu, op);
            shade_frontend::parse(&printed).unwrap();
            let Opportunity::InlineStructifiedField(inline) = op else {
                panic!("unexpected {op}");
            };
            match inline.field.as_str() {
                "_f1" => {
                    assert!(printed.contains("float x = a._f0._f1_f0;"));
                    assert!(printed.contains("_GLF_struct_2(1.0, 2, vec2(0.0))"));
                }
                "_f0" => {
                    assert!(printed.contains("float x = a._f0_f1._f0;"));
                    assert!(printed.contains(
                        "_GLF_struct_3 a = _GLF_struct_3(_GLF_struct_1(1.0, 2), vec2(0.0));"
                    ));
                }
                other => panic!("unexpected field {other}"),
            }
        }
    }
}
