// analysis.rs
//! Shared facts every finder reads: scope, types, lvalue positions and
//! name-use counts. Computed once per pass over the accepted tree.

use rustc_hash::{FxHashMap, FxHashSet};
use shade_frontend::{
    DeclId, DeclKind, ExprId, ExprKind, Qualifier, ShadingLanguageVersion, StmtId, StmtKind,
    TranslationUnit, TypeSpec, Visitor, walk_decl, walk_expr, walk_stmt, walk_translation_unit,
};

use crate::scope::ReductionScope;
use crate::typer::{Types, builtin_out_params};

#[derive(Debug, Clone)]
pub struct Analysis {
    pub version: ShadingLanguageVersion,
    pub scope: ReductionScope,
    pub types: Types,
    pub uses: NameUses,
    lvalues: FxHashSet<ExprId>,
    /// Per function name, which parameter positions are `out`/`inout`.
    out_params: FxHashMap<String, Vec<usize>>,
}

impl Analysis {
    pub fn compute(tu: &TranslationUnit, reduce_everywhere: bool) -> Self {
        let out_params = out_param_positions(tu);
        let mut lvalues = LvalueCollector {
            out_params: &out_params,
            lvalues: FxHashSet::default(),
        };
        walk_translation_unit(&mut lvalues, tu);
        let lvalues = lvalues.lvalues;

        Analysis {
            version: tu.language_version(),
            scope: ReductionScope::compute(tu, reduce_everywhere),
            types: Types::compute(tu),
            uses: NameUses::compute(tu),
            lvalues,
            out_params,
        }
    }

    /// The expression is written to: an assignment target, an
    /// increment/decrement operand, an `out` argument, or the base of one.
    pub fn is_lvalue(&self, id: ExprId) -> bool {
        self.lvalues.contains(&id)
    }

    pub fn is_user_function(&self, name: &str) -> bool {
        self.out_params.contains_key(name)
    }

    /// A call that writes through `out`/`inout` arguments.
    pub fn writes_arguments(&self, tu: &TranslationUnit, id: ExprId) -> bool {
        match tu.expr(id) {
            ExprKind::Call { callee, .. } => match self.out_params.get(callee) {
                Some(positions) => !positions.is_empty(),
                None => !builtin_out_params(callee).is_empty(),
            },
            _ => false,
        }
    }

    /// Conservative: any write, any call to a user-defined function and any
    /// builtin with `out` parameters counts.
    pub fn has_side_effects(&self, tu: &TranslationUnit, id: ExprId) -> bool {
        let effectful = match tu.expr(id) {
            ExprKind::Binary { op, .. } => op.is_assignment(),
            ExprKind::Unary { op, .. } => op.is_side_effecting(),
            ExprKind::Call { callee, .. } => {
                self.is_user_function(callee) || !builtin_out_params(callee).is_empty()
            }
            _ => false,
        };
        effectful
            || tu
                .expr(id)
                .children()
                .into_iter()
                .any(|child| self.has_side_effects(tu, child))
    }
}

/// `Paren`, `Member` and `Index` pass writes through to their base.
fn lvalue_chain(tu: &TranslationUnit, mut id: ExprId, out: &mut FxHashSet<ExprId>) {
    loop {
        out.insert(id);
        id = match tu.expr(id) {
            ExprKind::Paren(inner) => *inner,
            ExprKind::Member { base, .. } | ExprKind::Index { base, .. } => *base,
            _ => return,
        };
    }
}

fn out_param_positions(tu: &TranslationUnit) -> FxHashMap<String, Vec<usize>> {
    let mut out: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (_, func) in tu.functions() {
        let positions = func
            .params
            .iter()
            .enumerate()
            .filter(|(_, param)| {
                param.ty.has_qualifier(&Qualifier::Out) || param.ty.has_qualifier(&Qualifier::InOut)
            })
            .map(|(i, _)| i);
        let entry = out.entry(func.name.clone()).or_default();
        entry.extend(positions);
        entry.sort_unstable();
        entry.dedup();
    }
    out
}

struct LvalueCollector<'a> {
    out_params: &'a FxHashMap<String, Vec<usize>>,
    lvalues: FxHashSet<ExprId>,
}

impl Visitor for LvalueCollector<'_> {
    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        match tu.expr(id) {
            ExprKind::Binary { op, lhs, .. } if op.is_assignment() => {
                lvalue_chain(tu, *lhs, &mut self.lvalues);
            }
            ExprKind::Unary { op, operand } if op.is_side_effecting() => {
                lvalue_chain(tu, *operand, &mut self.lvalues);
            }
            ExprKind::Call { callee, args } => {
                let positions = match self.out_params.get(callee) {
                    Some(positions) => positions.as_slice(),
                    None => builtin_out_params(callee),
                };
                for &pos in positions {
                    if let Some(&arg) = args.get(pos) {
                        lvalue_chain(tu, arg, &mut self.lvalues);
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, tu, id, depth);
    }
}

/// How often names are referenced.
#[derive(Debug, Clone, Default)]
pub struct NameUses {
    /// Calls by callee name, including struct constructors.
    calls: FxHashMap<String, usize>,
    /// Type names appearing in declarations, parameters, return types and
    /// struct fields.
    type_refs: FxHashMap<String, usize>,
    /// Identifier references inside each function body.
    idents: FxHashMap<DeclId, FxHashMap<String, usize>>,
}

impl NameUses {
    pub fn compute(tu: &TranslationUnit) -> Self {
        let mut collector = UseCollector {
            uses: NameUses::default(),
            function: None,
        };
        walk_translation_unit(&mut collector, tu);
        collector.uses
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn type_refs(&self, name: &str) -> usize {
        self.type_refs.get(name).copied().unwrap_or(0)
    }

    pub fn ident_uses_in(&self, function: DeclId, name: &str) -> usize {
        self.idents
            .get(&function)
            .and_then(|names| names.get(name))
            .copied()
            .unwrap_or(0)
    }
}

struct UseCollector {
    uses: NameUses,
    function: Option<DeclId>,
}

impl UseCollector {
    fn type_ref(&mut self, ty: &TypeSpec) {
        *self.uses.type_refs.entry(ty.name.clone()).or_default() += 1;
    }
}

impl Visitor for UseCollector {
    fn visit_decl(&mut self, tu: &TranslationUnit, id: DeclId, depth: u32) {
        match tu.decl(id) {
            DeclKind::Function(func) => {
                self.type_ref(&func.return_type);
                for param in &func.params {
                    self.type_ref(&param.ty);
                }
                self.function = Some(id);
                walk_decl(self, tu, id, depth);
                self.function = None;
            }
            DeclKind::Struct(decl) => {
                for field in &decl.fields {
                    self.type_ref(&field.ty);
                }
            }
            DeclKind::Variables(vars) => {
                self.type_ref(&vars.ty);
                walk_decl(self, tu, id, depth);
            }
            DeclKind::Directive(_) | DeclKind::Precision { .. } => {}
        }
    }

    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        if let StmtKind::VarDecl(vars) = tu.stmt(id) {
            self.type_ref(&vars.ty);
        }
        walk_stmt(self, tu, id, depth);
    }

    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        match tu.expr(id) {
            ExprKind::Call { callee, .. } => {
                *self.uses.calls.entry(callee.clone()).or_default() += 1;
            }
            ExprKind::Ident(name) => {
                if let Some(function) = self.function {
                    *self
                        .uses
                        .idents
                        .entry(function)
                        .or_default()
                        .entry(name.clone())
                        .or_default() += 1;
                }
            }
            _ => {}
        }
        walk_expr(self, tu, id, depth);
    }
}
