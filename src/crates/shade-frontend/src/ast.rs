// src/ast.rs
//! Arena-allocated AST for the shading language.
//!
//! Every expression, statement and top-level declaration lives in a typed
//! arena slot addressed by [`ExprId`], [`StmtId`] or [`DeclId`]. Slots are
//! never reused: removing a subtree marks its slots dead, so a stale id can be
//! detected with a single liveness lookup. Cloning a [`TranslationUnit`]
//! copies the arenas verbatim, so an id names the same structural position in
//! the clone as in the original. [`TranslationUnit::compact`] rebuilds dense
//! arenas and invalidates every id handed out before.

use std::marker::PhantomData;

use crate::version::ShadingLanguageVersion;

// ---------------------------------------------------------------------------
// Ids and arenas
// ---------------------------------------------------------------------------

/// Conversion between an id newtype and its arena slot index.
pub trait ArenaId: Copy {
    fn from_index(index: usize) -> Self;
    fn slot(self) -> usize;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index. Only arenas and tests should use this.
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            /// Return the underlying index.
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn slot(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of an expression slot.
    ExprId,
    "expr"
);
define_id!(
    /// Identifier of a statement slot.
    StmtId,
    "stmt"
);
define_id!(
    /// Identifier of a top-level declaration slot.
    DeclId,
    "decl"
);

#[derive(Debug, Clone)]
struct Slot<T> {
    node: T,
    live: bool,
}

/// Append-only node storage with per-slot liveness.
#[derive(Debug, Clone)]
pub struct Arena<I, T> {
    slots: Vec<Slot<T>>,
    _id: PhantomData<fn() -> I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn alloc(&mut self, node: T) -> I {
        let id = I::from_index(self.slots.len());
        self.slots.push(Slot { node, live: true });
        id
    }

    /// Access a slot. Ids always come from this arena, so the index is in range.
    pub fn get(&self, id: I) -> &T {
        &self.slots[id.slot()].node
    }

    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.slots[id.slot()].node
    }

    /// `false` for dead slots and for ids that were never allocated here.
    pub fn is_live(&self, id: I) -> bool {
        self.slots.get(id.slot()).is_some_and(|slot| slot.live)
    }

    pub fn kill(&mut self, id: I) {
        if let Some(slot) = self.slots.get_mut(id.slot()) {
            slot.live = false;
        }
    }

    /// Total number of slots, live or dead.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }
}

// ---------------------------------------------------------------------------
// Types and qualifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    High,
    Medium,
    Low,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::High => "highp",
            Precision::Medium => "mediump",
            Precision::Low => "lowp",
        }
    }
}

/// One `key` or `key = value` entry of a `layout(...)` qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutItem {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Const,
    Uniform,
    In,
    Out,
    InOut,
    Attribute,
    Varying,
    Flat,
    Invariant,
    Precision(Precision),
    Layout(Vec<LayoutItem>),
}

/// A possibly-qualified type name, e.g. `uniform highp vec2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub qualifiers: Vec<Qualifier>,
    pub name: String,
}

impl TypeSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            qualifiers: Vec::new(),
            name: name.into(),
        }
    }

    pub fn has_qualifier(&self, qualifier: &Qualifier) -> bool {
        self.qualifiers.contains(qualifier)
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Literal text is kept verbatim so printing reproduces the source spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(String),
    Uint(String),
    Float(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    /// Increment and decrement write to their operand.
    pub fn is_side_effecting(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Xor,
    Or,
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Comma,
}

/// Binding strength of the non-binary expression forms.
pub const PREC_TERNARY: u8 = 3;
pub const PREC_UNARY: u8 = 15;
pub const PREC_POSTFIX: u8 = 16;
pub const PREC_PRIMARY: u8 = 17;

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Xor => "^^",
            BinaryOp::Or => "||",
            BinaryOp::Assign => "=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::ModAssign => "%=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::Comma => ",",
        }
    }

    /// Higher binds tighter. Ternary sits at [`PREC_TERNARY`], between
    /// assignment and `||`.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Comma => 1,
            op if op.is_assignment() => 2,
            BinaryOp::Or => 4,
            BinaryOp::Xor => 5,
            BinaryOp::And => 6,
            BinaryOp::BitOr => 7,
            BinaryOp::BitXor => 8,
            BinaryOp::BitAnd => 9,
            BinaryOp::Eq | BinaryOp::Ne => 10,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 11,
            BinaryOp::Shl | BinaryOp::Shr => 12,
            BinaryOp::Add | BinaryOp::Sub => 13,
            _ => 14,
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::ModAssign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::AndAssign
                | BinaryOp::XorAssign
                | BinaryOp::OrAssign
        )
    }

    /// Relational, equality and logical operators always yield `bool`.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::And
                | BinaryOp::Xor
                | BinaryOp::Or
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    Paren(ExprId),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Ternary {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// Function calls and type constructors (`vec4(1.0)`, `S(a, b)`).
    Call {
        callee: String,
        args: Vec<ExprId>,
    },
    /// Struct field access or vector swizzle.
    Member {
        base: ExprId,
        field: String,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
}

impl ExprKind {
    /// Direct sub-expressions in source order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Literal(_) | ExprKind::Ident(_) => Vec::new(),
            ExprKind::Paren(inner) => vec![*inner],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => vec![*cond, *then_expr, *else_expr],
            ExprKind::Call { args, .. } => args.clone(),
            ExprKind::Member { base, .. } => vec![*base],
            ExprKind::Index { base, index } => vec![*base, *index],
        }
    }

    /// Rebuild this node with every child id passed through `f`.
    pub fn map_children(&self, mut f: impl FnMut(ExprId) -> ExprId) -> ExprKind {
        match self {
            ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
            ExprKind::Ident(name) => ExprKind::Ident(name.clone()),
            ExprKind::Paren(inner) => ExprKind::Paren(f(*inner)),
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: f(*operand),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = f(*lhs);
                let rhs = f(*rhs);
                ExprKind::Binary { op: *op, lhs, rhs }
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = f(*cond);
                let then_expr = f(*then_expr);
                let else_expr = f(*else_expr);
                ExprKind::Ternary {
                    cond,
                    then_expr,
                    else_expr,
                }
            }
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: callee.clone(),
                args: args.iter().map(|arg| f(*arg)).collect(),
            },
            ExprKind::Member { base, field } => ExprKind::Member {
                base: f(*base),
                field: field.clone(),
            },
            ExprKind::Index { base, index } => {
                let base = f(*base);
                let index = f(*index);
                ExprKind::Index { base, index }
            }
        }
    }

    /// Binding strength used by the printer to decide on parentheses.
    pub fn precedence(&self) -> u8 {
        match self {
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Ternary { .. } => PREC_TERNARY,
            ExprKind::Unary { op, .. } if !op.is_postfix() => PREC_UNARY,
            ExprKind::Unary { .. }
            | ExprKind::Call { .. }
            | ExprKind::Member { .. }
            | ExprKind::Index { .. } => PREC_POSTFIX,
            ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::Paren(_) => PREC_PRIMARY,
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// One name in a variable declaration: `a`, `b[3]`, `c = 1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub array_size: Option<u32>,
    pub init: Option<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: TypeSpec,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    VarDecl(VarDecl),
    Expr(ExprId),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    /// `init` is a `VarDecl`, `Expr` or `Empty` statement.
    For {
        init: StmtId,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Discard,
    Empty,
}

impl StmtKind {
    /// Direct sub-statements in source order.
    pub fn child_stmts(&self) -> Vec<StmtId> {
        match self {
            StmtKind::Block(stmts) => stmts.clone(),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut out = vec![*then_branch];
                out.extend(else_branch.iter().copied());
                out
            }
            StmtKind::For { init, body, .. } => vec![*init, *body],
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => vec![*body],
            _ => Vec::new(),
        }
    }

    /// Expressions owned directly by this statement.
    pub fn child_exprs(&self) -> Vec<ExprId> {
        match self {
            StmtKind::VarDecl(decl) => decl.declarators.iter().filter_map(|d| d.init).collect(),
            StmtKind::Expr(expr) => vec![*expr],
            StmtKind::If { cond, .. }
            | StmtKind::While { cond, .. }
            | StmtKind::DoWhile { cond, .. } => vec![*cond],
            StmtKind::For { cond, step, .. } => cond.iter().chain(step.iter()).copied().collect(),
            StmtKind::Return(value) => value.iter().copied().collect(),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub ty: TypeSpec,
    pub name: String,
    pub array_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeSpec,
    pub name: Option<String>,
    pub array_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub return_type: TypeSpec,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for a prototype.
    pub body: Option<StmtId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// A preprocessor line other than the leading `#version`, kept verbatim.
    Directive(String),
    Precision {
        precision: Precision,
        ty: String,
    },
    Struct(StructDecl),
    Function(FunctionDecl),
    Variables(VarDecl),
}

impl DeclKind {
    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match self {
            DeclKind::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match self {
            DeclKind::Struct(decl) => Some(decl),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Translation unit
// ---------------------------------------------------------------------------

/// A whole shader: optional `#version`, top-level declarations in order, and
/// the arenas holding every node.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub version: Option<ShadingLanguageVersion>,
    pub decls: Vec<DeclId>,
    exprs: Arena<ExprId, ExprKind>,
    stmts: Arena<StmtId, StmtKind>,
    decl_nodes: Arena<DeclId, DeclKind>,
}

impl TranslationUnit {
    pub fn new(version: Option<ShadingLanguageVersion>) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// The declared version, or the implicit default when `#version` is absent.
    pub fn language_version(&self) -> ShadingLanguageVersion {
        self.version.unwrap_or_default()
    }

    // -- allocation ---------------------------------------------------------

    pub fn add_expr(&mut self, kind: ExprKind) -> ExprId {
        self.exprs.alloc(kind)
    }

    pub fn add_stmt(&mut self, kind: StmtKind) -> StmtId {
        self.stmts.alloc(kind)
    }

    /// Allocate a declaration without adding it to the top-level list.
    pub fn add_decl(&mut self, kind: DeclKind) -> DeclId {
        self.decl_nodes.alloc(kind)
    }

    /// Allocate a declaration and append it to the top-level list.
    pub fn push_decl(&mut self, kind: DeclKind) -> DeclId {
        let id = self.add_decl(kind);
        self.decls.push(id);
        id
    }

    // -- access -------------------------------------------------------------

    pub fn expr(&self, id: ExprId) -> &ExprKind {
        self.exprs.get(id)
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprKind {
        self.exprs.get_mut(id)
    }

    pub fn stmt(&self, id: StmtId) -> &StmtKind {
        self.stmts.get(id)
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtKind {
        self.stmts.get_mut(id)
    }

    pub fn decl(&self, id: DeclId) -> &DeclKind {
        self.decl_nodes.get(id)
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclKind {
        self.decl_nodes.get_mut(id)
    }

    pub fn is_expr_live(&self, id: ExprId) -> bool {
        self.exprs.is_live(id)
    }

    pub fn is_stmt_live(&self, id: StmtId) -> bool {
        self.stmts.is_live(id)
    }

    /// Live and still present in the top-level list.
    pub fn is_decl_live(&self, id: DeclId) -> bool {
        self.decl_nodes.is_live(id) && self.decls.contains(&id)
    }

    /// Number of live nodes of every kind; a rough program size.
    pub fn live_node_count(&self) -> usize {
        self.exprs.live_count() + self.stmts.live_count() + self.decl_nodes.live_count()
    }

    /// Iterate top-level function declarations.
    pub fn functions(&self) -> impl Iterator<Item = (DeclId, &FunctionDecl)> {
        self.decls
            .iter()
            .filter_map(|&id| self.decl(id).as_function().map(|func| (id, func)))
    }

    /// Iterate top-level struct declarations.
    pub fn structs(&self) -> impl Iterator<Item = (DeclId, &StructDecl)> {
        self.decls
            .iter()
            .filter_map(|&id| self.decl(id).as_struct().map(|decl| (id, decl)))
    }

    pub fn find_struct(&self, name: &str) -> Option<(DeclId, &StructDecl)> {
        self.structs().find(|(_, decl)| decl.name == name)
    }

    // -- removal ------------------------------------------------------------

    /// Mark an expression and everything below it dead.
    pub fn kill_expr(&mut self, id: ExprId) {
        for child in self.expr(id).children() {
            self.kill_expr(child);
        }
        self.exprs.kill(id);
    }

    /// Mark a statement and everything below it dead.
    pub fn kill_stmt(&mut self, id: StmtId) {
        let kind = self.stmt(id);
        let stmts = kind.child_stmts();
        let exprs = kind.child_exprs();
        for expr in exprs {
            self.kill_expr(expr);
        }
        for stmt in stmts {
            self.kill_stmt(stmt);
        }
        self.stmts.kill(id);
    }

    /// Remove a declaration from the top-level list and kill its contents.
    ///
    /// Returns `false` if the declaration was not in the list.
    pub fn remove_decl(&mut self, id: DeclId) -> bool {
        let Some(pos) = self.decls.iter().position(|&d| d == id) else {
            return false;
        };
        self.decls.remove(pos);
        match self.decl(id).clone() {
            DeclKind::Function(func) => {
                if let Some(body) = func.body {
                    self.kill_stmt(body);
                }
            }
            DeclKind::Variables(vars) => {
                for init in vars.declarators.iter().filter_map(|d| d.init) {
                    self.kill_expr(init);
                }
            }
            DeclKind::Directive(_) | DeclKind::Precision { .. } | DeclKind::Struct(_) => {}
        }
        self.decl_nodes.kill(id);
        true
    }

    /// Detach a statement from a block's child list and kill it.
    ///
    /// Returns `false` if `stmt` is not a child of `block`.
    pub fn remove_from_block(&mut self, block: StmtId, stmt: StmtId) -> bool {
        let StmtKind::Block(children) = self.stmt_mut(block) else {
            return false;
        };
        let Some(pos) = children.iter().position(|&s| s == stmt) else {
            return false;
        };
        children.remove(pos);
        self.kill_stmt(stmt);
        true
    }

    /// Replace `target` in place by its direct child `child`.
    ///
    /// The child's node moves into the target's slot so every parent link to
    /// `target` now reaches the child's content. The target's other children
    /// are killed and the child's old slot is abandoned.
    pub fn replace_with_child(&mut self, target: ExprId, child: ExprId) {
        for other in self.expr(target).children() {
            if other != child {
                self.kill_expr(other);
            }
        }
        let moved = self.expr(child).clone();
        self.exprs.kill(child);
        *self.expr_mut(target) = moved;
    }

    /// Overwrite an expression with a fresh leaf, killing its old children.
    pub fn replace_with_leaf(&mut self, target: ExprId, leaf: ExprKind) {
        for child in self.expr(target).children() {
            self.kill_expr(child);
        }
        *self.expr_mut(target) = leaf;
    }

    /// Abandon a slot whose content has been moved elsewhere, without touching
    /// its children.
    pub fn forget_expr(&mut self, id: ExprId) {
        self.exprs.kill(id);
    }

    /// Abandon a statement slot whose children have been re-parented.
    pub fn forget_stmt(&mut self, id: StmtId) {
        self.stmts.kill(id);
    }

    // -- compaction ---------------------------------------------------------

    /// Rebuild the unit with dense arenas holding only reachable nodes.
    ///
    /// Every id is remapped in a single pass; ids from before the call are
    /// meaningless on the result.
    pub fn compact(&self) -> TranslationUnit {
        let mut out = TranslationUnit::new(self.version);
        for &decl in &self.decls {
            let kind = self.copy_decl(decl, &mut out);
            out.push_decl(kind);
        }
        out
    }

    fn copy_decl(&self, id: DeclId, out: &mut TranslationUnit) -> DeclKind {
        match self.decl(id) {
            DeclKind::Function(func) => {
                let body = func.body.map(|body| self.copy_stmt(body, out));
                DeclKind::Function(FunctionDecl {
                    body,
                    ..func.clone()
                })
            }
            DeclKind::Variables(vars) => DeclKind::Variables(self.copy_var_decl(vars, out)),
            other => other.clone(),
        }
    }

    fn copy_var_decl(&self, vars: &VarDecl, out: &mut TranslationUnit) -> VarDecl {
        VarDecl {
            ty: vars.ty.clone(),
            declarators: vars
                .declarators
                .iter()
                .map(|d| Declarator {
                    name: d.name.clone(),
                    array_size: d.array_size,
                    init: d.init.map(|init| self.copy_expr(init, out)),
                })
                .collect(),
        }
    }

    fn copy_stmt(&self, id: StmtId, out: &mut TranslationUnit) -> StmtId {
        let kind = match self.stmt(id) {
            StmtKind::Block(stmts) => {
                StmtKind::Block(stmts.iter().map(|s| self.copy_stmt(*s, out)).collect())
            }
            StmtKind::VarDecl(vars) => StmtKind::VarDecl(self.copy_var_decl(vars, out)),
            StmtKind::Expr(expr) => StmtKind::Expr(self.copy_expr(*expr, out)),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.copy_expr(*cond, out),
                then_branch: self.copy_stmt(*then_branch, out),
                else_branch: else_branch.map(|s| self.copy_stmt(s, out)),
            },
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => StmtKind::For {
                init: self.copy_stmt(*init, out),
                cond: cond.map(|e| self.copy_expr(e, out)),
                step: step.map(|e| self.copy_expr(e, out)),
                body: self.copy_stmt(*body, out),
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.copy_expr(*cond, out),
                body: self.copy_stmt(*body, out),
            },
            StmtKind::DoWhile { body, cond } => StmtKind::DoWhile {
                body: self.copy_stmt(*body, out),
                cond: self.copy_expr(*cond, out),
            },
            StmtKind::Return(value) => StmtKind::Return(value.map(|e| self.copy_expr(e, out))),
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::Discard => StmtKind::Discard,
            StmtKind::Empty => StmtKind::Empty,
        };
        out.add_stmt(kind)
    }

    fn copy_expr(&self, id: ExprId, out: &mut TranslationUnit) -> ExprId {
        let kind = self.expr(id).map_children(|child| self.copy_expr(child, out));
        out.add_expr(kind)
    }

    // -- structural equality ------------------------------------------------

    /// Compare two units by shape and content, ignoring ids and
    /// parenthesised groupings.
    pub fn structural_eq(&self, other: &TranslationUnit) -> bool {
        self.language_version() == other.language_version()
            && self.decls.len() == other.decls.len()
            && self
                .decls
                .iter()
                .zip(&other.decls)
                .all(|(&a, &b)| self.decl_eq(a, other, b))
    }

    fn decl_eq(&self, a: DeclId, other: &TranslationUnit, b: DeclId) -> bool {
        match (self.decl(a), other.decl(b)) {
            (DeclKind::Function(fa), DeclKind::Function(fb)) => {
                fa.return_type == fb.return_type
                    && fa.name == fb.name
                    && fa.params == fb.params
                    && match (fa.body, fb.body) {
                        (Some(x), Some(y)) => self.stmt_eq(x, other, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (DeclKind::Variables(va), DeclKind::Variables(vb)) => self.var_decl_eq(va, other, vb),
            (x, y) => x == y,
        }
    }

    fn var_decl_eq(&self, a: &VarDecl, other: &TranslationUnit, b: &VarDecl) -> bool {
        a.ty == b.ty
            && a.declarators.len() == b.declarators.len()
            && a.declarators.iter().zip(&b.declarators).all(|(x, y)| {
                x.name == y.name
                    && x.array_size == y.array_size
                    && self.opt_expr_eq(x.init, other, y.init)
            })
    }

    fn stmt_eq(&self, a: StmtId, other: &TranslationUnit, b: StmtId) -> bool {
        match (self.stmt(a), other.stmt(b)) {
            (StmtKind::Block(xs), StmtKind::Block(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(&x, &y)| self.stmt_eq(x, other, y))
            }
            (StmtKind::VarDecl(x), StmtKind::VarDecl(y)) => self.var_decl_eq(x, other, y),
            (StmtKind::Expr(x), StmtKind::Expr(y)) => self.expr_eq(*x, other, *y),
            (
                StmtKind::If {
                    cond: c1,
                    then_branch: t1,
                    else_branch: e1,
                },
                StmtKind::If {
                    cond: c2,
                    then_branch: t2,
                    else_branch: e2,
                },
            ) => {
                self.expr_eq(*c1, other, *c2)
                    && self.stmt_eq(*t1, other, *t2)
                    && match (e1, e2) {
                        (Some(x), Some(y)) => self.stmt_eq(*x, other, *y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                StmtKind::For {
                    init: i1,
                    cond: c1,
                    step: s1,
                    body: b1,
                },
                StmtKind::For {
                    init: i2,
                    cond: c2,
                    step: s2,
                    body: b2,
                },
            ) => {
                self.stmt_eq(*i1, other, *i2)
                    && self.opt_expr_eq(*c1, other, *c2)
                    && self.opt_expr_eq(*s1, other, *s2)
                    && self.stmt_eq(*b1, other, *b2)
            }
            (StmtKind::While { cond: c1, body: b1 }, StmtKind::While { cond: c2, body: b2 })
            | (StmtKind::DoWhile { cond: c1, body: b1 }, StmtKind::DoWhile { cond: c2, body: b2 }) => {
                self.expr_eq(*c1, other, *c2) && self.stmt_eq(*b1, other, *b2)
            }
            (StmtKind::Return(x), StmtKind::Return(y)) => self.opt_expr_eq(*x, other, *y),
            (StmtKind::Break, StmtKind::Break)
            | (StmtKind::Continue, StmtKind::Continue)
            | (StmtKind::Discard, StmtKind::Discard)
            | (StmtKind::Empty, StmtKind::Empty) => true,
            _ => false,
        }
    }

    fn opt_expr_eq(&self, a: Option<ExprId>, other: &TranslationUnit, b: Option<ExprId>) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => self.expr_eq(x, other, y),
            (None, None) => true,
            _ => false,
        }
    }

    /// Follow parenthesised groupings down to the expression they wrap.
    pub fn strip_parens(&self, mut id: ExprId) -> ExprId {
        while let ExprKind::Paren(inner) = self.expr(id) {
            id = *inner;
        }
        id
    }

    fn expr_eq(&self, a: ExprId, other: &TranslationUnit, b: ExprId) -> bool {
        let a = self.strip_parens(a);
        let b = other.strip_parens(b);
        let (x, y) = (self.expr(a), other.expr(b));
        let same_shell = match (x, y) {
            (ExprKind::Literal(l1), ExprKind::Literal(l2)) => l1 == l2,
            (ExprKind::Ident(n1), ExprKind::Ident(n2)) => n1 == n2,
            (ExprKind::Unary { op: o1, .. }, ExprKind::Unary { op: o2, .. }) => o1 == o2,
            (ExprKind::Binary { op: o1, .. }, ExprKind::Binary { op: o2, .. }) => o1 == o2,
            (ExprKind::Ternary { .. }, ExprKind::Ternary { .. }) => true,
            (ExprKind::Call { callee: c1, .. }, ExprKind::Call { callee: c2, .. }) => c1 == c2,
            (ExprKind::Member { field: f1, .. }, ExprKind::Member { field: f2, .. }) => f1 == f2,
            (ExprKind::Index { .. }, ExprKind::Index { .. }) => true,
            _ => false,
        };
        if !same_shell {
            return false;
        }
        let xs = x.children();
        let ys = y.children();
        xs.len() == ys.len()
            && xs
                .iter()
                .zip(&ys)
                .all(|(&cx, &cy)| self.expr_eq(cx, other, cy))
    }
}
