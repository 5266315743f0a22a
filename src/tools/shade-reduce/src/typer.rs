// typer.rs
//! Best-effort expression typing.
//!
//! Types come from scoped declarations, user function signatures, type
//! constructors, swizzles and a table of built-in functions. An expression
//! the typer cannot place simply has no entry; callers treat that as
//! "ineligible" for anything type-sensitive.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use shade_frontend::{
    BinaryOp, DeclId, DeclKind, ExprId, ExprKind, Literal, StmtId, StmtKind, TranslationUnit,
    TypeSpec, UnaryOp, VarDecl, Visitor, walk_decl, walk_expr, walk_stmt, walk_translation_unit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Bool,
    Int,
    Uint,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Scalar(BasicType),
    Vector(BasicType, u8),
    Matrix { cols: u8, rows: u8 },
    Struct(String),
    Array(Box<Type>, u32),
}

impl Type {
    pub const FLOAT: Type = Type::Scalar(BasicType::Float);
    pub const INT: Type = Type::Scalar(BasicType::Int);
    pub const BOOL: Type = Type::Scalar(BasicType::Bool);

    /// Resolve a built-in type name. Struct names are not known here.
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "void" => Type::Void,
            "bool" => Type::BOOL,
            "int" => Type::INT,
            "uint" => Type::Scalar(BasicType::Uint),
            "float" => Type::FLOAT,
            _ => return vector_from_name(name).or_else(|| matrix_from_name(name)),
        };
        Some(ty)
    }

    pub fn is_scalar_or_vector(&self) -> bool {
        matches!(self, Type::Scalar(_) | Type::Vector(..))
    }

    /// Component type of a scalar or vector.
    pub fn basic(&self) -> Option<BasicType> {
        match self {
            Type::Scalar(basic) | Type::Vector(basic, _) => Some(*basic),
            Type::Matrix { .. } => Some(BasicType::Float),
            _ => None,
        }
    }

    fn with_basic(&self, basic: BasicType) -> Option<Type> {
        match self {
            Type::Scalar(_) => Some(Type::Scalar(basic)),
            Type::Vector(_, n) => Some(Type::Vector(basic, *n)),
            _ => None,
        }
    }
}

fn vector_from_name(name: &str) -> Option<Type> {
    let (basic, rest) = match *name.as_bytes().first()? {
        b'v' => (BasicType::Float, name.strip_prefix("vec")?),
        b'i' => (BasicType::Int, name.strip_prefix("ivec")?),
        b'u' => (BasicType::Uint, name.strip_prefix("uvec")?),
        b'b' => (BasicType::Bool, name.strip_prefix("bvec")?),
        _ => return None,
    };
    match rest {
        "2" => Some(Type::Vector(basic, 2)),
        "3" => Some(Type::Vector(basic, 3)),
        "4" => Some(Type::Vector(basic, 4)),
        _ => None,
    }
}

fn matrix_from_name(name: &str) -> Option<Type> {
    let rest = name.strip_prefix("mat")?;
    let dim = |s: &str| match s {
        "2" => Some(2u8),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    };
    match rest.split_once('x') {
        Some((cols, rows)) => Some(Type::Matrix {
            cols: dim(cols)?,
            rows: dim(rows)?,
        }),
        None => {
            let n = dim(rest)?;
            Some(Type::Matrix { cols: n, rows: n })
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BasicType::Bool => "bool",
            BasicType::Int => "int",
            BasicType::Uint => "uint",
            BasicType::Float => "float",
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Scalar(basic) => write!(f, "{basic}"),
            Type::Vector(basic, n) => {
                let prefix = match basic {
                    BasicType::Bool => "b",
                    BasicType::Int => "i",
                    BasicType::Uint => "u",
                    BasicType::Float => "",
                };
                write!(f, "{prefix}vec{n}")
            }
            Type::Matrix { cols, rows } if cols == rows => write!(f, "mat{cols}"),
            Type::Matrix { cols, rows } => write!(f, "mat{cols}x{rows}"),
            Type::Struct(name) => f.write_str(name),
            Type::Array(elem, n) => write!(f, "{elem}[{n}]"),
        }
    }
}

/// Types of the expressions the typer could resolve.
#[derive(Debug, Clone, Default)]
pub struct Types {
    exprs: FxHashMap<ExprId, Type>,
}

impl Types {
    pub fn compute(tu: &TranslationUnit) -> Self {
        let mut typer = Typer::new(tu);
        walk_translation_unit(&mut typer, tu);
        Types {
            exprs: typer.types,
        }
    }

    pub fn get(&self, id: ExprId) -> Option<&Type> {
        self.exprs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Signature {
    params: Vec<Option<Type>>,
    ret: Option<Type>,
}

struct Typer {
    struct_names: FxHashSet<String>,
    struct_fields: FxHashMap<String, Vec<(String, Option<Type>)>>,
    functions: FxHashMap<String, Vec<Signature>>,
    /// Innermost scope last; `None` shadows an outer name with an unknown type.
    scopes: Vec<FxHashMap<String, Option<Type>>>,
    types: FxHashMap<ExprId, Type>,
}

impl Typer {
    fn new(tu: &TranslationUnit) -> Self {
        let mut typer = Typer {
            struct_names: tu.structs().map(|(_, s)| s.name.clone()).collect(),
            struct_fields: FxHashMap::default(),
            functions: FxHashMap::default(),
            scopes: vec![FxHashMap::default()],
            types: FxHashMap::default(),
        };
        for (_, decl) in tu.structs() {
            let fields = decl
                .fields
                .iter()
                .map(|field| (field.name.clone(), typer.resolve(&field.ty, field.array_size)))
                .collect();
            typer.struct_fields.insert(decl.name.clone(), fields);
        }
        for (_, func) in tu.functions() {
            let signature = Signature {
                params: func
                    .params
                    .iter()
                    .map(|param| typer.resolve(&param.ty, param.array_size))
                    .collect(),
                ret: typer.resolve(&func.return_type, None),
            };
            typer
                .functions
                .entry(func.name.clone())
                .or_default()
                .push(signature);
        }
        typer
    }

    fn resolve(&self, spec: &TypeSpec, array_size: Option<u32>) -> Option<Type> {
        let base = match Type::from_name(&spec.name) {
            Some(ty) => ty,
            None if self.struct_names.contains(&spec.name) => Type::Struct(spec.name.clone()),
            None => return None,
        };
        Some(match array_size {
            Some(n) => Type::Array(Box::new(base), n),
            None => base,
        })
    }

    fn declare(&mut self, name: &str, ty: Option<Type>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn declare_vars(&mut self, vars: &VarDecl) {
        for declarator in &vars.declarators {
            let ty = self.resolve(&vars.ty, declarator.array_size);
            self.declare(&declarator.name, ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return ty.clone();
            }
        }
        builtin_variable(name)
    }

    fn type_of(&self, id: ExprId) -> Option<&Type> {
        self.types.get(&id)
    }

    fn infer(&self, kind: &ExprKind) -> Option<Type> {
        match kind {
            ExprKind::Literal(lit) => Some(Type::Scalar(match lit {
                Literal::Int(_) => BasicType::Int,
                Literal::Uint(_) => BasicType::Uint,
                Literal::Float(_) => BasicType::Float,
                Literal::Bool(_) => BasicType::Bool,
            })),
            ExprKind::Ident(name) => self.lookup(name),
            ExprKind::Paren(inner) => self.type_of(*inner).cloned(),
            ExprKind::Unary { op, operand } => {
                let ty = self.type_of(*operand)?;
                match op {
                    UnaryOp::Not => (ty == &Type::BOOL).then_some(Type::BOOL),
                    _ => Some(ty.clone()),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(*op, *lhs, *rhs),
            ExprKind::Ternary {
                then_expr,
                else_expr,
                ..
            } => {
                let then_ty = self.type_of(*then_expr)?;
                (Some(then_ty) == self.type_of(*else_expr)).then(|| then_ty.clone())
            }
            ExprKind::Call { callee, args } => self.infer_call(callee, args),
            ExprKind::Member { base, field } => match self.type_of(*base)? {
                Type::Struct(name) => self
                    .struct_fields
                    .get(name)?
                    .iter()
                    .find(|(field_name, _)| field_name == field)
                    .and_then(|(_, ty)| ty.clone()),
                Type::Vector(basic, n) => swizzle_type(*basic, *n, field),
                _ => None,
            },
            ExprKind::Index { base, .. } => match self.type_of(*base)? {
                Type::Array(elem, _) => Some((**elem).clone()),
                Type::Vector(basic, _) => Some(Type::Scalar(*basic)),
                Type::Matrix { rows, .. } => Some(Type::Vector(BasicType::Float, *rows)),
                _ => None,
            },
        }
    }

    fn infer_binary(&self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Option<Type> {
        if op == BinaryOp::Comma {
            return self.type_of(rhs).cloned();
        }
        if op.is_assignment() {
            return self.type_of(lhs).cloned();
        }
        if op.yields_bool() {
            return Some(Type::BOOL);
        }
        let l = self.type_of(lhs)?;
        if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
            return Some(l.clone());
        }
        let r = self.type_of(rhs)?;
        arithmetic_result(op, l, r)
    }

    fn infer_call(&self, callee: &str, args: &[ExprId]) -> Option<Type> {
        if let Some(ty) = Type::from_name(callee) {
            return Some(ty);
        }
        if self.struct_names.contains(callee) {
            return Some(Type::Struct(callee.to_string()));
        }
        let arg_types: Vec<Option<&Type>> = args.iter().map(|&arg| self.type_of(arg)).collect();
        if let Some(overloads) = self.functions.get(callee) {
            return overloads
                .iter()
                .filter(|sig| sig.params.len() == args.len())
                .find(|sig| {
                    sig.params.iter().zip(&arg_types).all(|(param, arg)| match (param, arg) {
                        (Some(param), Some(arg)) => param == *arg,
                        _ => true,
                    })
                })
                .and_then(|sig| sig.ret.clone());
        }
        builtin_call(callee, &arg_types)
    }
}

impl Visitor for Typer {
    fn visit_decl(&mut self, tu: &TranslationUnit, id: DeclId, depth: u32) {
        match tu.decl(id) {
            DeclKind::Function(func) => {
                self.scopes.push(FxHashMap::default());
                for param in &func.params {
                    if let Some(name) = &param.name {
                        let ty = self.resolve(&param.ty, param.array_size);
                        self.declare(name, ty);
                    }
                }
                walk_decl(self, tu, id, depth);
                self.scopes.pop();
            }
            DeclKind::Variables(vars) => {
                walk_decl(self, tu, id, depth);
                self.declare_vars(vars);
            }
            DeclKind::Directive(_) | DeclKind::Precision { .. } | DeclKind::Struct(_) => {}
        }
    }

    fn visit_stmt(&mut self, tu: &TranslationUnit, id: StmtId, depth: u32) {
        match tu.stmt(id) {
            StmtKind::Block(_) | StmtKind::For { .. } => {
                self.scopes.push(FxHashMap::default());
                walk_stmt(self, tu, id, depth);
                self.scopes.pop();
            }
            StmtKind::VarDecl(vars) => {
                walk_stmt(self, tu, id, depth);
                self.declare_vars(vars);
            }
            _ => walk_stmt(self, tu, id, depth),
        }
    }

    fn visit_expr(&mut self, tu: &TranslationUnit, id: ExprId, depth: u32) {
        walk_expr(self, tu, id, depth);
        if let Some(ty) = self.infer(tu.expr(id)) {
            self.types.insert(id, ty);
        }
    }
}

fn arithmetic_result(op: BinaryOp, l: &Type, r: &Type) -> Option<Type> {
    if op == BinaryOp::Mul {
        match (l, r) {
            (Type::Matrix { cols, rows }, Type::Vector(BasicType::Float, n)) if cols == n => {
                return Some(Type::Vector(BasicType::Float, *rows));
            }
            (Type::Vector(BasicType::Float, n), Type::Matrix { cols, rows }) if rows == n => {
                return Some(Type::Vector(BasicType::Float, *cols));
            }
            (Type::Matrix { cols: c1, rows: r1 }, Type::Matrix { cols: c2, rows: r2 })
                if c1 == r2 =>
            {
                return Some(Type::Matrix {
                    cols: *c2,
                    rows: *r1,
                });
            }
            _ => {}
        }
    }
    match (l, r) {
        _ if l == r && !matches!(l, Type::Struct(_) | Type::Array(..) | Type::Void) => {
            Some(l.clone())
        }
        (Type::Scalar(a), other) | (other, Type::Scalar(a))
            if matches!(other, Type::Vector(..) | Type::Matrix { .. })
                && other.basic() == Some(*a) =>
        {
            Some(other.clone())
        }
        _ => None,
    }
}

fn swizzle_type(basic: BasicType, width: u8, field: &str) -> Option<Type> {
    const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
    if field.is_empty() || field.len() > 4 {
        return None;
    }
    let set = SETS.iter().find(|set| field.chars().all(|c| set.contains(c)))?;
    let in_range = field
        .chars()
        .all(|c| set.find(c).is_some_and(|pos| pos < width as usize));
    if !in_range {
        return None;
    }
    Some(match field.len() {
        1 => Type::Scalar(basic),
        n => Type::Vector(basic, n as u8),
    })
}

fn builtin_variable(name: &str) -> Option<Type> {
    let ty = match name {
        "gl_FragColor" | "gl_FragCoord" | "gl_Position" => Type::Vector(BasicType::Float, 4),
        "gl_PointCoord" => Type::Vector(BasicType::Float, 2),
        "gl_FrontFacing" => Type::BOOL,
        "gl_PointSize" | "gl_FragDepth" => Type::FLOAT,
        "gl_VertexID" | "gl_InstanceID" => Type::INT,
        _ => return None,
    };
    Some(ty)
}

/// Argument positions a builtin writes through `out` parameters.
pub fn builtin_out_params(name: &str) -> &'static [usize] {
    match name {
        "modf" | "frexp" => &[1],
        "uaddCarry" | "usubBorrow" => &[2],
        "umulExtended" | "imulExtended" => &[2, 3],
        _ => &[],
    }
}

fn builtin_call(name: &str, args: &[Option<&Type>]) -> Option<Type> {
    let first = args.first().copied().flatten();
    match name {
        "radians" | "degrees" | "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "sinh"
        | "cosh" | "tanh" | "asinh" | "acosh" | "atanh" | "pow" | "exp" | "log" | "exp2"
        | "log2" | "sqrt" | "inversesqrt" | "abs" | "sign" | "floor" | "trunc" | "round"
        | "roundEven" | "ceil" | "fract" | "mod" | "min" | "max" | "clamp" | "mix"
        | "normalize" | "faceforward" | "reflect" | "refract" | "dFdx" | "dFdy" | "fwidth"
        | "not" | "transpose" | "inverse" | "matrixCompMult" | "modf" | "frexp" | "ldexp"
        | "uaddCarry" | "usubBorrow" => first.cloned(),
        "step" | "smoothstep" => args.last().copied().flatten().cloned(),
        "length" | "distance" | "dot" | "determinant" => Some(Type::FLOAT),
        "cross" => Some(Type::Vector(BasicType::Float, 3)),
        "any" | "all" => Some(Type::BOOL),
        "isnan" | "isinf" | "lessThan" | "lessThanEqual" | "greaterThan"
        | "greaterThanEqual" | "equal" | "notEqual" => first?.with_basic(BasicType::Bool),
        "floatBitsToInt" => first?.with_basic(BasicType::Int),
        "floatBitsToUint" => first?.with_basic(BasicType::Uint),
        "intBitsToFloat" | "uintBitsToFloat" => first?.with_basic(BasicType::Float),
        "texture" | "texture2D" | "texture2DProj" | "texture2DLod" | "textureCube"
        | "textureLod" | "textureProj" | "texelFetch" | "textureGrad" => {
            Some(Type::Vector(BasicType::Float, 4))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_frontend::parse;

    /// Type of the expression statement at `index` in `main`'s body.
    fn stmt_type(source: &str, index: usize) -> Option<Type> {
        let tu = parse(source).unwrap();
        let types = Types::compute(&tu);
        let (_, main) = tu.functions().find(|(_, f)| f.name == "main").unwrap();
        let StmtKind::Block(stmts) = tu.stmt(main.body.unwrap()) else {
            panic!("main body is not a block");
        };
        let StmtKind::Expr(expr) = tu.stmt(stmts[index]) else {
            panic!("statement {index} is not an expression");
        };
        types.get(*expr).cloned()
    }

    #[test]
    fn names_round_trip_through_display() {
        for name in ["float", "uint", "vec3", "ivec2", "bvec4", "mat3", "mat2x4"] {
            assert_eq!(Type::from_name(name).unwrap().to_string(), name);
        }
        assert_eq!(Type::from_name("vec5"), None);
        assert_eq!(Type::from_name("S"), None);
    }

    #[test]
    fn scalar_vector_arithmetic() {
        let src = "void main() { vec3 v; float f; int i; v * f; f + 1.0; i << 2; v.xy; v.x; }";
        assert_eq!(stmt_type(src, 3), Type::from_name("vec3"));
        assert_eq!(stmt_type(src, 4), Some(Type::FLOAT));
        assert_eq!(stmt_type(src, 5), Some(Type::INT));
        assert_eq!(stmt_type(src, 6), Type::from_name("vec2"));
        assert_eq!(stmt_type(src, 7), Some(Type::FLOAT));
    }

    #[test]
    fn mismatched_operands_are_untyped() {
        assert_eq!(stmt_type("void main() { int i; float f; i + f; }", 2), None);
        assert_eq!(stmt_type("void main() { vec2 v; v.z; }", 1), None);
    }

    #[test]
    fn matrix_vector_products() {
        let src = "void main() { mat2 m; vec2 v; m * v; v * m; m * 2.0; m[1]; }";
        assert_eq!(stmt_type(src, 2), Type::from_name("vec2"));
        assert_eq!(stmt_type(src, 3), Type::from_name("vec2"));
        assert_eq!(stmt_type(src, 4), Type::from_name("mat2"));
        assert_eq!(stmt_type(src, 5), Type::from_name("vec2"));
    }

    #[test]
    fn user_functions_and_structs() {
        let src = "struct S { vec2 p; int n[3]; };\n\
                   float foo(int a, int b, float c) { return c; }\n\
                   void main() { S s; foo(1, 2, 3.0); s.p; s.n[0]; S(vec2(1.0), s.n); }";
        assert_eq!(stmt_type(src, 1), Some(Type::FLOAT));
        assert_eq!(stmt_type(src, 2), Type::from_name("vec2"));
        assert_eq!(stmt_type(src, 3), Some(Type::INT));
        assert_eq!(stmt_type(src, 4), Some(Type::Struct("S".to_string())));
    }

    #[test]
    fn inner_scopes_shadow_outer_names() {
        let src = "float x;\nvoid main() { { int x; x; } x; }";
        let tu = parse(src).unwrap();
        let types = Types::compute(&tu);
        let idents: Vec<Type> = (0..64)
            .map(ExprId::new)
            .filter(|&id| tu.is_expr_live(id))
            .filter(|&id| matches!(tu.expr(id), ExprKind::Ident(_)))
            .filter_map(|id| types.get(id).cloned())
            .collect();
        assert_eq!(idents, [Type::INT, Type::FLOAT]);
    }

    #[test]
    fn builtins_and_globals() {
        let src = "uniform vec2 injectionSwitch;\n\
                   void main() { gl_FragColor; dot(injectionSwitch, injectionSwitch); \
                   clamp(injectionSwitch, 0.0, 1.0); lessThan(injectionSwitch, injectionSwitch); }";
        assert_eq!(stmt_type(src, 0), Type::from_name("vec4"));
        assert_eq!(stmt_type(src, 1), Some(Type::FLOAT));
        assert_eq!(stmt_type(src, 2), Type::from_name("vec2"));
        assert_eq!(stmt_type(src, 3), Type::from_name("bvec2"));
    }

    #[test]
    fn out_parameter_builtins() {
        let src = "void main() { vec2 v, i; modf(v, i); }";
        assert_eq!(stmt_type(src, 1), Type::from_name("vec2"));
        assert_eq!(builtin_out_params("frexp"), [1]);
        assert_eq!(builtin_out_params("umulExtended"), [2, 3]);
        assert!(builtin_out_params("sin").is_empty());
    }
}
