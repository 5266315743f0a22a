// src/parser/tests.rs

use super::*;
use crate::ast::*;

fn main_body(tu: &TranslationUnit) -> Vec<StmtId> {
    let (_, main) = tu
        .functions()
        .find(|(_, f)| f.name == "main")
        .expect("main present");
    match tu.stmt(main.body.expect("main has a body")) {
        StmtKind::Block(stmts) => stmts.clone(),
        other => panic!("expected block, got {other:?}"),
    }
}

fn first_expr(tu: &TranslationUnit) -> ExprId {
    let stmts = main_body(tu);
    match tu.stmt(stmts[0]) {
        StmtKind::Expr(expr) => *expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn parses_version_and_precision() {
    let tu = parse("#version 310 es\nprecision highp float;\nvoid main() {}\n").unwrap();
    assert_eq!(tu.version, Some(ShadingLanguageVersion::ESSL_310));
    assert_eq!(tu.decls.len(), 2);
    assert!(matches!(
        tu.decl(tu.decls[0]),
        DeclKind::Precision {
            precision: Precision::High,
            ..
        }
    ));
}

#[test]
fn missing_version_uses_default_dialect() {
    let tu = parse("void main() {}").unwrap();
    assert_eq!(tu.version, None);
    assert_eq!(tu.language_version(), ShadingLanguageVersion::default());
}

#[test]
fn other_directives_are_kept_verbatim() {
    let tu = parse("#version 100\n#define N 4\nvoid main() {}").unwrap();
    assert_eq!(
        tu.decl(tu.decls[0]),
        &DeclKind::Directive("#define N 4".to_string())
    );
}

#[test]
fn binary_operators_are_left_associative() {
    let tu = parse("void main() { a + b + c; }").unwrap();
    let sum = first_expr(&tu);
    let ExprKind::Binary { op, lhs, rhs } = tu.expr(sum) else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert_eq!(tu.expr(*rhs), &ExprKind::Ident("c".to_string()));
    assert!(matches!(
        tu.expr(*lhs),
        ExprKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let tu = parse("void main() { a + b * c; }").unwrap();
    let ExprKind::Binary { op, rhs, .. } = tu.expr(first_expr(&tu)) else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        tu.expr(*rhs),
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn assignment_is_right_associative() {
    let tu = parse("void main() { a = b = 1; }").unwrap();
    let ExprKind::Binary { op, rhs, .. } = tu.expr(first_expr(&tu)) else {
        panic!("expected assignment");
    };
    assert_eq!(*op, BinaryOp::Assign);
    assert!(matches!(
        tu.expr(*rhs),
        ExprKind::Binary {
            op: BinaryOp::Assign,
            ..
        }
    ));
}

#[test]
fn parses_struct_with_multi_name_fields() {
    let tu = parse("struct S { float a, b[2]; vec2 c; };").unwrap();
    let (_, s) = tu.find_struct("S").unwrap();
    let names: Vec<_> = s.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(s.fields[1].array_size, Some(2));
    assert_eq!(s.fields[1].ty.name, "float");
}

#[test]
fn void_parameter_list_is_empty() {
    let tu = parse("float f(void);").unwrap();
    let (_, f) = tu.functions().next().unwrap();
    assert!(f.params.is_empty());
    assert!(f.body.is_none());
}

#[test]
fn parses_qualified_globals() {
    let tu = parse("layout(location = 0) out vec4 color;\nuniform vec2 injectionSwitch;").unwrap();
    let DeclKind::Variables(out) = tu.decl(tu.decls[0]) else {
        panic!("expected variables");
    };
    assert_eq!(out.ty.name, "vec4");
    assert!(out.ty.has_qualifier(&Qualifier::Out));
    assert!(matches!(&out.ty.qualifiers[0], Qualifier::Layout(items) if items[0].key == "location"));
    let DeclKind::Variables(uniform) = tu.decl(tu.decls[1]) else {
        panic!("expected variables");
    };
    assert!(uniform.ty.has_qualifier(&Qualifier::Uniform));
}

#[test]
fn declaration_versus_expression_statements() {
    let tu = parse("void main() { int x = 1, y; x = y; S s; }").unwrap();
    let body = main_body(&tu);
    assert!(matches!(tu.stmt(body[0]), StmtKind::VarDecl(v) if v.declarators.len() == 2));
    assert!(matches!(tu.stmt(body[1]), StmtKind::Expr(_)));
    assert!(matches!(tu.stmt(body[2]), StmtKind::VarDecl(v) if v.ty.name == "S"));
}

#[test]
fn parses_control_flow() {
    let source = "void main() {
        for (int i = 0; i < 4; i++) { if (i == 2) break; else continue; }
        while (true) { discard; }
        do { ; } while (false);
        for (;;) return;
    }";
    let tu = parse(source).unwrap();
    let body = main_body(&tu);
    assert_eq!(body.len(), 4);
    let StmtKind::For { init, cond, step, .. } = tu.stmt(body[0]) else {
        panic!("expected for");
    };
    assert!(matches!(tu.stmt(*init), StmtKind::VarDecl(_)));
    assert!(cond.is_some() && step.is_some());
    assert!(matches!(tu.stmt(body[1]), StmtKind::While { .. }));
    assert!(matches!(tu.stmt(body[2]), StmtKind::DoWhile { .. }));
    let StmtKind::For { init, cond, step, .. } = tu.stmt(body[3]) else {
        panic!("expected for");
    };
    assert_eq!(tu.stmt(*init), &StmtKind::Empty);
    assert!(cond.is_none() && step.is_none());
}

#[test]
fn ternary_and_swizzles() {
    let tu = parse("void main() { c ? v.xy : w[1].zw; }").unwrap();
    let ExprKind::Ternary { else_expr, .. } = tu.expr(first_expr(&tu)) else {
        panic!("expected ternary");
    };
    let ExprKind::Member { base, field } = tu.expr(*else_expr) else {
        panic!("expected member access");
    };
    assert_eq!(field, "zw");
    assert!(matches!(tu.expr(*base), ExprKind::Index { .. }));
}

#[test]
fn unsigned_literal_keeps_suffix() {
    let tu = parse("void main() { 3u; }").unwrap();
    assert_eq!(
        tu.expr(first_expr(&tu)),
        &ExprKind::Literal(Literal::Uint("3u".to_string()))
    );
}

#[test]
fn reports_missing_semicolon() {
    let err = parse("void main() { a = 1 }").unwrap_err();
    assert!(matches!(err.error, ParserError::ExpectedToken { ref expected, .. } if expected == ";"));
    assert_eq!(err.span.line, 1);
}

#[test]
fn reports_statement_at_top_level() {
    let err = parse("return 1;").unwrap_err();
    assert!(matches!(err.error, ParserError::StatementAtTopLevel { .. }));
}

#[test]
fn reports_lexer_error_instead_of_parser_error() {
    let err = parse("void main() { a = 1 @ 2; }").unwrap_err();
    assert!(matches!(
        err.error,
        ParserError::Lexer(LexerError::UnexpectedCharacter { ch: '@', .. })
    ));
}

#[test]
fn reports_malformed_version() {
    let err = parse("#version three\nvoid main() {}").unwrap_err();
    assert!(matches!(err.error, ParserError::MalformedVersion { .. }));
}

#[test]
fn rejects_non_literal_array_size() {
    let err = parse("float a[N];").unwrap_err();
    assert!(matches!(err.error, ParserError::InvalidArraySize { ref text, .. } if text == "N"));
}
