//! Overload resolution: arity, named arguments, costs, ambiguity.

mod common;

use common::{codes, Fixture};
use rill_binder::SymbolFlags;
use rill_common::Code;
use rill_sema::{ConversionKind, TypeId};

fn declare_fn_of(
    f: &mut Fixture,
    name: &str,
    params: Vec<(&str, &str)>,
    result: Option<&str>,
) {
    let scope = f.fn_scope();
    let mut built = Vec::new();
    for (param_name, param_ty) in params {
        let ty = f.t_path(param_ty);
        built.push(f.param(scope, param_name, ty, None));
    }
    let result_ty = result.map(|r| f.t_path(r));
    let body = f.block(scope, vec![]);
    f.fn_decl(
        name,
        Vec::new(),
        built,
        result_ty,
        Some(body),
        Some(scope),
        SymbolFlags::empty(),
        None,
    );
}

/// Two overloads that fit equally well are ambiguous, never an arbitrary
/// pick.
#[test]
fn equal_cost_overloads_are_ambiguous() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "push", vec![("x", "int"), ("y", "uint")], None);
    declare_fn_of(&mut f, "push", vec![("x", "uint"), ("y", "int")], None);

    let scope = f.fn_scope();
    let one = f.int(1);
    let two = f.int(2);
    let callee = f.ident("push");
    let call = f.call(callee, vec![one, two]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::AmbiguousOverload]);
    // Both candidates are listed as related locations.
    assert_eq!(sink.diagnostics[0].related.len(), 2);
}

/// The exact match wins over the one needing a literal coercion.
#[test]
fn exact_overload_beats_coercing_one() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "emit", vec![("x", "int")], Some("int"));
    declare_fn_of(&mut f, "emit", vec![("x", "uint")], Some("uint"));

    let scope = f.fn_scope();
    let one = f.int(1);
    let callee = f.ident("emit");
    let call = f.call(callee, vec![one]);
    let (let_r, r_sym) = f.let_stmt(scope, "r", None, Some(call));
    f.simple_fn("main", scope, vec![let_r]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&r_sym).copied(), Some(TypeId::INT));
}

/// Named arguments reorder onto their parameters.
#[test]
fn named_arguments_reorder() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "size", vec![("width", "int"), ("height", "int")], Some("int"));

    let scope = f.fn_scope();
    let two = f.int(2);
    let five = f.int(5);
    let callee = f.ident("size");
    let call = f.call_named(callee, vec![(Some("height"), five), (Some("width"), two)]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}

#[test]
fn duplicate_named_argument_is_rejected() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "size", vec![("width", "int"), ("height", "int")], None);

    let scope = f.fn_scope();
    let two = f.int(2);
    let five = f.int(5);
    let callee = f.ident("size");
    let call = f.call_named(callee, vec![(Some("width"), two), (Some("width"), five)]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::TypeMismatch]);
    assert!(sink.diagnostics[0].message.contains("more than once"));
}

/// Defaulted parameters may stay unfilled.
#[test]
fn default_fills_missing_argument() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let (p1, s1) = f.param(scope, "x", int_ty, None);
    let int_ty2 = f.t_path("int");
    let zero = f.int(0);
    let (p2, s2) = f.param(scope, "y", int_ty2, Some(zero));
    let body = f.block(scope, vec![]);
    f.fn_decl(
        "pad",
        Vec::new(),
        vec![(p1, s1), (p2, s2)],
        None,
        Some(body),
        Some(scope),
        SymbolFlags::empty(),
        None,
    );

    let main_scope = f.fn_scope();
    let one = f.int(1);
    let callee = f.ident("pad");
    let call = f.call(callee, vec![one]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", main_scope, vec![stmt]);

    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}

/// Arity mismatch against a single candidate reports the specific
/// expectation.
#[test]
fn arity_mismatch_is_specific() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "one", vec![("x", "int")], None);

    let scope = f.fn_scope();
    let a = f.int(1);
    let b = f.int(2);
    let callee = f.ident("one");
    let call = f.call(callee, vec![a, b]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::TypeMismatch]);
    assert!(sink.diagnostics[0].message.contains("argument"));
}

/// No viable overload among several candidates aggregates into one
/// diagnostic.
#[test]
fn no_overload_reports_once() {
    let mut f = Fixture::new();
    f.struct_decl("Blob", vec![]);
    declare_fn_of(&mut f, "eat", vec![("x", "int")], None);
    declare_fn_of(&mut f, "eat", vec![("x", "bool")], None);

    let scope = f.fn_scope();
    let lit = f.struct_lit("Blob", vec![]);
    let callee = f.ident("eat");
    let call = f.call(callee, vec![lit]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::NoOverload]);
}

/// Numeric widening of an argument records an implicit conversion.
#[test]
fn widening_argument_records_conversion() {
    let mut f = Fixture::new();
    declare_fn_of(&mut f, "wide", vec![("x", "int64")], None);

    let scope = f.fn_scope();
    let int32_ty = f.t_path("int32");
    let one = f.int(1);
    let (let_a, _) = f.let_stmt(scope, "a", Some(int32_ty), Some(one));

    let a = f.ident("a");
    let callee = f.ident("wide");
    let call = f.call(callee, vec![a]);
    let stmt = f.expr_stmt(call);
    f.simple_fn("main", scope, vec![let_a, stmt]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let conversion = result.implicit_conversions.get(&a).expect("conversion");
    assert_eq!(conversion.kind, ConversionKind::NumericWiden);
    assert_eq!(conversion.source, TypeId::INT32);
    assert_eq!(conversion.target, TypeId::INT64);
}

/// A function that calls itself with exactly its own parameters warns.
#[test]
fn trivial_recursion_warns() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let (param, param_sym) = f.param(scope, "x", int_ty, None);

    let callee = f.ident("loopy");
    let arg = f.ident("x");
    let call = f.call(callee, vec![arg]);
    let ret = f.return_stmt(Some(call));
    let body = f.block(scope, vec![ret]);
    let result_ty = f.t_path("int");
    f.fn_decl(
        "loopy",
        Vec::new(),
        vec![(param, param_sym)],
        Some(result_ty),
        Some(body),
        Some(scope),
        SymbolFlags::empty(),
        None,
    );

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::TrivialRecursion]);
    assert_eq!(
        sink.diagnostics[0].severity,
        rill_common::Severity::Warning
    );
    assert!(!sink.diagnostics[0].fixes.is_empty());
}

/// `f(x + 0)` style variations are out of scope for the guard.
#[test]
fn modified_argument_recursion_is_allowed() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let (param, param_sym) = f.param(scope, "x", int_ty, None);

    let callee = f.ident("loopy");
    let x = f.ident("x");
    let zero = f.int(0);
    let sum = f.binary(rill_ast::BinaryOp::Add, x, zero);
    let call = f.call(callee, vec![sum]);
    let ret = f.return_stmt(Some(call));
    let body = f.block(scope, vec![ret]);
    let result_ty = f.t_path("int");
    f.fn_decl(
        "loopy",
        Vec::new(),
        vec![(param, param_sym)],
        Some(result_ty),
        Some(body),
        Some(scope),
        SymbolFlags::empty(),
        None,
    );

    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}
