//! Constant evaluation: folding, cycles, non-constant initializers.

mod common;

use common::{codes, Fixture};
use rill_binder::SymbolFlags;
use rill_common::Code;
use rill_sema::TypeId;

#[test]
fn arithmetic_constant_folds() {
    let mut f = Fixture::new();
    let two = f.int(2);
    let three = f.int(3);
    let sum = f.binary(rill_ast::BinaryOp::Add, two, three);
    let symbol = f.const_decl("TOTAL", None, sum);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&symbol).copied(), Some(TypeId::INT));
}

#[test]
fn const_cycle_is_reported_once() {
    let mut f = Fixture::new();
    let b_ref = f.ident("B");
    f.const_decl("A", None, b_ref);
    let a_ref = f.ident("A");
    f.const_decl("B", None, a_ref);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::ConstCycle]);
}

#[test]
fn const_referencing_const_resolves() {
    let mut f = Fixture::new();
    let ten = f.int(10);
    f.const_decl("BASE", None, ten);
    let base = f.ident("BASE");
    let one = f.int(1);
    let sum = f.binary(rill_ast::BinaryOp::Add, base, one);
    let derived = f.const_decl("DERIVED", None, sum);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(
        result.symbol_types.get(&derived).copied(),
        Some(TypeId::INT)
    );
}

/// A call is not a constant expression.
#[test]
fn call_initializer_is_not_constant() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let one = f.int(1);
    let ret = f.return_stmt(Some(one));
    let body = f.block(scope, vec![ret]);
    let int_ty = f.t_path("int");
    f.fn_decl(
        "make",
        Vec::new(),
        Vec::new(),
        Some(int_ty),
        Some(body),
        Some(scope),
        SymbolFlags::empty(),
        None,
    );

    let callee = f.ident("make");
    let call = f.call(callee, vec![]);
    f.const_decl("BAD", None, call);

    let (_, sink) = f.run();
    assert!(sink.has_code(Code::ConstNotConstant));
}

/// An annotated constant must fit the annotation's range.
#[test]
fn annotated_constant_checks_range() {
    let mut f = Fixture::new();
    let big = f.int(300);
    let int8_ty = f.t_path("int8");
    f.const_decl("SMALL", Some(int8_ty), big);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::IntLiteralOutOfRange]);
}

/// Comparison and logical operators fold to bool.
#[test]
fn comparison_constant_is_bool() {
    let mut f = Fixture::new();
    let two = f.int(2);
    let three = f.int(3);
    let less = f.binary(rill_ast::BinaryOp::Lt, two, three);
    let symbol = f.const_decl("ORDERED", None, less);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&symbol).copied(), Some(TypeId::BOOL));
}
