//! Operator dispatch through the magic method index, user-defined
//! operators and coercions, and argument-passing effects.

mod common;

use common::{codes, Fixture};
use rill_ast::{BinaryOp, UnaryOp};
use rill_binder::SymbolFlags;
use rill_common::Code;
use rill_sema::{ConversionKind, TypeId};

#[test]
fn builtin_arithmetic_and_comparison() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let one = f.int(1);
    let two = f.int(2);
    let sum = f.binary(BinaryOp::Add, one, two);
    let (let_s, s_sym) = f.let_stmt(scope, "s", None, Some(sum));

    let three = f.int(3);
    let four = f.int(4);
    let less = f.binary(BinaryOp::Lt, three, four);
    let (let_c, c_sym) = f.let_stmt(scope, "c", None, Some(less));

    f.simple_fn("main", scope, vec![let_s, let_c]);
    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&s_sym).copied(), Some(TypeId::INT));
    assert_eq!(result.symbol_types.get(&c_sym).copied(), Some(TypeId::BOOL));
}

#[test]
fn mismatched_operand_kinds_are_rejected() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let one = f.int(1);
    let truth = f.boolean(true);
    let bad = f.binary(BinaryOp::Add, one, truth);
    let stmt = f.expr_stmt(bad);
    f.simple_fn("main", scope, vec![stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::TypeMismatch]);
}

#[test]
fn unary_not_and_neg() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let truth = f.boolean(true);
    let negated = f.unary(UnaryOp::Not, truth);
    let (let_a, a_sym) = f.let_stmt(scope, "a", None, Some(negated));

    let one = f.int(1);
    let minus = f.unary(UnaryOp::Neg, one);
    let (let_b, b_sym) = f.let_stmt(scope, "b", None, Some(minus));

    f.simple_fn("main", scope, vec![let_a, let_b]);
    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&a_sym).copied(), Some(TypeId::BOOL));
    assert_eq!(result.symbol_types.get(&b_sym).copied(), Some(TypeId::INT));
}

#[test]
fn negating_unsigned_is_rejected() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let uint_ty = f.t_path("uint");
    let one = f.int(1);
    let (let_u, _) = f.let_stmt(scope, "u", Some(uint_ty), Some(one));
    let u = f.ident("u");
    let minus = f.unary(UnaryOp::Neg, u);
    let stmt = f.expr_stmt(minus);
    f.simple_fn("main", scope, vec![let_u, stmt]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::TypeMismatch]);
}

fn declare_meters(f: &mut Fixture) {
    let int_ty = f.t_path("int");
    f.struct_decl("Meters", vec![("value", int_ty)]);
}

/// A user `__add` on a struct dispatches the operator and records its
/// symbol.
#[test]
fn user_operator_dispatches() {
    let mut f = Fixture::new();
    declare_meters(&mut f);

    let add_scope = f.fn_scope();
    let meters_a = f.t_path("Meters");
    let (pa, sa) = f.param(add_scope, "a", meters_a, None);
    let meters_b = f.t_path("Meters");
    let (pb, sb) = f.param(add_scope, "b", meters_b, None);
    let a = f.ident("a");
    let ret = f.return_stmt(Some(a));
    let add_body = f.block(add_scope, vec![ret]);
    let meters_r = f.t_path("Meters");
    let add_symbol = f.fn_decl(
        "__add",
        Vec::new(),
        vec![(pa, sa), (pb, sb)],
        Some(meters_r),
        Some(add_body),
        Some(add_scope),
        SymbolFlags::empty(),
        None,
    );

    let scope = f.fn_scope();
    let one = f.int(1);
    let m1 = f.struct_lit("Meters", vec![("value", one)]);
    let (let_m1, _) = f.let_stmt(scope, "m1", None, Some(m1));
    let two = f.int(2);
    let m2 = f.struct_lit("Meters", vec![("value", two)]);
    let (let_m2, _) = f.let_stmt(scope, "m2", None, Some(m2));

    let lhs = f.ident("m1");
    let rhs = f.ident("m2");
    let sum = f.binary(BinaryOp::Add, lhs, rhs);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(sum));
    f.simple_fn("main", scope, vec![let_m1, let_m2, let_s]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.magic_binary_symbols.get(&sum).copied(), Some(add_symbol));
}

/// A user `__to` powers both explicit casts and implicit conversion.
#[test]
fn user_to_conversion() {
    let mut f = Fixture::new();
    declare_meters(&mut f);

    let to_scope = f.fn_scope();
    let meters_ty = f.t_path("Meters");
    let (p_self, s_self) = f.param(to_scope, "m", meters_ty, None);
    let int_ty = f.t_path("int");
    let (p_target, s_target) = f.param(to_scope, "target", int_ty, None);
    let m = f.ident("m");
    let value = f.field(m, "value");
    let ret = f.return_stmt(Some(value));
    let to_body = f.block(to_scope, vec![ret]);
    let int_result = f.t_path("int");
    f.fn_decl(
        "__to",
        Vec::new(),
        vec![(p_self, s_self), (p_target, s_target)],
        Some(int_result),
        Some(to_body),
        Some(to_scope),
        SymbolFlags::empty(),
        None,
    );

    let scope = f.fn_scope();
    let one = f.int(1);
    let lit = f.struct_lit("Meters", vec![("value", one)]);
    let (let_m, _) = f.let_stmt(scope, "m", None, Some(lit));

    let m_ref = f.ident("m");
    let int_annotation = f.t_path("int");
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(int_annotation), Some(m_ref));
    f.simple_fn("main", scope, vec![let_m, let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&x_sym).copied(), Some(TypeId::INT));
    let conversion = result.implicit_conversions.get(&m_ref).expect("conversion");
    assert_eq!(conversion.kind, ConversionKind::UserTo);
}

/// Passing a non-copy value into a call consumes it.
#[test]
fn by_value_argument_moves() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let eat_scope = f.fn_scope();
    let buffer_ty = f.t_path("Buffer");
    let (param, param_sym) = f.param(eat_scope, "b", buffer_ty, None);
    let eat_body = f.block(eat_scope, vec![]);
    f.fn_decl(
        "eat",
        Vec::new(),
        vec![(param, param_sym)],
        None,
        Some(eat_body),
        Some(eat_scope),
        SymbolFlags::empty(),
        None,
    );

    let scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(lit));

    let callee = f.ident("eat");
    let s1 = f.ident("s");
    let call = f.call(callee, vec![s1]);
    let stmt = f.expr_stmt(call);

    let s2 = f.ident("s");
    let (let_a, _) = f.let_stmt(scope, "a", None, Some(s2));
    f.simple_fn("main", scope, vec![let_s, stmt, let_a]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::UseAfterMove]);
}

/// A `&mut` parameter borrows the argument place for the caller's scope.
#[test]
fn mut_ref_parameter_borrows_argument() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let touch_scope = f.fn_scope();
    let buffer_ty = f.t_path("Buffer");
    let ref_ty = f.t_ref(buffer_ty, true);
    let (param, param_sym) = f.param(touch_scope, "b", ref_ty, None);
    let touch_body = f.block(touch_scope, vec![]);
    f.fn_decl(
        "touch",
        Vec::new(),
        vec![(param, param_sym)],
        None,
        Some(touch_body),
        Some(touch_scope),
        SymbolFlags::empty(),
        None,
    );

    let scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(lit));

    let callee = f.ident("touch");
    let s1 = f.ident("s");
    let call = f.call(callee, vec![s1]);
    let stmt = f.expr_stmt(call);

    // The argument borrow is still live at this shared borrow.
    let s2 = f.ident("s");
    let borrowed = f.borrow_expr(false, s2);
    let (let_r, _) = f.let_stmt(scope, "r", None, Some(borrowed));
    f.simple_fn("main", scope, vec![let_s, stmt, let_r]);

    let (result, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::BorrowConflict]);
    assert!(result.expr_borrows.contains_key(&s1));
}
