//! Type expression resolution: sugar forms, aliases, arrays, failures.

mod common;

use common::{codes, Fixture};
use rill_sema::{TypeData, TypeId, UnionVariant};
use rill_common::Code;

#[test]
fn unknown_type_reports_unresolved() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let bogus = f.t_path("NoSuchType");
    let (let_x, _) = f.let_stmt(scope, "x", Some(bogus), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::UnresolvedSymbol]);
}

/// `T?` resolves to an `Option` union with a `Some` tag and `nothing`.
#[test]
fn optional_sugar_builds_option_union() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let opt = f.t_optional(int_ty);
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(opt), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let ty = result.symbol_types.get(&x_sym).copied().unwrap();
    let members = result.types.union_variants(ty).expect("union members");
    assert_eq!(members.len(), 2);
    assert!(matches!(members[0], UnionVariant::Tag { ref args, .. } if args == &[TypeId::INT]));
    assert!(matches!(members[1], UnionVariant::Nothing));
}

/// `T!` defaults the error side to the built-in `Error` struct.
#[test]
fn errorable_sugar_defaults_error_type() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let res = f.t_errorable(int_ty, None);
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(res), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let ty = result.symbol_types.get(&x_sym).copied().unwrap();
    match result.types.lookup(ty) {
        Some(TypeData::Union(nominal)) => {
            assert_eq!(nominal.args.len(), 2);
            assert_eq!(nominal.args[0], TypeId::INT);
            assert!(matches!(
                result.types.lookup(nominal.args[1]),
                Some(TypeData::Struct(_))
            ));
        }
        other => panic!("expected a Result union, got {other:?}"),
    }
}

/// Alias targets resolve through the chain.
#[test]
fn alias_resolves_to_target() {
    let mut f = Fixture::new();
    let int_ty = f.t_path("int");
    f.alias_decl("Num", int_ty);

    let scope = f.fn_scope();
    let num_ty = f.t_path("Num");
    let one = f.int(1);
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(num_ty), Some(one));
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let ty = result.symbol_types.get(&x_sym).copied().unwrap();
    assert_eq!(result.types.resolve_alias(ty), TypeId::INT);
}

/// A fixed-size array annotation carries its length as a const type.
#[test]
fn fixed_array_length_is_interned() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let four = f.int(4);
    let arr = f.t_array(int_ty, Some(four));
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(arr), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let ty = result.symbol_types.get(&x_sym).copied().unwrap();
    match result.types.lookup(ty) {
        Some(TypeData::Array { elem, len: Some(len) }) => {
            assert_eq!(*elem, TypeId::INT);
            assert!(matches!(
                result.types.lookup(*len),
                Some(TypeData::Const { value: 4 })
            ));
        }
        other => panic!("expected a fixed array, got {other:?}"),
    }
}

/// An array length that references a constant symbol evaluates through
/// the const engine.
#[test]
fn array_length_from_const_symbol() {
    let mut f = Fixture::new();
    let four = f.int(4);
    f.const_decl("LEN", None, four);

    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let len_ref = f.ident("LEN");
    let arr = f.t_array(int_ty, Some(len_ref));
    let (let_x, x_sym) = f.let_stmt(scope, "x", Some(arr), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    let ty = result.symbol_types.get(&x_sym).copied().unwrap();
    assert!(matches!(
        result.types.lookup(ty),
        Some(TypeData::Array { len: Some(_), .. })
    ));
}

/// Raw pointer types are rejected under the default options.
#[test]
fn raw_pointer_rejected_by_default() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_ty = f.t_path("int");
    let span = rill_common::Span::new(800, 805);
    let ptr = f
        .ast
        .push_type_expr(rill_ast::TypeExprKind::Pointer { inner: int_ty }, span);
    let (let_x, _) = f.let_stmt(scope, "x", Some(ptr), None);
    f.simple_fn("main", scope, vec![let_x]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::RawPointerNotAllowed]);
}

/// The same fixed-size form two ways shares one interned descriptor.
#[test]
fn array_annotations_share_descriptors() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let int_a = f.t_path("int");
    let four_a = f.int(4);
    let arr_a = f.t_array(int_a, Some(four_a));
    let (let_a, a_sym) = f.let_stmt(scope, "a", Some(arr_a), None);

    let int_b = f.t_path("int");
    let four_b = f.int(4);
    let arr_b = f.t_array(int_b, Some(four_b));
    let (let_b, b_sym) = f.let_stmt(scope, "b", Some(arr_b), None);
    f.simple_fn("main", scope, vec![let_a, let_b]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(
        result.symbol_types.get(&a_sym),
        result.symbol_types.get(&b_sym)
    );
}
