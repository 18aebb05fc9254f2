//! Move tracking through straight-line and branching control flow.

mod common;

use common::{codes, Fixture};
use rill_common::Code;

/// Initializing a new binding from a non-copy value consumes it.
#[test]
fn use_after_move_is_reported() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(lit));

    let s1 = f.ident("s");
    let (let_a, _) = f.let_stmt(scope, "a", None, Some(s1));

    let s2 = f.ident("s");
    let (let_b, _) = f.let_stmt(scope, "b", None, Some(s2));

    f.simple_fn("main", scope, vec![let_s, let_a, let_b]);
    let (_, sink) = f.run();

    assert_eq!(codes(&sink), vec![Code::UseAfterMove]);
    assert!(sink.diagnostics[0].message.contains("use of moved value `s`"));
    assert!(sink.diagnostics[0].related[0].message.contains("moved here"));
}

/// Copy types never move.
#[test]
fn copy_values_do_not_move() {
    let mut f = Fixture::new();
    let scope = f.fn_scope();
    let one = f.int(1);
    let (let_x, _) = f.let_stmt(scope, "x", None, Some(one));

    let x1 = f.ident("x");
    let (let_a, _) = f.let_stmt(scope, "a", None, Some(x1));
    let x2 = f.ident("x");
    let (let_b, _) = f.let_stmt(scope, "b", None, Some(x2));

    f.simple_fn("main", scope, vec![let_x, let_a, let_b]);
    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty());
}

/// A binding moved in either branch of an `if`/`else` is moved after the
/// join.
#[test]
fn branch_merge_keeps_either_move() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let fn_scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(fn_scope, "s", None, Some(lit));

    // then: let a = s;
    let then_scope = f.scope(fn_scope);
    let s1 = f.ident("s");
    let (let_a, _) = f.let_stmt(then_scope, "a", None, Some(s1));
    let then_block = f.block(then_scope, vec![let_a]);

    // else: empty
    let else_scope = f.scope(fn_scope);
    let else_block = f.block(else_scope, vec![]);

    let cond = f.boolean(true);
    let if_stmt = f.if_stmt(cond, then_block, Some(else_block));

    // after the join: use of s
    let s2 = f.ident("s");
    let (let_b, _) = f.let_stmt(fn_scope, "b", None, Some(s2));

    f.simple_fn("main", fn_scope, vec![let_s, if_stmt, let_b]);
    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::UseAfterMove]);
}

/// A move confined to one branch does not leak into the sibling branch.
#[test]
fn sibling_branch_does_not_see_move() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let fn_scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(fn_scope, "s", None, Some(lit));

    // then: let a = s;
    let then_scope = f.scope(fn_scope);
    let s1 = f.ident("s");
    let (let_a, _) = f.let_stmt(then_scope, "a", None, Some(s1));
    let then_block = f.block(then_scope, vec![let_a]);

    // else: let b = s;  (fine: the then-branch move is not visible here)
    let else_scope = f.scope(fn_scope);
    let s2 = f.ident("s");
    let (let_b, _) = f.let_stmt(else_scope, "b", None, Some(s2));
    let else_block = f.block(else_scope, vec![let_b]);

    let cond = f.boolean(true);
    let if_stmt = f.if_stmt(cond, then_block, Some(else_block));

    f.simple_fn("main", fn_scope, vec![let_s, if_stmt]);
    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}

/// Reassignment restores a moved binding.
#[test]
fn assignment_revives_moved_binding() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(lit));

    let s1 = f.ident("s");
    let (let_a, _) = f.let_stmt(scope, "a", None, Some(s1));

    let target = f.ident("s");
    let lit2 = f.struct_lit("Buffer", vec![]);
    let assign = f.assign_stmt(target, lit2);

    let s2 = f.ident("s");
    let (let_b, _) = f.let_stmt(scope, "b", None, Some(s2));

    f.simple_fn("main", scope, vec![let_s, let_a, assign, let_b]);
    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}

/// Double drop reports the first drop as the move site.
#[test]
fn double_drop_is_use_after_move() {
    let mut f = Fixture::new();
    f.struct_decl("Buffer", vec![]);

    let scope = f.fn_scope();
    let lit = f.struct_lit("Buffer", vec![]);
    let (let_s, _) = f.let_stmt(scope, "s", None, Some(lit));

    let s1 = f.ident("s");
    let drop1 = f.drop_stmt(s1);
    let s2 = f.ident("s");
    let drop2 = f.drop_stmt(s2);

    f.simple_fn("main", scope, vec![let_s, drop1, drop2]);
    let (_, sink) = f.run();
    // The second drop reports twice: once for reading the moved binding,
    // once for dropping it.
    assert!(sink.has_code(Code::UseAfterMove));
}
