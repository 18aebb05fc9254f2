//! Imported module member access.

mod common;

use common::{codes, Fixture};
use rill_binder::{Symbol, SymbolFlags, SymbolKind};
use rill_common::Code;
use rill_sema::TypeId;

/// Install a module symbol `util` whose export map carries one private
/// const `SECRET`.
fn declare_util_module(f: &mut Fixture) {
    let twenty = f.int(20);
    let secret = f.const_decl("SECRET", None, twenty);

    let module_name = f.name("util");
    let module_path = f.name("pkg::util");
    let span = f.span();
    let mut module_symbol = Symbol::new(module_name, SymbolKind::Import, span);
    module_symbol.module_path = Some(module_path);
    let file_scope = f.symbols.file_scope();
    f.symbols.declare(file_scope, module_symbol);

    let secret_name = f.name("SECRET");
    f.exports.add(module_path, secret_name, secret);
}

#[test]
fn public_module_const_resolves() {
    let mut f = Fixture::new();

    let ten = f.int(10);
    let limit_atom = f.name("LIMIT");
    let span = f.span();
    let item = f.ast.push_item(
        rill_ast::ItemKind::Const(rill_ast::ConstDecl {
            name: limit_atom,
            ty: None,
            value: ten,
        }),
        span,
    );
    let file_scope = f.symbols.file_scope();
    let limit = f.symbols.declare(
        file_scope,
        Symbol::new(limit_atom, SymbolKind::Const, span)
            .with_item(item)
            .with_flags(SymbolFlags::PUBLIC),
    );
    f.symbols.record_item_symbol(item, limit);

    let module_name = f.name("util");
    let module_path = f.name("pkg::util");
    let mspan = f.span();
    let mut module_symbol = Symbol::new(module_name, SymbolKind::Import, mspan);
    module_symbol.module_path = Some(module_path);
    f.symbols.declare(file_scope, module_symbol);
    f.exports.add(module_path, limit_atom, limit);

    let scope = f.fn_scope();
    let base = f.ident("util");
    let access = f.field(base, "LIMIT");
    let (let_x, x_sym) = f.let_stmt(scope, "x", None, Some(access));
    f.simple_fn("main", scope, vec![let_x]);

    let (result, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
    assert_eq!(result.symbol_types.get(&x_sym).copied(), Some(TypeId::INT));
}

#[test]
fn private_module_member_is_rejected() {
    let mut f = Fixture::new();
    declare_util_module(&mut f);

    let scope = f.fn_scope();
    let base = f.ident("util");
    let access = f.field(base, "SECRET");
    let (let_x, _) = f.let_stmt(scope, "x", None, Some(access));
    f.simple_fn("main", scope, vec![let_x]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::ModuleMemberNotPublic]);
}

#[test]
fn unknown_module_member_is_rejected() {
    let mut f = Fixture::new();
    declare_util_module(&mut f);

    let scope = f.fn_scope();
    let base = f.ident("util");
    let access = f.field(base, "MISSING");
    let (let_x, _) = f.let_stmt(scope, "x", None, Some(access));
    f.simple_fn("main", scope, vec![let_x]);

    let (_, sink) = f.run();
    assert_eq!(codes(&sink), vec![Code::ModuleMemberNotFound]);
}
