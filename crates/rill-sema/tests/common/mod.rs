//! Shared fixture builder for sema integration tests.
//!
//! Tests assemble the AST and symbol table by hand, the way the parser
//! and binder would have, then run `check` and assert on the diagnostics
//! and the typed result.

use rill_ast::{
    AttrList, CallArg, EntryMode, ExprId, ExprKind, FieldDef, FunctionDecl, ItemKind, Literal,
    Param, StmtId, StmtKind, StructDecl, StructLitField, TypeExprId, TypeExprKind, TypeParam,
    UnaryOp,
};
use rill_binder::{
    ExportMap, ScopeId, ScopeKind, Symbol, SymbolFlags, SymbolId, SymbolKind, SymbolTable,
};
use rill_common::{Atom, Code, Span, StringInterner, VecSink};
use rill_sema::{CancelToken, CheckOptions, CheckResult, LayoutEngine, NullLayoutEngine};
use smallvec::SmallVec;

pub struct Fixture {
    pub ast: rill_ast::Module,
    pub symbols: SymbolTable,
    pub exports: ExportMap,
    pub strings: StringInterner,
    next_pos: u32,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Fixture {
            ast: rill_ast::Module::new(),
            symbols: SymbolTable::new(),
            exports: ExportMap::new(),
            strings: StringInterner::new(),
            next_pos: 0,
        }
    }

    /// A fresh, unique span so related-location assertions can tell
    /// sites apart.
    pub fn span(&mut self) -> Span {
        self.next_pos += 10;
        Span::new(self.next_pos, self.next_pos + 5)
    }

    pub fn name(&mut self, s: &str) -> Atom {
        self.strings.intern(s)
    }

    pub fn file_scope(&self) -> ScopeId {
        self.symbols.file_scope()
    }

    pub fn scope(&mut self, parent: ScopeId) -> ScopeId {
        self.symbols.push_scope(Some(parent), ScopeKind::Block)
    }

    pub fn fn_scope(&mut self) -> ScopeId {
        let file = self.symbols.file_scope();
        self.symbols.push_scope(Some(file), ScopeKind::Function)
    }

    // -------------------------------------------------------------------------
    // Type expressions
    // -------------------------------------------------------------------------

    pub fn t_path(&mut self, name: &str) -> TypeExprId {
        let atom = self.name(name);
        let span = self.span();
        self.ast.push_type_expr(
            TypeExprKind::Path {
                segments: vec![atom],
                args: SmallVec::new(),
            },
            span,
        )
    }

    pub fn t_generic(&mut self, name: &str, args: Vec<TypeExprId>) -> TypeExprId {
        let atom = self.name(name);
        let span = self.span();
        self.ast.push_type_expr(
            TypeExprKind::Path {
                segments: vec![atom],
                args: args.into_iter().collect(),
            },
            span,
        )
    }

    pub fn t_optional(&mut self, inner: TypeExprId) -> TypeExprId {
        let span = self.span();
        self.ast
            .push_type_expr(TypeExprKind::Optional { inner }, span)
    }

    pub fn t_errorable(&mut self, ok: TypeExprId, err: Option<TypeExprId>) -> TypeExprId {
        let span = self.span();
        self.ast
            .push_type_expr(TypeExprKind::Errorable { ok, err }, span)
    }

    pub fn t_ref(&mut self, inner: TypeExprId, mutable: bool) -> TypeExprId {
        let span = self.span();
        self.ast
            .push_type_expr(TypeExprKind::Reference { mutable, inner }, span)
    }

    pub fn t_array(&mut self, elem: TypeExprId, len: Option<ExprId>) -> TypeExprId {
        let span = self.span();
        self.ast.push_type_expr(TypeExprKind::Array { elem, len }, span)
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    pub fn int(&mut self, value: i64) -> ExprId {
        let span = self.span();
        self.ast
            .push_expr(ExprKind::Literal(Literal::Int(value)), span)
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        let span = self.span();
        self.ast
            .push_expr(ExprKind::Literal(Literal::Bool(value)), span)
    }

    pub fn string_lit(&mut self, value: &str) -> ExprId {
        let atom = self.name(value);
        let span = self.span();
        self.ast.push_expr(ExprKind::Literal(Literal::Str(atom)), span)
    }

    pub fn nothing(&mut self) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::Literal(Literal::Nothing), span)
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let atom = self.name(name);
        let span = self.span();
        self.ast.push_expr(ExprKind::Ident(atom), span)
    }

    pub fn borrow_expr(&mut self, mutable: bool, operand: ExprId) -> ExprId {
        let span = self.span();
        self.ast
            .push_expr(ExprKind::Borrow { mutable, operand }, span)
    }

    pub fn field(&mut self, base: ExprId, name: &str) -> ExprId {
        let atom = self.name(name);
        let span = self.span();
        self.ast.push_expr(ExprKind::Field { base, name: atom }, span)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::Unary { op, operand }, span)
    }

    pub fn binary(&mut self, op: rill_ast::BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::Binary { op, lhs, rhs }, span)
    }

    pub fn call(&mut self, callee: ExprId, args: Vec<ExprId>) -> ExprId {
        let call_args = args
            .into_iter()
            .map(|value| CallArg {
                name: None,
                value,
                span: self.ast.expr_span(value),
            })
            .collect();
        let span = self.span();
        self.ast.push_expr(
            ExprKind::Call {
                callee,
                type_args: SmallVec::new(),
                args: call_args,
            },
            span,
        )
    }

    pub fn call_named(&mut self, callee: ExprId, args: Vec<(Option<&str>, ExprId)>) -> ExprId {
        let call_args = args
            .into_iter()
            .map(|(name, value)| CallArg {
                name: name.map(|n| self.strings.intern(n)),
                value,
                span: self.ast.expr_span(value),
            })
            .collect();
        let span = self.span();
        self.ast.push_expr(
            ExprKind::Call {
                callee,
                type_args: SmallVec::new(),
                args: call_args,
            },
            span,
        )
    }

    pub fn spawn(&mut self, call: ExprId) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::Spawn { call }, span)
    }

    pub fn async_block(&mut self, body: StmtId) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::AsyncBlock { body }, span)
    }

    pub fn await_expr(&mut self, operand: ExprId) -> ExprId {
        let span = self.span();
        self.ast.push_expr(ExprKind::Await { operand }, span)
    }

    pub fn struct_lit(&mut self, type_name: &str, fields: Vec<(&str, ExprId)>) -> ExprId {
        let path = vec![self.name(type_name)];
        let lit_fields = fields
            .into_iter()
            .map(|(name, value)| StructLitField {
                name: self.strings.intern(name),
                value,
                span: self.ast.expr_span(value),
            })
            .collect();
        let span = self.span();
        self.ast.push_expr(
            ExprKind::StructLit {
                path,
                type_args: SmallVec::new(),
                fields: lit_fields,
            },
            span,
        )
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    /// A `let` statement, declaring the binding symbol in `scope`.
    pub fn let_stmt(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Option<TypeExprId>,
        value: Option<ExprId>,
    ) -> (StmtId, SymbolId) {
        let atom = self.name(name);
        let span = self.span();
        let stmt = self.ast.push_stmt(
            StmtKind::Let {
                name: atom,
                mutable: true,
                ty,
                value,
            },
            span,
        );
        let symbol = self.symbols.declare(
            scope,
            Symbol::new(atom, SymbolKind::Let, span).with_stmt(stmt),
        );
        self.symbols.record_stmt_binding(stmt, symbol);
        (stmt, symbol)
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let span = self.ast.expr_span(expr);
        self.ast.push_stmt(StmtKind::Expr(expr), span)
    }

    pub fn return_stmt(&mut self, value: Option<ExprId>) -> StmtId {
        let span = self.span();
        self.ast.push_stmt(StmtKind::Return { value }, span)
    }

    pub fn assign_stmt(&mut self, target: ExprId, value: ExprId) -> StmtId {
        let span = self.span();
        self.ast.push_stmt(StmtKind::Assign { target, value }, span)
    }

    pub fn drop_stmt(&mut self, expr: ExprId) -> StmtId {
        let span = self.span();
        self.ast.push_stmt(StmtKind::Drop { expr }, span)
    }

    /// A block owning `scope`.
    pub fn block(&mut self, scope: ScopeId, stmts: Vec<StmtId>) -> StmtId {
        let span = self.span();
        let stmt = self.ast.push_stmt(StmtKind::Block { stmts }, span);
        self.symbols.record_block_scope(stmt, scope);
        stmt
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprId,
        then_block: StmtId,
        else_block: Option<StmtId>,
    ) -> StmtId {
        let span = self.span();
        self.ast.push_stmt(
            StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            span,
        )
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Declare a struct item with plain (attribute-free) fields.
    pub fn struct_decl(&mut self, name: &str, fields: Vec<(&str, TypeExprId)>) -> SymbolId {
        let atom = self.name(name);
        let field_defs = fields
            .into_iter()
            .map(|(field_name, ty)| FieldDef {
                name: self.strings.intern(field_name),
                ty,
                attrs: AttrList::new(),
                span: Span::new(self.next_pos, self.next_pos + 1),
            })
            .collect();
        let span = self.span();
        let item = self.ast.push_item(
            ItemKind::Struct(StructDecl {
                name: atom,
                type_params: Vec::new(),
                fields: field_defs,
                attrs: AttrList::new(),
            }),
            span,
        );
        let symbol = self.symbols.declare(
            self.symbols.file_scope(),
            Symbol::new(atom, SymbolKind::Type, span).with_item(item),
        );
        self.symbols.record_item_symbol(item, symbol);
        symbol
    }

    /// A function parameter: AST node plus its binding symbol in the
    /// function scope.
    pub fn param(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: TypeExprId,
        default: Option<ExprId>,
    ) -> (Param, SymbolId) {
        let atom = self.name(name);
        let span = self.span();
        let symbol = self
            .symbols
            .declare(scope, Symbol::new(atom, SymbolKind::Param, span));
        (
            Param {
                name: atom,
                ty,
                default,
                span,
            },
            symbol,
        )
    }

    /// Declare a function item wired to its body scope.
    #[allow(clippy::too_many_arguments)]
    pub fn fn_decl(
        &mut self,
        name: &str,
        type_params: Vec<TypeParam>,
        params: Vec<(Param, SymbolId)>,
        result: Option<TypeExprId>,
        body: Option<StmtId>,
        scope: Option<ScopeId>,
        flags: SymbolFlags,
        entry: Option<EntryMode>,
    ) -> SymbolId {
        let atom = self.name(name);
        let span = self.span();
        let (ast_params, param_symbols): (Vec<Param>, Vec<SymbolId>) = params.into_iter().unzip();
        let item = self.ast.push_item(
            ItemKind::Function(FunctionDecl {
                name: atom,
                type_params: type_params.clone(),
                params: ast_params,
                variadic: false,
                result,
                body,
                is_async: false,
                is_public: true,
                entry,
            }),
            span,
        );
        let mut symbol = Symbol::new(atom, SymbolKind::Function, span)
            .with_item(item)
            .with_flags(flags)
            .with_type_params(type_params);
        symbol.entry = entry;
        let symbol = self.symbols.declare(self.symbols.file_scope(), symbol);
        self.symbols.record_item_symbol(item, symbol);
        self.symbols.record_item_params(item, param_symbols);
        if let Some(scope) = scope {
            self.symbols.record_item_scope(item, scope);
        }
        symbol
    }

    /// Shorthand: a function whose body is the given statements in a
    /// fresh function scope.
    pub fn simple_fn(&mut self, name: &str, scope: ScopeId, stmts: Vec<StmtId>) -> SymbolId {
        let body = self.block(scope, stmts);
        self.fn_decl(
            name,
            Vec::new(),
            Vec::new(),
            None,
            Some(body),
            Some(scope),
            SymbolFlags::empty(),
            None,
        )
    }

    /// A declared type parameter without bounds.
    pub fn type_param(&mut self, name: &str) -> TypeParam {
        let atom = self.name(name);
        let span = self.span();
        TypeParam {
            name: atom,
            bounds: Vec::new(),
            is_const: false,
            span,
        }
    }

    /// A declared type parameter bounded by a contract.
    pub fn bounded_type_param(&mut self, name: &str, contract: &str) -> TypeParam {
        let atom = self.name(name);
        let contract_atom = self.name(contract);
        let span = self.span();
        TypeParam {
            name: atom,
            bounds: vec![rill_ast::BoundExpr {
                path: vec![contract_atom],
                args: SmallVec::new(),
                span,
            }],
            is_const: false,
            span,
        }
    }

    /// Declare `alias name = target`.
    pub fn alias_decl(&mut self, name: &str, target: TypeExprId) -> SymbolId {
        let atom = self.name(name);
        let span = self.span();
        let item = self.ast.push_item(
            ItemKind::Alias(rill_ast::AliasDecl {
                name: atom,
                type_params: Vec::new(),
                target,
            }),
            span,
        );
        let symbol = self.symbols.declare(
            self.symbols.file_scope(),
            Symbol::new(atom, SymbolKind::Type, span).with_item(item),
        );
        self.symbols.record_item_symbol(item, symbol);
        symbol
    }

    /// Declare a field-only contract. `readonly` fields carry the
    /// `@readonly` attribute.
    pub fn contract_decl(&mut self, name: &str, fields: Vec<(&str, TypeExprId, bool)>) -> SymbolId {
        let atom = self.name(name);
        let readonly = self.name("readonly");
        let items = fields
            .into_iter()
            .map(|(field_name, ty, is_readonly)| {
                let mut attrs = AttrList::new();
                if is_readonly {
                    attrs.push(rill_ast::Attr {
                        name: readonly,
                        args: SmallVec::new(),
                        span: Span::new(0, 0),
                    });
                }
                rill_ast::ContractItem::Field {
                    name: self.strings.intern(field_name),
                    ty,
                    attrs,
                    span: Span::new(0, 0),
                }
            })
            .collect();
        let span = self.span();
        let item = self.ast.push_item(
            ItemKind::Contract(rill_ast::ContractDecl {
                name: atom,
                type_params: Vec::new(),
                items,
            }),
            span,
        );
        let symbol = self.symbols.declare(
            self.symbols.file_scope(),
            Symbol::new(atom, SymbolKind::Contract, span).with_item(item),
        );
        self.symbols.record_item_symbol(item, symbol);
        symbol
    }

    pub fn const_decl(&mut self, name: &str, ty: Option<TypeExprId>, value: ExprId) -> SymbolId {
        let atom = self.name(name);
        let span = self.span();
        let item = self.ast.push_item(
            ItemKind::Const(rill_ast::ConstDecl {
                name: atom,
                ty,
                value,
            }),
            span,
        );
        let symbol = self.symbols.declare(
            self.symbols.file_scope(),
            Symbol::new(atom, SymbolKind::Const, span).with_item(item),
        );
        self.symbols.record_item_symbol(item, symbol);
        symbol
    }

    // -------------------------------------------------------------------------
    // Running
    // -------------------------------------------------------------------------

    pub fn run(self) -> (CheckResult, VecSink) {
        self.run_with(&NullLayoutEngine, &CheckOptions::default())
    }

    pub fn run_with(
        mut self,
        layout: &dyn LayoutEngine,
        options: &CheckOptions,
    ) -> (CheckResult, VecSink) {
        let mut sink = VecSink::new();
        let token = CancelToken::new();
        let result = rill_sema::check(
            &token,
            &self.ast,
            &self.symbols,
            &self.exports,
            &mut self.strings,
            layout,
            options,
            &mut sink,
        );
        (result, sink)
    }
}

/// Diagnostic codes emitted, in order. Handy for exact assertions.
#[allow(dead_code)]
pub fn codes(sink: &VecSink) -> Vec<Code> {
    sink.diagnostics.iter().map(|d| d.code).collect()
}
