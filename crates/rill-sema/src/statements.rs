//! Statement type checking.
//!
//! Walks function bodies statement by statement: scopes push on entry and
//! expire their borrows and tasks on exit, `if`/`while`/`for` bodies run
//! under move-state snapshots that merge at the join, and `return`
//! delivers into the innermost return context (a declared result type, or
//! an async block's collector).

use crate::assignability::{Conversion, ConversionKind};
use crate::context::{Checker, CurrentFn, ReturnContext};
use crate::intern::{TypeData, TypeId, UnionVariant};
use rill_ast::{ExprId, ExprKind, FunctionDecl, ItemId, ItemKind, StmtId, StmtKind};
use rill_common::{Applicability, Code, Diagnostic, FixSuggestion, Span};
use tracing::trace_span;

impl<'a> Checker<'a> {
    /// Walk every function body, consulting the cancellation token between
    /// top-level items.
    pub(crate) fn check_bodies(&mut self, token: &crate::context::CancelToken) {
        let order: Vec<ItemId> = self.ast.item_order.clone();
        for &item in &order {
            if token.is_cancelled() {
                return;
            }
            if let ItemKind::Function(decl) = &self.ast.item(item).kind {
                self.check_function_body(item, decl);
            }
        }
    }

    fn check_function_body(&mut self, item: ItemId, decl: &FunctionDecl) {
        let Some(symbol) = self.symbols.item_symbol(item) else {
            return;
        };
        let Some(body) = decl.body else {
            return;
        };
        let _span = trace_span!("check_item", name = self.name(decl.name)).entered();

        let Some(signature) = self.signatures.get(&symbol).cloned() else {
            return;
        };

        // Per-function state.
        self.moves.reset();
        self.tasks.reset();
        self.current_fn = Some(CurrentFn {
            symbol,
            params: self.symbols.item_params(item).to_vec(),
        });

        // Parameter bindings carry their declared types.
        let param_symbols = self.symbols.item_params(item).to_vec();
        for (param_symbol, param_sig) in param_symbols.iter().zip(&signature.params) {
            self.symbol_types.insert(*param_symbol, param_sig.ty);
        }

        // Default values type in file scope, against the parameter type.
        for (ast_param, param_sig) in decl.params.iter().zip(&signature.params) {
            if let Some(default) = ast_param.default {
                self.type_expr(default);
                self.materialize_literal(param_sig.ty, default);
                let default_ty = self.expr_type(default);
                if !param_sig.ty.is_none()
                    && !default_ty.is_none()
                    && !self.coerce_expr(param_sig.ty, default_ty, default, ast_param.span)
                {
                    let expected = self.ty(param_sig.ty);
                    let found = self.ty(default_ty);
                    self.error(
                        Code::TypeMismatch,
                        ast_param.span,
                        format!("default value has type `{found}`, expected `{expected}`"),
                    );
                }
            }
        }

        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);
        self.return_stack.push(ReturnContext::Declared {
            expected: signature.result,
            span: self.ast.stmt_span(body),
        });

        if let Some(scope) = self.symbols.item_scope(item) {
            self.push_scope(scope);
            self.walk_block_stmts(body);
            self.pop_scope();
        } else {
            self.check_stmt(body);
        }

        self.return_stack.pop();
        self.pop_generic_env();
        self.current_fn = None;
    }

    /// Walk the statements of a block whose scope the caller manages.
    fn walk_block_stmts(&mut self, block: StmtId) {
        let StmtKind::Block { stmts } = &self.ast.stmt(block).kind else {
            self.check_stmt(block);
            return;
        };
        for &stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    pub(crate) fn check_stmt(&mut self, stmt: StmtId) {
        let span = self.ast.stmt_span(stmt);
        let kind = self.ast.stmt(stmt).kind.clone();
        match kind {
            StmtKind::Let {
                name: _,
                mutable: _,
                ty,
                value,
            } => self.check_let(stmt, ty, value, span),
            StmtKind::Assign { target, value } => self.check_assign(target, value, span),
            StmtKind::Expr(expr) => {
                self.type_expr(expr);
            }
            StmtKind::Return { value } => self.check_return(value, span),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.check_if(cond, then_block, else_block),
            StmtKind::While { cond, body } => {
                self.check_condition(cond);
                let entry = self.moves.snapshot();
                self.check_stmt(body);
                self.moves.merge(entry);
            }
            StmtKind::For {
                binding: _,
                iterable,
                body,
            } => self.check_for(stmt, iterable, body),
            StmtKind::Block { stmts } => {
                if let Some(scope) = self.symbols.block_scope(stmt) {
                    self.push_scope(scope);
                    for &inner in &stmts {
                        self.check_stmt(inner);
                    }
                    self.pop_scope();
                } else {
                    for &inner in &stmts {
                        self.check_stmt(inner);
                    }
                }
            }
            StmtKind::Drop { expr } => self.check_drop(expr, span),
            StmtKind::Break | StmtKind::Continue => {}
        }
    }

    // -------------------------------------------------------------------------
    // Let
    // -------------------------------------------------------------------------

    fn check_let(
        &mut self,
        stmt: StmtId,
        ty: Option<rill_ast::TypeExprId>,
        value: Option<ExprId>,
        span: Span,
    ) {
        let declared = ty.map(|t| self.resolve_type(t, self.current_scope()));
        let value_ty = value.map(|v| self.type_expr(v));

        if let (Some(declared), Some(value)) = (declared, value) {
            self.materialize_literal(declared, value);
        }
        let value_ty = value.map(|v| self.expr_type(v)).or(value_ty);

        let binding_ty = match (declared, value_ty) {
            (Some(declared), Some(actual)) => {
                if let Some(value_expr) = value {
                    self.ensure_binding_type_match(declared, actual, value_expr, span);
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(actual)) => actual,
            (None, None) => TypeId::NONE,
        };

        if let Some(symbol) = self.symbols.stmt_binding(stmt) {
            self.symbol_types.insert(symbol, binding_ty);
            if let Some(value_expr) = value {
                // A spawned task binds its handle to this symbol.
                let stripped = self.ast.skip_parens(value_expr);
                if let Some(task) = self.tasks.task_for_expr(stripped) {
                    self.tasks.bind_task(task, symbol);
                }
                self.apply_move_from_initializer(value_expr, span);
            }
        }
    }

    /// Initializing from a non-copy binding consumes it.
    fn apply_move_from_initializer(&mut self, value: ExprId, span: Span) {
        let Some(place) = self.place_of_expr(value) else {
            return;
        };
        let source_ty = self.expr_type(self.ast.skip_parens(value));
        if !source_ty.is_none() && self.types.is_copy(source_ty, &self.copy_types) {
            return;
        }
        let issue = self.borrows.move_allowed(place);
        self.report_move_issue(issue, place, span);
        self.moves.mark_moved(place.symbol, span);
    }

    /// The binding-type check of `let`: assignability with conversion
    /// recording, and on failure a mismatch with two fix suggestions.
    pub(crate) fn ensure_binding_type_match(
        &mut self,
        declared: TypeId,
        actual: TypeId,
        value: ExprId,
        span: Span,
    ) -> bool {
        if declared.is_none() || actual.is_none() {
            return true;
        }
        if self.coerce_expr(declared, actual, value, span) {
            return true;
        }
        let declared_name = self.ty(declared);
        let actual_name = self.ty(actual);
        let value_span = self.ast.expr_span(value);
        self.report(
            Diagnostic::new(
                Code::TypeMismatch,
                span,
                format!("cannot initialize `{declared_name}` binding from `{actual_name}`"),
            )
            .with_fix(FixSuggestion {
                message: format!("change the annotation to `{actual_name}`"),
                replacement: Some(actual_name.clone()),
                span,
                applicability: Applicability::MachineApplicable,
            })
            .with_fix(FixSuggestion {
                message: format!("convert the value with `to {declared_name}`"),
                replacement: None,
                span: value_span,
                applicability: Applicability::ManualReview,
            }),
        );
        false
    }

    // -------------------------------------------------------------------------
    // Assignment
    // -------------------------------------------------------------------------

    fn check_assign(&mut self, target: ExprId, value: ExprId, span: Span) {
        let value_ty = self.type_expr(value);
        let target_ty = self.type_assign_target(target, span);
        if !target_ty.is_none() && !value_ty.is_none() {
            self.materialize_literal(target_ty, value);
            let value_ty = self.expr_type(value);
            if !self.coerce_expr(target_ty, value_ty, value, span) {
                let expected = self.ty(target_ty);
                let found = self.ty(value_ty);
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("cannot assign `{found}` to `{expected}`"),
                );
            }
        }

        // Mutation discipline on the assigned place.
        if let Some(place) = self.place_of_expr(target) {
            let issue = self.borrows.mutation_allowed(place);
            self.report_mutation_issue(issue, place, span);
            // Assignment restores a moved binding.
            self.moves.clear(place.symbol);
        }
    }

    /// Type an assignment target without tripping the use-after-move check
    /// (writing to a moved binding revives it).
    fn type_assign_target(&mut self, target: ExprId, span: Span) -> TypeId {
        let stripped = self.ast.skip_parens(target);
        match self.ast.expr(stripped).kind.clone() {
            ExprKind::Ident(name) => {
                let Some(symbol) = self.symbols.lookup(self.current_scope(), name) else {
                    let display = self.name(name).to_string();
                    self.error(
                        Code::UnresolvedSymbol,
                        span,
                        format!("unknown name `{display}`"),
                    );
                    return self.set_expr_type(stripped, TypeId::NONE);
                };
                let ty = self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
                self.set_expr_type(stripped, ty)
            }
            ExprKind::Field { base, name } => {
                let ty = self.type_expr(stripped);
                self.check_field_write_attrs(base, name, span);
                ty
            }
            _ => self.type_expr(stripped),
        }
    }

    /// `@readonly` fields reject writes; `@atomic` fields reject direct
    /// access in either direction.
    fn check_field_write_attrs(&mut self, base: ExprId, name: rill_common::Atom, span: Span) {
        let base_ty = self.expr_type(self.ast.skip_parens(base));
        if base_ty.is_none() {
            return;
        }
        let resolved = self.types.resolve_alias(base_ty);
        let holder = match self.types.lookup(resolved) {
            Some(TypeData::Reference { inner, .. }) | Some(TypeData::Own { inner }) => {
                self.types.resolve_alias(*inner)
            }
            _ => resolved,
        };
        let Some(fields) = self.fields_of(holder) else {
            return;
        };
        let Some(info) = fields.get(&name) else {
            return;
        };
        if info.attrs.has(self.names.readonly) {
            let display = self.name(name).to_string();
            self.error(
                Code::AttrReadonlyWrite,
                span,
                format!("field `{display}` is readonly and cannot be assigned"),
            );
        }
    }

    // -------------------------------------------------------------------------
    // Return
    // -------------------------------------------------------------------------

    fn check_return(&mut self, value: Option<ExprId>, span: Span) {
        let value_ty = match value {
            Some(v) => self.type_expr(v),
            None => TypeId::NOTHING,
        };

        // Returning a task from its scope satisfies the obligation.
        if let Some(value_expr) = value {
            if let Some(task) = self.task_of_expr(value_expr) {
                self.tasks.mark_returned(task);
            }
        }

        let Some(context) = self.return_stack.last().cloned() else {
            return;
        };
        match context {
            ReturnContext::Collector { .. } => {
                if let Some(ReturnContext::Collector { collected }) = self.return_stack.last_mut() {
                    collected.push(value_ty);
                }
            }
            ReturnContext::Declared { expected, .. } => {
                if expected.is_none() || value_ty.is_none() {
                    return;
                }
                if let Some(value_expr) = value {
                    self.materialize_literal(expected, value_expr);
                    let value_ty = self.expr_type(value_expr);
                    if self.coerce_expr(expected, value_ty, value_expr, span) {
                        return;
                    }
                    if self.auto_wrap_return(expected, value_ty, value_expr) {
                        return;
                    }
                } else if expected == TypeId::NOTHING
                    || expected == TypeId::UNIT
                    || self.option_accepts_nothing(expected)
                {
                    return;
                }
                let expected_name = self.ty(expected);
                let found_name = self.ty(value_ty);
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("return type mismatch: expected `{expected_name}`, found `{found_name}`"),
                );
            }
        }
    }

    fn option_accepts_nothing(&self, expected: TypeId) -> bool {
        let resolved = self.types.resolve_alias(expected);
        self.types
            .union_variants(resolved)
            .is_some_and(|members| members.iter().any(|m| matches!(m, UnionVariant::Nothing)))
    }

    /// Auto-wrap a returned payload into the declared `Option`/`Result`:
    /// `return 1` in a `-> int?` body records a tag-union conversion to
    /// `Some(1)`; `-> T!E` accepts both the `Ok` and `Err` payloads.
    fn auto_wrap_return(&mut self, expected: TypeId, value_ty: TypeId, value: ExprId) -> bool {
        let resolved = self.types.resolve_alias(expected);
        let Some(members) = self.types.union_variants(resolved).map(|m| m.to_vec()) else {
            return false;
        };
        for member in members {
            if let UnionVariant::Tag { args, .. } = member {
                if args.len() == 1 && self.assignable(args[0], value_ty).is_ok() {
                    self.implicit_conversions.insert(
                        value,
                        Conversion {
                            source: value_ty,
                            target: resolved,
                            kind: ConversionKind::TagUnion,
                        },
                    );
                    return true;
                }
            }
        }
        false
    }

    // -------------------------------------------------------------------------
    // Control flow
    // -------------------------------------------------------------------------

    fn check_condition(&mut self, cond: ExprId) {
        let cond_ty = self.type_expr(cond);
        if cond_ty.is_none() {
            return;
        }
        if !self.assignable(TypeId::BOOL, cond_ty).is_ok() {
            let found = self.ty(cond_ty);
            self.error(
                Code::TypeMismatch,
                self.ast.expr_span(cond),
                format!("condition must be `bool`, found `{found}`"),
            );
        }
    }

    fn check_if(&mut self, cond: ExprId, then_block: StmtId, else_block: Option<StmtId>) {
        self.check_condition(cond);
        let entry = self.moves.snapshot();
        self.check_stmt(then_block);
        let after_then = self.moves.snapshot();
        match else_block {
            Some(else_block) => {
                self.moves.restore(entry);
                self.check_stmt(else_block);
                self.moves.merge(after_then);
            }
            None => {
                self.moves.restore(entry);
                self.moves.merge(after_then);
            }
        }
    }

    fn check_for(&mut self, stmt: StmtId, iterable: ExprId, body: StmtId) {
        let iterable_ty = self.type_expr(iterable);
        let element_ty = self.for_element_type(iterable_ty, iterable);

        if let Some(symbol) = self.symbols.stmt_binding(stmt) {
            self.symbol_types.insert(symbol, element_ty);
        }

        let entry = self.moves.snapshot();
        self.check_stmt(body);
        self.moves.merge(entry);
    }

    fn for_element_type(&mut self, iterable_ty: TypeId, iterable: ExprId) -> TypeId {
        if iterable_ty.is_none() {
            return TypeId::NONE;
        }
        let resolved = self.types.resolve_alias(iterable_ty);
        let looked = match self.types.lookup(resolved) {
            Some(TypeData::Reference { inner, .. }) | Some(TypeData::Own { inner }) => {
                self.types.resolve_alias(*inner)
            }
            _ => resolved,
        };
        match self.types.lookup(looked) {
            Some(TypeData::Array { elem, .. }) => *elem,
            Some(TypeData::String) => TypeId::STRING,
            _ => {
                let found = self.ty(iterable_ty);
                self.error(
                    Code::TypeMismatch,
                    self.ast.expr_span(iterable),
                    format!("type `{found}` is not iterable"),
                );
                TypeId::NONE
            }
        }
    }

    // -------------------------------------------------------------------------
    // Drop
    // -------------------------------------------------------------------------

    fn check_drop(&mut self, expr: ExprId, span: Span) {
        self.type_expr(expr);
        let Some(place) = self.place_of_expr(expr) else {
            self.error(
                Code::TypeMismatch,
                span,
                "`drop` requires an owned binding",
            );
            return;
        };
        if let Some(moved_at) = self.moves.moved_at(place.symbol) {
            let display = self
                .name(self.symbols.symbol(place.symbol).name)
                .to_string();
            self.report(
                Diagnostic::new(
                    Code::UseAfterMove,
                    span,
                    format!("cannot drop `{display}`: it was already moved"),
                )
                .with_related(moved_at, format!("`{display}` was moved here")),
            );
            return;
        }
        let issue = self.borrows.move_allowed(place);
        self.report_move_issue(issue, place, span);
        self.moves.mark_moved(place.symbol, span);
    }
}
