//! Expression type checking.
//!
//! `type_expr` dispatches on the expression kind and writes the computed
//! type into the result exactly once per expression. Operators route
//! through the magic method index, calls through the call resolver, and
//! every observation point updates the borrow/move/task trackers.

use crate::assignability::{Assignability, ConversionKind};
use crate::borrow_checker::{BorrowIssue, BorrowKind, Place};
use crate::call_checker::CallArgInfo;
use crate::context::Checker;
use crate::intern::{NumericKind, TypeData, TypeId};
use rill_ast::{CallArg, ExprId, ExprKind, Literal, StructLitField, UnaryOp};
use rill_binder::{SymbolId, SymbolKind};
use rill_common::limits::MAX_EXPR_CHECK_DEPTH;
use rill_common::{Atom, Code, Diagnostic, Span};

impl<'a> Checker<'a> {
    /// Compute and record the type of an expression.
    pub(crate) fn type_expr(&mut self, expr: ExprId) -> TypeId {
        if self.expr_depth >= MAX_EXPR_CHECK_DEPTH {
            return self.set_expr_type(expr, TypeId::NONE);
        }
        self.expr_depth += 1;
        let ty = self.type_expr_inner(expr);
        self.expr_depth -= 1;
        self.set_expr_type(expr, ty)
    }

    fn type_expr_inner(&mut self, expr: ExprId) -> TypeId {
        let span = self.ast.expr_span(expr);
        let kind = self.ast.expr(expr).kind.clone();
        match kind {
            ExprKind::Literal(lit) => self.type_literal(lit),
            ExprKind::Ident(name) => self.type_ident(expr, name, span),
            ExprKind::Field { base, name } => self.type_field(expr, base, name, span),
            ExprKind::Index { base, index } => self.type_index(base, index, span),
            ExprKind::Unary { op, operand } => self.type_unary(expr, op, operand, span),
            ExprKind::Binary { op, lhs, rhs } => self.type_binary(expr, op, lhs, rhs, span),
            ExprKind::Borrow { mutable, operand } => {
                self.type_borrow(expr, mutable, operand, span)
            }
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.type_call(expr, callee, &type_args, &args, span),
            ExprKind::Tuple(elems) => {
                let tys: Vec<TypeId> = elems.iter().map(|&e| self.type_expr(e)).collect();
                self.types.tuple(tys)
            }
            ExprKind::Array(elems) => self.type_array_literal(&elems),
            ExprKind::StructLit {
                path,
                type_args,
                fields,
            } => self.type_struct_literal(&path, &type_args, &fields, span),
            ExprKind::Cast { operand, ty } => self.type_cast(operand, ty, span),
            ExprKind::Await { operand } => self.type_await(operand, span),
            ExprKind::Spawn { call } => self.type_spawn(expr, call, span),
            ExprKind::AsyncBlock { body } => self.type_async_block(expr, body, span),
            ExprKind::Paren(inner) => self.type_expr(inner),
        }
    }

    fn type_literal(&mut self, literal: Literal) -> TypeId {
        match literal {
            Literal::Int(_) => TypeId::INT,
            Literal::Uint(_) => TypeId::UINT,
            Literal::Float(_) => TypeId::FLOAT,
            Literal::Str(_) => TypeId::STRING,
            Literal::Bool(_) => TypeId::BOOL,
            Literal::Nothing => TypeId::NOTHING,
        }
    }

    // -------------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------------

    fn type_ident(&mut self, _expr: ExprId, name: Atom, span: Span) -> TypeId {
        let Some(symbol) = self.symbols.lookup(self.current_scope(), name) else {
            let display = self.name(name).to_string();
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("unknown name `{display}`"),
            );
            return TypeId::NONE;
        };
        let sym = self.symbols.symbol(symbol);
        match sym.kind {
            SymbolKind::Let | SymbolKind::Param => {
                self.check_binding_use(symbol, span);
                self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE)
            }
            SymbolKind::Const => self.ensure_const_evaluated(symbol).ty,
            SymbolKind::Function => self
                .symbol_types
                .get(&symbol)
                .copied()
                .unwrap_or(TypeId::NONE),
            SymbolKind::Module | SymbolKind::Import => {
                let display = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("module `{display}` cannot be used as a value"),
                );
                TypeId::NONE
            }
            SymbolKind::Tag => {
                let display = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("tag `{display}` must be applied to its payload"),
                );
                TypeId::NONE
            }
            SymbolKind::Type | SymbolKind::Contract => {
                let display = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("`{display}` is a type, not a value"),
                );
                TypeId::NONE
            }
        }
    }

    /// Reading a consumed binding is an error unless the type is Copy.
    fn check_binding_use(&mut self, symbol: SymbolId, span: Span) {
        let Some(moved_at) = self.moves.moved_at(symbol) else {
            return;
        };
        let ty = self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
        if !ty.is_none() && self.types.is_copy(ty, &self.copy_types) {
            return;
        }
        let display = self.name(self.symbols.symbol(symbol).name).to_string();
        let message = if self.tasks.task_for_binding(symbol).is_some() {
            format!("use of moved task `{display}`; call `.clone()` to keep a handle")
        } else {
            format!("use of moved value `{display}`")
        };
        self.report(
            Diagnostic::new(Code::UseAfterMove, span, message)
                .with_related(moved_at, format!("`{display}` was moved here")),
        );
    }

    // -------------------------------------------------------------------------
    // Member access
    // -------------------------------------------------------------------------

    fn type_field(&mut self, _expr: ExprId, base: ExprId, name: Atom, span: Span) -> TypeId {
        // Module member access resolves the module first, without typing
        // the base as a value.
        if let Some(module_sym) = self.module_symbol_of(base) {
            self.set_expr_type(base, TypeId::NONE);
            return self.type_module_member(module_sym, name, span);
        }

        let receiver = self.type_expr(base);
        if receiver.is_none() {
            return TypeId::NONE;
        }
        let looked_through = self.look_through_receiver(receiver);

        if let Some(fields) = self.fields_of(looked_through) {
            if let Some(info) = fields.get(&name) {
                let info = info.clone();
                if info.attrs.has(self.names.atomic) {
                    let display = self.name(name).to_string();
                    self.error(
                        Code::AtomicDirectAccess,
                        span,
                        format!("field `{display}` is atomic and cannot be accessed directly"),
                    );
                }
                return info.ty;
            }
        }

        // Contract-bound fields on a generic receiver.
        if let Some(ty) = self.contract_bound_field(looked_through, name) {
            return ty;
        }

        let receiver_name = self.ty(receiver);
        let display = self.name(name).to_string();
        self.error(
            Code::TypeMismatch,
            span,
            format!("type `{receiver_name}` has no field `{display}`"),
        );
        TypeId::NONE
    }

    /// References and `own` wrappers expose their inner type's fields.
    fn look_through_receiver(&self, receiver: TypeId) -> TypeId {
        let resolved = self.types.resolve_alias(receiver);
        match self.types.lookup(resolved) {
            Some(TypeData::Reference { inner, .. }) | Some(TypeData::Own { inner }) => {
                self.types.resolve_alias(*inner)
            }
            _ => resolved,
        }
    }

    /// A field required by one of the receiver's contract bounds, when the
    /// receiver is a generic parameter.
    fn contract_bound_field(&mut self, receiver: TypeId, name: Atom) -> Option<TypeId> {
        let TypeData::GenericParam { owner, index, .. } =
            self.types.lookup(receiver).cloned()?
        else {
            return None;
        };
        if owner.is_none() {
            return None;
        }
        let owner_params = self.generic_param_types(owner);
        let env = self.generic_env_for(owner, &owner_params);
        self.push_generic_env(env);
        let all_bounds = self.resolve_param_bounds(owner, self.symbols.file_scope());
        self.pop_generic_env();
        let bounds = all_bounds.into_iter().nth(index as usize)?;
        for bound in bounds {
            if let Some(spec) = self.instantiate_spec(&bound) {
                if let Some(field) = spec.fields.get(&name) {
                    return Some(field.ty);
                }
            }
        }
        None
    }

    fn module_symbol_of(&self, base: ExprId) -> Option<SymbolId> {
        let stripped = self.ast.skip_parens(base);
        let ExprKind::Ident(name) = self.ast.expr(stripped).kind else {
            return None;
        };
        let symbol = self.symbols.lookup(self.current_scope(), name)?;
        matches!(
            self.symbols.symbol(symbol).kind,
            SymbolKind::Module | SymbolKind::Import
        )
        .then_some(symbol)
    }

    fn type_module_member(&mut self, module_sym: SymbolId, name: Atom, span: Span) -> TypeId {
        let module = self.symbols.symbol(module_sym);
        let module_name = self.name(module.name).to_string();
        let Some(path) = module.module_path else {
            return TypeId::NONE;
        };
        let Some(target) = self.exports.lookup(path, name) else {
            let member = self.name(name).to_string();
            self.error(
                Code::ModuleMemberNotFound,
                span,
                format!("module `{module_name}` has no member `{member}`"),
            );
            return TypeId::NONE;
        };
        if !self.symbols.symbol(target).is_public() {
            let member = self.name(name).to_string();
            self.error(
                Code::ModuleMemberNotPublic,
                span,
                format!("`{member}` of module `{module_name}` is not public"),
            );
            return TypeId::NONE;
        }
        match self.symbols.symbol(target).kind {
            SymbolKind::Const => self.ensure_const_evaluated(target).ty,
            SymbolKind::Function => self
                .symbol_types
                .get(&target)
                .copied()
                .unwrap_or(TypeId::NONE),
            _ => {
                let member = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("member `{member}` is not a value"),
                );
                TypeId::NONE
            }
        }
    }

    fn type_index(&mut self, base: ExprId, index: ExprId, span: Span) -> TypeId {
        let base_ty = self.type_expr(base);
        let index_ty = self.type_expr(index);
        if base_ty.is_none() {
            return TypeId::NONE;
        }
        let index_is_integer = matches!(
            self.types.numeric(index_ty),
            Some((NumericKind::Int | NumericKind::Uint, _))
        );
        if !index_ty.is_none() && !index_is_integer {
            let found = self.ty(index_ty);
            self.error(
                Code::TypeMismatch,
                self.ast.expr_span(index),
                format!("index must be an integer, found `{found}`"),
            );
        }
        let resolved = self.look_through_receiver(base_ty);
        match self.types.lookup(resolved) {
            Some(TypeData::Array { elem, .. }) => *elem,
            Some(TypeData::String) => TypeId::STRING,
            _ => {
                let found = self.ty(base_ty);
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("type `{found}` cannot be indexed"),
                );
                TypeId::NONE
            }
        }
    }

    // -------------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------------

    fn type_unary(&mut self, expr: ExprId, op: UnaryOp, operand: ExprId, span: Span) -> TypeId {
        let operand_ty = self.type_expr(operand);
        if operand_ty.is_none() {
            return TypeId::NONE;
        }

        if op == UnaryOp::Deref {
            let resolved = self.types.resolve_alias(operand_ty);
            return match self.types.lookup(resolved) {
                Some(TypeData::Reference { inner, .. })
                | Some(TypeData::Pointer { inner })
                | Some(TypeData::Own { inner }) => *inner,
                _ => {
                    let found = self.ty(operand_ty);
                    self.error(
                        Code::TypeMismatch,
                        span,
                        format!("type `{found}` cannot be dereferenced"),
                    );
                    TypeId::NONE
                }
            };
        }

        let keys = self.receiver_keys(operand_ty);
        let Some((_, methods)) = self.magic.lookup(&keys, op.magic_name(), 1) else {
            let found = self.ty(operand_ty);
            self.error(
                Code::TypeMismatch,
                span,
                format!("operator `{}` is not defined for `{found}`", op.magic_name()),
            );
            return TypeId::NONE;
        };
        let entry_symbol = methods[0].symbol;
        let result_key = methods[0].signature.result.clone();
        let result = self.magic_result_type(entry_symbol, &result_key, operand_ty);
        if !entry_symbol.is_none() {
            self.magic_unary_symbols.insert(expr, entry_symbol);
            self.check_magic_self_recursion(entry_symbol, &[operand], span);
        }
        result
    }

    fn type_binary(
        &mut self,
        expr: ExprId,
        op: rill_ast::BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> TypeId {
        let lhs_ty = self.type_expr(lhs);
        let rhs_ty = self.type_expr(rhs);
        if lhs_ty.is_none() || rhs_ty.is_none() {
            return if op.is_comparison() {
                TypeId::BOOL
            } else {
                TypeId::NONE
            };
        }

        let keys = self.receiver_keys(lhs_ty);
        let Some((_, methods)) = self.magic.lookup(&keys, op.magic_name(), 2) else {
            let lhs_name = self.ty(lhs_ty);
            let rhs_name = self.ty(rhs_ty);
            self.error(
                Code::TypeMismatch,
                span,
                format!(
                    "operator `{}` is not defined for `{lhs_name}` and `{rhs_name}`",
                    op.magic_name()
                ),
            );
            return if op.is_comparison() {
                TypeId::BOOL
            } else {
                TypeId::NONE
            };
        };

        // Compete by conversion cost of the right operand.
        let entries: Vec<(SymbolId, String, String)> = methods
            .iter()
            .map(|m| {
                (
                    m.symbol,
                    m.signature.params[1].clone(),
                    m.signature.result.clone(),
                )
            })
            .collect();
        let mut best: Option<(u32, SymbolId, String)> = None;
        let mut ambiguous = false;
        for (symbol, rhs_key, result_key) in entries {
            let expected = self.magic_param_type(symbol, &rhs_key, 1);
            let cost = if expected.is_none() {
                0
            } else {
                match self.assignable(expected, rhs_ty) {
                    Assignability::Exact => 0,
                    Assignability::Deref => 1,
                    Assignability::Convert(kind) => match kind {
                        ConversionKind::TagUnion => 0,
                        ConversionKind::NumericWiden => 1,
                        ConversionKind::UserTo => 2,
                    },
                    Assignability::No => continue,
                }
            };
            match &best {
                Some((best_cost, _, _)) if cost > *best_cost => {}
                Some((best_cost, _, _)) if cost == *best_cost => ambiguous = true,
                _ => {
                    best = Some((cost, symbol, result_key));
                    ambiguous = false;
                }
            }
        }
        let Some((_, symbol, result_key)) = best else {
            let lhs_name = self.ty(lhs_ty);
            let rhs_name = self.ty(rhs_ty);
            self.error(
                Code::TypeMismatch,
                span,
                format!(
                    "operator `{}` is not defined for `{lhs_name}` and `{rhs_name}`",
                    op.magic_name()
                ),
            );
            return if op.is_comparison() {
                TypeId::BOOL
            } else {
                TypeId::NONE
            };
        };
        if ambiguous {
            self.error(
                Code::AmbiguousOverload,
                span,
                format!("ambiguous operator `{}`", op.magic_name()),
            );
        }

        let result = self.magic_result_type(symbol, &result_key, lhs_ty);
        if !symbol.is_none() {
            self.magic_binary_symbols.insert(expr, symbol);
            self.check_magic_self_recursion(symbol, &[lhs, rhs], span);
        }
        if op.is_comparison() {
            TypeId::BOOL
        } else {
            result
        }
    }

    /// Result type of a magic entry: the backing signature for user
    /// methods, the primitive named by the key for builtins.
    fn magic_result_type(&mut self, symbol: SymbolId, result_key: &str, fallback: TypeId) -> TypeId {
        if !symbol.is_none() {
            if let Some(sig) = self.signatures.get(&symbol) {
                return sig.result;
            }
        }
        match result_key {
            "bool" => TypeId::BOOL,
            "string" => TypeId::STRING,
            "int" => TypeId::INT,
            "uint" => TypeId::UINT,
            "float" => TypeId::FLOAT,
            "int8" => TypeId::INT8,
            "int16" => TypeId::INT16,
            "int32" => TypeId::INT32,
            "int64" => TypeId::INT64,
            "uint8" => TypeId::UINT8,
            "uint16" => TypeId::UINT16,
            "uint32" => TypeId::UINT32,
            "uint64" => TypeId::UINT64,
            "float16" => TypeId::FLOAT16,
            "float32" => TypeId::FLOAT32,
            "float64" => TypeId::FLOAT64,
            _ => fallback,
        }
    }

    fn magic_param_type(&mut self, symbol: SymbolId, key: &str, index: usize) -> TypeId {
        if !symbol.is_none() {
            if let Some(sig) = self.signatures.get(&symbol) {
                if let Some(param) = sig.params.get(index) {
                    return param.ty;
                }
            }
        }
        self.magic_result_type(SymbolId::NONE, key, TypeId::NONE)
    }

    /// An operator resolving to the function being checked, applied to its
    /// own parameters, is the same trivial recursion as a direct call.
    fn check_magic_self_recursion(&mut self, symbol: SymbolId, operands: &[ExprId], span: Span) {
        let Some(current) = self.current_fn.clone() else {
            return;
        };
        if current.symbol != symbol || operands.len() != current.params.len() {
            return;
        }
        for (&operand, &param) in operands.iter().zip(&current.params) {
            let stripped = self.ast.skip_parens(operand);
            let ExprKind::Ident(name) = self.ast.expr(stripped).kind else {
                return;
            };
            match self.symbols.lookup(self.current_scope(), name) {
                Some(resolved) if resolved == param => {}
                _ => return,
            }
        }
        let display = self.name(self.symbols.symbol(symbol).name).to_string();
        self.error(
            Code::TrivialRecursion,
            span,
            format!("`{display}` calls itself with its own parameters and cannot terminate"),
        );
    }

    // -------------------------------------------------------------------------
    // Borrows
    // -------------------------------------------------------------------------

    fn type_borrow(&mut self, expr: ExprId, mutable: bool, operand: ExprId, span: Span) -> TypeId {
        let operand_ty = self.type_expr(operand);
        let kind = if mutable {
            BorrowKind::Mut
        } else {
            BorrowKind::Shared
        };
        if let Some(place) = self.place_of_expr(operand) {
            let scope = self.current_scope();
            let (borrow_id, issue) = self.borrows.begin_borrow(expr, span, kind, place, scope);
            if !borrow_id.is_none() {
                self.expr_borrows.insert(expr, borrow_id);
            }
            self.report_borrow_issue(issue, place, span);
        }
        if operand_ty.is_none() {
            return TypeId::NONE;
        }
        self.types.reference(operand_ty, mutable)
    }

    /// The place an expression denotes, if it is one.
    pub(crate) fn place_of_expr(&self, expr: ExprId) -> Option<Place> {
        let stripped = self.ast.skip_parens(expr);
        let ExprKind::Ident(name) = self.ast.expr(stripped).kind else {
            return None;
        };
        let symbol = self.symbols.lookup(self.current_scope(), name)?;
        matches!(
            self.symbols.symbol(symbol).kind,
            SymbolKind::Let | SymbolKind::Param
        )
        .then(|| Place::local(symbol))
    }

    pub(crate) fn report_borrow_issue(&mut self, issue: BorrowIssue, place: Place, span: Span) {
        let Some(prev) = issue.previous() else {
            return;
        };
        let display = self
            .name(self.symbols.symbol(place.symbol).name)
            .to_string();
        let prev_span = self.borrows.borrow(prev).map(|b| b.span).unwrap_or_default();
        let message = match issue {
            BorrowIssue::ConflictShared { .. } => {
                format!("cannot borrow `{display}` as mutable while it is borrowed as shared")
            }
            BorrowIssue::ConflictMut { .. } => {
                format!("cannot borrow `{display}` while it is mutably borrowed")
            }
            _ => format!("cannot borrow `{display}`"),
        };
        self.report(
            Diagnostic::new(Code::BorrowConflict, span, message).with_related(
                prev_span,
                format!("previous borrow of `{display}` occurs here"),
            ),
        );
    }

    pub(crate) fn report_mutation_issue(&mut self, issue: BorrowIssue, place: Place, span: Span) {
        let Some(prev) = issue.previous() else {
            return;
        };
        let display = self
            .name(self.symbols.symbol(place.symbol).name)
            .to_string();
        let prev_span = self.borrows.borrow(prev).map(|b| b.span).unwrap_or_default();
        let message = match issue {
            BorrowIssue::Frozen { .. } => {
                format!("cannot assign to `{display}` while it is borrowed as shared")
            }
            _ => format!("cannot assign to `{display}` while it is mutably borrowed"),
        };
        self.report(
            Diagnostic::new(Code::BorrowMutation, span, message).with_related(
                prev_span,
                format!("previous borrow of `{display}` occurs here"),
            ),
        );
    }

    pub(crate) fn report_move_issue(&mut self, issue: BorrowIssue, place: Place, span: Span) {
        let Some(prev) = issue.previous() else {
            return;
        };
        let display = self
            .name(self.symbols.symbol(place.symbol).name)
            .to_string();
        let prev_span = self.borrows.borrow(prev).map(|b| b.span).unwrap_or_default();
        self.report(
            Diagnostic::new(
                Code::BorrowMove,
                span,
                format!("cannot move out of `{display}` while it is borrowed"),
            )
            .with_related(
                prev_span,
                format!("previous borrow of `{display}` occurs here"),
            ),
        );
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    fn type_call(
        &mut self,
        expr: ExprId,
        callee: ExprId,
        type_args: &[rill_ast::TypeExprId],
        args: &[CallArg],
        span: Span,
    ) -> TypeId {
        let arg_infos: Vec<CallArgInfo> = args
            .iter()
            .map(|arg| CallArgInfo {
                expr: arg.value,
                ty: self.type_expr(arg.value),
                span: arg.span,
                name: arg.name,
            })
            .collect();
        let scope = self.current_scope();
        let resolved_type_args: Vec<TypeId> = type_args
            .iter()
            .map(|&t| self.resolve_type(t, scope))
            .collect();

        let stripped = self.ast.skip_parens(callee);
        match self.ast.expr(stripped).kind.clone() {
            ExprKind::Ident(name) => {
                let overloads = self.callable_overloads(scope, name);
                if !overloads.is_empty() {
                    self.set_expr_type(
                        callee,
                        self.symbol_types
                            .get(&overloads[0])
                            .copied()
                            .unwrap_or(TypeId::NONE),
                    );
                    return self.resolve_call(
                        expr,
                        name,
                        &overloads,
                        &arg_infos,
                        &resolved_type_args,
                        span,
                    );
                }
                if let Some(symbol) = self.symbols.lookup(scope, name) {
                    match self.symbols.symbol(symbol).kind {
                        SymbolKind::Tag => {
                            self.set_expr_type(callee, TypeId::NONE);
                            return self.check_tag_call(name, symbol, &arg_infos, span);
                        }
                        SymbolKind::Let | SymbolKind::Param => {
                            let fn_type = self.type_expr(callee);
                            return self.check_fn_value_call(fn_type, &arg_infos, span);
                        }
                        _ => {}
                    }
                }
                // Built-in tag constructors: Some / Ok / Err.
                if name == self.names.some || name == self.names.ok || name == self.names.err {
                    self.set_expr_type(callee, TypeId::NONE);
                    return self.check_tag_call(name, SymbolId::NONE, &arg_infos, span);
                }
                let display = self.name(name).to_string();
                self.set_expr_type(callee, TypeId::NONE);
                self.error(
                    Code::UnresolvedSymbol,
                    span,
                    format!("unknown function `{display}`"),
                );
                TypeId::NONE
            }
            ExprKind::Field { base, name } => {
                if let Some(module_sym) = self.module_symbol_of(base) {
                    self.set_expr_type(base, TypeId::NONE);
                    self.set_expr_type(callee, TypeId::NONE);
                    return self.type_module_call(
                        expr,
                        module_sym,
                        name,
                        &arg_infos,
                        &resolved_type_args,
                        span,
                    );
                }
                self.type_method_call(
                    expr,
                    callee,
                    base,
                    name,
                    arg_infos,
                    &resolved_type_args,
                    span,
                )
            }
            _ => {
                let fn_type = self.type_expr(callee);
                self.check_fn_value_call(fn_type, &arg_infos, span)
            }
        }
    }

    fn type_module_call(
        &mut self,
        expr: ExprId,
        module_sym: SymbolId,
        name: Atom,
        args: &[CallArgInfo],
        type_args: &[TypeId],
        span: Span,
    ) -> TypeId {
        let module = self.symbols.symbol(module_sym);
        let module_name = self.name(module.name).to_string();
        let Some(path) = module.module_path else {
            return TypeId::NONE;
        };
        let Some(target) = self.exports.lookup(path, name) else {
            let member = self.name(name).to_string();
            self.error(
                Code::ModuleMemberNotFound,
                span,
                format!("module `{module_name}` has no member `{member}`"),
            );
            return TypeId::NONE;
        };
        if !self.symbols.symbol(target).is_public() {
            let member = self.name(name).to_string();
            self.error(
                Code::ModuleMemberNotPublic,
                span,
                format!("`{member}` of module `{module_name}` is not public"),
            );
            return TypeId::NONE;
        }
        if self.symbols.symbol(target).kind != SymbolKind::Function {
            let member = self.name(name).to_string();
            self.error(
                Code::TypeMismatch,
                span,
                format!("member `{member}` is not callable"),
            );
            return TypeId::NONE;
        }
        self.resolve_call(expr, name, &[target], args, type_args, span)
    }

    fn type_method_call(
        &mut self,
        expr: ExprId,
        callee: ExprId,
        base: ExprId,
        name: Atom,
        args: Vec<CallArgInfo>,
        type_args: &[TypeId],
        span: Span,
    ) -> TypeId {
        let receiver_ty = self.type_expr(base);
        self.set_expr_type(callee, TypeId::NONE);
        if receiver_ty.is_none() {
            return TypeId::NONE;
        }

        // `.clone()` on a task handle duplicates it without consuming.
        if name == self.names.clone && args.is_empty() {
            if self.task_payload(self.types.resolve_alias(receiver_ty)).is_some() {
                return receiver_ty;
            }
        }

        // Contract-bound methods on a generic receiver.
        if let Some(result) = self.contract_bound_method(receiver_ty, name, &args, span) {
            return result;
        }

        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(CallArgInfo {
            expr: base,
            ty: receiver_ty,
            span: self.ast.expr_span(base),
            name: None,
        });
        full_args.extend(args);

        let scope = self.current_scope();
        let overloads = self.callable_overloads(scope, name);
        if overloads.is_empty() {
            let receiver_name = self.ty(receiver_ty);
            let display = self.name(name).to_string();
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("no method `{display}` for type `{receiver_name}`"),
            );
            return TypeId::NONE;
        }
        self.resolve_call(expr, name, &overloads, &full_args, type_args, span)
    }

    /// Dispatch a method through the receiver's contract bounds when the
    /// receiver is a generic parameter.
    fn contract_bound_method(
        &mut self,
        receiver: TypeId,
        name: Atom,
        args: &[CallArgInfo],
        span: Span,
    ) -> Option<TypeId> {
        let resolved = self.look_through_receiver(receiver);
        let TypeData::GenericParam { owner, index, .. } =
            self.types.lookup(resolved).cloned()?
        else {
            return None;
        };
        if owner.is_none() {
            return None;
        }
        let owner_params = self.generic_param_types(owner);
        let env = self.generic_env_for(owner, &owner_params);
        self.push_generic_env(env);
        let all_bounds = self.resolve_param_bounds(owner, self.symbols.file_scope());
        self.pop_generic_env();
        let bounds = all_bounds.into_iter().nth(index as usize)?;
        for bound in bounds {
            let Some(spec) = self.instantiate_spec(&bound) else {
                continue;
            };
            let Some(requirements) = spec.methods.get(&name) else {
                continue;
            };
            for requirement in requirements {
                if requirement.params.len() != args.len() {
                    continue;
                }
                let fits = requirement
                    .params
                    .iter()
                    .zip(args)
                    .all(|(&expected, arg)| self.assignable(expected, arg.ty).is_ok());
                if fits {
                    return Some(requirement.result);
                }
            }
            if !requirements.is_empty() {
                let display = self.name(name).to_string();
                let receiver_name = self.ty(receiver);
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("arguments do not match contract method `{display}` on `{receiver_name}`"),
                );
                return Some(TypeId::NONE);
            }
        }
        None
    }

    // -------------------------------------------------------------------------
    // Literals and constructors
    // -------------------------------------------------------------------------

    fn type_array_literal(&mut self, elems: &[ExprId]) -> TypeId {
        if elems.is_empty() {
            return self.types.array(TypeId::NOTHING, None);
        }
        let first = self.type_expr(elems[0]);
        for &elem in &elems[1..] {
            let ty = self.type_expr(elem);
            if first.is_none() || ty.is_none() {
                continue;
            }
            if !self.coerce_expr(first, ty, elem, self.ast.expr_span(elem)) {
                let expected = self.ty(first);
                let found = self.ty(ty);
                self.error(
                    Code::TypeMismatch,
                    self.ast.expr_span(elem),
                    format!("array element has type `{found}`, expected `{expected}`"),
                );
            }
        }
        self.types.array(first, None)
    }

    fn type_struct_literal(
        &mut self,
        path: &[Atom],
        type_args: &[rill_ast::TypeExprId],
        fields: &[StructLitField],
        span: Span,
    ) -> TypeId {
        let scope = self.current_scope();
        let symbol = match path {
            [name] => self.symbols.lookup(scope, *name),
            [module, name] => self
                .symbols
                .lookup(scope, *module)
                .and_then(|m| self.symbols.symbol(m).module_path)
                .and_then(|p| self.exports.lookup(p, *name)),
            _ => None,
        };
        let Some(symbol) = symbol else {
            let display = path
                .iter()
                .map(|&a| self.name(a))
                .collect::<Vec<_>>()
                .join("::");
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("unknown type `{display}`"),
            );
            return TypeId::NONE;
        };
        if self.symbols.symbol(symbol).kind != SymbolKind::Type {
            let display = self.name(self.symbols.symbol(symbol).name).to_string();
            self.error(
                Code::TypeMismatch,
                span,
                format!("`{display}` is not a struct type"),
            );
            return TypeId::NONE;
        }

        let resolved_args: Vec<TypeId> = type_args
            .iter()
            .map(|&t| self.resolve_type(t, scope))
            .collect();
        let param_count = self.symbols.symbol(symbol).type_params.len();
        if param_count > 0 && resolved_args.is_empty() {
            let display = self.name(self.symbols.symbol(symbol).name).to_string();
            self.error(
                Code::TypeMismatch,
                span,
                format!("struct literal for generic `{display}` needs explicit type arguments"),
            );
            return TypeId::NONE;
        }
        let instance = self.instantiate_named(symbol, resolved_args, span);
        if instance.is_none() {
            return TypeId::NONE;
        }

        let declared = self.types.struct_fields(instance).cloned().unwrap_or_default();
        let mut missing: Vec<String> = Vec::new();
        for (field_name, info) in &declared {
            match fields.iter().find(|f| f.name == *field_name) {
                Some(lit_field) => {
                    self.type_expr(lit_field.value);
                    self.materialize_literal(info.ty, lit_field.value);
                    let value_ty = self.expr_type(lit_field.value);
                    if !value_ty.is_none()
                        && !info.ty.is_none()
                        && !self.coerce_expr(info.ty, value_ty, lit_field.value, lit_field.span)
                    {
                        let expected = self.ty(info.ty);
                        let found = self.ty(value_ty);
                        self.error(
                            Code::TypeMismatch,
                            lit_field.span,
                            format!("field has type `{found}`, expected `{expected}`"),
                        );
                    }
                }
                None => missing.push(self.name(*field_name).to_string()),
            }
        }
        for lit_field in fields {
            if !declared.contains_key(&lit_field.name) {
                let display = self.name(lit_field.name).to_string();
                let type_name = self.ty(instance);
                self.error(
                    Code::TypeMismatch,
                    lit_field.span,
                    format!("type `{type_name}` has no field `{display}`"),
                );
            }
        }
        if !missing.is_empty() {
            let type_name = self.ty(instance);
            self.error(
                Code::TypeMismatch,
                span,
                format!(
                    "missing fields in literal of `{type_name}`: {}",
                    missing.join(", ")
                ),
            );
        }
        instance
    }

    /// Rewrite an untyped numeric literal to the declared sized type when
    /// the value fits.
    pub(crate) fn materialize_literal(&mut self, declared: TypeId, expr: ExprId) {
        if declared.is_none() {
            return;
        }
        let stripped = self.ast.skip_parens(expr);
        let value = match self.ast.expr(stripped).kind {
            ExprKind::Literal(Literal::Int(v)) => v as i128,
            ExprKind::Literal(Literal::Uint(v)) => v as i128,
            _ => return,
        };
        let actual = self.expr_type(stripped);
        let declared_resolved = self.types.resolve_alias(declared);
        match (self.types.numeric(declared_resolved), self.types.numeric(actual)) {
            (Some(_), Some((_, crate::intern::WIDTH_ANY))) => {
                if self.int_fits(declared_resolved, value) {
                    self.expr_types.insert(stripped, declared_resolved);
                    self.expr_types.insert(expr, declared_resolved);
                } else {
                    let target = self.ty(declared_resolved);
                    self.error(
                        Code::IntLiteralOutOfRange,
                        self.ast.expr_span(stripped),
                        format!("literal {value} does not fit in `{target}`"),
                    );
                }
            }
            _ => {}
        }
    }

    // -------------------------------------------------------------------------
    // Casts, await, spawn, async blocks
    // -------------------------------------------------------------------------

    fn type_cast(&mut self, operand: ExprId, ty: rill_ast::TypeExprId, span: Span) -> TypeId {
        let operand_ty = self.type_expr(operand);
        let target = self.resolve_type(ty, self.current_scope());
        if operand_ty.is_none() || target.is_none() {
            return target;
        }
        if let Some(result) = self.numeric_cast_result(operand_ty, target) {
            return result;
        }
        if self.assignable(target, operand_ty).is_ok() {
            return target;
        }
        if self.find_user_to(operand_ty, target, span).is_some() {
            return target;
        }
        let from = self.ty(operand_ty);
        let to = self.ty(target);
        self.error(
            Code::TypeMismatch,
            span,
            format!("cannot cast `{from}` to `{to}`"),
        );
        TypeId::NONE
    }

    /// Explicit numeric casts may narrow and cross kinds.
    fn numeric_cast_result(&self, from: TypeId, to: TypeId) -> Option<TypeId> {
        let _ = self.types.numeric(from)?;
        let _ = self.types.numeric(to)?;
        Some(to)
    }

    fn type_await(&mut self, operand: ExprId, span: Span) -> TypeId {
        let operand_ty = self.type_expr(operand);
        if operand_ty.is_none() {
            return TypeId::NONE;
        }
        let Some(payload) = self.task_payload(operand_ty) else {
            let found = self.ty(operand_ty);
            self.error(
                Code::TypeMismatch,
                span,
                format!("`await` requires a task, found `{found}`"),
            );
            return TypeId::NONE;
        };
        if let Some(task) = self.task_of_expr(operand) {
            self.tasks.mark_awaited(task);
        }
        // Awaiting consumes the handle.
        if let Some(place) = self.place_of_expr(operand) {
            self.moves.mark_moved(place.symbol, span);
        }
        payload
    }

    fn type_spawn(&mut self, expr: ExprId, call: ExprId, span: Span) -> TypeId {
        let result = self.type_expr(call);
        let scope = self.current_scope();
        let in_async = self.async_block_depth > 0;
        self.tasks.spawn_task(expr, span, scope, in_async);
        if result.is_none() {
            return self.task_type(TypeId::NONE);
        }
        self.task_type(result)
    }

    fn type_async_block(&mut self, expr: ExprId, body: rill_ast::StmtId, span: Span) -> TypeId {
        self.async_block_depth += 1;
        self.return_stack
            .push(crate::context::ReturnContext::Collector {
                collected: Vec::new(),
            });
        self.check_stmt(body);
        let collected = match self.return_stack.pop() {
            Some(crate::context::ReturnContext::Collector { collected }) => collected,
            _ => Vec::new(),
        };
        self.async_block_depth -= 1;

        // The block's value is a task and carries the same obligation as
        // a spawned one.
        let scope = self.current_scope();
        self.tasks.spawn_task(expr, span, scope, true);

        let payload = match collected.split_first() {
            None => TypeId::NOTHING,
            Some((&first, rest)) => {
                for &ty in rest {
                    if !self.assignable(first, ty).is_ok() && !self.assignable(ty, first).is_ok() {
                        let a = self.ty(first);
                        let b = self.ty(ty);
                        self.error(
                            Code::TypeMismatch,
                            span,
                            format!("async block returns both `{a}` and `{b}`"),
                        );
                        break;
                    }
                }
                first
            }
        };
        self.task_type(payload)
    }
}
