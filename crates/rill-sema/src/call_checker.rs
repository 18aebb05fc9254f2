//! Call resolution.
//!
//! Handles overload filtering, named/positional/default/variadic argument
//! reconciliation, generic inference from arguments, conversion costing,
//! bound enforcement, and the borrow/move/task effects of passing
//! arguments.
//!
//! Cost model per argument: 0 exact, 1 for numeric widening, copyable
//! `own`/value adjustment, reference dereference, or literal coercion, 2
//! for a user `__to` conversion. Variadic candidates carry a penalty so an
//! exact-arity candidate always wins ties. Non-generic candidates are
//! preferred over generic ones; a tie on minimal cost is ambiguity, never
//! an arbitrary pick.

use crate::assignability::{Assignability, Conversion, ConversionKind};
use crate::borrow_checker::BorrowKind;
use crate::context::{Checker, Signature};
use crate::intern::{NumericKind, TypeData, TypeId, WIDTH_ANY};
use rill_ast::{ExprId, ExprKind, Literal};
use rill_binder::{SymbolId, SymbolKind};
use rill_common::{Atom, Code, Diagnostic, Span};
use rustc_hash::FxHashMap;
use tracing::trace;

/// One already-typed call argument.
#[derive(Clone, Debug)]
pub(crate) struct CallArgInfo {
    pub expr: ExprId,
    pub ty: TypeId,
    pub span: Span,
    pub name: Option<Atom>,
}

/// A viable candidate with its total conversion cost.
struct CandidateFit {
    symbol: SymbolId,
    cost: u32,
    bindings: FxHashMap<TypeId, TypeId>,
    /// Argument assigned to each declared parameter slot; `None` means the
    /// default fills it.
    slots: Vec<Option<CallArgInfo>>,
    /// Extra arguments captured by a variadic tail.
    rest: Vec<CallArgInfo>,
    conversions: Vec<(ExprId, Conversion)>,
    result: TypeId,
}

/// Why a candidate was rejected; used for single-candidate diagnostics.
enum CandidateFailure {
    Arity {
        min: usize,
        max: Option<usize>,
        found: usize,
    },
    UnknownNamed(Atom, Span),
    DuplicateNamed(Atom, Span),
    MissingParam(Atom),
    ArgType {
        expected: TypeId,
        found: TypeId,
        span: Span,
    },
    Unbound(Atom),
}

impl<'a> Checker<'a> {
    /// Resolve an overloaded call and return its result type.
    pub(crate) fn resolve_call(
        &mut self,
        call_expr: ExprId,
        callee_name: Atom,
        candidates: &[SymbolId],
        args: &[CallArgInfo],
        type_args: &[TypeId],
        span: Span,
    ) -> TypeId {
        let mut non_generic: Vec<SymbolId> = Vec::new();
        let mut generic: Vec<SymbolId> = Vec::new();
        for &candidate in candidates {
            if self.symbols.symbol(candidate).type_params.is_empty() {
                non_generic.push(candidate);
            } else {
                generic.push(candidate);
            }
        }

        // The non-generic set wins when it has any viable member.
        for set in [&non_generic, &generic] {
            let mut fits: Vec<CandidateFit> = Vec::new();
            for &candidate in set.iter() {
                if let Ok(fit) = self.evaluate_candidate(candidate, args, type_args) {
                    fits.push(fit);
                }
            }
            if fits.is_empty() {
                continue;
            }
            let min_cost = fits.iter().map(|f| f.cost).min().unwrap_or(0);
            let mut best: Vec<CandidateFit> =
                fits.into_iter().filter(|f| f.cost == min_cost).collect();
            if best.len() > 1 {
                let name = self.name(callee_name).to_string();
                let mut diagnostic = Diagnostic::new(
                    Code::AmbiguousOverload,
                    span,
                    format!("ambiguous call to `{name}`: multiple overloads match equally well"),
                );
                for fit in &best {
                    let candidate_span = self.symbols.symbol(fit.symbol).span;
                    diagnostic = diagnostic.with_related(candidate_span, "candidate defined here");
                }
                self.report(diagnostic);
                return TypeId::NONE;
            }
            let fit = best.remove(0);
            return self.commit_call(call_expr, fit, span);
        }

        // Nothing fit. One candidate gets its specific mismatch; several
        // get the aggregate diagnostic.
        if candidates.len() == 1 {
            if let Err(failure) = self.evaluate_candidate(candidates[0], args, type_args) {
                self.report_candidate_failure(callee_name, candidates[0], failure, span);
            }
        } else {
            let name = self.name(callee_name).to_string();
            let mut diagnostic = Diagnostic::new(
                Code::NoOverload,
                span,
                format!("no matching overload for `{name}`"),
            );
            if let Some(&first) = candidates.first() {
                let candidate_span = self.symbols.symbol(first).span;
                diagnostic = diagnostic.with_related(candidate_span, "closest candidate is here");
            }
            self.report(diagnostic);
        }
        TypeId::NONE
    }

    fn report_candidate_failure(
        &mut self,
        callee_name: Atom,
        candidate: SymbolId,
        failure: CandidateFailure,
        span: Span,
    ) {
        let name = self.name(callee_name).to_string();
        match failure {
            CandidateFailure::Arity { min, max, found } => {
                let expectation = match max {
                    Some(max) if max == min => format!("{min}"),
                    Some(max) => format!("{min} to {max}"),
                    None => format!("at least {min}"),
                };
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("`{name}` expects {expectation} argument(s), found {found}"),
                );
            }
            CandidateFailure::UnknownNamed(arg, arg_span) => {
                let arg_name = self.name(arg).to_string();
                self.error(
                    Code::TypeMismatch,
                    arg_span,
                    format!("`{name}` has no parameter named `{arg_name}`"),
                );
            }
            CandidateFailure::DuplicateNamed(arg, arg_span) => {
                let arg_name = self.name(arg).to_string();
                self.error(
                    Code::TypeMismatch,
                    arg_span,
                    format!("argument `{arg_name}` supplied more than once"),
                );
            }
            CandidateFailure::MissingParam(param) => {
                let param_name = self.name(param).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("missing argument for parameter `{param_name}` of `{name}`"),
                );
            }
            CandidateFailure::ArgType {
                expected,
                found,
                span: arg_span,
            } => {
                let expected_name = self.ty(expected);
                let found_name = self.ty(found);
                let candidate_span = self.symbols.symbol(candidate).span;
                self.report(
                    Diagnostic::new(
                        Code::TypeMismatch,
                        arg_span,
                        format!("expected `{expected_name}`, found `{found_name}`"),
                    )
                    .with_related(candidate_span, format!("`{name}` is declared here")),
                );
            }
            CandidateFailure::Unbound(param) => {
                let param_name = self.name(param).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("cannot infer type parameter `{param_name}` of `{name}` from the arguments"),
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Candidate evaluation
    // -------------------------------------------------------------------------

    fn evaluate_candidate(
        &mut self,
        symbol: SymbolId,
        args: &[CallArgInfo],
        type_args: &[TypeId],
    ) -> Result<CandidateFit, CandidateFailure> {
        let Some(signature) = self.signatures.get(&symbol).cloned() else {
            return Err(CandidateFailure::Arity {
                min: 0,
                max: Some(0),
                found: args.len(),
            });
        };
        let slots = self.reorder_arguments(&signature, args)?;
        let (slots, rest) = slots;

        // Generic inference.
        let params = self.generic_param_types(symbol);
        let mut bindings: FxHashMap<TypeId, TypeId> = FxHashMap::default();
        if !params.is_empty() {
            for (i, &explicit) in type_args.iter().enumerate() {
                if let Some(&param) = params.get(i) {
                    bindings.insert(param, explicit);
                }
            }
            for (slot, param_sig) in slots.iter().zip(&signature.params) {
                if let Some(arg) = slot {
                    if !self.infer_bindings(param_sig.ty, arg.ty, &mut bindings) {
                        return Err(CandidateFailure::ArgType {
                            expected: param_sig.ty,
                            found: arg.ty,
                            span: arg.span,
                        });
                    }
                }
            }
            if signature.variadic {
                if let Some(last) = signature.params.last() {
                    for arg in &rest {
                        if !self.infer_bindings(last.ty, arg.ty, &mut bindings) {
                            return Err(CandidateFailure::ArgType {
                                expected: last.ty,
                                found: arg.ty,
                                span: arg.span,
                            });
                        }
                    }
                }
            }
            for (i, &param) in params.iter().enumerate() {
                if !bindings.contains_key(&param) {
                    let type_params = &self.symbols.symbol(symbol).type_params;
                    let name = type_params
                        .get(i)
                        .map(|p| p.name)
                        .unwrap_or(Atom::NONE);
                    return Err(CandidateFailure::Unbound(name));
                }
            }
        }

        // Cost each argument against its (substituted) parameter type.
        let mut cost = 0u32;
        let mut conversions: Vec<(ExprId, Conversion)> = Vec::new();
        for (slot, param_sig) in slots.iter().zip(&signature.params) {
            let Some(arg) = slot else { continue };
            let expected = self.substitute_type(param_sig.ty, &bindings);
            let arg_cost = self
                .argument_cost(expected, arg, &mut conversions)
                .ok_or(CandidateFailure::ArgType {
                    expected,
                    found: arg.ty,
                    span: arg.span,
                })?;
            cost += arg_cost;
        }
        if signature.variadic {
            if let Some(last) = signature.params.last() {
                let expected = self.substitute_type(last.ty, &bindings);
                for arg in &rest {
                    let arg_cost = self
                        .argument_cost(expected, arg, &mut conversions)
                        .ok_or(CandidateFailure::ArgType {
                            expected,
                            found: arg.ty,
                            span: arg.span,
                        })?;
                    cost += arg_cost;
                }
            }
            // Exact-arity candidates always beat variadic ties.
            cost += 1;
        }

        let result = self.substitute_type(signature.result, &bindings);
        trace!(cost, "candidate fits");
        Ok(CandidateFit {
            symbol,
            cost,
            bindings,
            slots,
            rest,
            conversions,
            result,
        })
    }

    /// Map named and positional arguments onto parameter slots.
    #[allow(clippy::type_complexity)]
    fn reorder_arguments(
        &self,
        signature: &Signature,
        args: &[CallArgInfo],
    ) -> Result<(Vec<Option<CallArgInfo>>, Vec<CallArgInfo>), CandidateFailure> {
        let param_count = signature.params.len();
        let fixed_count = if signature.variadic {
            param_count.saturating_sub(1)
        } else {
            param_count
        };

        let mut slots: Vec<Option<CallArgInfo>> = vec![None; param_count];
        let mut rest: Vec<CallArgInfo> = Vec::new();
        let mut next_positional = 0usize;

        for arg in args {
            match arg.name {
                Some(name) => {
                    let Some(position) = signature.params.iter().position(|p| p.name == name)
                    else {
                        return Err(CandidateFailure::UnknownNamed(name, arg.span));
                    };
                    if slots[position].is_some() {
                        return Err(CandidateFailure::DuplicateNamed(name, arg.span));
                    }
                    slots[position] = Some(arg.clone());
                }
                None => {
                    while next_positional < param_count && slots[next_positional].is_some() {
                        next_positional += 1;
                    }
                    if next_positional < fixed_count {
                        slots[next_positional] = Some(arg.clone());
                        next_positional += 1;
                    } else if signature.variadic {
                        if next_positional < param_count && slots[next_positional].is_none() {
                            slots[next_positional] = Some(arg.clone());
                            next_positional += 1;
                        } else {
                            rest.push(arg.clone());
                        }
                    } else {
                        return Err(CandidateFailure::Arity {
                            min: signature.required_params(),
                            max: Some(param_count),
                            found: args.len(),
                        });
                    }
                }
            }
        }

        for (slot, param) in slots.iter().zip(&signature.params) {
            if slot.is_none() && !param.has_default {
                if signature.variadic && std::ptr::eq(param, signature.params.last().unwrap()) {
                    // The variadic tail may be empty.
                    continue;
                }
                if args.iter().all(|a| a.name.is_none()) {
                    return Err(CandidateFailure::Arity {
                        min: signature.required_params(),
                        max: if signature.variadic {
                            None
                        } else {
                            Some(param_count)
                        },
                        found: args.len(),
                    });
                }
                return Err(CandidateFailure::MissingParam(param.name));
            }
        }
        Ok((slots, rest))
    }

    /// Conversion cost for one argument, collecting conversions to record
    /// if this candidate wins. `None` means the argument does not fit.
    fn argument_cost(
        &mut self,
        expected: TypeId,
        arg: &CallArgInfo,
        conversions: &mut Vec<(ExprId, Conversion)>,
    ) -> Option<u32> {
        if expected.is_none() || arg.ty.is_none() {
            return Some(0);
        }
        match self.assignable(expected, arg.ty) {
            Assignability::Exact => Some(0),
            Assignability::Deref => Some(1),
            Assignability::Convert(kind) => {
                conversions.push((
                    arg.expr,
                    Conversion {
                        source: arg.ty,
                        target: expected,
                        kind,
                    },
                ));
                Some(match kind {
                    ConversionKind::TagUnion => 0,
                    ConversionKind::NumericWiden => 1,
                    ConversionKind::UserTo => 2,
                })
            }
            Assignability::No => {
                // Untyped literal coercion into a sized numeric parameter.
                if self.literal_coerces(expected, arg) {
                    return Some(1);
                }
                // A parameter taking a reference accepts a bare place; the
                // borrow is injected by the call effects.
                if let Some(TypeData::Reference { inner, .. }) =
                    self.types.lookup(self.types.resolve_alias(expected)).cloned()
                {
                    if self.assignable(inner, arg.ty).is_ok() {
                        return Some(1);
                    }
                }
                if self.count_user_to(arg.ty, expected) == 1 {
                    conversions.push((
                        arg.expr,
                        Conversion {
                            source: arg.ty,
                            target: expected,
                            kind: ConversionKind::UserTo,
                        },
                    ));
                    return Some(2);
                }
                None
            }
        }
    }

    /// Whether the argument is an untyped numeric literal that fits a
    /// sized parameter of the same kind.
    fn literal_coerces(&mut self, expected: TypeId, arg: &CallArgInfo) -> bool {
        let literal = match self.ast.expr(self.ast.skip_parens(arg.expr)).kind {
            ExprKind::Literal(Literal::Int(v)) => Some(v as i128),
            ExprKind::Literal(Literal::Uint(v)) => Some(v as i128),
            _ => None,
        };
        let Some(value) = literal else {
            return false;
        };
        match (self.types.numeric(expected), self.types.numeric(arg.ty)) {
            (Some((ek, _)), Some((ak, WIDTH_ANY))) => {
                let kinds_ok = ek == ak
                    || (ek == NumericKind::Uint && ak == NumericKind::Int && value >= 0)
                    || (ek == NumericKind::Int && ak == NumericKind::Uint);
                kinds_ok && self.int_fits(expected, value)
            }
            _ => false,
        }
    }

    /// Count `__to` candidates without reporting ambiguity; used while
    /// costing candidates.
    fn count_user_to(&mut self, actual: TypeId, expected: TypeId) -> usize {
        let receiver_keys = self.receiver_keys(actual);
        let target_key = self.types.type_key(expected, self.strings);
        let resolved = self.types.resolve_alias(expected);
        let target_key_resolved = self.types.type_key(resolved, self.strings);
        for key in &receiver_keys {
            let count = self
                .magic
                .methods_on(key, "__to")
                .iter()
                .filter(|m| {
                    m.signature.params.len() == 2
                        && (m.signature.params[1] == target_key
                            || m.signature.params[1] == target_key_resolved)
                })
                .count();
            if count > 0 {
                return count;
            }
        }
        0
    }

    // -------------------------------------------------------------------------
    // Generic inference
    // -------------------------------------------------------------------------

    /// Walk a parameter pattern side-by-side with the actual argument type,
    /// binding generic parameters at the leaves.
    pub(crate) fn infer_bindings(
        &mut self,
        pattern: TypeId,
        actual: TypeId,
        bindings: &mut FxHashMap<TypeId, TypeId>,
    ) -> bool {
        if pattern.is_none() || actual.is_none() {
            return true;
        }
        let Some(pattern_data) = self.types.lookup(pattern).cloned() else {
            return true;
        };
        match pattern_data {
            TypeData::GenericParam { .. } => match bindings.get(&pattern) {
                Some(&bound) => self.contract_types_equal(bound, actual),
                None => {
                    bindings.insert(pattern, actual);
                    true
                }
            },
            TypeData::Reference {
                inner: pattern_inner,
                mutable,
            } => {
                match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                    Some(TypeData::Reference {
                        inner: actual_inner,
                        mutable: actual_mutable,
                    }) if mutable == actual_mutable => {
                        self.infer_bindings(pattern_inner, actual_inner, bindings)
                    }
                    // A bare place can feed a reference parameter; infer
                    // from the place's own type.
                    _ => self.infer_bindings(pattern_inner, actual, bindings),
                }
            }
            TypeData::Own { inner: pattern_inner } => {
                match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                    Some(TypeData::Own { inner: actual_inner }) => {
                        self.infer_bindings(pattern_inner, actual_inner, bindings)
                    }
                    _ => self.infer_bindings(pattern_inner, actual, bindings),
                }
            }
            TypeData::Pointer { inner: pattern_inner } => {
                match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                    Some(TypeData::Pointer { inner: actual_inner }) => {
                        self.infer_bindings(pattern_inner, actual_inner, bindings)
                    }
                    _ => false,
                }
            }
            TypeData::Array {
                elem: pattern_elem,
                len: pattern_len,
            } => match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                Some(TypeData::Array {
                    elem: actual_elem,
                    len: actual_len,
                }) => {
                    let len_ok = match (pattern_len, actual_len) {
                        (None, _) => true,
                        (Some(p), Some(a)) => self.infer_bindings(p, a, bindings),
                        (Some(_), None) => false,
                    };
                    len_ok && self.infer_bindings(pattern_elem, actual_elem, bindings)
                }
                _ => false,
            },
            TypeData::Tuple(pattern_elems) => {
                match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                    Some(TypeData::Tuple(actual_elems))
                        if actual_elems.len() == pattern_elems.len() =>
                    {
                        pattern_elems
                            .iter()
                            .zip(&actual_elems)
                            .all(|(&p, &a)| self.infer_bindings(p, a, bindings))
                    }
                    _ => false,
                }
            }
            TypeData::Fn {
                params: pattern_params,
                result: pattern_result,
            } => match self.types.lookup(self.types.resolve_alias(actual)).cloned() {
                Some(TypeData::Fn {
                    params: actual_params,
                    result: actual_result,
                }) if actual_params.len() == pattern_params.len() => {
                    pattern_params
                        .iter()
                        .zip(&actual_params)
                        .all(|(&p, &a)| self.infer_bindings(p, a, bindings))
                        && self.infer_bindings(pattern_result, actual_result, bindings)
                }
                _ => false,
            },
            TypeData::Struct(pattern_nominal)
            | TypeData::Union(pattern_nominal)
            | TypeData::Alias(pattern_nominal) => {
                if pattern_nominal.args.is_empty() {
                    // Concrete nominal pattern; assignability decides later.
                    return self.assignable(pattern, actual).is_ok();
                }
                let actual_resolved = self.types.resolve_alias(actual);
                match self.types.lookup(actual_resolved).cloned() {
                    Some(TypeData::Struct(actual_nominal))
                    | Some(TypeData::Union(actual_nominal))
                    | Some(TypeData::Alias(actual_nominal)) => {
                        if actual_nominal.name != pattern_nominal.name
                            || actual_nominal.args.len() != pattern_nominal.args.len()
                        {
                            return false;
                        }
                        pattern_nominal
                            .args
                            .iter()
                            .zip(&actual_nominal.args)
                            .all(|(&p, &a)| self.infer_bindings(p, a, bindings))
                    }
                    _ => false,
                }
            }
            // Concrete pattern: nothing to bind.
            _ => true,
        }
    }

    // -------------------------------------------------------------------------
    // Committing the winner
    // -------------------------------------------------------------------------

    fn commit_call(&mut self, call_expr: ExprId, fit: CandidateFit, span: Span) -> TypeId {
        // Bounds on the winner.
        if !self.symbols.symbol(fit.symbol).type_params.is_empty() {
            self.enforce_bounds(fit.symbol, &fit.bindings, span);
        }
        for (expr, conversion) in &fit.conversions {
            self.implicit_conversions.insert(*expr, *conversion);
        }

        let signature = self.signatures.get(&fit.symbol).cloned();
        if let Some(signature) = signature {
            for (slot, param) in fit.slots.iter().zip(&signature.params) {
                if let Some(arg) = slot {
                    let expected = self.substitute_type(param.ty, &fit.bindings);
                    self.apply_argument_effects(expected, arg);
                }
            }
            if signature.variadic {
                if let Some(last) = signature.params.last() {
                    let expected = self.substitute_type(last.ty, &fit.bindings);
                    for arg in &fit.rest {
                        self.apply_argument_effects(expected, arg);
                    }
                }
            }
        }

        self.check_trivial_recursion(call_expr, fit.symbol, &fit.slots, span);
        fit.result
    }

    /// Borrow, move, and task consequences of binding one argument.
    fn apply_argument_effects(&mut self, expected: TypeId, arg: &CallArgInfo) {
        let expected_resolved = self.types.resolve_alias(expected);
        let arg_resolved = self.types.resolve_alias(arg.ty);

        // `&T` / `&mut T` parameters demand a borrow of the argument place
        // when the caller passes a bare place.
        if let Some(TypeData::Reference { mutable, .. }) =
            self.types.lookup(expected_resolved).cloned()
        {
            let arg_is_reference =
                matches!(self.types.lookup(arg_resolved), Some(TypeData::Reference { .. }));
            if !arg_is_reference {
                if let Some(place) = self.place_of_expr(arg.expr) {
                    let kind = if mutable {
                        BorrowKind::Mut
                    } else {
                        BorrowKind::Shared
                    };
                    let scope = self.current_scope();
                    let (borrow_id, issue) =
                        self.borrows
                            .begin_borrow(arg.expr, arg.span, kind, place, scope);
                    if !borrow_id.is_none() {
                        self.expr_borrows.insert(arg.expr, borrow_id);
                    }
                    self.report_borrow_issue(issue, place, arg.span);
                }
            }
            return;
        }

        // Task handles passed by value transfer ownership.
        if self.task_payload(expected_resolved).is_some() || self.task_payload(arg_resolved).is_some()
        {
            if let Some(task) = self.task_of_expr(arg.expr) {
                self.tasks.mark_passed(task);
            } else {
                self.tasks.mark_passed_expr(self.ast.skip_parens(arg.expr));
            }
            // Ownership of the handle is gone either way.
            if let Some(place) = self.place_of_expr(arg.expr) {
                self.moves.mark_moved(place.symbol, arg.span);
            }
            return;
        }

        // Non-copy values move into the call.
        if !self.types.is_copy(arg_resolved, &self.copy_types) {
            if let Some(place) = self.place_of_expr(arg.expr) {
                let issue = self.borrows.move_allowed(place);
                self.report_move_issue(issue, place, arg.span);
                self.moves.mark_moved(place.symbol, arg.span);
            }
        }
    }

    /// The task produced by an argument expression, via its binding or the
    /// spawn expression itself.
    pub(crate) fn task_of_expr(&mut self, expr: ExprId) -> Option<crate::task_checker::TaskId> {
        let stripped = self.ast.skip_parens(expr);
        if let Some(task) = self.tasks.task_for_expr(stripped) {
            return Some(task);
        }
        if let ExprKind::Ident(name) = self.ast.expr(stripped).kind {
            let symbol = self.symbols.lookup(self.current_scope(), name)?;
            return self.tasks.task_for_binding(symbol);
        }
        None
    }

    // -------------------------------------------------------------------------
    // Trivial recursion
    // -------------------------------------------------------------------------

    /// `fn f(a, b) { return f(a, b); }` - a direct self-call with exactly
    /// the parameter symbols as arguments cannot terminate.
    fn check_trivial_recursion(
        &mut self,
        _call_expr: ExprId,
        callee: SymbolId,
        slots: &[Option<CallArgInfo>],
        span: Span,
    ) {
        let Some(current) = self.current_fn.clone() else {
            return;
        };
        if current.symbol != callee {
            return;
        }
        if slots.len() != current.params.len() {
            return;
        }
        for (slot, &param) in slots.iter().zip(&current.params) {
            let Some(arg) = slot else { return };
            let stripped = self.ast.skip_parens(arg.expr);
            let ExprKind::Ident(name) = self.ast.expr(stripped).kind else {
                return;
            };
            match self.symbols.lookup(self.current_scope(), name) {
                Some(resolved) if resolved == param => {}
                _ => return,
            }
        }
        let name = self
            .name(self.symbols.symbol(callee).name)
            .to_string();
        self.report(
            Diagnostic::new(
                Code::TrivialRecursion,
                span,
                format!("`{name}` calls itself with its own parameters and cannot terminate"),
            )
            .with_fix(rill_common::FixSuggestion {
                message: "route the base case through an intrinsic or cast the arguments"
                    .to_string(),
                replacement: None,
                span,
                applicability: rill_common::Applicability::ManualReview,
            }),
        );
    }

    // -------------------------------------------------------------------------
    // Non-symbol callees
    // -------------------------------------------------------------------------

    /// Apply a function-typed value (a `fn(T) -> R` local, field, or
    /// parameter) to arguments.
    pub(crate) fn check_fn_value_call(
        &mut self,
        fn_type: TypeId,
        args: &[CallArgInfo],
        span: Span,
    ) -> TypeId {
        let Some(TypeData::Fn { params, result }) = self
            .types
            .lookup(self.types.resolve_alias(fn_type))
            .cloned()
        else {
            let found = self.ty(fn_type);
            self.error(
                Code::TypeMismatch,
                span,
                format!("`{found}` is not callable"),
            );
            return TypeId::NONE;
        };
        if params.len() != args.len() {
            self.error(
                Code::TypeMismatch,
                span,
                format!("expected {} argument(s), found {}", params.len(), args.len()),
            );
            return result;
        }
        for (&expected, arg) in params.iter().zip(args) {
            if arg.name.is_some() {
                self.error(
                    Code::TypeMismatch,
                    arg.span,
                    "named arguments require a declared function",
                );
                continue;
            }
            if !self.coerce_expr(expected, arg.ty, arg.expr, arg.span) {
                let expected_name = self.ty(expected);
                let found_name = self.ty(arg.ty);
                self.error(
                    Code::TypeMismatch,
                    arg.span,
                    format!("expected `{expected_name}`, found `{found_name}`"),
                );
            }
        }
        result
    }

    /// Type a tag constructor call: `Some(1)` becomes the single-member
    /// union `Some<int>`, later upcast into any union carrying that tag.
    pub(crate) fn check_tag_call(
        &mut self,
        name: Atom,
        symbol: SymbolId,
        args: &[CallArgInfo],
        span: Span,
    ) -> TypeId {
        if !symbol.is_none() {
            if let Some(item) = self.symbols.symbol(symbol).item {
                if let rill_ast::ItemKind::Tag(tag) = &self.ast.item(item).kind {
                    if tag.arity as usize != args.len() {
                        let display = self.name(name).to_string();
                        self.error(
                            Code::TypeMismatch,
                            span,
                            format!(
                                "tag `{display}` takes {} payload(s), found {}",
                                tag.arity,
                                args.len()
                            ),
                        );
                        return TypeId::NONE;
                    }
                }
            }
        }
        for arg in args {
            if arg.name.is_some() {
                self.error(
                    Code::TypeMismatch,
                    arg.span,
                    "tag constructors take positional payloads only",
                );
            }
        }
        let arg_tys: Vec<TypeId> = args.iter().map(|a| a.ty).collect();
        self.tag_type(name, symbol, arg_tys)
    }

    /// Whether a symbol names a function overload set this checker can
    /// resolve calls against.
    pub(crate) fn callable_overloads(&self, scope: rill_binder::ScopeId, name: Atom) -> Vec<SymbolId> {
        self.symbols
            .lookup_overloads(scope, name)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&id| self.symbols.symbol(id).kind == SymbolKind::Function)
                    .collect()
            })
            .unwrap_or_default()
    }
}
