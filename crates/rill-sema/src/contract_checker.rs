//! Contract requirement sets and satisfaction checking.
//!
//! A contract declares required fields and methods; generic bounds demand
//! that the bound type satisfies them structurally. Requirement sets are
//! built eagerly per contract declaration and instantiated by positional
//! substitution when a bound applies generic arguments.
//!
//! Missing names aggregate into one diagnostic per category per type.
//! Signature failures and attribute/modifier failures report under
//! distinct codes so a developer can tell them apart.

use crate::context::Checker;
use crate::intern::{FieldAttrs, FieldInfo, Nominal, TypeData, TypeId};
use indexmap::IndexMap;
use rill_ast::{BoundExpr, ContractDecl, ContractItem, TypeExprId, TypeExprKind};
use rill_binder::{ScopeId, SymbolId, SymbolKind};
use rill_common::{Atom, Code, Diagnostic, Span};
use rustc_hash::FxHashMap;
use tracing::trace;

// =============================================================================
// Requirement data
// =============================================================================

#[derive(Clone, Debug)]
pub struct ContractSpec {
    pub fields: IndexMap<Atom, ContractField>,
    pub methods: IndexMap<Atom, Vec<MethodRequirement>>,
}

#[derive(Clone, Debug)]
pub struct ContractField {
    pub ty: TypeId,
    pub attrs: FieldAttrs,
}

#[derive(Clone, Debug)]
pub struct MethodRequirement {
    /// Parameter types, excluding the implicit receiver.
    pub params: Vec<TypeId>,
    pub result: TypeId,
    pub attrs: FieldAttrs,
    pub is_public: bool,
    pub is_async: bool,
}

/// A contract usage at a generic position.
#[derive(Clone, Debug)]
pub struct BoundInstance {
    pub contract: SymbolId,
    pub args: Vec<TypeId>,
    pub span: Span,
}

impl<'a> Checker<'a> {
    // -------------------------------------------------------------------------
    // Building requirement sets
    // -------------------------------------------------------------------------

    pub(crate) fn populate_contract(&mut self, symbol: SymbolId, decl: &ContractDecl) {
        let file_scope = self.symbols.file_scope();
        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);

        let mut fields: IndexMap<Atom, ContractField> = IndexMap::new();
        let mut field_spans: FxHashMap<Atom, Span> = FxHashMap::default();
        let mut methods: IndexMap<Atom, Vec<MethodRequirement>> = IndexMap::new();

        for item in &decl.items {
            match item {
                ContractItem::Field {
                    name,
                    ty,
                    attrs,
                    span,
                } => {
                    if let Some(&prev) = field_spans.get(name) {
                        let display = self.name(*name).to_string();
                        self.report(
                            Diagnostic::new(
                                Code::ContractDuplicateField,
                                *span,
                                format!("duplicate contract field `{display}`"),
                            )
                            .with_related(prev, format!("previous declaration of `{display}` is here")),
                        );
                        continue;
                    }
                    if self.type_expr_mentions(*ty, decl.name) {
                        let display = self.name(decl.name).to_string();
                        self.error(
                            Code::ContractSelfType,
                            *span,
                            format!("contract `{display}` cannot require itself as a type"),
                        );
                        continue;
                    }
                    let resolved = self.resolve_type(*ty, file_scope);
                    field_spans.insert(*name, *span);
                    fields.insert(
                        *name,
                        ContractField {
                            ty: resolved,
                            attrs: FieldAttrs::from_ast(attrs),
                        },
                    );
                }
                ContractItem::Method {
                    name,
                    params: method_params,
                    result,
                    attrs,
                    is_public,
                    is_async,
                    has_body,
                    span,
                } => {
                    if *has_body {
                        let display = self.name(*name).to_string();
                        self.error(
                            Code::ContractMethodBody,
                            *span,
                            format!("contract method `{display}` cannot have a body"),
                        );
                    }
                    let mut param_tys = Vec::with_capacity(method_params.len());
                    let mut self_typed = false;
                    for &p in method_params {
                        if self.type_expr_mentions(p, decl.name) {
                            self_typed = true;
                            break;
                        }
                        param_tys.push(self.resolve_type(p, file_scope));
                    }
                    if self_typed
                        || result.is_some_and(|r| self.type_expr_mentions(r, decl.name))
                    {
                        let display = self.name(decl.name).to_string();
                        self.error(
                            Code::ContractSelfType,
                            *span,
                            format!("contract `{display}` cannot require itself as a type"),
                        );
                        continue;
                    }
                    let result_ty = match result {
                        Some(r) => self.resolve_type(*r, file_scope),
                        None => TypeId::UNIT,
                    };
                    let requirement = MethodRequirement {
                        params: param_tys,
                        result: result_ty,
                        attrs: FieldAttrs::from_ast(attrs),
                        is_public: *is_public,
                        is_async: *is_async,
                    };
                    let entries = methods.entry(*name).or_default();
                    if entries.iter().any(|r| r.params == requirement.params) {
                        let display = self.name(*name).to_string();
                        self.error(
                            Code::ContractDuplicateMethod,
                            *span,
                            format!("duplicate contract method `{display}` with identical parameters"),
                        );
                        continue;
                    }
                    entries.push(requirement);
                }
            }
        }
        self.pop_generic_env();

        let spec = ContractSpec { fields, methods };
        self.check_unused_contract_params(symbol, &params, &spec);
        self.contract_specs.insert(symbol, spec);
    }

    fn check_unused_contract_params(
        &mut self,
        symbol: SymbolId,
        params: &[TypeId],
        spec: &ContractSpec,
    ) {
        let mut used = rustc_hash::FxHashSet::default();
        for field in spec.fields.values() {
            self.collect_generic_params(field.ty, &mut used);
        }
        for requirements in spec.methods.values() {
            for req in requirements {
                for &p in &req.params {
                    self.collect_generic_params(p, &mut used);
                }
                self.collect_generic_params(req.result, &mut used);
            }
        }
        let type_params = self.symbols.symbol(symbol).type_params.clone();
        for (param_ty, decl) in params.iter().zip(&type_params) {
            if !used.contains(param_ty) {
                let display = self.name(decl.name).to_string();
                self.error(
                    Code::ContractUnusedTypeParam,
                    decl.span,
                    format!("contract type parameter `{display}` is never used"),
                );
            }
        }
    }

    fn collect_generic_params(&self, ty: TypeId, out: &mut rustc_hash::FxHashSet<TypeId>) {
        let Some(data) = self.types.lookup(ty) else {
            return;
        };
        match data {
            TypeData::GenericParam { .. } => {
                out.insert(ty);
            }
            TypeData::Reference { inner, .. }
            | TypeData::Own { inner }
            | TypeData::Pointer { inner } => self.collect_generic_params(*inner, out),
            TypeData::Array { elem, len } => {
                self.collect_generic_params(*elem, out);
                if let Some(len) = len {
                    self.collect_generic_params(*len, out);
                }
            }
            TypeData::Tuple(elems) => {
                for &e in elems {
                    self.collect_generic_params(e, out);
                }
            }
            TypeData::Fn { params, result } => {
                for &p in params {
                    self.collect_generic_params(p, out);
                }
                self.collect_generic_params(*result, out);
            }
            TypeData::Struct(n) | TypeData::Union(n) | TypeData::Alias(n) => {
                for &a in &n.args {
                    self.collect_generic_params(a, out);
                }
            }
            _ => {}
        }
    }

    /// Whether a type expression mentions `name` as a path segment.
    fn type_expr_mentions(&self, id: TypeExprId, name: Atom) -> bool {
        match &self.ast.type_expr(id).kind {
            TypeExprKind::Path { segments, args } => {
                segments.contains(&name) || args.iter().any(|&a| self.type_expr_mentions(a, name))
            }
            TypeExprKind::Reference { inner, .. }
            | TypeExprKind::Own { inner }
            | TypeExprKind::Pointer { inner }
            | TypeExprKind::Optional { inner } => self.type_expr_mentions(*inner, name),
            TypeExprKind::Array { elem, .. } => self.type_expr_mentions(*elem, name),
            TypeExprKind::Errorable { ok, err } => {
                self.type_expr_mentions(*ok, name)
                    || err.is_some_and(|e| self.type_expr_mentions(e, name))
            }
            TypeExprKind::Tuple(elems) => elems.iter().any(|&e| self.type_expr_mentions(e, name)),
            TypeExprKind::Fn { params, result } => {
                params.iter().any(|&p| self.type_expr_mentions(p, name))
                    || result.is_some_and(|r| self.type_expr_mentions(r, name))
            }
            TypeExprKind::ConstInt(_) => false,
        }
    }

    // -------------------------------------------------------------------------
    // Bounds
    // -------------------------------------------------------------------------

    /// Resolve a written bound (`T: Contract<Args>`) into a `BoundInstance`.
    pub(crate) fn resolve_bound(&mut self, bound: &BoundExpr, scope: ScopeId) -> Option<BoundInstance> {
        let symbol = match bound.path.as_slice() {
            [name] => self.symbols.lookup(scope, *name),
            [module, name] => {
                let module_sym = self.symbols.lookup(scope, *module)?;
                let path = self.symbols.symbol(module_sym).module_path?;
                self.exports.lookup(path, *name)
            }
            _ => None,
        };
        let Some(symbol) = symbol else {
            let display = self.bound_path_display(bound);
            self.error(
                Code::ContractBoundNotFound,
                bound.span,
                format!("unknown contract `{display}` in bound"),
            );
            return None;
        };
        if self.symbols.symbol(symbol).kind != SymbolKind::Contract {
            let display = self.bound_path_display(bound);
            self.error(
                Code::ContractBoundNotContract,
                bound.span,
                format!("`{display}` is not a contract"),
            );
            return None;
        }
        let expected = self.symbols.symbol(symbol).type_params.len();
        if expected != bound.args.len() {
            let display = self.bound_path_display(bound);
            self.error(
                Code::ContractBoundTypeError,
                bound.span,
                format!(
                    "contract `{display}` takes {expected} type argument(s), found {}",
                    bound.args.len()
                ),
            );
            return None;
        }
        let mut args = Vec::with_capacity(bound.args.len());
        for &arg in &bound.args {
            let t = self.resolve_type(arg, scope);
            if t.is_none() {
                let display = self.bound_path_display(bound);
                self.error(
                    Code::ContractBoundTypeError,
                    bound.span,
                    format!("unresolved type argument in bound `{display}`"),
                );
                return None;
            }
            args.push(t);
        }
        Some(BoundInstance {
            contract: symbol,
            args,
            span: bound.span,
        })
    }

    fn bound_path_display(&self, bound: &BoundExpr) -> String {
        bound
            .path
            .iter()
            .map(|&a| self.name(a))
            .collect::<Vec<_>>()
            .join("::")
    }

    /// Resolve all bounds on a declaration's type parameters, reporting
    /// duplicates.
    pub(crate) fn resolve_param_bounds(
        &mut self,
        owner: SymbolId,
        scope: ScopeId,
    ) -> Vec<Vec<BoundInstance>> {
        let type_params = self.symbols.symbol(owner).type_params.clone();
        let mut all = Vec::with_capacity(type_params.len());
        for param in &type_params {
            let mut bounds: Vec<BoundInstance> = Vec::with_capacity(param.bounds.len());
            for bound in &param.bounds {
                let Some(instance) = self.resolve_bound(bound, scope) else {
                    continue;
                };
                if let Some(prev) = bounds.iter().find(|b| b.contract == instance.contract) {
                    let display = self.bound_path_display(bound);
                    let prev_span = prev.span;
                    self.report(
                        Diagnostic::new(
                            Code::ContractBoundDuplicate,
                            bound.span,
                            format!("duplicate bound `{display}`"),
                        )
                        .with_related(prev_span, "previous bound is here"),
                    );
                    continue;
                }
                bounds.push(instance);
            }
            all.push(bounds);
        }
        all
    }

    // -------------------------------------------------------------------------
    // Substitution
    // -------------------------------------------------------------------------

    /// Replace generic parameters by `subst` (keyed by the parameter's own
    /// `TypeId`), rebuilding composite types as needed.
    pub(crate) fn substitute_type(
        &mut self,
        ty: TypeId,
        subst: &FxHashMap<TypeId, TypeId>,
    ) -> TypeId {
        if ty.is_none() || subst.is_empty() {
            return ty;
        }
        let Some(data) = self.types.lookup(ty).cloned() else {
            return ty;
        };
        match data {
            TypeData::GenericParam { .. } => subst.get(&ty).copied().unwrap_or(ty),
            TypeData::Reference { inner, mutable } => {
                let new_inner = self.substitute_type(inner, subst);
                if new_inner == inner {
                    ty
                } else {
                    self.types.reference(new_inner, mutable)
                }
            }
            TypeData::Own { inner } => {
                let new_inner = self.substitute_type(inner, subst);
                if new_inner == inner {
                    ty
                } else {
                    self.types.own(new_inner)
                }
            }
            TypeData::Pointer { inner } => {
                let new_inner = self.substitute_type(inner, subst);
                if new_inner == inner {
                    ty
                } else {
                    self.types.pointer(new_inner)
                }
            }
            TypeData::Array { elem, len } => {
                let new_elem = self.substitute_type(elem, subst);
                let new_len = len.map(|l| self.substitute_type(l, subst));
                if new_elem == elem && new_len == len {
                    ty
                } else {
                    self.types.array(new_elem, new_len)
                }
            }
            TypeData::Tuple(elems) => {
                let new_elems: Vec<TypeId> = elems
                    .iter()
                    .map(|&e| self.substitute_type(e, subst))
                    .collect();
                if new_elems == elems {
                    ty
                } else {
                    self.types.tuple(new_elems)
                }
            }
            TypeData::Fn { params, result } => {
                let new_params: Vec<TypeId> = params
                    .iter()
                    .map(|&p| self.substitute_type(p, subst))
                    .collect();
                let new_result = self.substitute_type(result, subst);
                if new_params == params && new_result == result {
                    ty
                } else {
                    self.types.function(new_params, new_result)
                }
            }
            TypeData::Struct(n) | TypeData::Union(n) | TypeData::Alias(n) => {
                if n.args.is_empty() {
                    return ty;
                }
                let new_args: Vec<TypeId> = n
                    .args
                    .iter()
                    .map(|&a| self.substitute_type(a, subst))
                    .collect();
                if new_args == n.args {
                    return ty;
                }
                self.reinstantiate_nominal(&n, new_args)
            }
            _ => ty,
        }
    }

    /// Rebuild a nominal instance with new arguments, routing built-ins
    /// through their dedicated constructors.
    fn reinstantiate_nominal(&mut self, nominal: &Nominal, args: Vec<TypeId>) -> TypeId {
        if nominal.symbol.is_none() {
            if nominal.name == self.names.option && args.len() == 1 {
                return self.option_type(args[0]);
            }
            if nominal.name == self.names.result && args.len() == 2 {
                return self.result_type(args[0], args[1]);
            }
            if nominal.name == self.names.task && args.len() == 1 {
                return self.task_type(args[0]);
            }
            // A builtin tag union.
            return self.tag_type(nominal.name, nominal.symbol, args);
        }
        if self.symbols.symbol(nominal.symbol).kind == SymbolKind::Tag {
            return self.tag_type(nominal.name, nominal.symbol, args);
        }
        self.instantiate_named(nominal.symbol, args, Span::dummy())
    }

    /// Instantiate a contract's requirement set with bound arguments,
    /// substituting the contract's own parameters by position.
    pub(crate) fn instantiate_spec(&mut self, bound: &BoundInstance) -> Option<ContractSpec> {
        let spec = self.contract_specs.get(&bound.contract)?.clone();
        let params = self.generic_param_types(bound.contract);
        if params.len() != bound.args.len() {
            return Some(spec);
        }
        let subst: FxHashMap<TypeId, TypeId> =
            params.into_iter().zip(bound.args.iter().copied()).collect();
        let fields = spec
            .fields
            .iter()
            .map(|(name, f)| {
                (
                    *name,
                    ContractField {
                        ty: self.substitute_type(f.ty, &subst),
                        attrs: f.attrs.clone(),
                    },
                )
            })
            .collect();
        let methods = spec
            .methods
            .iter()
            .map(|(name, reqs)| {
                let reqs = reqs
                    .iter()
                    .map(|r| MethodRequirement {
                        params: r
                            .params
                            .iter()
                            .map(|&p| self.substitute_type(p, &subst))
                            .collect(),
                        result: self.substitute_type(r.result, &subst),
                        attrs: r.attrs.clone(),
                        is_public: r.is_public,
                        is_async: r.is_async,
                    })
                    .collect();
                (*name, reqs)
            })
            .collect();
        Some(ContractSpec { fields, methods })
    }

    // -------------------------------------------------------------------------
    // Satisfaction
    // -------------------------------------------------------------------------

    /// Check that `target` satisfies `bound`; reports aggregated
    /// diagnostics at `span` and returns overall success.
    pub(crate) fn check_satisfaction(
        &mut self,
        target: TypeId,
        bound: &BoundInstance,
        span: Span,
    ) -> bool {
        let Some(spec) = self.instantiate_spec(bound) else {
            return false;
        };
        let contract_name = self
            .name(self.symbols.symbol(bound.contract).name)
            .to_string();
        let target_name = self.ty(target);
        trace!(target = %target_name, contract = %contract_name, "checking contract satisfaction");

        let target_fields = self.fields_of(target);
        let mut ok = true;

        let mut missing_fields: Vec<String> = Vec::new();
        let mut mismatched_fields: Vec<String> = Vec::new();
        let mut attr_mismatched_fields: Vec<String> = Vec::new();
        for (name, required) in &spec.fields {
            let display = self.name(*name).to_string();
            let Some(actual) = target_fields.as_ref().and_then(|f| f.get(name)) else {
                missing_fields.push(display);
                continue;
            };
            if !self.contract_types_equal(actual.ty, required.ty) {
                mismatched_fields.push(format!(
                    "`{display}` (expected `{}`, found `{}`)",
                    self.ty(required.ty),
                    self.ty(actual.ty)
                ));
                continue;
            }
            if actual.attrs != required.attrs {
                attr_mismatched_fields.push(display);
            }
        }
        if !missing_fields.is_empty() {
            ok = false;
            self.error(
                Code::ContractMissingField,
                span,
                format!(
                    "type `{target_name}` is missing required fields of contract `{contract_name}`: {}",
                    missing_fields.join(", ")
                ),
            );
        }
        if !mismatched_fields.is_empty() {
            ok = false;
            self.error(
                Code::ContractFieldTypeError,
                span,
                format!(
                    "type `{target_name}` has wrongly typed fields for contract `{contract_name}`: {}",
                    mismatched_fields.join(", ")
                ),
            );
        }
        if !attr_mismatched_fields.is_empty() {
            ok = false;
            self.error(
                Code::ContractFieldAttrMismatch,
                span,
                format!(
                    "type `{target_name}` has mismatched field attributes for contract `{contract_name}`: {}",
                    attr_mismatched_fields.join(", ")
                ),
            );
        }

        let mut missing_methods: Vec<String> = Vec::new();
        for (name, requirements) in &spec.methods {
            let display = self.name(*name).to_string();
            let candidates = self.method_candidates(target, *name);
            if candidates.is_empty() {
                missing_methods.push(display);
                continue;
            }
            for requirement in requirements {
                let mut signature_matched = false;
                let mut modifiers_matched = false;
                for candidate in &candidates {
                    if !self.method_signature_matches(candidate, requirement, target) {
                        continue;
                    }
                    signature_matched = true;
                    if candidate.attrs == requirement.attrs
                        && candidate.is_public == requirement.is_public
                        && candidate.is_async == requirement.is_async
                    {
                        modifiers_matched = true;
                        break;
                    }
                }
                if !signature_matched {
                    ok = false;
                    self.error(
                        Code::ContractMethodMismatch,
                        span,
                        format!(
                            "method `{display}` on `{target_name}` does not match the signature required by contract `{contract_name}`"
                        ),
                    );
                } else if !modifiers_matched {
                    ok = false;
                    self.error(
                        Code::ContractMethodAttrMismatch,
                        span,
                        format!(
                            "method `{display}` on `{target_name}` matches the signature but not the attributes or modifiers required by contract `{contract_name}`"
                        ),
                    );
                }
            }
        }
        if !missing_methods.is_empty() {
            ok = false;
            self.error(
                Code::ContractMissingMethod,
                span,
                format!(
                    "type `{target_name}` is missing required methods of contract `{contract_name}`: {}",
                    missing_methods.join(", ")
                ),
            );
        }
        ok
    }

    /// Fields visible on a type: struct fields plus extern fields.
    pub(crate) fn fields_of(&self, ty: TypeId) -> Option<IndexMap<Atom, FieldInfo>> {
        let resolved = self.types.resolve_alias(ty);
        let mut fields = self.types.struct_fields(resolved).cloned();
        if let Some(extern_fields) = self.extern_fields.get(&resolved) {
            let merged = fields.get_or_insert_with(IndexMap::new);
            for (name, info) in extern_fields {
                merged.entry(*name).or_insert_with(|| info.clone());
            }
        }
        fields
    }

    /// Candidate methods visible on `target`: magic-index entries plus
    /// user functions whose first parameter is `target`.
    fn method_candidates(&mut self, target: TypeId, name: Atom) -> Vec<MethodCandidate> {
        let mut candidates = Vec::new();
        let method_name = self.name(name).to_string();
        let keys = self.receiver_keys(target);
        for key in &keys {
            for entry in self.magic.methods_on(key, &method_name) {
                if entry.symbol.is_none() {
                    // Built-in operator entries carry only type keys; treat
                    // them as matching by arity alone elsewhere.
                    continue;
                }
                if let Some(sig) = self.signatures.get(&entry.symbol) {
                    let symbol = self.symbols.symbol(entry.symbol);
                    candidates.push(MethodCandidate {
                        params: sig.params.iter().skip(1).map(|p| p.ty).collect(),
                        result: sig.result,
                        attrs: FieldAttrs::default(),
                        is_public: symbol.is_public(),
                        is_async: sig.is_async,
                    });
                }
            }
        }
        for symbol_id in self.symbols.symbol_ids() {
            let symbol = self.symbols.symbol(symbol_id);
            if symbol.kind != SymbolKind::Function || symbol.name != name {
                continue;
            }
            let Some(sig) = self.signatures.get(&symbol_id) else {
                continue;
            };
            let Some(first) = sig.params.first() else {
                continue;
            };
            if !self.contract_types_equal(first.ty, target) {
                continue;
            }
            candidates.push(MethodCandidate {
                params: sig.params.iter().skip(1).map(|p| p.ty).collect(),
                result: sig.result,
                attrs: FieldAttrs::default(),
                is_public: symbol.is_public(),
                is_async: sig.is_async,
            });
        }
        candidates
    }

    fn method_signature_matches(
        &self,
        candidate: &MethodCandidate,
        requirement: &MethodRequirement,
        target: TypeId,
    ) -> bool {
        // A requirement may spell the receiver explicitly as its first
        // parameter; accept either arrangement.
        let required: &[TypeId] = &requirement.params;
        let stripped = match required.first() {
            Some(&first) if self.contract_types_equal(first, target) => &required[1..],
            _ => required,
        };
        if stripped.len() != candidate.params.len() {
            return false;
        }
        stripped
            .iter()
            .zip(&candidate.params)
            .all(|(&r, &c)| self.contract_types_equal(r, c))
            && self.contract_types_equal(candidate.result, requirement.result)
    }

    /// Structural equality under contract matching: alias-resolved
    /// identity, equal wrappers over equal inners, same-named generic
    /// params, arrays with equal element and count.
    pub(crate) fn contract_types_equal(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.types.resolve_alias(a);
        let b = self.types.resolve_alias(b);
        if a == b {
            return true;
        }
        match (self.types.lookup(a), self.types.lookup(b)) {
            (
                Some(TypeData::Reference {
                    inner: ia,
                    mutable: ma,
                }),
                Some(TypeData::Reference {
                    inner: ib,
                    mutable: mb,
                }),
            ) => ma == mb && self.contract_types_equal(*ia, *ib),
            (Some(TypeData::Own { inner: ia }), Some(TypeData::Own { inner: ib }))
            | (Some(TypeData::Pointer { inner: ia }), Some(TypeData::Pointer { inner: ib })) => {
                self.contract_types_equal(*ia, *ib)
            }
            (
                Some(TypeData::GenericParam { name: na, .. }),
                Some(TypeData::GenericParam { name: nb, .. }),
            ) => na == nb,
            (
                Some(TypeData::Array { elem: ea, len: la }),
                Some(TypeData::Array { elem: eb, len: lb }),
            ) => la == lb && self.contract_types_equal(*ea, *eb),
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Bound enforcement at call sites
    // -------------------------------------------------------------------------

    /// Enforce every bound on a generic function's parameters given the
    /// inferred bindings (parameter `TypeId` -> concrete type).
    pub(crate) fn enforce_bounds(
        &mut self,
        fn_symbol: SymbolId,
        bindings: &FxHashMap<TypeId, TypeId>,
        span: Span,
    ) -> bool {
        let params = self.generic_param_types(fn_symbol);
        let env = self.generic_env_for(fn_symbol, &params);
        self.push_generic_env(env);
        let bounds = self.resolve_param_bounds(fn_symbol, self.symbols.file_scope());
        self.pop_generic_env();

        let mut ok = true;
        for (param_ty, param_bounds) in params.iter().zip(bounds) {
            let Some(&target) = bindings.get(param_ty) else {
                continue;
            };
            for bound in param_bounds {
                let instantiated_args: Vec<TypeId> = bound
                    .args
                    .iter()
                    .map(|&a| self.substitute_type(a, bindings))
                    .collect();
                let bound = BoundInstance {
                    contract: bound.contract,
                    args: instantiated_args,
                    span,
                };
                if self.satisfied_by_own_bound(target, &bound) {
                    continue;
                }
                if !self.check_satisfaction(target, &bound, span) {
                    ok = false;
                }
            }
        }
        ok
    }

    /// A generic-parameter target satisfies a bound without re-check when
    /// its own declaration carries a matching bound.
    fn satisfied_by_own_bound(&mut self, target: TypeId, bound: &BoundInstance) -> bool {
        let Some(TypeData::GenericParam { owner, index, .. }) = self.types.lookup(target).cloned()
        else {
            return false;
        };
        if owner.is_none() {
            return false;
        }
        let owner_params = self.generic_param_types(owner);
        let env = self.generic_env_for(owner, &owner_params);
        self.push_generic_env(env);
        let all_bounds = self.resolve_param_bounds(owner, self.symbols.file_scope());
        self.pop_generic_env();
        let Some(own_bounds) = all_bounds.get(index as usize) else {
            return false;
        };
        own_bounds.iter().any(|own| {
            own.contract == bound.contract
                && own.args.len() == bound.args.len()
                && own
                    .args
                    .iter()
                    .zip(&bound.args)
                    .all(|(&a, &b)| self.contract_types_equal(a, b))
        })
    }
}

/// A method visible on a type during satisfaction checking.
struct MethodCandidate {
    params: Vec<TypeId>,
    result: TypeId,
    attrs: FieldAttrs,
    is_public: bool,
    is_async: bool,
}
