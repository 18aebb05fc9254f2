//! Type and function declaration processing.
//!
//! Declarations populate in two passes so forward references work: pass
//! one registers a shell for every nominal type, pass two resolves bodies
//! (struct fields, alias targets, union members, contract requirement
//! sets, function signatures, extern blocks) in file scope under each
//! declaration's own generic environment.
//!
//! Generic instantiation caches by `(symbol, args)`. The instance enters
//! the cache before its body populates, so self-referential instances
//! resolve to the in-flight shell instead of recursing.

use crate::context::{Checker, ParamSig, Signature};
use crate::intern::{FieldAttrs, FieldInfo, TypeData, TypeId, UnionVariant};
use crate::magic_methods::{MagicMethod, MagicSignature};
use indexmap::IndexMap;
use rill_ast::{
    AliasDecl, AttrArg, ExternBlock, FieldDef, FunctionDecl, ItemId, ItemKind, StructDecl,
    UnionDecl, UnionMember,
};
use rill_binder::{SymbolId, SymbolKind};
use rill_common::limits::MAX_INSTANTIATION_DEPTH;
use rill_common::{Atom, Code, Span};
use rustc_hash::FxHashMap;
use tracing::trace;

impl<'a> Checker<'a> {
    /// Process every declaration: register shells, then populate bodies.
    pub(crate) fn declare_items(&mut self) {
        let order: Vec<ItemId> = self.ast.item_order.clone();
        for &item in &order {
            self.register_item_shell(item);
        }
        for &item in &order {
            self.populate_item(item);
        }
    }

    // -------------------------------------------------------------------------
    // Pass 1: shells
    // -------------------------------------------------------------------------

    fn register_item_shell(&mut self, item: ItemId) {
        let Some(symbol) = self.symbols.item_symbol(item) else {
            return;
        };
        match &self.ast.item(item).kind {
            ItemKind::Struct(decl) => {
                let params = self.generic_param_types(symbol);
                let shell = self.types.register_struct(decl.name, symbol, params.clone());
                self.finish_shell(symbol, params, shell);
                if decl.attrs.iter().any(|a| a.name == self.names.copy) {
                    self.copy_types.insert(shell);
                }
            }
            ItemKind::Union(decl) => {
                let params = self.generic_param_types(symbol);
                let shell = self.types.register_union(decl.name, symbol, params.clone());
                self.finish_shell(symbol, params, shell);
            }
            ItemKind::Alias(decl) => {
                let params = self.generic_param_types(symbol);
                let shell = self.types.register_alias(decl.name, symbol, params.clone());
                self.finish_shell(symbol, params, shell);
            }
            _ => {}
        }
    }

    fn finish_shell(&mut self, symbol: SymbolId, params: Vec<TypeId>, shell: TypeId) {
        self.symbol_types.insert(symbol, shell);
        self.instance_cache.insert((symbol, params), shell);
        self.nominal_types.push(shell);
    }

    /// Interned `GenericParam` types for a declaration's parameters.
    pub(crate) fn generic_param_types(&mut self, symbol: SymbolId) -> Vec<TypeId> {
        let params = self.symbols.symbol(symbol).type_params.clone();
        params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                self.types
                    .register_type_param(p.name, symbol, i as u32, p.is_const)
            })
            .collect()
    }

    /// Environment mapping a declaration's parameter names to `args`.
    pub(crate) fn generic_env_for(
        &self,
        symbol: SymbolId,
        args: &[TypeId],
    ) -> FxHashMap<Atom, TypeId> {
        self.symbols
            .symbol(symbol)
            .type_params
            .iter()
            .zip(args)
            .map(|(p, &a)| (p.name, a))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Pass 2: bodies
    // -------------------------------------------------------------------------

    fn populate_item(&mut self, item: ItemId) {
        let Some(symbol) = self.symbols.item_symbol(item) else {
            return;
        };
        match &self.ast.item(item).kind {
            ItemKind::Struct(decl) => self.populate_struct(symbol, decl),
            ItemKind::Alias(decl) => self.populate_alias(symbol, decl),
            ItemKind::Union(decl) => self.populate_union(symbol, decl),
            ItemKind::Contract(decl) => self.populate_contract(symbol, decl),
            ItemKind::Function(decl) => self.populate_function(symbol, decl),
            ItemKind::Const(_) => {
                self.ensure_const_evaluated(symbol);
            }
            ItemKind::Extern(block) => self.populate_extern(block),
            ItemKind::Tag(_) | ItemKind::Import(_) => {}
        }
    }

    fn populate_struct(&mut self, symbol: SymbolId, decl: &StructDecl) {
        let shell = self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
        if shell.is_none() {
            return;
        }
        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);
        let fields = self.resolve_field_defs(&decl.fields);
        self.pop_generic_env();
        self.validate_field_attrs(&fields, &decl.fields);
        self.types.set_struct_fields(shell, fields);
    }

    fn populate_alias(&mut self, symbol: SymbolId, decl: &AliasDecl) {
        let shell = self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
        if shell.is_none() {
            return;
        }
        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);
        let target = self.resolve_type(decl.target, self.symbols.file_scope());
        self.pop_generic_env();
        if target.is_none() {
            let name = self.name(decl.name).to_string();
            let span = self.ast.type_expr(decl.target).span;
            self.error(
                Code::TypeMismatch,
                span,
                format!("alias `{name}` has no resolvable target"),
            );
            return;
        }
        self.types.set_alias_target(shell, target);
    }

    fn populate_union(&mut self, symbol: SymbolId, decl: &UnionDecl) {
        let shell = self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
        if shell.is_none() {
            return;
        }
        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);
        let members = self.resolve_union_members(&decl.members);
        self.pop_generic_env();

        let has_discriminant = members
            .iter()
            .any(|m| matches!(m, UnionVariant::Tag { .. } | UnionVariant::Nothing));
        if !has_discriminant && !members.is_empty() {
            let name = self.name(decl.name).to_string();
            let span = self.symbols.symbol(symbol).span;
            self.error(
                Code::TypeMismatch,
                span,
                format!("union `{name}` of plain value types needs a tag or `nothing` member"),
            );
        }
        self.types.set_union_members(shell, members);
    }

    fn resolve_union_members(&mut self, members: &[UnionMember]) -> Vec<UnionVariant> {
        let file_scope = self.symbols.file_scope();
        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            match member {
                UnionMember::Type(ty) => {
                    let t = self.resolve_type(*ty, file_scope);
                    if !t.is_none() {
                        resolved.push(UnionVariant::Type(t));
                    }
                }
                UnionMember::Nothing(_) => resolved.push(UnionVariant::Nothing),
                UnionMember::Tag { name, args, span } => {
                    let tag_symbol = match self.symbols.lookup(file_scope, *name) {
                        Some(s) if self.symbols.symbol(s).kind == SymbolKind::Tag => s,
                        _ => {
                            let display = self.name(*name).to_string();
                            self.error(
                                Code::UnresolvedSymbol,
                                *span,
                                format!("unknown tag `{display}`"),
                            );
                            continue;
                        }
                    };
                    if let Some(item) = self.symbols.symbol(tag_symbol).item {
                        if let ItemKind::Tag(tag) = &self.ast.item(item).kind {
                            if tag.arity as usize != args.len() {
                                let display = self.name(*name).to_string();
                                self.error(
                                    Code::TypeMismatch,
                                    *span,
                                    format!(
                                        "tag `{display}` takes {} payload(s), found {}",
                                        tag.arity,
                                        args.len()
                                    ),
                                );
                                continue;
                            }
                        }
                    }
                    let mut arg_tys = Vec::with_capacity(args.len());
                    let mut failed = false;
                    for &arg in args {
                        let t = self.resolve_type(arg, file_scope);
                        if t.is_none() {
                            failed = true;
                            break;
                        }
                        arg_tys.push(t);
                    }
                    if failed {
                        continue;
                    }
                    resolved.push(UnionVariant::Tag {
                        name: *name,
                        symbol: tag_symbol,
                        args: arg_tys,
                    });
                }
            }
        }
        resolved
    }

    fn populate_function(&mut self, symbol: SymbolId, decl: &FunctionDecl) {
        let file_scope = self.symbols.file_scope();
        let params = self.generic_param_types(symbol);
        let env = self.generic_env_for(symbol, &params);
        self.push_generic_env(env);

        let mut param_sigs = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = self.resolve_type(param.ty, file_scope);
            param_sigs.push(ParamSig {
                name: param.name,
                ty,
                has_default: param.default.is_some(),
                span: param.span,
            });
        }
        let result = match decl.result {
            Some(r) => self.resolve_type(r, file_scope),
            None => TypeId::UNIT,
        };
        self.pop_generic_env();

        let signature = Signature {
            params: param_sigs,
            result,
            variadic: decl.variadic,
            is_async: decl.is_async,
        };
        let param_tys: Vec<TypeId> = signature.params.iter().map(|p| p.ty).collect();
        let fn_type = self.types.function(param_tys, result);
        self.symbol_types.insert(symbol, fn_type);

        // Wire magic methods (`__add`, `__to`, ...) into the index under
        // their receiver's canonical key.
        let fn_name = self.name(decl.name).to_string();
        if fn_name.starts_with("__") {
            if let Some(first) = signature.params.first() {
                if !first.ty.is_none() {
                    let receiver = self.types.type_key(first.ty, self.strings);
                    let key_params: Vec<String> = signature
                        .params
                        .iter()
                        .map(|p| self.types.type_key(p.ty, self.strings))
                        .collect();
                    let result_key = self.types.type_key(result, self.strings);
                    trace!(receiver = %receiver, name = %fn_name, "registering magic method");
                    self.magic.add_user(
                        receiver,
                        &fn_name,
                        MagicMethod {
                            signature: MagicSignature {
                                params: key_params,
                                result: result_key,
                            },
                            symbol,
                        },
                    );
                }
            }
        }

        self.signatures.insert(symbol, signature);
    }

    fn populate_extern(&mut self, block: &ExternBlock) {
        let target = self.resolve_type(block.target, self.symbols.file_scope());
        if target.is_none() {
            return;
        }
        let resolved_target = self.types.resolve_alias(target);
        let mut fields: IndexMap<Atom, FieldInfo> = IndexMap::new();
        for field in &block.fields {
            let ty = self.resolve_type(field.ty, self.symbols.file_scope());
            for attr in &field.attrs {
                let known = attr.name == self.names.readonly
                    || attr.name == self.names.atomic
                    || attr.name == self.names.guarded_by
                    || attr.name == self.names.align
                    || attr.name == self.names.packed;
                if !known {
                    let attr_name = self.name(attr.name).to_string();
                    self.error(
                        Code::ExternUnknownAttr,
                        attr.span,
                        format!("unknown attribute `@{attr_name}` in extern block"),
                    );
                }
            }
            if fields.contains_key(&field.name) {
                let field_name = self.name(field.name).to_string();
                let prev_span = block
                    .fields
                    .iter()
                    .find(|f| f.name == field.name)
                    .map_or(field.span, |f| f.span);
                self.report(
                    rill_common::Diagnostic::new(
                        Code::ExternDuplicateField,
                        field.span,
                        format!("duplicate extern field `{field_name}`"),
                    )
                    .with_related(prev_span, format!("previous declaration of `{field_name}` is here")),
                );
                continue;
            }
            fields.insert(
                field.name,
                FieldInfo {
                    ty,
                    attrs: FieldAttrs::from_ast(&field.attrs),
                },
            );
        }
        self.extern_fields
            .entry(resolved_target)
            .or_default()
            .extend(fields);
    }

    // -------------------------------------------------------------------------
    // Field resolution and attribute validation
    // -------------------------------------------------------------------------

    pub(crate) fn resolve_field_defs(&mut self, defs: &[FieldDef]) -> IndexMap<Atom, FieldInfo> {
        let file_scope = self.symbols.file_scope();
        let mut fields = IndexMap::with_capacity(defs.len());
        for def in defs {
            let ty = self.resolve_type(def.ty, file_scope);
            fields.insert(
                def.name,
                FieldInfo {
                    ty,
                    attrs: FieldAttrs::from_ast(&def.attrs),
                },
            );
        }
        fields
    }

    fn validate_field_attrs(&mut self, fields: &IndexMap<Atom, FieldInfo>, defs: &[FieldDef]) {
        for def in defs {
            let Some(info) = fields.get(&def.name) else {
                continue;
            };
            let info = info.clone();
            if info.attrs.has(self.names.atomic) {
                let atomicable = matches!(
                    self.types.lookup(self.types.resolve_alias(info.ty)),
                    Some(
                        TypeData::Int { .. } | TypeData::Uint { .. } | TypeData::Bool
                    )
                );
                if !atomicable {
                    let ty_name = self.ty(info.ty);
                    self.error(
                        Code::AttrAtomicInvalidType,
                        def.span,
                        format!("`@atomic` requires an integer or bool field, found `{ty_name}`"),
                    );
                }
            }
            if let Some(attr) = info.attrs.get(self.names.guarded_by) {
                let Some(AttrArg::Str(lock_name)) = attr.args.first().cloned() else {
                    self.error(
                        Code::AttrGuardedByNotField,
                        def.span,
                        "`@guarded_by` expects a field name string",
                    );
                    continue;
                };
                let Some(lock_field) = fields.get(&lock_name) else {
                    let lock = self.name(lock_name).to_string();
                    self.error(
                        Code::AttrGuardedByNotField,
                        def.span,
                        format!("`@guarded_by(\"{lock}\")` names no field of this type"),
                    );
                    continue;
                };
                let key = self.types.type_key(lock_field.ty, self.strings);
                if key != "Lock" && !key.starts_with("Lock<") {
                    let lock = self.name(lock_name).to_string();
                    self.error(
                        Code::AttrGuardedByNotLock,
                        def.span,
                        format!("`@guarded_by(\"{lock}\")` names a non-lock field"),
                    );
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Generic instantiation
    // -------------------------------------------------------------------------

    /// Instantiate a named type with concrete arguments.
    pub(crate) fn instantiate_named(
        &mut self,
        symbol: SymbolId,
        args: Vec<TypeId>,
        span: Span,
    ) -> TypeId {
        let param_count = self.symbols.symbol(symbol).type_params.len();
        if args.len() != param_count {
            let name = self.name(self.symbols.symbol(symbol).name).to_string();
            self.error(
                Code::TypeMismatch,
                span,
                format!(
                    "`{name}` takes {param_count} type argument(s), found {}",
                    args.len()
                ),
            );
            return TypeId::NONE;
        }
        if !self.check_const_args(symbol, &args, span) {
            return TypeId::NONE;
        }
        if param_count == 0 {
            return self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE);
        }

        let key = (symbol, args.clone());
        if let Some(&id) = self.instance_cache.get(&key) {
            return id;
        }
        if self.instantiation_depth >= MAX_INSTANTIATION_DEPTH {
            self.error(
                Code::TypeMismatch,
                span,
                "type instantiation is too deep and possibly infinite",
            );
            return TypeId::NONE;
        }

        let Some(item) = self.symbols.symbol(symbol).item else {
            return TypeId::NONE;
        };
        self.instantiation_depth += 1;
        let id = match &self.ast.item(item).kind {
            ItemKind::Struct(decl) => {
                let id = self.types.register_struct(decl.name, symbol, args.clone());
                self.instance_cache.insert(key, id);
                self.nominal_types.push(id);
                if self.copy_types.contains(
                    &self.symbol_types.get(&symbol).copied().unwrap_or(TypeId::NONE),
                ) {
                    self.copy_types.insert(id);
                }
                let env = self.generic_env_for(symbol, &args);
                self.push_generic_env(env);
                let fields = self.resolve_field_defs(&decl.fields);
                self.pop_generic_env();
                self.types.set_struct_fields(id, fields);
                id
            }
            ItemKind::Union(decl) => {
                let id = self.types.register_union(decl.name, symbol, args.clone());
                self.instance_cache.insert(key, id);
                self.nominal_types.push(id);
                let env = self.generic_env_for(symbol, &args);
                self.push_generic_env(env);
                let members = self.resolve_union_members(&decl.members);
                self.pop_generic_env();
                self.types.set_union_members(id, members);
                id
            }
            ItemKind::Alias(decl) => {
                let id = self.types.register_alias(decl.name, symbol, args.clone());
                self.instance_cache.insert(key, id);
                self.nominal_types.push(id);
                let env = self.generic_env_for(symbol, &args);
                self.push_generic_env(env);
                let target = self.resolve_type(decl.target, self.symbols.file_scope());
                self.pop_generic_env();
                if !target.is_none() {
                    self.types.set_alias_target(id, target);
                }
                id
            }
            _ => TypeId::NONE,
        };
        self.instantiation_depth -= 1;
        id
    }
}
