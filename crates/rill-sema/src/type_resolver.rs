//! Type expression resolution.
//!
//! Maps AST type expressions to interned `TypeId`s under the current
//! generic parameter environment. Results cache by
//! `(type_expr, scope, env_id)`; the env id changes on every push of type
//! parameters, so one instantiation's entries never serve another.
//!
//! Unknown names yield `TypeId::NONE` plus one `SemaUnresolvedSymbol`;
//! dependent failures propagate the sentinel silently.

use crate::context::Checker;
use crate::intern::{TypeData, TypeId};
use rill_ast::{TypeExprId, TypeExprKind};
use rill_binder::{ScopeId, SymbolKind};
use rill_common::{Atom, Code, Span};

/// Built-in primitive type names.
fn builtin_primitive(name: &str) -> Option<TypeId> {
    Some(match name {
        "int" => TypeId::INT,
        "uint" => TypeId::UINT,
        "float" => TypeId::FLOAT,
        "bool" => TypeId::BOOL,
        "string" => TypeId::STRING,
        "nothing" => TypeId::NOTHING,
        "unit" => TypeId::UNIT,
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
        _ => return None,
    })
}

impl<'a> Checker<'a> {
    /// Resolve a type expression in `scope`, with caching.
    pub(crate) fn resolve_type(&mut self, id: TypeExprId, scope: ScopeId) -> TypeId {
        let key = (id, scope, self.current_env_id());
        if let Some(&cached) = self.resolve_cache.get(&key) {
            return cached;
        }
        let resolved = self.resolve_type_uncached(id, scope);
        self.resolve_cache.insert(key, resolved);
        resolved
    }

    fn resolve_type_uncached(&mut self, id: TypeExprId, scope: ScopeId) -> TypeId {
        let node = self.ast.type_expr(id);
        let span = node.span;
        match &node.kind {
            TypeExprKind::Path { segments, args } => {
                self.resolve_path_type(segments, args, span, scope)
            }
            TypeExprKind::Reference { mutable, inner } => {
                let inner_ty = self.resolve_type(*inner, scope);
                if inner_ty.is_none() {
                    return TypeId::NONE;
                }
                self.types.reference(inner_ty, *mutable)
            }
            TypeExprKind::Own { inner } => {
                let inner_ty = self.resolve_type(*inner, scope);
                if inner_ty.is_none() {
                    return TypeId::NONE;
                }
                self.types.own(inner_ty)
            }
            TypeExprKind::Pointer { inner } => {
                let inner_ty = self.resolve_type(*inner, scope);
                if inner_ty.is_none() {
                    return TypeId::NONE;
                }
                if !self.options.allow_raw_pointers {
                    self.error(
                        Code::RawPointerNotAllowed,
                        span,
                        "raw pointer types are not allowed here",
                    );
                }
                self.types.pointer(inner_ty)
            }
            TypeExprKind::Array { elem, len } => {
                let elem_ty = self.resolve_type(*elem, scope);
                if elem_ty.is_none() {
                    return TypeId::NONE;
                }
                match len {
                    None => self.types.array(elem_ty, None),
                    Some(len_expr) => match self.eval_const_index(*len_expr) {
                        Some(value) => {
                            let len_ty = self.types.const_value(value);
                            self.types.array(elem_ty, Some(len_ty))
                        }
                        None => {
                            let len_span = self.ast.expr_span(*len_expr);
                            self.error(
                                Code::ConstNotConstant,
                                len_span,
                                "array length must be a constant expression",
                            );
                            TypeId::NONE
                        }
                    },
                }
            }
            TypeExprKind::Optional { inner } => {
                let inner_ty = self.resolve_type(*inner, scope);
                if inner_ty.is_none() {
                    return TypeId::NONE;
                }
                self.option_type(inner_ty)
            }
            TypeExprKind::Errorable { ok, err } => {
                let ok_ty = self.resolve_type(*ok, scope);
                if ok_ty.is_none() {
                    return TypeId::NONE;
                }
                let err_ty = match err {
                    Some(e) => {
                        let t = self.resolve_type(*e, scope);
                        if t.is_none() {
                            return TypeId::NONE;
                        }
                        t
                    }
                    None => self.default_error_type(),
                };
                self.result_type(ok_ty, err_ty)
            }
            TypeExprKind::Tuple(elems) => {
                let mut tys = Vec::with_capacity(elems.len());
                for &elem in elems {
                    let t = self.resolve_type(elem, scope);
                    if t.is_none() {
                        return TypeId::NONE;
                    }
                    tys.push(t);
                }
                self.types.tuple(tys)
            }
            TypeExprKind::Fn { params, result } => {
                let mut param_tys = Vec::with_capacity(params.len());
                for &param in params {
                    let t = self.resolve_type(param, scope);
                    if t.is_none() {
                        return TypeId::NONE;
                    }
                    param_tys.push(t);
                }
                let result_ty = match result {
                    Some(r) => {
                        let t = self.resolve_type(*r, scope);
                        if t.is_none() {
                            return TypeId::NONE;
                        }
                        t
                    }
                    None => TypeId::UNIT,
                };
                self.types.function(param_tys, result_ty)
            }
            TypeExprKind::ConstInt(value) => self.types.const_value(*value),
        }
    }

    fn resolve_path_type(
        &mut self,
        segments: &[Atom],
        args: &[TypeExprId],
        span: Span,
        scope: ScopeId,
    ) -> TypeId {
        match segments {
            [name] => self.resolve_single_name(*name, args, span, scope),
            [module, name] => self.resolve_qualified_name(*module, *name, args, span, scope),
            _ => {
                self.error(Code::UnresolvedSymbol, span, "unsupported type path depth");
                TypeId::NONE
            }
        }
    }

    fn resolve_single_name(
        &mut self,
        name: Atom,
        args: &[TypeExprId],
        span: Span,
        scope: ScopeId,
    ) -> TypeId {
        // In-scope generic parameter.
        if let Some(param) = self.lookup_generic_param(name) {
            if !args.is_empty() {
                let display = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("type parameter `{display}` takes no type arguments"),
                );
            }
            return param;
        }

        // Built-in primitive.
        if let Some(prim) = builtin_primitive(self.name(name)) {
            if !args.is_empty() {
                let display = self.name(name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("`{display}` takes no type arguments"),
                );
                return TypeId::NONE;
            }
            return prim;
        }

        // Option / Result / Task / Error are recognized before user lookup.
        if name == self.names.option {
            let [payload] = args else {
                self.error(Code::TypeMismatch, span, "`Option` takes one type argument");
                return TypeId::NONE;
            };
            let payload_ty = self.resolve_type(*payload, scope);
            if payload_ty.is_none() {
                return TypeId::NONE;
            }
            return self.option_type(payload_ty);
        }
        if name == self.names.result {
            let (ok, err) = match args {
                [ok] => (*ok, None),
                [ok, err] => (*ok, Some(*err)),
                _ => {
                    self.error(
                        Code::TypeMismatch,
                        span,
                        "`Result` takes one or two type arguments",
                    );
                    return TypeId::NONE;
                }
            };
            let ok_ty = self.resolve_type(ok, scope);
            if ok_ty.is_none() {
                return TypeId::NONE;
            }
            let err_ty = match err {
                Some(e) => {
                    let t = self.resolve_type(e, scope);
                    if t.is_none() {
                        return TypeId::NONE;
                    }
                    t
                }
                None => self.default_error_type(),
            };
            return self.result_type(ok_ty, err_ty);
        }
        if name == self.names.task {
            let [payload] = args else {
                self.error(Code::TypeMismatch, span, "`Task` takes one type argument");
                return TypeId::NONE;
            };
            let payload_ty = self.resolve_type(*payload, scope);
            if payload_ty.is_none() {
                return TypeId::NONE;
            }
            return self.task_type(payload_ty);
        }
        if name == self.names.error && args.is_empty() {
            return self.default_error_type();
        }

        // User-defined or imported type symbol.
        let Some(symbol) = self.symbols.lookup(scope, name) else {
            let display = self.name(name).to_string();
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("unknown type `{display}`"),
            );
            return TypeId::NONE;
        };
        self.resolve_type_symbol(symbol, args, span, scope)
    }

    fn resolve_qualified_name(
        &mut self,
        module: Atom,
        name: Atom,
        args: &[TypeExprId],
        span: Span,
        scope: ScopeId,
    ) -> TypeId {
        let Some(module_sym) = self.symbols.lookup(scope, module) else {
            let display = self.name(module).to_string();
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("unknown module `{display}`"),
            );
            return TypeId::NONE;
        };
        let module_symbol = self.symbols.symbol(module_sym);
        if !matches!(module_symbol.kind, SymbolKind::Module | SymbolKind::Import) {
            let display = self.name(module).to_string();
            self.error(
                Code::UnresolvedSymbol,
                span,
                format!("`{display}` is not a module"),
            );
            return TypeId::NONE;
        }
        let Some(path) = module_symbol.module_path else {
            return TypeId::NONE;
        };
        let Some(target) = self.exports.lookup(path, name) else {
            let module_name = self.name(module).to_string();
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
                format!("`{member}` is not public"),
            );
            return TypeId::NONE;
        }
        self.resolve_type_symbol(target, args, span, scope)
    }

    fn resolve_type_symbol(
        &mut self,
        symbol: rill_binder::SymbolId,
        args: &[TypeExprId],
        span: Span,
        scope: ScopeId,
    ) -> TypeId {
        let kind = self.symbols.symbol(symbol).kind;
        match kind {
            SymbolKind::Type => {
                let mut arg_tys = Vec::with_capacity(args.len());
                for &arg in args {
                    let t = self.resolve_type(arg, scope);
                    if t.is_none() {
                        return TypeId::NONE;
                    }
                    arg_tys.push(t);
                }
                self.instantiate_named(symbol, arg_tys, span)
            }
            SymbolKind::Contract => {
                let display = self.name(self.symbols.symbol(symbol).name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("contract `{display}` cannot be used as a type"),
                );
                TypeId::NONE
            }
            _ => {
                let display = self.name(self.symbols.symbol(symbol).name).to_string();
                self.error(
                    Code::UnresolvedSymbol,
                    span,
                    format!("`{display}` is not a type"),
                );
                TypeId::NONE
            }
        }
    }

    /// Check that const generic parameters got `Const<_>` arguments.
    pub(crate) fn check_const_args(
        &mut self,
        symbol: rill_binder::SymbolId,
        args: &[TypeId],
        span: Span,
    ) -> bool {
        let type_params = self.symbols.symbol(symbol).type_params.clone();
        let mut ok = true;
        for (param, &arg) in type_params.iter().zip(args) {
            let is_const_arg = matches!(self.types.lookup(arg), Some(TypeData::Const { .. }));
            if param.is_const && !is_const_arg {
                let param_name = self.name(param.name).to_string();
                let arg_name = self.ty(arg);
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!(
                        "const parameter `{param_name}` requires a constant argument, found `{arg_name}`"
                    ),
                );
                ok = false;
            } else if !param.is_const && is_const_arg {
                let param_name = self.name(param.name).to_string();
                self.error(
                    Code::TypeMismatch,
                    span,
                    format!("type parameter `{param_name}` cannot take a constant argument"),
                );
                ok = false;
            }
        }
        ok
    }
}
