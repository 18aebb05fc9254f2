//! Entrypoint validation.
//!
//! Functions flagged as entrypoints are called by the runtime, not by
//! user code, so their signatures carry extra obligations. The argument
//! mode decides how parameters are filled: `None` forbids parameters
//! without defaults, `Argv`/`Stdin` require each undefaulted parameter
//! type to be parseable via a `from_str` function. The return type must
//! convert to a process exit code.

use crate::context::Checker;
use crate::intern::{Nominal, NumericKind, TypeData, TypeId};
use rill_ast::{EntryMode, FunctionDecl, ItemId, ItemKind};
use rill_binder::{SymbolFlags, SymbolKind};
use rill_common::Code;

impl<'a> Checker<'a> {
    pub(crate) fn check_entrypoints(&mut self) {
        let order: Vec<ItemId> = self.ast.item_order.clone();
        for &item in &order {
            let ItemKind::Function(decl) = &self.ast.item(item).kind else {
                continue;
            };
            let Some(symbol) = self.symbols.item_symbol(item) else {
                continue;
            };
            if !self
                .symbols
                .symbol(symbol)
                .flags
                .contains(SymbolFlags::ENTRYPOINT)
            {
                continue;
            }
            self.check_entrypoint(symbol, decl);
        }
    }

    fn check_entrypoint(&mut self, symbol: rill_binder::SymbolId, decl: &FunctionDecl) {
        let mode = self
            .symbols
            .symbol(symbol)
            .entry
            .or(decl.entry)
            .unwrap_or(self.options.default_entry_mode);
        let Some(signature) = self.signatures.get(&symbol).cloned() else {
            return;
        };

        for (param, ast_param) in signature.params.iter().zip(&decl.params) {
            if param.has_default {
                continue;
            }
            let param_name = self.name(param.name).to_string();
            match mode {
                EntryMode::None => {
                    self.error(
                        Code::EntrypointNoModeRequiresNoArgs,
                        ast_param.span,
                        format!(
                            "entrypoint without an argument mode cannot take `{param_name}` without a default"
                        ),
                    );
                }
                EntryMode::Argv => {
                    if !self.has_from_str(param.ty) {
                        let ty_name = self.ty(param.ty);
                        self.error(
                            Code::EntrypointParamNoFromArgv,
                            ast_param.span,
                            format!(
                                "parameter `{param_name}` of type `{ty_name}` cannot be parsed from argv: no `from_str` is visible"
                            ),
                        );
                    }
                }
                EntryMode::Stdin => {
                    if !self.has_from_str(param.ty) {
                        let ty_name = self.ty(param.ty);
                        self.error(
                            Code::EntrypointParamNoFromStdin,
                            ast_param.span,
                            format!(
                                "parameter `{param_name}` of type `{ty_name}` cannot be parsed from stdin: no `from_str` is visible"
                            ),
                        );
                    }
                }
            }
        }

        if !self.entry_return_convertible(signature.result) {
            let ty_name = self.ty(signature.result);
            let span = self.symbols.symbol(symbol).span;
            self.error(
                Code::EntrypointReturnNotConvertible,
                span,
                format!("entrypoint return type `{ty_name}` does not convert to an exit code"),
            );
        }
    }

    /// A visible `from_str(s: &string) -> Result<T, _>` for `T`, in this
    /// module or any import.
    fn has_from_str(&mut self, ty: TypeId) -> bool {
        let from_str = self.names.from_str;
        let candidates: Vec<rill_binder::SymbolId> = self
            .symbols
            .symbol_ids()
            .filter(|&id| {
                let sym = self.symbols.symbol(id);
                sym.kind == SymbolKind::Function && sym.name == from_str
            })
            .collect();
        for candidate in candidates {
            let Some(signature) = self.signatures.get(&candidate) else {
                continue;
            };
            let [param] = signature.params.as_slice() else {
                continue;
            };
            let param_ok = matches!(
                self.types.lookup(self.types.resolve_alias(param.ty)),
                Some(TypeData::Reference {
                    inner: TypeId::STRING,
                    mutable: false,
                })
            );
            if !param_ok {
                continue;
            }
            let result = self.types.resolve_alias(signature.result);
            if let Some(TypeData::Union(Nominal { name, args, .. })) = self.types.lookup(result) {
                if *name == self.names.result
                    && args
                        .first()
                        .is_some_and(|&ok_ty| self.contract_types_equal(ok_ty, ty))
                {
                    return true;
                }
            }
        }
        false
    }

    /// `nothing`, `int`, `Option`/`Result`, or a type with a
    /// `__to(self, int) -> int` conversion.
    fn entry_return_convertible(&mut self, result: TypeId) -> bool {
        if result.is_none() {
            return true;
        }
        let resolved = self.types.resolve_alias(result);
        if resolved == TypeId::NOTHING || resolved == TypeId::UNIT {
            return true;
        }
        if matches!(self.types.numeric(resolved), Some((NumericKind::Int, _))) {
            return true;
        }
        if let Some(TypeData::Union(Nominal { name, symbol, .. })) = self.types.lookup(resolved) {
            if symbol.is_none() && (*name == self.names.option || *name == self.names.result) {
                return true;
            }
        }
        let keys = self.receiver_keys(resolved);
        for key in &keys {
            let has_exit_to = self
                .magic
                .methods_on(key, "__to")
                .iter()
                .any(|m| m.signature.params.len() == 2 && m.signature.params[1] == "int");
            if has_exit_to {
                return true;
            }
        }
        false
    }
}
