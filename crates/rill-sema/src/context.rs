//! Checker context.
//!
//! `Checker` owns every mutable table of the analysis: the type interner,
//! the borrow/move/task trackers, the sema-side symbol data, and the
//! per-walk stacks (scopes, return contexts, generic environments). The
//! logic lives in the sibling modules, each extending `Checker` with the
//! methods of one component.

use crate::assignability::Conversion;
use crate::borrow_checker::{BorrowId, BorrowTable};
use crate::const_eval::ConstState;
use crate::contract_checker::ContractSpec;
use crate::intern::{Nominal, TypeData, TypeId, TypeInterner, UnionVariant};
use crate::layout_checker::LayoutEngine;
use crate::magic_methods::MagicIndex;
use crate::move_checker::MoveTracker;
use crate::task_checker::TaskTracker;
use rill_ast::{EntryMode, ExprId, Module, TypeExprId};
use rill_binder::{ExportMap, ScopeId, SymbolId, SymbolTable};
use rill_common::{Atom, Code, Diagnostic, DiagnosticSink, Span, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Options and cancellation
// =============================================================================

/// Configuration the embedding driver passes to [`crate::check`].
#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Permit `*T` types in user code. Off by default; violations emit
    /// `SemaRawPointerNotAllowed`.
    pub allow_raw_pointers: bool,
    /// Entry mode assumed for `entry` functions without an explicit mode.
    pub default_entry_mode: EntryMode,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            allow_raw_pointers: false,
            default_entry_mode: EntryMode::None,
        }
    }
}

/// Cooperative cancellation. Consulted between top-level item walks only;
/// a single item always completes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// A resolved function signature.
#[derive(Clone, Debug)]
pub struct Signature {
    pub params: Vec<ParamSig>,
    pub result: TypeId,
    pub variadic: bool,
    pub is_async: bool,
}

#[derive(Clone, Debug)]
pub struct ParamSig {
    pub name: Atom,
    pub ty: TypeId,
    pub has_default: bool,
    pub span: Span,
}

impl Signature {
    /// Number of parameters that must be supplied by the caller.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| !p.has_default).count()
    }
}

// =============================================================================
// Walk state
// =============================================================================

/// Where `return` statements deliver their value.
#[derive(Clone, Debug)]
pub enum ReturnContext {
    /// Normal function body: validate against the declared result type.
    Declared { expected: TypeId, span: Span },
    /// Async block: collect returned payload types for later unification.
    Collector { collected: Vec<TypeId> },
}

/// The function whose body is being walked.
#[derive(Clone, Debug)]
pub struct CurrentFn {
    pub symbol: SymbolId,
    /// Ordered parameter symbols, for the trivial-recursion guard.
    pub params: Vec<SymbolId>,
}

/// Pre-interned atoms for well-known names.
#[derive(Clone, Debug)]
pub struct WellKnown {
    pub option: Atom,
    pub result: Atom,
    pub task: Atom,
    pub some: Atom,
    pub ok: Atom,
    pub err: Atom,
    pub error: Atom,
    pub readonly: Atom,
    pub atomic: Atom,
    pub guarded_by: Atom,
    pub align: Atom,
    pub packed: Atom,
    pub copy: Atom,
    pub from_str: Atom,
    pub lock: Atom,
    pub clone: Atom,
}

impl WellKnown {
    pub fn intern(strings: &mut StringInterner) -> Self {
        WellKnown {
            option: strings.intern("Option"),
            result: strings.intern("Result"),
            task: strings.intern("Task"),
            some: strings.intern("Some"),
            ok: strings.intern("Ok"),
            err: strings.intern("Err"),
            error: strings.intern("Error"),
            readonly: strings.intern("readonly"),
            atomic: strings.intern("atomic"),
            guarded_by: strings.intern("guarded_by"),
            align: strings.intern("align"),
            packed: strings.intern("packed"),
            copy: strings.intern("copy"),
            from_str: strings.intern("from_str"),
            lock: strings.intern("Lock"),
            clone: strings.intern("clone"),
        }
    }
}

// =============================================================================
// Checker
// =============================================================================

/// The semantic analyzer for one file.
pub struct Checker<'a> {
    pub(crate) ast: &'a Module,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) exports: &'a ExportMap,
    pub(crate) strings: &'a mut StringInterner,
    pub(crate) options: &'a CheckOptions,
    pub(crate) layout: &'a dyn LayoutEngine,
    pub(crate) sink: &'a mut dyn DiagnosticSink,

    pub(crate) types: TypeInterner,
    pub(crate) magic: MagicIndex,
    pub(crate) borrows: BorrowTable,
    pub(crate) moves: MoveTracker,
    pub(crate) tasks: TaskTracker,

    // Sema-side symbol data.
    pub(crate) symbol_types: FxHashMap<SymbolId, TypeId>,
    pub(crate) signatures: FxHashMap<SymbolId, Signature>,
    pub(crate) contract_specs: FxHashMap<SymbolId, ContractSpec>,
    pub(crate) const_states: FxHashMap<SymbolId, ConstState>,
    pub(crate) copy_types: FxHashSet<TypeId>,

    // Generic instance caches. Instances enter the cache before their
    // bodies populate, which doubles as the in-progress cycle guard.
    pub(crate) instance_cache: FxHashMap<(SymbolId, Vec<TypeId>), TypeId>,
    pub(crate) instantiation_depth: u32,
    pub(crate) builtin_instances: FxHashMap<(Atom, Vec<TypeId>), TypeId>,
    /// Foreign fields attached to a type by `extern` blocks.
    pub(crate) extern_fields: FxHashMap<TypeId, indexmap::IndexMap<Atom, crate::intern::FieldInfo>>,

    // Type resolution cache and generic environment stack.
    pub(crate) resolve_cache: FxHashMap<(TypeExprId, ScopeId, u32), TypeId>,
    pub(crate) generic_envs: Vec<(FxHashMap<Atom, TypeId>, u32)>,
    pub(crate) next_env_id: u32,

    // Walk state.
    pub(crate) scope_stack: Vec<ScopeId>,
    pub(crate) return_stack: Vec<ReturnContext>,
    pub(crate) current_fn: Option<CurrentFn>,
    pub(crate) expr_depth: u32,
    pub(crate) async_block_depth: u32,

    // Outputs.
    pub(crate) expr_types: FxHashMap<ExprId, TypeId>,
    pub(crate) expr_borrows: FxHashMap<ExprId, BorrowId>,
    pub(crate) implicit_conversions: FxHashMap<ExprId, Conversion>,
    pub(crate) magic_binary_symbols: FxHashMap<ExprId, SymbolId>,
    pub(crate) magic_unary_symbols: FxHashMap<ExprId, SymbolId>,

    pub(crate) names: WellKnown,
    /// Nominal instances for the layout post-pass, in registration order.
    pub(crate) nominal_types: Vec<TypeId>,
    pub(crate) error_struct: TypeId,
}

impl<'a> Checker<'a> {
    pub fn new(
        ast: &'a Module,
        symbols: &'a SymbolTable,
        exports: &'a ExportMap,
        strings: &'a mut StringInterner,
        layout: &'a dyn LayoutEngine,
        options: &'a CheckOptions,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let names = WellKnown::intern(strings);
        let mut types = TypeInterner::new();
        // The default error payload of `T!`: a built-in empty struct.
        let error_struct = types.register_struct(names.error, SymbolId::NONE, vec![]);
        types.set_struct_fields(error_struct, indexmap::IndexMap::new());

        Checker {
            ast,
            symbols,
            exports,
            strings,
            options,
            layout,
            sink,
            types,
            magic: MagicIndex::with_builtins(),
            borrows: BorrowTable::new(),
            moves: MoveTracker::new(),
            tasks: TaskTracker::new(),
            symbol_types: FxHashMap::default(),
            signatures: FxHashMap::default(),
            contract_specs: FxHashMap::default(),
            const_states: FxHashMap::default(),
            copy_types: FxHashSet::default(),
            instance_cache: FxHashMap::default(),
            instantiation_depth: 0,
            builtin_instances: FxHashMap::default(),
            extern_fields: FxHashMap::default(),
            resolve_cache: FxHashMap::default(),
            generic_envs: Vec::new(),
            next_env_id: 0,
            scope_stack: Vec::new(),
            return_stack: Vec::new(),
            current_fn: None,
            expr_depth: 0,
            async_block_depth: 0,
            expr_types: FxHashMap::default(),
            expr_borrows: FxHashMap::default(),
            implicit_conversions: FxHashMap::default(),
            magic_binary_symbols: FxHashMap::default(),
            magic_unary_symbols: FxHashMap::default(),
            names,
            nominal_types: vec![error_struct],
            error_struct,
        }
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    pub(crate) fn error(&mut self, code: Code, span: Span, message: impl Into<String>) {
        self.sink.report(Diagnostic::new(code, span, message));
    }

    /// Display form of a type for messages.
    pub(crate) fn ty(&self, id: TypeId) -> String {
        self.types.display(id, self.strings)
    }

    pub(crate) fn name(&self, atom: Atom) -> &str {
        self.strings.resolve(atom)
    }

    // -------------------------------------------------------------------------
    // Scopes
    // -------------------------------------------------------------------------

    pub(crate) fn current_scope(&self) -> ScopeId {
        *self
            .scope_stack
            .last()
            .unwrap_or(&self.symbols.file_scope())
    }

    pub(crate) fn push_scope(&mut self, scope: ScopeId) {
        self.scope_stack.push(scope);
    }

    /// Leave a scope: expire its borrows and report leaked tasks.
    pub(crate) fn pop_scope(&mut self) {
        let scope = self.current_scope();
        self.borrows.end_scope(scope);
        let leaked = self.tasks.end_scope(scope);
        for task in leaked {
            self.error(
                Code::TaskNotAwaited,
                task.span,
                "spawned task is neither awaited nor returned",
            );
        }
        self.scope_stack.pop();
    }

    // -------------------------------------------------------------------------
    // Generic environments
    // -------------------------------------------------------------------------

    /// Push a generic parameter environment; every push gets a fresh env
    /// id so resolver cache entries from one instantiation never leak into
    /// another.
    pub(crate) fn push_generic_env(&mut self, env: FxHashMap<Atom, TypeId>) {
        self.next_env_id += 1;
        self.generic_envs.push((env, self.next_env_id));
    }

    pub(crate) fn pop_generic_env(&mut self) {
        self.generic_envs.pop();
    }

    pub(crate) fn current_env_id(&self) -> u32 {
        self.generic_envs.last().map_or(0, |(_, id)| *id)
    }

    /// Resolve a name against the generic environment stack, innermost
    /// first.
    pub(crate) fn lookup_generic_param(&self, name: Atom) -> Option<TypeId> {
        self.generic_envs
            .iter()
            .rev()
            .find_map(|(env, _)| env.get(&name).copied())
    }

    // -------------------------------------------------------------------------
    // Built-in generic types
    // -------------------------------------------------------------------------

    fn builtin_union(
        &mut self,
        name: Atom,
        args: Vec<TypeId>,
        members: Vec<UnionVariant>,
    ) -> TypeId {
        let key = (name, args.clone());
        if let Some(&id) = self.builtin_instances.get(&key) {
            return id;
        }
        let id = self.types.register_union(name, SymbolId::NONE, args);
        self.types.set_union_members(id, members);
        self.builtin_instances.insert(key, id);
        self.nominal_types.push(id);
        id
    }

    /// `Option<T>` = `Some(T) | nothing`.
    pub(crate) fn option_type(&mut self, payload: TypeId) -> TypeId {
        let some = self.names.some;
        let name = self.names.option;
        self.builtin_union(
            name,
            vec![payload],
            vec![
                UnionVariant::Tag {
                    name: some,
                    symbol: SymbolId::NONE,
                    args: vec![payload],
                },
                UnionVariant::Nothing,
            ],
        )
    }

    /// `Result<T, E>` = `Ok(T) | Err(E)`.
    pub(crate) fn result_type(&mut self, ok: TypeId, err: TypeId) -> TypeId {
        let ok_name = self.names.ok;
        let err_name = self.names.err;
        let name = self.names.result;
        self.builtin_union(
            name,
            vec![ok, err],
            vec![
                UnionVariant::Tag {
                    name: ok_name,
                    symbol: SymbolId::NONE,
                    args: vec![ok],
                },
                UnionVariant::Tag {
                    name: err_name,
                    symbol: SymbolId::NONE,
                    args: vec![err],
                },
            ],
        )
    }

    /// The type of a tag constructor result: a single-member union named
    /// after the tag, so `Some(1)` is `Some<int>` until a union context
    /// upcasts it.
    pub(crate) fn tag_type(&mut self, name: Atom, symbol: SymbolId, args: Vec<TypeId>) -> TypeId {
        let key = (name, args.clone());
        if let Some(&id) = self.builtin_instances.get(&key) {
            return id;
        }
        let id = self.types.register_union(name, symbol, args.clone());
        self.types
            .set_union_members(id, vec![UnionVariant::Tag { name, symbol, args }]);
        self.builtin_instances.insert(key, id);
        self.nominal_types.push(id);
        id
    }

    /// `Task<T>`, the handle type produced by `spawn`.
    pub(crate) fn task_type(&mut self, payload: TypeId) -> TypeId {
        let key = (self.names.task, vec![payload]);
        if let Some(&id) = self.builtin_instances.get(&key) {
            return id;
        }
        let name = self.names.task;
        let id = self.types.register_struct(name, SymbolId::NONE, vec![payload]);
        self.types.set_struct_fields(id, indexmap::IndexMap::new());
        self.builtin_instances.insert(key, id);
        self.nominal_types.push(id);
        id
    }

    /// The payload of a `Task<T>`, if `id` is one.
    pub(crate) fn task_payload(&self, id: TypeId) -> Option<TypeId> {
        let resolved = self.types.resolve_alias(id);
        match self.types.lookup(resolved) {
            Some(TypeData::Struct(Nominal { name, args, .. }))
                if *name == self.names.task && args.len() == 1 =>
            {
                Some(args[0])
            }
            _ => None,
        }
    }

    /// Default error payload for `T!` without an explicit error type.
    pub(crate) fn default_error_type(&self) -> TypeId {
        self.error_struct
    }

    // -------------------------------------------------------------------------
    // Magic receiver keys
    // -------------------------------------------------------------------------

    /// Candidate receiver keys for magic lookup on `ty`: the type itself,
    /// its alias target, then structural variants.
    pub(crate) fn receiver_keys(&self, ty: TypeId) -> Vec<String> {
        let mut keys = Vec::with_capacity(3);
        let mut push = |keys: &mut Vec<String>, key: String| {
            if !keys.contains(&key) {
                keys.push(key);
            }
        };
        push(&mut keys, self.types.type_key(ty, self.strings));
        let resolved = self.types.resolve_alias(ty);
        if resolved != ty {
            push(&mut keys, self.types.type_key(resolved, self.strings));
        }
        match self.types.lookup(resolved) {
            Some(TypeData::Reference { inner, .. })
            | Some(TypeData::Own { inner })
            | Some(TypeData::Pointer { inner }) => {
                push(&mut keys, self.types.type_key(*inner, self.strings));
            }
            Some(TypeData::Array {
                elem,
                len: Some(_),
            }) => {
                let elem_key = self.types.type_key(*elem, self.strings);
                push(&mut keys, format!("Array<{elem_key}>"));
            }
            _ => {}
        }
        keys
    }

    /// Record the computed type of an expression. Written exactly once per
    /// expression.
    pub(crate) fn set_expr_type(&mut self, expr: ExprId, ty: TypeId) -> TypeId {
        self.expr_types.insert(expr, ty);
        ty
    }

    pub(crate) fn expr_type(&self, expr: ExprId) -> TypeId {
        self.expr_types.get(&expr).copied().unwrap_or(TypeId::NONE)
    }
}
