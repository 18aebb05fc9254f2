//! Scope tree and symbol table.

use crate::symbols::{Symbol, SymbolId};
use rill_ast::{ItemId, StmtId};
use rill_common::Atom;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Dense id of a lexical scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    #[inline]
    pub fn from_usize(index: usize) -> Self {
        ScopeId(u32::try_from(index).expect("scope id overflow"))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// File scope; parent of every other scope.
    Module,
    Function,
    Block,
    Loop,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
}

/// The resolved symbol table for one file.
///
/// Dense vectors are the authoritative stores; the hash maps are derived
/// indices keyed by AST id. Overloaded functions appear as multiple
/// symbols under the same `(scope, name)` key, in declaration order.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    /// Name index per scope. The value keeps declaration order so overload
    /// resolution is deterministic.
    scope_names: FxHashMap<(ScopeId, Atom), SmallVec<[SymbolId; 1]>>,
    /// Symbols declared by each item; the first symbol of a type item is
    /// the nominal type symbol.
    item_symbols: FxHashMap<ItemId, SmallVec<[SymbolId; 2]>>,
    /// Ordered parameter symbols per function item.
    item_params: FxHashMap<ItemId, Vec<SymbolId>>,
    /// Binding introduced by each `let` / `for` statement.
    stmt_bindings: FxHashMap<StmtId, SymbolId>,
    /// Scope owned by each block statement.
    block_scopes: FxHashMap<StmtId, ScopeId>,
    /// Body scope per function item.
    item_scopes: FxHashMap<ItemId, ScopeId>,
    /// Member symbols per extern block.
    extern_members: FxHashMap<ItemId, Vec<SymbolId>>,
    file_scope: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: Vec::new(),
            symbols: Vec::new(),
            scope_names: FxHashMap::default(),
            item_symbols: FxHashMap::default(),
            item_params: FxHashMap::default(),
            stmt_bindings: FxHashMap::default(),
            block_scopes: FxHashMap::default(),
            item_scopes: FxHashMap::default(),
            extern_members: FxHashMap::default(),
            file_scope: ScopeId(0),
        };
        table.file_scope = table.push_scope(None, ScopeKind::Module);
        table
    }

    #[inline]
    pub fn file_scope(&self) -> ScopeId {
        self.file_scope
    }

    pub fn push_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId::from_usize(self.scopes.len());
        self.scopes.push(Scope { parent, kind });
        id
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Add a symbol without binding a name (tag constructors, synthetics).
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::from_usize(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    /// Add a symbol and bind its name in `scope`.
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        let name = symbol.name;
        let id = self.add_symbol(symbol);
        self.scope_names.entry((scope, name)).or_default().push(id);
        id
    }

    #[inline]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len()).map(SymbolId::from_usize)
    }

    /// Resolve `name` by walking the scope chain outward. Returns the first
    /// symbol of the nearest declaring scope.
    pub fn lookup(&self, scope: ScopeId, name: Atom) -> Option<SymbolId> {
        self.lookup_overloads(scope, name)
            .and_then(|ids| ids.first().copied())
    }

    /// All symbols bound to `name` in the nearest declaring scope, in
    /// declaration order. Used for overload sets.
    pub fn lookup_overloads(&self, scope: ScopeId, name: Atom) -> Option<&[SymbolId]> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(ids) = self.scope_names.get(&(id, name)) {
                return Some(ids);
            }
            current = self.scopes[id.index()].parent;
        }
        None
    }

    /// Symbols bound in exactly `scope` (no chain walk).
    pub fn lookup_local(&self, scope: ScopeId, name: Atom) -> Option<&[SymbolId]> {
        self.scope_names.get(&(scope, name)).map(|v| v.as_slice())
    }

    // -------------------------------------------------------------------------
    // Derived indices
    // -------------------------------------------------------------------------

    pub fn record_item_symbol(&mut self, item: ItemId, symbol: SymbolId) {
        self.item_symbols.entry(item).or_default().push(symbol);
    }

    pub fn item_symbols(&self, item: ItemId) -> &[SymbolId] {
        self.item_symbols.get(&item).map_or(&[], |v| v.as_slice())
    }

    /// The nominal symbol of an item (its first recorded symbol).
    pub fn item_symbol(&self, item: ItemId) -> Option<SymbolId> {
        self.item_symbols(item).first().copied()
    }

    pub fn record_item_params(&mut self, item: ItemId, params: Vec<SymbolId>) {
        self.item_params.insert(item, params);
    }

    pub fn item_params(&self, item: ItemId) -> &[SymbolId] {
        self.item_params.get(&item).map_or(&[], |v| v.as_slice())
    }

    pub fn record_stmt_binding(&mut self, stmt: StmtId, symbol: SymbolId) {
        self.stmt_bindings.insert(stmt, symbol);
    }

    pub fn stmt_binding(&self, stmt: StmtId) -> Option<SymbolId> {
        self.stmt_bindings.get(&stmt).copied()
    }

    pub fn record_block_scope(&mut self, block: StmtId, scope: ScopeId) {
        self.block_scopes.insert(block, scope);
    }

    pub fn block_scope(&self, block: StmtId) -> Option<ScopeId> {
        self.block_scopes.get(&block).copied()
    }

    pub fn record_item_scope(&mut self, item: ItemId, scope: ScopeId) {
        self.item_scopes.insert(item, scope);
    }

    pub fn item_scope(&self, item: ItemId) -> Option<ScopeId> {
        self.item_scopes.get(&item).copied()
    }

    pub fn record_extern_member(&mut self, item: ItemId, symbol: SymbolId) {
        self.extern_members.entry(item).or_default().push(symbol);
    }

    pub fn extern_members(&self, item: ItemId) -> &[SymbolId] {
        self.extern_members.get(&item).map_or(&[], |v| v.as_slice())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Exports
// =============================================================================

/// Exported symbols per module path, for import resolution.
#[derive(Debug, Default)]
pub struct ExportMap {
    modules: FxHashMap<Atom, FxHashMap<Atom, SymbolId>>,
}

impl ExportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, module_path: Atom, name: Atom, symbol: SymbolId) {
        self.modules.entry(module_path).or_default().insert(name, symbol);
    }

    pub fn lookup(&self, module_path: Atom, name: Atom) -> Option<SymbolId> {
        self.modules.get(&module_path)?.get(&name).copied()
    }

    pub fn module(&self, module_path: Atom) -> Option<&FxHashMap<Atom, SymbolId>> {
        self.modules.get(&module_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Symbol, SymbolKind};
    use rill_common::Span;

    #[test]
    fn lookup_walks_scope_chain() {
        let mut interner = rill_common::StringInterner::new();
        let name = interner.intern("x");
        let mut table = SymbolTable::new();
        let outer = table.file_scope();
        let inner = table.push_scope(Some(outer), ScopeKind::Block);

        let sym = table.declare(outer, Symbol::new(name, SymbolKind::Let, Span::new(0, 1)));
        assert_eq!(table.lookup(inner, name), Some(sym));
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut interner = rill_common::StringInterner::new();
        let name = interner.intern("x");
        let mut table = SymbolTable::new();
        let outer = table.file_scope();
        let inner = table.push_scope(Some(outer), ScopeKind::Block);

        let a = table.declare(outer, Symbol::new(name, SymbolKind::Let, Span::new(0, 1)));
        let b = table.declare(inner, Symbol::new(name, SymbolKind::Let, Span::new(5, 6)));
        assert_eq!(table.lookup(inner, name), Some(b));
        assert_eq!(table.lookup(outer, name), Some(a));
    }

    #[test]
    fn overloads_keep_declaration_order() {
        let mut interner = rill_common::StringInterner::new();
        let name = interner.intern("push");
        let mut table = SymbolTable::new();
        let scope = table.file_scope();

        let a = table.declare(scope, Symbol::new(name, SymbolKind::Function, Span::new(0, 4)));
        let b = table.declare(scope, Symbol::new(name, SymbolKind::Function, Span::new(10, 14)));
        assert_eq!(table.lookup_overloads(scope, name).unwrap(), &[a, b]);
    }
}
