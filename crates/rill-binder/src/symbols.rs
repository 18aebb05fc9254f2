//! Symbol definitions.

use bitflags::bitflags;
use rill_ast::{ItemId, StmtId, TypeParam};
use rill_common::{Atom, Span};

pub use rill_ast::EntryMode;

/// Dense id of a symbol in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Reserved sentinel.
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub fn from_usize(index: usize) -> Self {
        SymbolId(u32::try_from(index).expect("symbol id overflow"))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// What a symbol names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// A struct, alias, or union declaration.
    Type,
    Contract,
    Function,
    Tag,
    Const,
    Let,
    Param,
    Module,
    Import,
}

bitflags! {
    /// Symbol modifier flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SymbolFlags: u16 {
        const PUBLIC     = 1 << 0;
        const IMPORTED   = 1 << 1;
        const ENTRYPOINT = 1 << 2;
        const MUTABLE    = 1 << 3;
        /// Set on `@copy`-attributed type declarations.
        const COPY       = 1 << 4;
        const ASYNC      = 1 << 5;
        const VARIADIC   = 1 << 6;
        const EXTERN     = 1 << 7;
    }
}

/// A resolved entity: binding, function, type, contract, tag, module.
///
/// The binder fills everything here from syntax; sema-computed data
/// (types, signatures, contract specs) lives in sema's own tables.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Atom,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    pub span: Span,
    /// Declaring item, for item-level symbols.
    pub item: Option<ItemId>,
    /// Declaring statement, for `let` bindings.
    pub stmt: Option<StmtId>,
    /// Declared type parameters (with bounds), for generic declarations.
    pub type_params: Vec<TypeParam>,
    /// Module path, for `Module`/`Import` symbols.
    pub module_path: Option<Atom>,
    /// Canonical receiver key for extern-registered methods.
    pub receiver_key: Option<Atom>,
    /// Entrypoint argument mode, for `ENTRYPOINT` functions.
    pub entry: Option<EntryMode>,
}

impl Symbol {
    pub fn new(name: Atom, kind: SymbolKind, span: Span) -> Self {
        Symbol {
            name,
            kind,
            flags: SymbolFlags::empty(),
            span,
            item: None,
            stmt: None,
            type_params: Vec::new(),
            module_path: None,
            receiver_key: None,
            entry: None,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: SymbolFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: ItemId) -> Self {
        self.item = Some(item);
        self
    }

    #[must_use]
    pub fn with_stmt(mut self, stmt: StmtId) -> Self {
        self.stmt = Some(stmt);
        self
    }

    #[must_use]
    pub fn with_type_params(mut self, params: Vec<TypeParam>) -> Self {
        self.type_params = params;
        self
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.flags.contains(SymbolFlags::PUBLIC)
    }
}
