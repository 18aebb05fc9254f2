//! Resolved symbol table for the Rill compiler.
//!
//! Name resolution runs before semantic analysis and produces a
//! `SymbolTable`: scopes, symbols, and the indices sema keys its walk by
//! (per-item symbols, per-statement bindings, per-block scopes). Sema
//! treats the table as shared and read-only; the types it computes are
//! published in its own result, keyed by `SymbolId`.

pub mod symbols;
pub mod table;

pub use symbols::{EntryMode, Symbol, SymbolFlags, SymbolId, SymbolKind};
pub use table::{ExportMap, Scope, ScopeId, ScopeKind, SymbolTable};
