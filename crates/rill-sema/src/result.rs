//! The output of semantic analysis.

use crate::assignability::Conversion;
use crate::borrow_checker::{Borrow, BorrowId};
use crate::context::{Checker, Signature};
use crate::intern::{TypeId, TypeInterner};
use rill_ast::ExprId;
use rill_binder::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Everything later compiler stages need from the sema walk. Diagnostics
/// go to the caller's sink as they are found; this is the typed side.
#[derive(Debug)]
pub struct CheckResult {
    /// The type of every expression, written once during the walk.
    pub expr_types: FxHashMap<ExprId, TypeId>,
    /// The populated type interner.
    pub types: TypeInterner,
    /// Every borrow recorded, dense by id.
    pub borrows: Vec<Borrow>,
    /// Borrow introduced by each borrow expression.
    pub expr_borrows: FxHashMap<ExprId, BorrowId>,
    /// Implicit conversions to materialize during lowering.
    pub implicit_conversions: FxHashMap<ExprId, Conversion>,
    /// Operator expression -> user magic method, for codegen and printing.
    pub magic_binary_symbols: FxHashMap<ExprId, SymbolId>,
    pub magic_unary_symbols: FxHashMap<ExprId, SymbolId>,
    /// Types whose values copy instead of moving.
    pub copy_types: FxHashSet<TypeId>,
    /// Computed type per symbol.
    pub symbol_types: FxHashMap<SymbolId, TypeId>,
    /// Resolved signature per function symbol.
    pub symbol_signatures: FxHashMap<SymbolId, Signature>,
}

impl CheckResult {
    /// The recorded type of an expression.
    pub fn type_of(&self, expr: ExprId) -> TypeId {
        self.expr_types.get(&expr).copied().unwrap_or(TypeId::NONE)
    }

    /// Whether values of `ty` duplicate implicitly.
    pub fn is_copy(&self, ty: TypeId) -> bool {
        self.types.is_copy(ty, &self.copy_types)
    }
}

impl<'a> Checker<'a> {
    /// Package the walk's outputs.
    pub(crate) fn finish(self) -> CheckResult {
        CheckResult {
            expr_types: self.expr_types,
            borrows: self.borrows.all().to_vec(),
            types: self.types,
            expr_borrows: self.expr_borrows,
            implicit_conversions: self.implicit_conversions,
            magic_binary_symbols: self.magic_binary_symbols,
            magic_unary_symbols: self.magic_unary_symbols,
            copy_types: self.copy_types,
            symbol_types: self.symbol_types,
            symbol_signatures: self.signatures,
        }
    }
}
