//! The per-file AST arena.

use crate::ids::{ExprId, ItemId, StmtId, TypeExprId};
use crate::node::{Expr, ExprKind, Item, ItemKind, Stmt, StmtKind, TypeExpr, TypeExprKind};
use rill_common::Span;

/// One parsed source file: dense arenas plus the top-level item order.
///
/// Push methods are used by the parser and by test fixtures; lookups are
/// plain indexing since ids are only ever minted by the owning arena.
#[derive(Debug, Default)]
pub struct Module {
    items: Vec<Item>,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    type_exprs: Vec<TypeExpr>,
    /// Top-level items in declaration order.
    pub item_order: Vec<ItemId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_item(&mut self, kind: ItemKind, span: Span) -> ItemId {
        let id = ItemId::from_usize(self.items.len());
        self.items.push(Item { kind, span });
        self.item_order.push(id);
        id
    }

    pub fn push_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::from_usize(self.stmts.len());
        self.stmts.push(Stmt { kind, span });
        id
    }

    pub fn push_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::from_usize(self.exprs.len());
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn push_type_expr(&mut self, kind: TypeExprKind, span: Span) -> TypeExprId {
        let id = TypeExprId::from_usize(self.type_exprs.len());
        self.type_exprs.push(TypeExpr { kind, span });
        id
    }

    #[inline]
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn type_expr(&self, id: TypeExprId) -> &TypeExpr {
        &self.type_exprs[id.index()]
    }

    #[inline]
    pub fn expr_span(&self, id: ExprId) -> Span {
        self.exprs[id.index()].span
    }

    #[inline]
    pub fn stmt_span(&self, id: StmtId) -> Span {
        self.stmts[id.index()].span
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Strip grouping parentheses, returning the underlying expression id.
    pub fn skip_parens(&self, mut id: ExprId) -> ExprId {
        while let ExprKind::Paren(inner) = self.expr(id).kind {
            id = inner;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Literal;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut m = Module::new();
        let a = m.push_expr(ExprKind::Literal(Literal::Int(1)), Span::new(0, 1));
        let b = m.push_expr(ExprKind::Literal(Literal::Int(2)), Span::new(2, 3));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(m.expr_span(b), Span::new(2, 3));
    }

    #[test]
    fn skip_parens_unwraps_nesting() {
        let mut m = Module::new();
        let lit = m.push_expr(ExprKind::Literal(Literal::Bool(true)), Span::new(1, 5));
        let p1 = m.push_expr(ExprKind::Paren(lit), Span::new(0, 6));
        let p2 = m.push_expr(ExprKind::Paren(p1), Span::new(0, 7));
        assert_eq!(m.skip_parens(p2), lit);
    }
}
