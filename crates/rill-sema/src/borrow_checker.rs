//! Place and borrow tracking.
//!
//! Tracks active shared/exclusive loans per `Place` with lexical lifetimes:
//! a borrow lives until its owning scope ends. The single-writer rule is
//! enforced at `begin_borrow` time; mutation and move checks consult the
//! same per-place state.

use rill_ast::ExprId;
use rill_binder::{ScopeId, SymbolId};
use rill_common::Span;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Dense borrow id. Id 0 is reserved as "no borrow".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BorrowId(pub u32);

impl BorrowId {
    pub const NONE: BorrowId = BorrowId(0);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorrowKind {
    Shared,
    Mut,
}

/// What kind of storage a place denotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaceKind {
    Invalid,
    Local,
}

/// A location participating in borrows.
///
/// Two places compare equal iff they denote the same storage; today that
/// is the base binding symbol. Field and index projections extend this
/// type without changing the comparison contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Place {
    pub kind: PlaceKind,
    pub symbol: SymbolId,
}

impl Place {
    pub const INVALID: Place = Place {
        kind: PlaceKind::Invalid,
        symbol: SymbolId::NONE,
    };

    pub fn local(symbol: SymbolId) -> Place {
        if symbol.is_none() {
            return Place::INVALID;
        }
        Place {
            kind: PlaceKind::Local,
            symbol,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != PlaceKind::Invalid && !self.symbol.is_none()
    }
}

/// Why a borrow or mutation was refused. Carries the previous borrow so
/// diagnostics can point at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorrowIssue {
    None,
    /// Exclusive borrow requested while a shared borrow is active.
    ConflictShared { prev: BorrowId },
    /// Any borrow requested while an exclusive borrow is active.
    ConflictMut { prev: BorrowId },
    /// Mutation attempted while a shared borrow is active.
    Frozen { prev: BorrowId },
    /// Mutation attempted while an exclusive borrow is active.
    Taken { prev: BorrowId },
}

impl BorrowIssue {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, BorrowIssue::None)
    }

    /// The borrow this issue conflicts with, if any.
    pub fn previous(&self) -> Option<BorrowId> {
        match *self {
            BorrowIssue::None => None,
            BorrowIssue::ConflictShared { prev }
            | BorrowIssue::ConflictMut { prev }
            | BorrowIssue::Frozen { prev }
            | BorrowIssue::Taken { prev } => Some(prev),
        }
    }
}

/// One tracked loan.
#[derive(Clone, Copy, Debug)]
pub struct Borrow {
    pub id: BorrowId,
    pub kind: BorrowKind,
    pub place: Place,
    pub span: Span,
    /// The borrow expression.
    pub from_expr: ExprId,
    /// The borrow expires when this scope ends.
    pub to_scope: ScopeId,
}

#[derive(Debug, Default)]
struct PlaceState {
    shared: SmallVec<[BorrowId; 2]>,
    exclusive: Option<BorrowId>,
}

impl PlaceState {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

/// Active borrows per place, with scope-indexed expiry.
///
/// The dense borrow vector is the authoritative store; place states and
/// the per-scope lists are derived indices cleared on scope exit.
#[derive(Debug, Default)]
pub struct BorrowTable {
    borrows: Vec<Borrow>,
    states: FxHashMap<Place, PlaceState>,
    scope_borrows: FxHashMap<ScopeId, Vec<BorrowId>>,
}

impl BorrowTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: BorrowKind, place: Place, span: Span, from_expr: ExprId, to_scope: ScopeId) -> BorrowId {
        let id = BorrowId(u32::try_from(self.borrows.len() + 1).expect("borrow id overflow"));
        self.borrows.push(Borrow {
            id,
            kind,
            place,
            span,
            from_expr,
            to_scope,
        });
        id
    }

    /// Record a borrow of `place` for the rest of `scope`.
    ///
    /// A conflicting request still allocates the borrow (so downstream
    /// tables stay dense) but does not enter the place state; the returned
    /// issue names the previous loan.
    pub fn begin_borrow(
        &mut self,
        from_expr: ExprId,
        span: Span,
        kind: BorrowKind,
        place: Place,
        scope: ScopeId,
    ) -> (BorrowId, BorrowIssue) {
        if !place.is_valid() {
            return (BorrowId::NONE, BorrowIssue::None);
        }

        let issue = {
            let state = self.states.entry(place).or_default();
            if let Some(prev) = state.exclusive {
                BorrowIssue::ConflictMut { prev }
            } else if kind == BorrowKind::Mut {
                if let Some(&prev) = state.shared.first() {
                    BorrowIssue::ConflictShared { prev }
                } else {
                    BorrowIssue::None
                }
            } else {
                BorrowIssue::None
            }
        };

        let id = self.alloc(kind, place, span, from_expr, scope);
        self.scope_borrows.entry(scope).or_default().push(id);

        if issue.is_none() {
            let state = self.states.entry(place).or_default();
            match kind {
                BorrowKind::Shared => state.shared.push(id),
                BorrowKind::Mut => state.exclusive = Some(id),
            }
        }
        (id, issue)
    }

    /// Whether `place` may be written through its owner right now.
    pub fn mutation_allowed(&self, place: Place) -> BorrowIssue {
        let Some(state) = self.states.get(&place) else {
            return BorrowIssue::None;
        };
        if let Some(prev) = state.exclusive {
            return BorrowIssue::Taken { prev };
        }
        if let Some(&prev) = state.shared.first() {
            return BorrowIssue::Frozen { prev };
        }
        BorrowIssue::None
    }

    /// Whether `place` may be moved out of right now. Same discipline as
    /// mutation: any active loan pins the place.
    pub fn move_allowed(&self, place: Place) -> BorrowIssue {
        self.mutation_allowed(place)
    }

    /// Drop every borrow whose lifetime ends with `scope`.
    pub fn end_scope(&mut self, scope: ScopeId) {
        let Some(ids) = self.scope_borrows.remove(&scope) else {
            return;
        };
        for id in ids {
            let borrow = self.borrows[(id.0 - 1) as usize];
            if let Some(state) = self.states.get_mut(&borrow.place) {
                state.shared.retain(|b| *b != id);
                if state.exclusive == Some(id) {
                    state.exclusive = None;
                }
                if state.is_empty() {
                    self.states.remove(&borrow.place);
                }
            }
        }
    }

    pub fn borrow(&self, id: BorrowId) -> Option<&Borrow> {
        if id.is_none() {
            return None;
        }
        self.borrows.get((id.0 - 1) as usize)
    }

    /// Every borrow ever recorded, dense by id.
    pub fn all(&self) -> &[Borrow] {
        &self.borrows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPR: ExprId = ExprId(0);
    const SCOPE: ScopeId = ScopeId(0);

    fn place(n: u32) -> Place {
        Place::local(SymbolId(n))
    }

    #[test]
    fn shared_borrows_coexist() {
        let mut table = BorrowTable::new();
        let (_, i1) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Shared, place(1), SCOPE);
        let (_, i2) = table.begin_borrow(EXPR, Span::new(2, 3), BorrowKind::Shared, place(1), SCOPE);
        assert!(i1.is_none());
        assert!(i2.is_none());
    }

    #[test]
    fn mut_conflicts_with_shared() {
        let mut table = BorrowTable::new();
        let (prev, _) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Shared, place(1), SCOPE);
        let (_, issue) = table.begin_borrow(EXPR, Span::new(2, 3), BorrowKind::Mut, place(1), SCOPE);
        assert_eq!(issue, BorrowIssue::ConflictShared { prev });
    }

    #[test]
    fn any_borrow_conflicts_with_mut() {
        let mut table = BorrowTable::new();
        let (prev, _) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Mut, place(1), SCOPE);
        let (_, shared) = table.begin_borrow(EXPR, Span::new(2, 3), BorrowKind::Shared, place(1), SCOPE);
        let (_, exclusive) = table.begin_borrow(EXPR, Span::new(4, 5), BorrowKind::Mut, place(1), SCOPE);
        assert_eq!(shared, BorrowIssue::ConflictMut { prev });
        assert_eq!(exclusive, BorrowIssue::ConflictMut { prev });
    }

    #[test]
    fn distinct_places_do_not_interfere() {
        let mut table = BorrowTable::new();
        let (_, i1) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Mut, place(1), SCOPE);
        let (_, i2) = table.begin_borrow(EXPR, Span::new(2, 3), BorrowKind::Mut, place(2), SCOPE);
        assert!(i1.is_none());
        assert!(i2.is_none());
    }

    #[test]
    fn mutation_frozen_while_shared() {
        let mut table = BorrowTable::new();
        let (prev, _) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Shared, place(1), SCOPE);
        assert_eq!(table.mutation_allowed(place(1)), BorrowIssue::Frozen { prev });
    }

    #[test]
    fn mutation_taken_while_mut() {
        let mut table = BorrowTable::new();
        let (prev, _) = table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Mut, place(1), SCOPE);
        assert_eq!(table.mutation_allowed(place(1)), BorrowIssue::Taken { prev });
    }

    #[test]
    fn end_scope_releases_the_place() {
        let inner = ScopeId(1);
        let mut table = BorrowTable::new();
        table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Mut, place(1), inner);
        table.end_scope(inner);
        // Opposite-kind borrow is accepted immediately after expiry.
        let (_, issue) = table.begin_borrow(EXPR, Span::new(2, 3), BorrowKind::Shared, place(1), SCOPE);
        assert!(issue.is_none());
        assert!(table.mutation_allowed(place(1)).previous().is_some());
    }

    #[test]
    fn invalid_place_is_ignored() {
        let mut table = BorrowTable::new();
        let (id, issue) =
            table.begin_borrow(EXPR, Span::new(0, 1), BorrowKind::Mut, Place::INVALID, SCOPE);
        assert!(id.is_none());
        assert!(issue.is_none());
    }
}
