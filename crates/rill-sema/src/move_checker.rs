//! Move tracking.
//!
//! A binding is consumed once its value moves out; later reads are errors
//! unless the type is Copy. Branching control flow snapshots the state on
//! entry and merges on the join: a binding moved in either arm stays moved
//! afterwards (the join keeps the union of consumed bindings, earliest
//! move span wins).

use rill_binder::SymbolId;
use rill_common::Span;
use rustc_hash::FxHashMap;

/// Snapshot of the consumed-bindings map, taken at branch entry.
pub type MoveSnapshot = FxHashMap<SymbolId, Span>;

/// Consumed bindings of the function currently being checked.
#[derive(Debug, Default)]
pub struct MoveTracker {
    moved: FxHashMap<SymbolId, Span>,
}

impl MoveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `symbol` as consumed. Idempotent; the earliest move span is
    /// kept so diagnostics always point at the first consumption.
    pub fn mark_moved(&mut self, symbol: SymbolId, span: Span) {
        self.moved.entry(symbol).or_insert(span);
    }

    /// Forget a consumption (reassignment restores the binding).
    pub fn clear(&mut self, symbol: SymbolId) {
        self.moved.remove(&symbol);
    }

    /// The first-move span, if `symbol` is consumed.
    pub fn moved_at(&self, symbol: SymbolId) -> Option<Span> {
        self.moved.get(&symbol).copied()
    }

    #[inline]
    pub fn is_moved(&self, symbol: SymbolId) -> bool {
        self.moved.contains_key(&symbol)
    }

    /// Snapshot the state at a branch point.
    pub fn snapshot(&self) -> MoveSnapshot {
        self.moved.clone()
    }

    /// Restore a snapshot taken with [`MoveTracker::snapshot`].
    pub fn restore(&mut self, snapshot: MoveSnapshot) {
        self.moved = snapshot;
    }

    /// Join a branch result into the current state: key-union, keeping the
    /// earlier span for bindings moved on both paths.
    pub fn merge(&mut self, other: MoveSnapshot) {
        for (symbol, span) in other {
            match self.moved.get(&symbol) {
                Some(&existing) if existing.start <= span.start => {}
                _ => {
                    self.moved.insert(symbol, span);
                }
            }
        }
    }

    /// Reset for the next function body.
    pub fn reset(&mut self) {
        self.moved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(n: u32) -> SymbolId {
        SymbolId(n)
    }

    #[test]
    fn mark_keeps_earliest_span() {
        let mut tracker = MoveTracker::new();
        tracker.mark_moved(sym(1), Span::new(10, 12));
        tracker.mark_moved(sym(1), Span::new(30, 32));
        assert_eq!(tracker.moved_at(sym(1)), Some(Span::new(10, 12)));
    }

    #[test]
    fn clear_restores_binding() {
        let mut tracker = MoveTracker::new();
        tracker.mark_moved(sym(1), Span::new(0, 1));
        tracker.clear(sym(1));
        assert!(!tracker.is_moved(sym(1)));
    }

    #[test]
    fn branch_merge_is_key_union() {
        // if/else walk: snapshot entry, walk then, snapshot exit, restore
        // entry, walk else, merge.
        let mut tracker = MoveTracker::new();
        tracker.mark_moved(sym(1), Span::new(0, 1));

        let entry = tracker.snapshot();
        tracker.mark_moved(sym(2), Span::new(10, 11));
        let after_then = tracker.snapshot();

        tracker.restore(entry);
        tracker.mark_moved(sym(3), Span::new(20, 21));
        tracker.merge(after_then);

        assert!(tracker.is_moved(sym(1)));
        assert!(tracker.is_moved(sym(2)));
        assert!(tracker.is_moved(sym(3)));
    }

    #[test]
    fn merge_prefers_earlier_span() {
        let mut tracker = MoveTracker::new();
        tracker.mark_moved(sym(1), Span::new(40, 42));
        let mut other = MoveSnapshot::default();
        other.insert(sym(1), Span::new(5, 7));
        tracker.merge(other);
        assert_eq!(tracker.moved_at(sym(1)), Some(Span::new(5, 7)));
    }
}
