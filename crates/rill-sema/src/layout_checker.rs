//! Layout validation post-pass.
//!
//! The physical layout engine is an external collaborator; the core only
//! asks one question of it: does a nominal type contain itself by value
//! with no indirection? Cycles are reported once each, with the cycle
//! rotated to start at its smallest label so the same cycle always
//! produces the same wording.

use crate::context::Checker;
use crate::intern::{TypeData, TypeId, TypeInterner};
use rill_common::{Code, Span, StringInterner};
use rustc_hash::FxHashSet;

/// The layout engine seam.
pub trait LayoutEngine {
    /// The labels of a recursive unsized value cycle through `root`, in
    /// cycle order, or `None` if the type has a finite layout.
    fn unsized_cycle(
        &self,
        types: &TypeInterner,
        strings: &StringInterner,
        root: TypeId,
    ) -> Option<Vec<String>>;
}

/// A layout engine that trusts every type. Used by tests that exercise
/// other parts of the core.
#[derive(Debug, Default)]
pub struct NullLayoutEngine;

impl LayoutEngine for NullLayoutEngine {
    fn unsized_cycle(
        &self,
        _types: &TypeInterner,
        _strings: &StringInterner,
        _root: TypeId,
    ) -> Option<Vec<String>> {
        None
    }
}

/// Rotate a cycle so it starts at its smallest label.
pub(crate) fn normalize_cycle(labels: &[String]) -> Vec<String> {
    if labels.is_empty() {
        return Vec::new();
    }
    let start = labels
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    labels[start..]
        .iter()
        .chain(labels[..start].iter())
        .cloned()
        .collect()
}

impl<'a> Checker<'a> {
    /// Ask the layout engine about every nominal type seen during the
    /// walk.
    pub(crate) fn check_layouts(&mut self) {
        let mut reported: FxHashSet<Vec<String>> = FxHashSet::default();
        let nominal_types = self.nominal_types.clone();
        for ty in nominal_types {
            let Some(cycle) = self.layout.unsized_cycle(&self.types, self.strings, ty) else {
                continue;
            };
            let normalized = normalize_cycle(&cycle);
            if !reported.insert(normalized.clone()) {
                continue;
            }
            let span = self.nominal_decl_span(ty);
            let chain = normalized.join(" -> ");
            let closing = normalized.first().cloned().unwrap_or_default();
            self.error(
                Code::RecursiveUnsized,
                span,
                format!("recursive type without indirection: {chain} -> {closing}"),
            );
        }
    }

    fn nominal_decl_span(&self, ty: TypeId) -> Span {
        match self.types.lookup(ty) {
            Some(TypeData::Struct(n)) | Some(TypeData::Union(n)) | Some(TypeData::Alias(n))
                if !n.symbol.is_none() =>
            {
                self.symbols.symbol(n.symbol).span
            }
            _ => Span::dummy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_rotates_to_smallest_label() {
        let cycle = vec!["C".to_string(), "A".to_string(), "B".to_string()];
        assert_eq!(
            normalize_cycle(&cycle),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn rotations_normalize_identically() {
        let a = vec!["B".to_string(), "C".to_string(), "A".to_string()];
        let b = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(normalize_cycle(&a), normalize_cycle(&b));
    }
}
