//! Assignability and implicit conversions.
//!
//! `assignable` decides whether a value of one type may flow into a slot
//! of another without an explicit cast. Conversions that change the value
//! representation are recorded per expression so later phases can insert
//! them: numeric widenings, tag-union upcasts, and user `__to` coercions.
//!
//! The relation is coinductive over unions: a pair already being checked
//! is assumed assignable, which breaks mutually recursive union cycles.

use crate::context::Checker;
use crate::intern::{TypeData, TypeId, UnionVariant, WIDTH_ANY};
use rill_ast::ExprId;
use rill_binder::SymbolId;
use rill_common::{Code, Span};
use rustc_hash::FxHashSet;

/// A recorded implicit conversion on an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub source: TypeId,
    pub target: TypeId,
    pub kind: ConversionKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionKind {
    NumericWiden,
    TagUnion,
    UserTo,
}

/// Outcome of an assignability query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignability {
    No,
    Exact,
    /// Copyable `own`/reference adjustment; allowed but not recorded.
    Deref,
    Convert(ConversionKind),
}

impl Assignability {
    #[inline]
    pub fn is_ok(self) -> bool {
        !matches!(self, Assignability::No)
    }
}

impl<'a> Checker<'a> {
    /// Whether `actual` is assignable to `expected`.
    pub(crate) fn assignable(&mut self, expected: TypeId, actual: TypeId) -> Assignability {
        let mut seen = FxHashSet::default();
        self.assignable_inner(expected, actual, &mut seen)
    }

    fn assignable_inner(
        &mut self,
        expected: TypeId,
        actual: TypeId,
        seen: &mut FxHashSet<(TypeId, TypeId)>,
    ) -> Assignability {
        // Sentinels absorb: the root cause was already reported.
        if expected.is_none() || actual.is_none() {
            return Assignability::Exact;
        }
        if expected == actual {
            return Assignability::Exact;
        }
        let expected_r = self.types.resolve_alias(expected);
        let actual_r = self.types.resolve_alias(actual);
        if expected_r == actual_r {
            return Assignability::Exact;
        }
        if !seen.insert((expected_r, actual_r)) {
            return Assignability::Exact;
        }

        // Tag-union upcast: `Some<int>` flows into any union carrying
        // `Some(int)`.
        if let Some(result) = self.tag_union_upcast(expected_r, actual_r, seen) {
            return result;
        }

        // Union membership: the actual type is one of the expected
        // union's members.
        if let Some(members) = self.types.union_variants(expected_r).map(|m| m.to_vec()) {
            for member in &members {
                match member {
                    UnionVariant::Type(member_ty) => {
                        if self
                            .assignable_inner(*member_ty, actual_r, seen)
                            .is_ok()
                        {
                            return Assignability::Exact;
                        }
                    }
                    UnionVariant::Nothing => {
                        if actual_r == TypeId::NOTHING {
                            return Assignability::Exact;
                        }
                    }
                    UnionVariant::Tag { .. } => {}
                }
            }
        }

        let expected_data = self.types.lookup(expected_r).cloned();
        let actual_data = self.types.lookup(actual_r).cloned();
        match (&expected_data, &actual_data) {
            // Arrays: dynamic-left accepts any length, fixed-left requires
            // an identical length.
            (
                Some(TypeData::Array {
                    elem: ee,
                    len: expected_len,
                }),
                Some(TypeData::Array {
                    elem: ae,
                    len: actual_len,
                }),
            ) => {
                let lengths_ok = match (expected_len, actual_len) {
                    (None, _) => true,
                    (Some(el), Some(al)) => el == al,
                    (Some(_), None) => false,
                };
                if lengths_ok && self.assignable_inner(*ee, *ae, seen).is_ok() {
                    return Assignability::Exact;
                }
            }
            // Tuples element-wise.
            (Some(TypeData::Tuple(expected_elems)), Some(TypeData::Tuple(actual_elems))) => {
                if expected_elems.len() == actual_elems.len()
                    && expected_elems
                        .iter()
                        .zip(actual_elems)
                        .all(|(&e, &a)| self.assignable_inner(e, a, seen).is_ok())
                {
                    return Assignability::Exact;
                }
            }
            // Functions component-wise.
            (
                Some(TypeData::Fn {
                    params: ep,
                    result: er,
                }),
                Some(TypeData::Fn {
                    params: ap,
                    result: ar,
                }),
            ) => {
                if ep.len() == ap.len()
                    && ep
                        .iter()
                        .zip(ap)
                        .all(|(&e, &a)| self.assignable_inner(e, a, seen).is_ok())
                    && self.assignable_inner(*er, *ar, seen).is_ok()
                {
                    return Assignability::Exact;
                }
            }
            // `own T` / `&T` exchange with bare `T` only for Copy types;
            // `own T` and `&T` stay incompatible with each other.
            (Some(TypeData::Own { inner }), _) => {
                if *inner == actual_r && self.types.is_copy(*inner, &self.copy_types) {
                    return Assignability::Deref;
                }
            }
            (_, Some(TypeData::Own { inner })) => {
                if *inner == expected_r && self.types.is_copy(*inner, &self.copy_types) {
                    return Assignability::Deref;
                }
            }
            (Some(TypeData::Reference { inner, .. }), _)
                if !matches!(&actual_data, Some(TypeData::Reference { .. })) =>
            {
                if *inner == actual_r && self.types.is_copy(*inner, &self.copy_types) {
                    return Assignability::Deref;
                }
            }
            (_, Some(TypeData::Reference { inner, .. }))
                if !matches!(&expected_data, Some(TypeData::Reference { .. })) =>
            {
                if *inner == expected_r && self.types.is_copy(*inner, &self.copy_types) {
                    return Assignability::Deref;
                }
            }
            _ => {}
        }

        // Numeric widening within the same kind.
        if self.numeric_widens(expected_r, actual_r) {
            return Assignability::Convert(ConversionKind::NumericWiden);
        }

        Assignability::No
    }

    /// Strictly widening numeric conversion of the same kind. `WIDTH_ANY`
    /// is the widest width of each kind.
    pub(crate) fn numeric_widens(&self, expected: TypeId, actual: TypeId) -> bool {
        match (self.types.numeric(expected), self.types.numeric(actual)) {
            (Some((ek, ew)), Some((ak, aw))) if ek == ak => {
                if aw == WIDTH_ANY {
                    false
                } else {
                    ew == WIDTH_ANY || aw < ew
                }
            }
            _ => false,
        }
    }

    /// Recognize the single-member tag union produced by a constructor and
    /// upcast it into a union carrying that tag with equal arguments.
    fn tag_union_upcast(
        &mut self,
        expected: TypeId,
        actual: TypeId,
        seen: &mut FxHashSet<(TypeId, TypeId)>,
    ) -> Option<Assignability> {
        let actual_members = self.types.union_variants(actual)?;
        let [UnionVariant::Tag {
            name: actual_name,
            args: actual_args,
            ..
        }] = actual_members
        else {
            return None;
        };
        let actual_name = *actual_name;
        let actual_args = actual_args.clone();
        if expected == actual {
            return Some(Assignability::Exact);
        }
        let expected_members = self.types.union_variants(expected)?.to_vec();
        for member in expected_members {
            if let UnionVariant::Tag { name, args, .. } = member {
                if name == actual_name
                    && args.len() == actual_args.len()
                    && args
                        .iter()
                        .zip(&actual_args)
                        .all(|(&e, &a)| self.assignable_inner(e, a, seen).is_ok())
                {
                    return Some(Assignability::Convert(ConversionKind::TagUnion));
                }
            }
        }
        None
    }

    // -------------------------------------------------------------------------
    // User-defined conversions
    // -------------------------------------------------------------------------

    /// Search for a `__to` coercion from `actual` into `expected`.
    ///
    /// Exactly one candidate wins; several report ambiguity; none is a
    /// plain failure.
    pub(crate) fn find_user_to(
        &mut self,
        actual: TypeId,
        expected: TypeId,
        span: Span,
    ) -> Option<SymbolId> {
        let receiver_keys = self.receiver_keys(actual);
        let mut target_keys = vec![self.types.type_key(expected, self.strings)];
        let expected_resolved = self.types.resolve_alias(expected);
        if expected_resolved != expected {
            target_keys.push(self.types.type_key(expected_resolved, self.strings));
        }

        let mut matches: Vec<SymbolId> = Vec::new();
        for key in &receiver_keys {
            for entry in self.magic.methods_on(key, "__to") {
                if entry.signature.params.len() != 2 {
                    continue;
                }
                if target_keys.contains(&entry.signature.params[1]) {
                    matches.push(entry.symbol);
                }
            }
            if !matches.is_empty() {
                break;
            }
        }
        match matches.len() {
            0 => None,
            1 => Some(matches[0]),
            _ => {
                let from = self.ty(actual);
                let to = self.ty(expected);
                self.error(
                    Code::AmbiguousConversion,
                    span,
                    format!("multiple `__to` conversions from `{from}` to `{to}`"),
                );
                // Deterministic pick keeps downstream typing stable.
                Some(matches[0])
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expression-level checks
    // -------------------------------------------------------------------------

    /// Check `actual` against `expected` at `expr`, recording any implicit
    /// conversion. Does not diagnose; callers decide the message.
    pub(crate) fn coerce_expr(
        &mut self,
        expected: TypeId,
        actual: TypeId,
        expr: ExprId,
        span: Span,
    ) -> bool {
        match self.assignable(expected, actual) {
            Assignability::Exact | Assignability::Deref => true,
            Assignability::Convert(kind) => {
                self.implicit_conversions.insert(
                    expr,
                    Conversion {
                        source: actual,
                        target: expected,
                        kind,
                    },
                );
                true
            }
            Assignability::No => {
                if self.find_user_to(actual, expected, span).is_some() {
                    self.implicit_conversions.insert(
                        expr,
                        Conversion {
                            source: actual,
                            target: expected,
                            kind: ConversionKind::UserTo,
                        },
                    );
                    true
                } else {
                    false
                }
            }
        }
    }
}
