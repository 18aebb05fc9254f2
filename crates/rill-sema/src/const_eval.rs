//! Compile-time constant evaluation.
//!
//! Constants memoize through a three-state machine: `Unvisited` (absent
//! from the map), `Visiting`, `Done`. Re-entering `Visiting` is a cycle
//! and reports `SemaConstCycle` once, at the re-entering symbol.
//!
//! Integer arithmetic is checked: overflow past the representable integer
//! range, unsigned subtraction below zero, division or modulo by zero, and
//! negation outside the `i64` range all fail the evaluation. A failed
//! constant keeps its type but carries no value, so downstream consumers
//! (array lengths, const generic arguments) degrade without cascading
//! diagnostics.

use crate::context::Checker;
use crate::intern::{NumericKind, TypeId, WIDTH_ANY};
use rill_ast::{BinaryOp, ExprKind, ItemKind, Literal, UnaryOp};
use rill_binder::{SymbolId, SymbolKind};
use rill_common::Code;

/// Evaluation state per const symbol.
#[derive(Clone, Debug)]
pub enum ConstState {
    Visiting,
    Done(ConstValue),
}

/// The outcome of evaluating a constant: always typed, valued only when
/// evaluation succeeded with a compile-time scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstValue {
    pub ty: TypeId,
    pub value: Option<ConstScalar>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstScalar {
    Int(i128),
    Bool(bool),
}

impl ConstValue {
    pub fn unresolved() -> Self {
        ConstValue {
            ty: TypeId::NONE,
            value: None,
        }
    }

    pub fn int_value(&self) -> Option<i128> {
        match self.value {
            Some(ConstScalar::Int(v)) => Some(v),
            _ => None,
        }
    }
}

enum Eval {
    NotConst,
    Value(ConstValue),
}

impl<'a> Checker<'a> {
    /// Compute (or fetch) the type and value of a const symbol.
    pub(crate) fn ensure_const_evaluated(&mut self, symbol: SymbolId) -> ConstValue {
        match self.const_states.get(&symbol) {
            Some(ConstState::Done(value)) => return *value,
            Some(ConstState::Visiting) => {
                let span = self.symbols.symbol(symbol).span;
                let name = self.name(self.symbols.symbol(symbol).name).to_string();
                self.error(
                    Code::ConstCycle,
                    span,
                    format!("cyclic evaluation of constant `{name}`"),
                );
                let value = ConstValue::unresolved();
                self.const_states.insert(symbol, ConstState::Done(value));
                return value;
            }
            None => {}
        }
        self.const_states.insert(symbol, ConstState::Visiting);

        let value = self.evaluate_const_symbol(symbol);
        // A cycle diagnostic may already have finished this symbol.
        if let Some(ConstState::Done(existing)) = self.const_states.get(&symbol) {
            let existing = *existing;
            self.symbol_types.insert(symbol, existing.ty);
            return existing;
        }
        self.const_states.insert(symbol, ConstState::Done(value));
        self.symbol_types.insert(symbol, value.ty);
        value
    }

    fn evaluate_const_symbol(&mut self, symbol: SymbolId) -> ConstValue {
        let sym = self.symbols.symbol(symbol);
        let span = sym.span;
        let Some(item_id) = sym.item else {
            return ConstValue::unresolved();
        };
        let ItemKind::Const(decl) = &self.ast.item(item_id).kind else {
            return ConstValue::unresolved();
        };
        let annotated = decl
            .ty
            .map(|ty| self.resolve_type(ty, self.symbols.file_scope()));
        let value_expr = decl.value;

        let outcome = self.eval_const_expr(value_expr);
        match outcome {
            Eval::NotConst => {
                self.error(
                    Code::ConstNotConstant,
                    self.ast.expr_span(value_expr),
                    "constant initializer is not a constant expression",
                );
                ConstValue {
                    ty: annotated.unwrap_or(TypeId::NONE),
                    value: None,
                }
            }
            Eval::Value(computed) => {
                let ty = match annotated {
                    Some(expected) if !expected.is_none() => {
                        if let Some(v) = computed.int_value() {
                            if !self.int_fits(expected, v) {
                                let expected_name = self.ty(expected);
                                self.error(
                                    Code::IntLiteralOutOfRange,
                                    span,
                                    format!("constant value {v} does not fit in `{expected_name}`"),
                                );
                                return ConstValue {
                                    ty: expected,
                                    value: None,
                                };
                            }
                        }
                        expected
                    }
                    _ => computed.ty,
                };
                ConstValue {
                    ty,
                    value: computed.value,
                }
            }
        }
    }

    /// Evaluate an expression as a compile-time integer, for array lengths
    /// and const generic arguments.
    pub(crate) fn eval_const_index(&mut self, expr: rill_ast::ExprId) -> Option<u32> {
        match self.eval_const_expr(expr) {
            Eval::Value(v) => match v.int_value() {
                Some(value) if (0..=u32::MAX as i128).contains(&value) => Some(value as u32),
                _ => None,
            },
            Eval::NotConst => None,
        }
    }

    fn eval_const_expr(&mut self, expr: rill_ast::ExprId) -> Eval {
        let node = self.ast.expr(expr);
        match &node.kind {
            ExprKind::Literal(lit) => Eval::Value(match lit {
                Literal::Int(v) => ConstValue {
                    ty: TypeId::INT,
                    value: Some(ConstScalar::Int(*v as i128)),
                },
                Literal::Uint(v) => ConstValue {
                    ty: TypeId::UINT,
                    value: Some(ConstScalar::Int(*v as i128)),
                },
                Literal::Float(_) => ConstValue {
                    ty: TypeId::FLOAT,
                    value: None,
                },
                Literal::Str(_) => ConstValue {
                    ty: TypeId::STRING,
                    value: None,
                },
                Literal::Bool(b) => ConstValue {
                    ty: TypeId::BOOL,
                    value: Some(ConstScalar::Bool(*b)),
                },
                Literal::Nothing => ConstValue {
                    ty: TypeId::NOTHING,
                    value: None,
                },
            }),
            ExprKind::Paren(inner) => self.eval_const_expr(*inner),
            ExprKind::Unary { op, operand } => {
                let inner = match self.eval_const_expr(*operand) {
                    Eval::Value(v) => v,
                    Eval::NotConst => return Eval::NotConst,
                };
                Eval::Value(self.eval_const_unary(*op, inner))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = match self.eval_const_expr(*lhs) {
                    Eval::Value(v) => v,
                    Eval::NotConst => return Eval::NotConst,
                };
                let right = match self.eval_const_expr(*rhs) {
                    Eval::Value(v) => v,
                    Eval::NotConst => return Eval::NotConst,
                };
                Eval::Value(self.eval_const_binary(*op, left, right))
            }
            ExprKind::Ident(name) => {
                let Some(symbol) = self.symbols.lookup(self.symbols.file_scope(), *name) else {
                    return Eval::NotConst;
                };
                if self.symbols.symbol(symbol).kind != SymbolKind::Const {
                    return Eval::NotConst;
                }
                Eval::Value(self.ensure_const_evaluated(symbol))
            }
            ExprKind::Field { base, name } => {
                // Module-qualified constant access: `config::LIMIT`.
                let base_id = self.ast.skip_parens(*base);
                let ExprKind::Ident(module_name) = self.ast.expr(base_id).kind else {
                    return Eval::NotConst;
                };
                let Some(module_sym) = self.symbols.lookup(self.symbols.file_scope(), module_name)
                else {
                    return Eval::NotConst;
                };
                let module = self.symbols.symbol(module_sym);
                if !matches!(module.kind, SymbolKind::Module | SymbolKind::Import) {
                    return Eval::NotConst;
                }
                let Some(path) = module.module_path else {
                    return Eval::NotConst;
                };
                let Some(target) = self.exports.lookup(path, *name) else {
                    return Eval::NotConst;
                };
                if self.symbols.symbol(target).kind != SymbolKind::Const {
                    return Eval::NotConst;
                }
                Eval::Value(self.ensure_const_evaluated(target))
            }
            _ => Eval::NotConst,
        }
    }

    fn eval_const_unary(&mut self, op: UnaryOp, inner: ConstValue) -> ConstValue {
        match (op, inner.value) {
            (UnaryOp::Plus, _) => inner,
            (UnaryOp::Neg, Some(ConstScalar::Int(v))) => ConstValue {
                ty: inner.ty,
                value: negate_checked(v).map(ConstScalar::Int),
            },
            (UnaryOp::Neg, _) => ConstValue {
                ty: inner.ty,
                value: None,
            },
            (UnaryOp::Not, Some(ConstScalar::Bool(b))) => ConstValue {
                ty: TypeId::BOOL,
                value: Some(ConstScalar::Bool(!b)),
            },
            (UnaryOp::Not, _) => ConstValue {
                ty: TypeId::BOOL,
                value: None,
            },
            (UnaryOp::Deref, _) => ConstValue::unresolved(),
        }
    }

    fn eval_const_binary(&mut self, op: BinaryOp, left: ConstValue, right: ConstValue) -> ConstValue {
        let result_ty = self.const_binary_type(op, left.ty, right.ty);
        let is_unsigned = matches!(
            self.types.numeric(left.ty),
            Some((NumericKind::Uint, _))
        );
        let value = match (left.value, right.value) {
            (Some(ConstScalar::Int(a)), Some(ConstScalar::Int(b))) => {
                eval_int_binary(op, a, b, is_unsigned)
            }
            (Some(ConstScalar::Bool(a)), Some(ConstScalar::Bool(b))) => match op {
                BinaryOp::And => Some(ConstScalar::Bool(a && b)),
                BinaryOp::Or => Some(ConstScalar::Bool(a || b)),
                BinaryOp::Eq => Some(ConstScalar::Bool(a == b)),
                BinaryOp::Ne => Some(ConstScalar::Bool(a != b)),
                _ => None,
            },
            _ => None,
        };
        ConstValue {
            ty: result_ty,
            value,
        }
    }

    fn const_binary_type(&mut self, op: BinaryOp, left: TypeId, right: TypeId) -> TypeId {
        if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
            return TypeId::BOOL;
        }
        match (self.types.numeric(left), self.types.numeric(right)) {
            (Some((lk, lw)), Some((rk, _))) if lk == rk => {
                if lw == WIDTH_ANY {
                    right
                } else {
                    left
                }
            }
            _ => left,
        }
    }

    /// Whether `value` fits the integer range of `ty`. Non-integer types
    /// accept anything (the mismatch surfaces elsewhere).
    pub(crate) fn int_fits(&self, ty: TypeId, value: i128) -> bool {
        match self.types.numeric(ty) {
            Some((NumericKind::Int, WIDTH_ANY)) => {
                (i64::MIN as i128..=i64::MAX as i128).contains(&value)
            }
            Some((NumericKind::Int, width)) => {
                let bits = u32::from(width);
                let min = -(1i128 << (bits - 1));
                let max = (1i128 << (bits - 1)) - 1;
                (min..=max).contains(&value)
            }
            Some((NumericKind::Uint, WIDTH_ANY)) => (0..=u64::MAX as i128).contains(&value),
            Some((NumericKind::Uint, width)) => {
                let bits = u32::from(width);
                (0..(1i128 << bits)).contains(&value)
            }
            _ => true,
        }
    }
}

// =============================================================================
// Checked integer arithmetic
// =============================================================================

/// The widest value range a constant may take: `i64::MIN ..= u64::MAX`.
const RANGE_MIN: i128 = i64::MIN as i128;
const RANGE_MAX: i128 = u64::MAX as i128;

fn in_range(v: i128) -> Option<i128> {
    if (RANGE_MIN..=RANGE_MAX).contains(&v) {
        Some(v)
    } else {
        None
    }
}

/// Negation is only defined inside the `i64` range.
fn negate_checked(v: i128) -> Option<i128> {
    if (-(i64::MAX as i128 + 1)..=i64::MAX as i128).contains(&v) {
        Some(-v)
    } else {
        None
    }
}

fn eval_int_binary(op: BinaryOp, a: i128, b: i128, is_unsigned: bool) -> Option<ConstScalar> {
    let int = |v: Option<i128>| v.map(ConstScalar::Int);
    match op {
        BinaryOp::Add => int(a.checked_add(b).and_then(in_range)),
        BinaryOp::Sub => {
            let result = a.checked_sub(b).and_then(in_range)?;
            if is_unsigned && result < 0 {
                return None;
            }
            Some(ConstScalar::Int(result))
        }
        BinaryOp::Mul => int(a.checked_mul(b).and_then(in_range)),
        BinaryOp::Div => {
            if b == 0 {
                return None;
            }
            int(a.checked_div(b).and_then(in_range))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return None;
            }
            int(a.checked_rem(b).and_then(in_range))
        }
        BinaryOp::Eq => Some(ConstScalar::Bool(a == b)),
        BinaryOp::Ne => Some(ConstScalar::Bool(a != b)),
        BinaryOp::Lt => Some(ConstScalar::Bool(a < b)),
        BinaryOp::Le => Some(ConstScalar::Bool(a <= b)),
        BinaryOp::Gt => Some(ConstScalar::Bool(a > b)),
        BinaryOp::Ge => Some(ConstScalar::Bool(a >= b)),
        BinaryOp::BitAnd => int(Some(a & b)),
        BinaryOp::BitOr => int(Some(a | b)),
        BinaryOp::BitXor => int(Some(a ^ b)),
        BinaryOp::Shl => int(u32::try_from(b).ok().and_then(|s| a.checked_shl(s)).and_then(in_range)),
        BinaryOp::Shr => int(u32::try_from(b).ok().and_then(|s| a.checked_shr(s)).and_then(in_range)),
        BinaryOp::And | BinaryOp::Or => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_overflow_fails() {
        assert_eq!(
            eval_int_binary(BinaryOp::Add, RANGE_MAX, 1, false),
            None
        );
        assert_eq!(
            eval_int_binary(BinaryOp::Add, 2, 3, false),
            Some(ConstScalar::Int(5))
        );
    }

    #[test]
    fn unsigned_subtraction_below_zero_fails() {
        assert_eq!(eval_int_binary(BinaryOp::Sub, 1, 2, true), None);
        assert_eq!(
            eval_int_binary(BinaryOp::Sub, 1, 2, false),
            Some(ConstScalar::Int(-1))
        );
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(eval_int_binary(BinaryOp::Div, 1, 0, false), None);
        assert_eq!(eval_int_binary(BinaryOp::Mod, 1, 0, false), None);
    }

    #[test]
    fn negation_range_is_i64() {
        assert_eq!(negate_checked(i64::MAX as i128), Some(-(i64::MAX as i128)));
        // The lower bound -(i64::MAX + 1) = i64::MIN is inside the domain.
        assert_eq!(negate_checked(i64::MIN as i128), Some(i64::MAX as i128 + 1));
        // Anything past i64::MAX is already outside it.
        assert_eq!(negate_checked(i64::MAX as i128 + 1), None);
    }

    #[test]
    fn comparisons_fold_to_bool() {
        assert_eq!(
            eval_int_binary(BinaryOp::Lt, 1, 2, false),
            Some(ConstScalar::Bool(true))
        );
        assert_eq!(
            eval_int_binary(BinaryOp::Eq, 4, 4, false),
            Some(ConstScalar::Bool(true))
        );
    }
}
