//! Semantic analysis core for the Rill compiler.
//!
//! Given a parsed module and its resolved symbol table, the checker
//! computes the type of every expression, enforces contract bounds on
//! generics, tracks borrows with lexical lifetimes, tracks moved
//! bindings through branching control flow, enforces the structured
//! concurrency obligation on spawned tasks, and emits typed diagnostics.
//!
//! Module map:
//! - `intern` - hash-consed type store
//! - `borrow_checker` / `move_checker` / `task_checker` - per-function trackers
//! - `magic_methods` - operator and coercion dispatch table
//! - `const_eval` - fixed-point constant evaluation
//! - `type_resolver` - AST type expressions to `TypeId`s
//! - `declarations` - two-pass declaration population and instantiation
//! - `contract_checker` - requirement sets and satisfaction
//! - `call_checker` - overload resolution and argument effects
//! - `assignability` - assignable relation and implicit conversions
//! - `expr` / `statements` - the AST walker
//! - `entrypoint_checker` / `layout_checker` - post-pass validators
//!
//! The core is single-threaded; one [`Checker`] instance owns every
//! mutable table. Cancellation is consulted between top-level items.

pub mod assignability;
pub mod borrow_checker;
pub mod call_checker;
pub mod const_eval;
pub mod context;
pub mod contract_checker;
pub mod declarations;
pub mod entrypoint_checker;
pub mod expr;
pub mod intern;
pub mod layout_checker;
pub mod magic_methods;
pub mod move_checker;
pub mod result;
pub mod statements;
pub mod task_checker;
pub mod type_resolver;

pub use assignability::{Conversion, ConversionKind};
pub use borrow_checker::{Borrow, BorrowId, BorrowIssue, BorrowKind, BorrowTable, Place, PlaceKind};
pub use context::{CancelToken, CheckOptions, Checker, ParamSig, Signature};
pub use contract_checker::{BoundInstance, ContractSpec, MethodRequirement};
pub use intern::{FieldInfo, Nominal, TypeData, TypeId, TypeInterner, UnionVariant};
pub use layout_checker::{LayoutEngine, NullLayoutEngine};
pub use magic_methods::{MagicIndex, MagicMethod, MagicSignature};
pub use move_checker::{MoveSnapshot, MoveTracker};
pub use result::CheckResult;
pub use task_checker::{Task, TaskId, TaskTracker};

use rill_ast::Module;
use rill_binder::{ExportMap, SymbolTable};
use rill_common::{DiagnosticSink, StringInterner};
use tracing::debug_span;

/// Run semantic analysis over one file.
///
/// Diagnostics stream into `sink` as they are found; the typed outputs
/// come back as the [`CheckResult`].
pub fn check(
    token: &CancelToken,
    ast: &Module,
    symbols: &SymbolTable,
    exports: &ExportMap,
    strings: &mut StringInterner,
    layout: &dyn LayoutEngine,
    options: &CheckOptions,
    sink: &mut dyn DiagnosticSink,
) -> CheckResult {
    let _span = debug_span!("sema_check").entered();
    let mut checker = Checker::new(ast, symbols, exports, strings, layout, options, sink);
    checker.declare_items();
    checker.check_bodies(token);
    checker.check_entrypoints();
    checker.check_layouts();
    checker.finish()
}
