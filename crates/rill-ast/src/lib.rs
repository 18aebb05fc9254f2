//! Arena-based AST for the Rill compiler.
//!
//! The parser produces one `Module` per source file: dense arenas of
//! items, statements, expressions and type expressions, addressed by
//! 4-byte ids. Nodes are immutable after parsing; downstream phases key
//! their own side tables by id.
//!
//! This crate is data only. Parsing lives in the parser; name resolution
//! in the binder; typing in sema.

pub mod ids;
pub mod module;
pub mod node;

pub use ids::{ExprId, ItemId, StmtId, TypeExprId};
pub use module::Module;
pub use node::*;
