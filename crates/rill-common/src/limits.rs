//! Centralized limits and thresholds for the Rill compiler.
//!
//! Shared constants for recursion depths and step counts used throughout
//! the sema core. Centralizing them keeps construction sites consistent
//! and documents the rationale for each value once.

/// Maximum number of alias links followed while resolving a type.
///
/// Ill-formed programs can declare alias loops (`alias A = B; alias B = A`);
/// resolvers stop after this many steps and return the id they are holding,
/// unresolved.
pub const MAX_ALIAS_DEPTH: u32 = 32;

/// Maximum recursion depth for expression type checking.
///
/// Deeply nested expressions add a checker frame per level; past this depth
/// the walker stops descending and yields the sentinel type.
pub const MAX_EXPR_CHECK_DEPTH: u32 = 512;

/// Maximum depth for assignability recursion.
///
/// Mutually recursive unions can make `assignable` revisit the same pair
/// forever; the relation carries a visited set and additionally bails at
/// this depth.
pub const MAX_ASSIGNABILITY_DEPTH: u32 = 64;

/// Maximum number of nested generic instantiations in flight.
///
/// Guards the declaration populator against self-referential generic
/// instances that keep expanding.
pub const MAX_INSTANTIATION_DEPTH: u32 = 64;
