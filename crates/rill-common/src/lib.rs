//! Common types and utilities for the Rill compiler.
//!
//! This crate provides foundational types used across all rill crates:
//! - String interning (`Atom`, `StringInterner`)
//! - Source spans (`Span`, `Spanned`)
//! - Diagnostics (`Code`, `Diagnostic`, `DiagnosticSink`, fix suggestions)
//! - Centralized limits and thresholds

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, StringInterner};

// Span - source location tracking (byte offsets)
pub mod span;
pub use span::{Span, Spanned};

// Diagnostics - the stable error surface of semantic analysis
pub mod diagnostics;
pub use diagnostics::{
    Applicability, Code, Diagnostic, DiagnosticSink, FixSuggestion, Related, Severity, VecSink,
};

// Centralized limits and thresholds
pub mod limits;
