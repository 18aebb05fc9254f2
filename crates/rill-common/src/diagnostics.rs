//! Diagnostics - the stable error surface of semantic analysis.
//!
//! Every violation the sema core detects is reported through one of the
//! named codes below. Rendering (colors, source excerpts, locale) is the
//! driver's job; the core only produces structured `Diagnostic` values and
//! hands them to a caller-supplied `DiagnosticSink`.
//!
//! Reporting rules:
//! - each root cause yields exactly one primary error; dependent failures
//!   propagate sentinels instead of re-reporting
//! - secondary locations ("previous borrow of `x` occurs here") travel as
//!   `Related` entries
//! - fix suggestions are separate from the message body and carry an
//!   `Applicability` so tooling knows which ones are safe to auto-apply

use crate::span::Span;
use serde::Serialize;

// =============================================================================
// Codes
// =============================================================================

/// Stable diagnostic codes emitted by the sema core.
///
/// The numeric values are part of the tooling surface; append new codes,
/// never renumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum Code {
    TypeMismatch = 3001,
    UnresolvedSymbol = 3002,
    IntLiteralOutOfRange = 3003,

    BorrowConflict = 3101,
    BorrowMutation = 3102,
    BorrowMove = 3103,
    UseAfterMove = 3104,
    TaskNotAwaited = 3105,

    ContractMissingField = 3201,
    ContractMissingMethod = 3202,
    ContractMethodMismatch = 3203,
    ContractMethodAttrMismatch = 3204,
    ContractFieldTypeError = 3205,
    ContractFieldAttrMismatch = 3206,
    ContractSelfType = 3207,
    ContractBoundNotFound = 3208,
    ContractBoundNotContract = 3209,
    ContractBoundDuplicate = 3210,
    ContractBoundTypeError = 3211,
    ContractUnusedTypeParam = 3212,
    ContractMethodBody = 3213,
    ContractDuplicateField = 3214,
    ContractDuplicateMethod = 3215,

    ConstCycle = 3301,
    ConstNotConstant = 3302,

    AmbiguousOverload = 3401,
    NoOverload = 3402,
    AmbiguousConversion = 3403,
    TrivialRecursion = 3404,

    RecursiveUnsized = 3501,

    EntrypointNoModeRequiresNoArgs = 3601,
    EntrypointReturnNotConvertible = 3602,
    EntrypointParamNoFromArgv = 3603,
    EntrypointParamNoFromStdin = 3604,

    AtomicDirectAccess = 3701,
    AttrReadonlyWrite = 3702,
    AttrGuardedByNotField = 3703,
    AttrGuardedByNotLock = 3704,
    AttrAtomicInvalidType = 3705,

    ModuleMemberNotFound = 3801,
    ModuleMemberNotPublic = 3802,
    ExternDuplicateField = 3803,
    ExternUnknownAttr = 3804,
    RawPointerNotAllowed = 3805,
}

impl Code {
    /// Stable textual name, e.g. `SemaTypeMismatch`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Code::TypeMismatch => "SemaTypeMismatch",
            Code::UnresolvedSymbol => "SemaUnresolvedSymbol",
            Code::IntLiteralOutOfRange => "SemaIntLiteralOutOfRange",
            Code::BorrowConflict => "SemaBorrowConflict",
            Code::BorrowMutation => "SemaBorrowMutation",
            Code::BorrowMove => "SemaBorrowMove",
            Code::UseAfterMove => "SemaUseAfterMove",
            Code::TaskNotAwaited => "SemaTaskNotAwaited",
            Code::ContractMissingField => "SemaContractMissingField",
            Code::ContractMissingMethod => "SemaContractMissingMethod",
            Code::ContractMethodMismatch => "SemaContractMethodMismatch",
            Code::ContractMethodAttrMismatch => "SemaContractMethodAttrMismatch",
            Code::ContractFieldTypeError => "SemaContractFieldTypeError",
            Code::ContractFieldAttrMismatch => "SemaContractFieldAttrMismatch",
            Code::ContractSelfType => "SemaContractSelfType",
            Code::ContractBoundNotFound => "SemaContractBoundNotFound",
            Code::ContractBoundNotContract => "SemaContractBoundNotContract",
            Code::ContractBoundDuplicate => "SemaContractBoundDuplicate",
            Code::ContractBoundTypeError => "SemaContractBoundTypeError",
            Code::ContractUnusedTypeParam => "SemaContractUnusedTypeParam",
            Code::ContractMethodBody => "SemaContractMethodBody",
            Code::ContractDuplicateField => "SemaContractDuplicateField",
            Code::ContractDuplicateMethod => "SemaContractDuplicateMethod",
            Code::ConstCycle => "SemaConstCycle",
            Code::ConstNotConstant => "SemaConstNotConstant",
            Code::AmbiguousOverload => "SemaAmbiguousOverload",
            Code::NoOverload => "SemaNoOverload",
            Code::AmbiguousConversion => "SemaAmbiguousConversion",
            Code::TrivialRecursion => "SemaTrivialRecursion",
            Code::RecursiveUnsized => "SemaRecursiveUnsized",
            Code::EntrypointNoModeRequiresNoArgs => "SemaEntrypointNoModeRequiresNoArgs",
            Code::EntrypointReturnNotConvertible => "SemaEntrypointReturnNotConvertible",
            Code::EntrypointParamNoFromArgv => "SemaEntrypointParamNoFromArgv",
            Code::EntrypointParamNoFromStdin => "SemaEntrypointParamNoFromStdin",
            Code::AtomicDirectAccess => "SemaAtomicDirectAccess",
            Code::AttrReadonlyWrite => "SemaAttrReadonlyWrite",
            Code::AttrGuardedByNotField => "SemaAttrGuardedByNotField",
            Code::AttrGuardedByNotLock => "SemaAttrGuardedByNotLock",
            Code::AttrAtomicInvalidType => "SemaAttrAtomicInvalidType",
            Code::ModuleMemberNotFound => "SemaModuleMemberNotFound",
            Code::ModuleMemberNotPublic => "SemaModuleMemberNotPublic",
            Code::ExternDuplicateField => "SemaExternDuplicateField",
            Code::ExternUnknownAttr => "SemaExternUnknownAttr",
            Code::RawPointerNotAllowed => "SemaRawPointerNotAllowed",
        }
    }

    /// Numeric code for tooling.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Default severity for this code.
    pub const fn severity(self) -> Severity {
        match self {
            Code::TrivialRecursion => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A secondary location attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Related {
    pub span: Span,
    pub message: String,
}

/// How safe a fix suggestion is to apply without review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Applicability {
    /// The fix is mechanical and preserves semantics (e.g. widening an
    /// annotation to the actual type).
    MachineApplicable,
    /// The fix changes observable behavior or needs a human decision
    /// (e.g. inserting an explicit `to T` cast).
    ManualReview,
}

/// A suggested edit attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FixSuggestion {
    pub message: String,
    /// Replacement text for `span`, when the fix is a concrete edit.
    pub replacement: Option<String>,
    pub span: Span,
    pub applicability: Applicability,
}

/// A structured diagnostic produced by semantic analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    pub related: Vec<Related>,
    pub fixes: Vec<FixSuggestion>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity.
    pub fn new(code: Code, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: code.severity(),
            span,
            message: message.into(),
            related: Vec::new(),
            fixes: Vec::new(),
        }
    }

    /// Attach a secondary location.
    #[must_use]
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(Related {
            span,
            message: message.into(),
        });
        self
    }

    /// Attach a fix suggestion.
    #[must_use]
    pub fn with_fix(mut self, fix: FixSuggestion) -> Self {
        self.fixes.push(fix);
        self
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Caller-supplied reporter. Diagnostics are emitted as encountered and
/// never reordered.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// A sink that collects diagnostics into a vector. Used by tests and by
/// drivers that render after the walk completes.
#[derive(Debug, Default)]
pub struct VecSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics with the given code, in emission order.
    pub fn with_code(&self, code: Code) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.code == code).collect()
    }

    pub fn has_code(&self, code: Code) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

impl DiagnosticSink for VecSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Code::TypeMismatch.code(), 3001);
        assert_eq!(Code::TaskNotAwaited.as_str(), "SemaTaskNotAwaited");
        assert_eq!(Code::RawPointerNotAllowed.code(), 3805);
    }

    #[test]
    fn trivial_recursion_is_a_warning() {
        assert_eq!(Code::TrivialRecursion.severity(), Severity::Warning);
        assert_eq!(Code::UseAfterMove.severity(), Severity::Error);
    }

    #[test]
    fn vec_sink_preserves_order() {
        let mut sink = VecSink::new();
        sink.report(Diagnostic::new(Code::TypeMismatch, Span::new(0, 1), "a"));
        sink.report(Diagnostic::new(Code::UseAfterMove, Span::new(2, 3), "b"));
        assert_eq!(sink.diagnostics.len(), 2);
        assert_eq!(sink.diagnostics[0].code, Code::TypeMismatch);
        assert!(sink.has_code(Code::UseAfterMove));
    }
}
