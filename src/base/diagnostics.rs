//! Analysis diagnostics.
//!
//! Diagnostics are ordinary analysis *results*, not engine failures: a file
//! full of syntax errors still parses into a (possibly degenerate) unit plus
//! a diagnostic list. Engine failures (unreadable content, reentrant
//! computation) are reported through [`crate::AnalysisError`] instead.

use text_size::TextRange;

use super::Source;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// A hard error in the analyzed code.
    #[default]
    Error,
    /// A warning that does not invalidate the unit.
    Warning,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Categorized diagnostic codes, one per distinct condition the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // --- parse, unit files ---
    /// A directive did not end with `;`.
    ExpectedSemicolon,
    /// A directive needed a string URI and none was found.
    ExpectedUri,
    /// `library` or `part of` needed a dotted name.
    ExpectedName,
    /// A second `library` directive in the same unit.
    DuplicateLibraryDirective,
    /// `library` and `part of` in the same unit.
    ConflictingUnitDirectives,
    /// A string literal ran to the end of the line or file.
    UnterminatedString,
    /// A `/*` comment never closed.
    UnterminatedComment,

    // --- parse, markup files ---
    /// A `<script>` tag without a `src` attribute.
    MissingScriptSource,
    /// A `<script` tag that never closed.
    UnclosedScriptTag,

    // --- resolution ---
    /// A directive URI names no readable source.
    UriNotFound,
    /// `import`/`export` points at something that is not a library.
    TargetNotLibrary,
    /// A `part` directive points at a unit with no `part of`.
    TargetIsLibrary,
    /// A part's `part of` names a different library.
    PartOfNameMismatch,
    /// A markup `src` reference names no readable source.
    DanglingScriptReference,
    /// A markup `src` reference points at a part, not a library.
    ScriptIsNotLibrary,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpectedSemicolon => "expected-semicolon",
            Self::ExpectedUri => "expected-uri",
            Self::ExpectedName => "expected-name",
            Self::DuplicateLibraryDirective => "duplicate-library-directive",
            Self::ConflictingUnitDirectives => "conflicting-unit-directives",
            Self::UnterminatedString => "unterminated-string",
            Self::UnterminatedComment => "unterminated-comment",
            Self::MissingScriptSource => "missing-script-source",
            Self::UnclosedScriptTag => "unclosed-script-tag",
            Self::UriNotFound => "uri-not-found",
            Self::TargetNotLibrary => "target-not-library",
            Self::TargetIsLibrary => "target-is-library",
            Self::PartOfNameMismatch => "part-of-name-mismatch",
            Self::DanglingScriptReference => "dangling-script-reference",
            Self::ScriptIsNotLibrary => "script-is-not-library",
        }
    }

    /// Whether this code is produced by resolution (as opposed to parsing).
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UriNotFound
                | Self::TargetNotLibrary
                | Self::TargetIsLibrary
                | Self::PartOfNameMismatch
                | Self::DanglingScriptReference
                | Self::ScriptIsNotLibrary
        )
    }
}

/// One reported condition in one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source: Source,
    pub range: TextRange,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        source: Source,
        range: TextRange,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic {
            source,
            range,
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(
        source: Source,
        range: TextRange,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic {
            source,
            range,
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}
