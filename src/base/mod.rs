//! Foundation types for the Lumen analysis engine.
//!
//! This module provides fundamental types used throughout the engine:
//! - [`Source`], [`SourceRegistry`] - Interned source identities
//! - [`SourceKind`] - Library / part / markup classification
//! - [`LineIndex`], [`LineCol`] - Offset to line/column conversion
//! - [`Diagnostic`], [`Severity`], [`DiagnosticCode`] - Analysis diagnostics
//!
//! This module has NO dependencies on other lumen modules.

mod diagnostics;
mod line_index;
mod source;

pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use line_index::{LineCol, LineIndex};
pub use source::{ModificationStamp, Source, SourceKind, SourceRegistry, resolve_reference};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
