//! # lumen-analysis
//!
//! Incremental analysis engine for Lumen libraries, parts, and markup files.
//!
//! The engine maintains derived artifacts (parsed units, resolved units,
//! diagnostics, line tables) over a mutable universe of sources and keeps them
//! consistent as files are added, edited, or removed — recomputing only what a
//! change actually stales.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! context   → AnalysisContext façade: change application, cooperative
//!   ↓         single-step driver, forcing/peeking reads, eviction
//! project   → Content providers, directory scanning
//!   ↓
//! cache     → Per-source entries, descriptor states, bounded artifact cache
//! graph     → Reverse-dependency index
//! scheduler → Priority-bucketed pending-work queue
//!   ↓
//! semantic  → Directive resolution, library/markup element models
//! syntax    → Logos lexer, directive parser, markup scanner
//!   ↓
//! base      → Primitives (Source identity, LineIndex, Diagnostic)
//! ```
//!
//! The driving loop belongs to the host: it feeds [`ChangeSet`]s in via
//! [`AnalysisContext::apply_change_set`] and calls
//! [`AnalysisContext::perform_analysis_task`] until it returns `None`.

/// Foundation types: Source identity, line tables, diagnostics
pub mod base;

/// Syntax: directive lexer and parser, markup scanner
pub mod syntax;

/// Semantic: directive resolution and element models
pub mod semantic;

/// Cache: per-source entries, descriptor state machine, bounded store
pub mod cache;

/// Graph: reverse-dependency index
pub mod graph;

/// Scheduler: priority-bucketed pending-work queue
pub mod scheduler;

/// Context: the public request surface
pub mod context;

/// Project: content providers and workspace scanning
pub mod project;

mod error;

pub use error::AnalysisError;

// Re-export foundation and façade types
pub use base::{Diagnostic, DiagnosticCode, LineIndex, Severity, Source, SourceKind};
pub use context::{AnalysisContext, AnalysisOptions, ChangeNotice, ChangeSet, SharedAnalysisContext};
