//! Engine failure types.
//!
//! These are failures of the *analysis machinery*, distinct from diagnostics
//! in analyzed code. They stay local to the forcing call that triggered them:
//! a broken source never corrupts cached results for unrelated sources.

use thiserror::Error;

use crate::cache::DataDescriptor;

/// A failure raised by a forcing `compute_*` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The source's content could not be read. The affected descriptors move
    /// to the error state and stay there until content is resupplied.
    #[error("content for '{path}' could not be read: {reason}")]
    ContentUnavailable { path: String, reason: String },

    /// A computation re-entered a descriptor already being computed on this
    /// call stack. This is an engine contract violation, reported instead of
    /// recursing forever.
    #[error("recursive computation of {descriptor:?} for '{path}'")]
    Cycle {
        path: String,
        descriptor: DataDescriptor,
    },
}

impl AnalysisError {
    pub fn content_unavailable(path: impl Into<String>, reason: impl ToString) -> AnalysisError {
        AnalysisError::ContentUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_content_unavailable(&self) -> bool {
        matches!(self, AnalysisError::ContentUnavailable { .. })
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, AnalysisError::Cycle { .. })
    }
}
