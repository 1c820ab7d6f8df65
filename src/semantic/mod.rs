//! Semantic layer: directive resolution and element models.
//!
//! Resolution validates each directive against what is known about its
//! target (kind, readability, declared owner) and produces a [`ResolvedUnit`]
//! plus resolution diagnostics. The functions here are pure: the context
//! façade gathers target information from the cache and passes it in, so
//! this layer never touches engine state.

mod element;
mod resolve;

pub use element::{LibraryElement, MarkupElement};
pub use resolve::{
    ResolvedReference, ResolvedUnit, TargetInfo, TargetStatus, resolve_markup, resolve_unit,
};
