//! Project layer: content resolution and workspace scanning.
//!
//! The engine never touches the file system directly; a [`ContentProvider`]
//! supplies raw text for a source path on demand and is allowed to fail.
//! Read failures surface as catchable analysis failures, never crashes.

mod content;
mod scanner;

pub use content::{ContentProvider, FileContentProvider, MemoryContentProvider};
pub use scanner::{ScanError, collect_source_paths};
