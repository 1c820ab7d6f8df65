//! Incremental edit cache.
//!
//! A one-source fast path for editor keystrokes: while a burst of contiguous
//! edits stays inside one tracked delta, the resolve step can reuse the last
//! resolved unit instead of reparsing the whole file. The cache tracks at
//! most one source at a time; anything it cannot merge abandons the
//! optimization and the next analysis falls back to the full path.

use std::sync::Arc;

use text_size::TextSize;

use crate::base::{Diagnostic, Source};
use crate::semantic::ResolvedUnit;

/// Tracking state for one burst of edits to one source.
#[derive(Debug, Clone)]
pub struct IncrementalEditCache {
    pub source: Source,
    /// Content before the first tracked edit.
    pub old_contents: Arc<str>,
    /// Content after the most recent tracked edit.
    pub new_contents: Arc<str>,
    /// Start of the tracked delta, in both old and new coordinates.
    pub offset: TextSize,
    /// Length of the replaced region in `old_contents`.
    pub old_length: TextSize,
    /// Length of the replacement region in `new_contents`.
    pub new_length: TextSize,
    /// The resolved unit the tracked source had before the burst began.
    pub resolved_unit: Arc<ResolvedUnit>,
    /// Resolution diagnostics that accompanied `resolved_unit`; their ranges
    /// lie in the directive header, which a tracked body edit cannot move.
    pub resolution_errors: Arc<[Diagnostic]>,
}

impl IncrementalEditCache {
    /// Fold one edit into the current tracking state.
    ///
    /// - No resolved unit to reuse: nothing to optimize from, result is no
    ///   cache.
    /// - No current cache, or a different source tracked: start fresh
    ///   tracking with this single edit.
    /// - Same source: merge when the edit falls entirely within the tracked
    ///   delta's region of the new content (edges included); any other edit
    ///   abandons the optimization.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        current: Option<IncrementalEditCache>,
        source: Source,
        old_contents: Option<Arc<str>>,
        new_contents: Arc<str>,
        offset: TextSize,
        old_length: TextSize,
        new_length: TextSize,
        last_resolution: Option<(Arc<ResolvedUnit>, Arc<[Diagnostic]>)>,
    ) -> Option<IncrementalEditCache> {
        if let Some(mut cache) = current {
            if cache.source == source {
                let edit_end = offset + old_length;
                let tracked_end = cache.offset + cache.new_length;
                if cache.offset <= offset && edit_end <= tracked_end {
                    // Widen the tracked delta; the original old content and
                    // resolved unit keep describing the pre-burst state.
                    cache.new_length = cache.new_length - old_length + new_length;
                    cache.new_contents = new_contents;
                    return Some(cache);
                }
                return None;
            }
            // A different source starts a fresh burst below.
        }
        let (resolved_unit, resolution_errors) = last_resolution?;
        let old_contents = old_contents?;
        Some(IncrementalEditCache {
            source,
            old_contents,
            new_contents,
            offset,
            old_length,
            new_length,
            resolved_unit,
            resolution_errors,
        })
    }

    /// Drop the cache iff it tracks `source` (a structural change to the
    /// tracked source invalidates the in-flight optimization).
    pub fn clear(
        current: Option<IncrementalEditCache>,
        source: Source,
    ) -> Option<IncrementalEditCache> {
        current.filter(|cache| cache.source != source)
    }

    /// Whether the tracked delta begins strictly inside the unit's opaque
    /// body, i.e. the directive layer cannot have changed.
    pub fn is_body_edit(&self) -> bool {
        self.resolved_unit
            .header_end
            .is_some_and(|header| self.offset > header)
    }

    /// Signed length change of the tracked delta.
    pub fn length_delta(&self) -> i64 {
        i64::from(u32::from(self.new_length)) - i64::from(u32::from(self.old_length))
    }
}
