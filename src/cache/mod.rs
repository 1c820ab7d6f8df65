//! Cache: per-source entries, descriptor state machine, bounded store.
//!
//! The [`AnalysisCache`] owns every [`SourceEntry`] and enforces the heavy-
//! artifact ceiling: parsed and resolved units are the memory-heavy values,
//! and when more of them accumulate than the configured bound allows, the
//! oldest-used unprotected ones are demoted back to invalid. Eviction is
//! transparent — a later forcing read recomputes silently.
//!
//! The cache is owned exclusively by the context façade; nothing else
//! mutates entries.

mod descriptor;
mod entry;
mod state;

pub use descriptor::DataDescriptor;
pub use entry::{EntryData, MarkupData, ResolutionData, SourceEntry, UnitData};
pub use state::{CacheSlot, CacheState};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::base::{Source, SourceKind};

/// Entry store with heavy-artifact accounting.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: FxHashMap<Source, SourceEntry>,
    /// Sources ordered by last heavy-artifact use, oldest first.
    recently_used: Vec<Source>,
}

impl AnalysisCache {
    pub fn new() -> AnalysisCache {
        AnalysisCache::default()
    }

    pub fn get(&self, source: Source) -> Option<&SourceEntry> {
        self.entries.get(&source)
    }

    pub fn get_mut(&mut self, source: Source) -> Option<&mut SourceEntry> {
        self.entries.get_mut(&source)
    }

    pub fn contains(&self, source: Source) -> bool {
        self.entries.contains_key(&source)
    }

    /// Entry for a source, created (all-invalid) on first access.
    pub fn entry_mut(&mut self, source: Source, kind_hint: SourceKind) -> &mut SourceEntry {
        self.entries
            .entry(source)
            .or_insert_with(|| SourceEntry::new(kind_hint))
    }

    /// Drop a source's entry entirely (source removed from the universe).
    pub fn remove(&mut self, source: Source) -> Option<SourceEntry> {
        self.recently_used.retain(|&s| s != source);
        self.entries.remove(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Source, &SourceEntry)> {
        self.entries.iter().map(|(&s, e)| (s, e))
    }

    /// Total heavy artifacts across all entries.
    pub fn heavy_count(&self) -> usize {
        self.entries.values().map(SourceEntry::heavy_count).sum()
    }

    /// Record that a heavy artifact for `source` was produced or read,
    /// moving the source to the young end of the eviction order.
    pub fn touch(&mut self, source: Source) {
        self.recently_used.retain(|&s| s != source);
        self.recently_used.push(source);
    }

    /// Demote heavy artifacts until at most `ceiling` remain, skipping
    /// sources for which `protected` returns true (pinned sources and
    /// entries with a computation in flight). The youngest entry is never
    /// flushed: it is the source being worked on right now, and flushing it
    /// would force the driver to redo the work it just finished.
    ///
    /// Returns the sources whose artifacts were flushed. The bound can be
    /// exceeded transiently when everything over it is protected.
    pub fn enforce_ceiling(
        &mut self,
        ceiling: usize,
        protected: impl Fn(Source) -> bool,
    ) -> Vec<Source> {
        let mut excess = self.heavy_count().saturating_sub(ceiling);
        if excess == 0 {
            return Vec::new();
        }
        let mut flushed = Vec::new();
        let older = self.recently_used.len().saturating_sub(1);
        let order: Vec<Source> = self.recently_used[..older].to_vec();
        for source in order {
            if excess == 0 {
                break;
            }
            if protected(source) {
                continue;
            }
            let Some(entry) = self.entries.get_mut(&source) else {
                continue;
            };
            if entry.has_in_process() {
                continue;
            }
            let dropped = entry.flush_heavy();
            if dropped > 0 {
                debug!(?source, dropped, "evicted heavy artifacts");
                excess = excess.saturating_sub(dropped);
                flushed.push(source);
            }
        }
        self.recently_used.retain(|s| !flushed.contains(s));
        flushed
    }
}
