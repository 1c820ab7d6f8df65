//! Priority-bucketed pending-work queue.
//!
//! The [`WorkManager`] holds every source with outstanding analysis work,
//! one FIFO per priority class, walked in a fixed precedence: explicitly
//! pinned sources first, then markup units, libraries, ordinary parts, and
//! finally unclassified sources. A source appears at most once across all
//! classes; re-adding an already-queued source leaves it where it is.
//!
//! The queue holds *what* is pending, never cached results; reprioritizing
//! touches no cache state.

use indexmap::IndexSet;
use tracing::trace;

use crate::base::{Source, SourceKind};

/// Priority classes, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourcePriority {
    /// Explicitly pinned via the analysis priority order.
    Priority = 0,
    /// Markup units.
    Markup = 1,
    /// Library defining units.
    Library = 2,
    /// Ordinary included parts.
    NormalPart = 3,
    /// Not yet classified.
    Unknown = 4,
}

impl SourcePriority {
    pub const COUNT: usize = 5;

    /// The class a source of this kind belongs to when it is not pinned.
    pub fn for_kind(kind: SourceKind) -> SourcePriority {
        match kind {
            SourceKind::Markup => SourcePriority::Markup,
            SourceKind::Library => SourcePriority::Library,
            SourceKind::Part => SourcePriority::NormalPart,
            SourceKind::Unknown => SourcePriority::Unknown,
        }
    }

    fn all() -> [SourcePriority; Self::COUNT] {
        [
            SourcePriority::Priority,
            SourcePriority::Markup,
            SourcePriority::Library,
            SourcePriority::NormalPart,
            SourcePriority::Unknown,
        ]
    }
}

/// Pending-work queue.
#[derive(Debug, Default)]
pub struct WorkManager {
    queues: [IndexSet<Source>; SourcePriority::COUNT],
}

impl WorkManager {
    pub fn new() -> WorkManager {
        WorkManager::default()
    }

    /// Append a source to its class's tail. A source already queued
    /// anywhere is left in place.
    pub fn add(&mut self, source: Source, priority: SourcePriority) {
        if self.contains(source) {
            return;
        }
        trace!(?source, ?priority, "queueing source");
        self.queues[priority as usize].insert(source);
    }

    /// Insert a source at its class's head, for urgent re-insertion of a
    /// source with work still outstanding. Moves the source if queued.
    pub fn add_first(&mut self, source: Source, priority: SourcePriority) {
        self.remove(source);
        self.queues[priority as usize].shift_insert(0, source);
    }

    /// Remove a source from whichever class holds it; no-op if absent.
    pub fn remove(&mut self, source: Source) {
        for queue in &mut self.queues {
            if queue.shift_remove(&source) {
                return;
            }
        }
    }

    /// Atomically reclassify exactly `sources` into the top class, in the
    /// given order. Returns the previously pinned sources that are not in
    /// the new order, so the caller can requeue them under their kind-derived
    /// classes. Cache contents are untouched.
    pub fn set_priority_order(&mut self, sources: &[Source]) -> Vec<Source> {
        let demoted: Vec<Source> = self.queues[SourcePriority::Priority as usize]
            .iter()
            .copied()
            .filter(|s| !sources.contains(s))
            .collect();
        self.queues[SourcePriority::Priority as usize].clear();
        for &source in sources {
            self.remove(source);
            self.queues[SourcePriority::Priority as usize].insert(source);
        }
        demoted
    }

    /// Head of the highest-precedence non-empty class.
    pub fn next_source(&self) -> Option<Source> {
        self.queues
            .iter()
            .find_map(|queue| queue.first().copied())
    }

    /// Walk all classes in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = Source> + '_ {
        self.queues.iter().flat_map(|queue| queue.iter().copied())
    }

    pub fn contains(&self, source: Source) -> bool {
        self.queues.iter().any(|queue| queue.contains(&source))
    }

    /// The class currently holding a source.
    pub fn priority_of(&self, source: Source) -> Option<SourcePriority> {
        SourcePriority::all()
            .into_iter()
            .find(|&p| self.queues[p as usize].contains(&source))
    }

    pub fn is_pinned(&self, source: Source) -> bool {
        self.queues[SourcePriority::Priority as usize].contains(&source)
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(IndexSet::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRegistry;

    fn sources(n: usize) -> Vec<Source> {
        let mut registry = SourceRegistry::new();
        (0..n).map(|i| registry.intern(&format!("s{i}.lm"))).collect()
    }

    #[test]
    fn test_precedence_order() {
        let s = sources(4);
        let mut work = WorkManager::new();
        work.add(s[0], SourcePriority::NormalPart);
        work.add(s[1], SourcePriority::Library);
        work.add(s[2], SourcePriority::Markup);
        work.add(s[3], SourcePriority::Unknown);

        let order: Vec<Source> = work.iter().collect();
        assert_eq!(order, vec![s[2], s[1], s[0], s[3]]);
        assert_eq!(work.next_source(), Some(s[2]));
    }

    #[test]
    fn test_fifo_within_class() {
        let s = sources(3);
        let mut work = WorkManager::new();
        for &source in &s {
            work.add(source, SourcePriority::Library);
        }
        let order: Vec<Source> = work.iter().collect();
        assert_eq!(order, s);
    }

    #[test]
    fn test_duplicate_add_keeps_position() {
        let s = sources(3);
        let mut work = WorkManager::new();
        work.add(s[0], SourcePriority::Library);
        work.add(s[1], SourcePriority::Library);
        work.add(s[0], SourcePriority::Library);
        work.add(s[0], SourcePriority::Markup);

        let order: Vec<Source> = work.iter().collect();
        assert_eq!(order, vec![s[0], s[1]]);
    }

    #[test]
    fn test_add_first_moves_to_head() {
        let s = sources(3);
        let mut work = WorkManager::new();
        work.add(s[0], SourcePriority::Library);
        work.add(s[1], SourcePriority::Library);
        work.add_first(s[1], SourcePriority::Library);

        assert_eq!(work.next_source(), Some(s[1]));
        assert_eq!(work.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let s = sources(1);
        let mut work = WorkManager::new();
        work.remove(s[0]);
        assert!(work.is_empty());
    }

    #[test]
    fn test_set_priority_order_pins_in_given_order() {
        let s = sources(4);
        let mut work = WorkManager::new();
        work.add(s[0], SourcePriority::Library);
        work.add(s[1], SourcePriority::NormalPart);
        work.add(s[2], SourcePriority::Library);

        let demoted = work.set_priority_order(&[s[2], s[1]]);
        assert!(demoted.is_empty());
        let order: Vec<Source> = work.iter().collect();
        assert_eq!(order, vec![s[2], s[1], s[0]]);
        assert!(work.is_pinned(s[2]));
        assert!(!work.is_pinned(s[0]));
    }

    #[test]
    fn test_set_priority_order_reports_demoted() {
        let s = sources(2);
        let mut work = WorkManager::new();
        work.set_priority_order(&[s[0]]);
        let demoted = work.set_priority_order(&[s[1]]);
        assert_eq!(demoted, vec![s[0]]);
        assert!(!work.contains(s[0]));
    }
}
