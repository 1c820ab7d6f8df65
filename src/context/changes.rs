//! Change sets and change notices.
//!
//! A [`ChangeSet`] batches the add/change/remove events a host has observed;
//! [`AnalysisContext::apply_change_set`](super::AnalysisContext::apply_change_set)
//! translates it into cache invalidation, dependency propagation, and
//! re-enqueued work. A [`ChangeNotice`] is the inverse direction: one
//! source's newly available results from a single analysis step.

use std::sync::Arc;

use text_size::TextSize;
use tracing::debug;

use crate::base::{Diagnostic, LineIndex, Source};
use crate::cache::DataDescriptor;

use super::AnalysisContext;
use super::incremental::IncrementalEditCache;

/// Batched source events, built fluently:
///
/// ```ignore
/// let changes = ChangeSet::new()
///     .added(app)
///     .changed_content(util, "library util;")
///     .removed(old);
/// context.apply_change_set(changes);
/// ```
#[derive(Default)]
pub struct ChangeSet {
    pub(super) added: Vec<Source>,
    pub(super) changed: Vec<(Source, Option<Arc<str>>)>,
    pub(super) removed: Vec<Source>,
    pub(super) removed_containers: Vec<Box<dyn SourceContainer>>,
}

impl ChangeSet {
    pub fn new() -> ChangeSet {
        ChangeSet::default()
    }

    /// A source joined the analyzed universe.
    pub fn added(mut self, source: Source) -> ChangeSet {
        self.added.push(source);
        self
    }

    /// A source's content changed; the new text is fetched on demand.
    pub fn changed(mut self, source: Source) -> ChangeSet {
        self.changed.push((source, None));
        self
    }

    /// A source's content changed to the given text.
    pub fn changed_content(mut self, source: Source, text: impl Into<Arc<str>>) -> ChangeSet {
        self.changed.push((source, Some(text.into())));
        self
    }

    /// A source left the analyzed universe.
    pub fn removed(mut self, source: Source) -> ChangeSet {
        self.removed.push(source);
        self
    }

    /// Every known source matching the container predicate left the
    /// analyzed universe.
    pub fn removed_container(mut self, container: impl SourceContainer + 'static) -> ChangeSet {
        self.removed_containers.push(Box::new(container));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.removed_containers.is_empty()
    }
}

impl std::fmt::Debug for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSet")
            .field("added", &self.added)
            .field("changed", &self.changed.len())
            .field("removed", &self.removed)
            .field("removed_containers", &self.removed_containers.len())
            .finish()
    }
}

/// Containment predicate over source paths, for container removal.
pub trait SourceContainer: Send + Sync {
    fn contains(&self, path: &str) -> bool;
}

/// Container matching every path under a directory prefix.
#[derive(Debug, Clone)]
pub struct DirectoryContainer {
    prefix: String,
}

impl DirectoryContainer {
    /// `prefix` is a `/`-separated directory path, with or without a
    /// trailing slash.
    pub fn new(prefix: impl Into<String>) -> DirectoryContainer {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        DirectoryContainer { prefix }
    }
}

impl SourceContainer for DirectoryContainer {
    fn contains(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

impl<F> SourceContainer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn contains(&self, path: &str) -> bool {
        self(path)
    }
}

/// What newly became available for one source in one analysis step.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub source: Source,
    /// Line table, when it newly became available.
    pub line_info: Option<Arc<LineIndex>>,
    /// Diagnostics, when they newly became available.
    pub errors: Option<Vec<Diagnostic>>,
}

impl ChangeNotice {
    pub(super) fn new(source: Source) -> ChangeNotice {
        ChangeNotice {
            source,
            line_info: None,
            errors: None,
        }
    }
}

impl AnalysisContext {
    /// Apply a batch of source events: create entries for additions,
    /// invalidate (with dependency propagation) for changes, drop entries
    /// for removals, and re-enqueue everything affected.
    pub fn apply_change_set(&mut self, changes: ChangeSet) {
        debug!(?changes, "applying change set");
        for &source in &changes.added {
            self.add_source(source);
        }
        for (source, content) in changes.changed {
            self.source_changed(source, content);
        }
        for &source in &changes.removed {
            self.source_removed(source);
        }
        for container in &changes.removed_containers {
            let matching: Vec<Source> = self
                .cache
                .sources()
                .filter(|&source| container.contains(self.registry.path(source)))
                .collect();
            for source in matching {
                self.source_removed(source);
            }
        }
    }

    /// Supply (or withdraw, with `None`) the full content of a source,
    /// invalidating everything derived from it.
    pub fn set_contents(&mut self, source: Source, content: Option<&str>) {
        match content {
            Some(text) => self.source_changed(source, Some(Arc::from(text))),
            None => {
                self.overlay.remove(&source);
                self.source_changed(source, None);
            }
        }
    }

    /// Supply an edited content version described as a single text delta,
    /// feeding the incremental edit cache so a burst of contiguous edits can
    /// reuse the previous resolution.
    pub fn set_changed_contents(
        &mut self,
        source: Source,
        text: &str,
        offset: u32,
        old_length: u32,
        new_length: u32,
    ) {
        // Capture the pre-edit state before invalidation drops it.
        let prior = self.content_if_available(source);
        let last_resolution = self.cache.get(source).and_then(|entry| {
            let data = entry.unit()?;
            let mut candidates = vec![source];
            candidates.extend(data.resolved_in());
            candidates.into_iter().find_map(|library| {
                let resolution = data.resolution(library)?;
                Some((
                    resolution.resolved_unit.get()?.clone(),
                    resolution.errors.get()?.clone(),
                ))
            })
        });
        let current = self.incremental.take();

        let new_text: Arc<str> = Arc::from(text);
        self.source_changed(source, Some(new_text.clone()));

        self.incremental = IncrementalEditCache::update(
            current,
            source,
            prior,
            new_text,
            TextSize::new(offset),
            TextSize::new(old_length),
            TextSize::new(new_length),
            last_resolution,
        );
    }

    // ---- individual event rules ----

    pub(super) fn add_source(&mut self, source: Source) {
        let hint = self.registry.kind_hint(source);
        self.cache.entry_mut(source, hint);
        self.requeue(source);
        self.incremental = IncrementalEditCache::clear(self.incremental.take(), source);
    }

    pub(super) fn source_changed(&mut self, source: Source, content: Option<Arc<str>>) {
        if !self.cache.contains(source) {
            // A change to an unknown source is an addition.
            if let Some(text) = content {
                self.overlay.insert(source, text);
            }
            self.registry.bump_stamp(source);
            self.add_source(source);
            return;
        }
        if let Some(text) = content {
            self.overlay.insert(source, text);
        }
        self.registry.bump_stamp(source);
        if let Some(entry) = self.cache.get_mut(source) {
            entry.invalidate_all();
        }
        self.invalidate_dependents(source);
        self.requeue(source);
        self.incremental = IncrementalEditCache::clear(self.incremental.take(), source);
    }

    pub(super) fn source_removed(&mut self, source: Source) {
        debug!(path = %self.registry.path(source), "removing source");
        self.overlay.remove(&source);
        self.cache.remove(source);
        self.work.remove(source);
        // Dependents now hold dangling references and must be re-diagnosed.
        self.invalidate_dependents(source);
        self.graph.remove_source(source);
        self.priority_order.retain(|&s| s != source);
        self.incremental = IncrementalEditCache::clear(self.incremental.take(), source);
    }

    /// A source's content changed shape: every reverse dependent loses the
    /// artifacts that were derived against it and goes back to the queue.
    fn invalidate_dependents(&mut self, source: Source) {
        let dependents = self.graph.dependents_of(source);
        for dependent in dependents {
            let Some(entry) = self.cache.get_mut(dependent) else {
                continue;
            };
            if entry.is_markup() {
                entry.invalidate(DataDescriptor::ResolutionErrors);
                entry.invalidate(DataDescriptor::Element);
            } else {
                entry.invalidate(DataDescriptor::ResolvedUnit);
                entry.invalidate(DataDescriptor::ClientFlag);
            }
            self.requeue(dependent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRegistry;

    #[test]
    fn test_change_set_builder() {
        let mut registry = SourceRegistry::new();
        let a = registry.intern("a.lm");
        let b = registry.intern("b.lm");
        let changes = ChangeSet::new()
            .added(a)
            .changed_content(b, "library b;")
            .removed_container(DirectoryContainer::new("old"));
        assert!(!changes.is_empty());
        assert_eq!(changes.added, vec![a]);
        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.removed_containers.len(), 1);
    }

    #[test]
    fn test_directory_container_prefix() {
        let container = DirectoryContainer::new("pkg/src");
        assert!(container.contains("pkg/src/a.lm"));
        assert!(container.contains("pkg/src/deep/b.lm"));
        assert!(!container.contains("pkg/srcx/a.lm"));
        assert!(!container.contains("other/a.lm"));
    }

    #[test]
    fn test_closure_container() {
        let container = |path: &str| path.ends_with(".lmx");
        assert!(SourceContainer::contains(&container, "index.lmx"));
        assert!(!SourceContainer::contains(&container, "app.lm"));
    }
}
