//! # Analysis context
//!
//! The [`AnalysisContext`] is the engine's single request surface. It owns
//! the cache, the dependency graph, the work queue, the source registry, and
//! the content overlay; nothing else mutates them. Hosts feed change sets in
//! through [`AnalysisContext::apply_change_set`] and drive analysis forward
//! by calling [`AnalysisContext::perform_analysis_task`] until it reports a
//! fixed point.
//!
//! The context is an explicitly constructed, explicitly owned value: create
//! one per analyzed workspace and drop it when the workspace closes. For
//! multi-threaded hosts, [`SharedAnalysisContext`] serializes every call
//! behind one lock.
//!
//! The whole cache is rebuildable from source content: dropping a context
//! and replaying the same change set yields the same observable results,
//! only at recomputation cost.

mod changes;
mod compute;
mod incremental;
mod queries;
mod shared;
mod task;

pub use changes::{ChangeNotice, ChangeSet, DirectoryContainer, SourceContainer};
pub use incremental::IncrementalEditCache;
pub use shared::SharedAnalysisContext;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::AnalysisError;
use crate::base::{Source, SourceKind, SourceRegistry};
use crate::cache::AnalysisCache;
use crate::graph::DependencyGraph;
use crate::project::{ContentProvider, MemoryContentProvider};
use crate::scheduler::{SourcePriority, WorkManager};

/// Tunables for one context.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Ceiling on memory-heavy cached artifacts (parsed and resolved units)
    /// across all entries. Exceeding it evicts the oldest-used unprotected
    /// artifacts.
    pub max_cache_size: usize,
}

impl Default for AnalysisOptions {
    fn default() -> AnalysisOptions {
        AnalysisOptions { max_cache_size: 64 }
    }
}

/// The public request surface over the incremental analysis engine.
pub struct AnalysisContext {
    options: AnalysisOptions,
    registry: SourceRegistry,
    cache: AnalysisCache,
    graph: DependencyGraph,
    work: WorkManager,
    /// Editor-supplied contents, shadowing the provider.
    overlay: FxHashMap<Source, Arc<str>>,
    provider: Box<dyn ContentProvider>,
    /// Pinned sources in host-given order; protected from eviction.
    priority_order: Vec<Source>,
    incremental: Option<IncrementalEditCache>,
}

impl AnalysisContext {
    pub fn new(options: AnalysisOptions, provider: impl ContentProvider + 'static) -> Self {
        AnalysisContext {
            options,
            registry: SourceRegistry::new(),
            cache: AnalysisCache::new(),
            graph: DependencyGraph::new(),
            work: WorkManager::new(),
            overlay: FxHashMap::default(),
            provider: Box::new(provider),
            priority_order: Vec::new(),
            incremental: None,
        }
    }

    /// Context over an in-memory store, returning the store handle so the
    /// host (or a test) can keep supplying content.
    pub fn in_memory(options: AnalysisOptions) -> (Self, MemoryContentProvider) {
        let provider = MemoryContentProvider::new();
        (Self::new(options, provider.clone()), provider)
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Memory-heavy artifacts (parsed and resolved units) currently cached.
    pub fn heavy_artifact_count(&self) -> usize {
        self.cache.heavy_count()
    }

    /// Intern a path, returning its stable source identity.
    pub fn intern_path(&mut self, path: &str) -> Source {
        self.registry.intern(path)
    }

    /// The path a source was interned under.
    pub fn path_of(&self, source: Source) -> &str {
        self.registry.path(source)
    }

    /// Mark the given sources as most urgent, in the given order.
    ///
    /// They move into the scheduler's top class and become exempt from
    /// eviction; previously pinned sources fall back to their kind-derived
    /// classes. Cache contents are untouched.
    pub fn set_analysis_priority_order(&mut self, order: Vec<Source>) {
        debug!(count = order.len(), "setting analysis priority order");
        let demoted = self.work.set_priority_order(&order);
        self.priority_order = order;
        for source in demoted {
            let class = self.class_for(source);
            self.work.add(source, class);
        }
    }

    // ---- internal plumbing shared by the submodules ----

    /// Current content for a source: overlay first, then the provider.
    pub(crate) fn read_content(&self, source: Source) -> Result<Arc<str>, AnalysisError> {
        if let Some(text) = self.overlay.get(&source) {
            return Ok(text.clone());
        }
        let path = self.registry.path(source);
        self.provider
            .read(path)
            .map_err(|err| AnalysisError::content_unavailable(path, err))
    }

    /// Like [`Self::read_content`] but swallowing the failure.
    fn content_if_available(&self, source: Source) -> Option<Arc<str>> {
        self.read_content(source).ok()
    }

    /// The scheduler class a source belongs to right now.
    fn class_for(&self, source: Source) -> SourcePriority {
        if self.priority_order.contains(&source) {
            return SourcePriority::Priority;
        }
        let kind = self
            .cache
            .get(source)
            .and_then(|entry| entry.kind.get().copied())
            .unwrap_or_else(|| self.registry.kind_hint(source));
        SourcePriority::for_kind(kind)
    }

    /// Queue a source for analysis under its current class.
    fn requeue(&mut self, source: Source) {
        let class = self.class_for(source);
        self.work.add(source, class);
    }

    /// Evict heavy artifacts down to the configured ceiling, sparing pinned
    /// sources and entries with a computation in flight.
    fn enforce_cache_ceiling(&mut self) {
        let ceiling = self.options.max_cache_size;
        if self.cache.heavy_count() <= ceiling {
            return;
        }
        let pinned: FxHashSet<Source> = self.priority_order.iter().copied().collect();
        self.cache
            .enforce_ceiling(ceiling, |source| pinned.contains(&source));
    }

    /// Whether a source's entry carries markup artifacts.
    fn is_markup_source(&self, source: Source) -> bool {
        match self.cache.get(source) {
            Some(entry) => entry.is_markup(),
            None => self.registry.kind_hint(source) == SourceKind::Markup,
        }
    }
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("sources", &self.cache.len())
            .field("pending", &self.work.len())
            .field("heavy_artifacts", &self.cache.heavy_count())
            .finish()
    }
}
