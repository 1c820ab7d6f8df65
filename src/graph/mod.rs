//! Reverse-dependency index.
//!
//! Tracks which sources' cached artifacts depend on which other sources'
//! content: a library depends on its parts and imported/exported libraries,
//! a markup unit depends on the libraries it references. Edges decide what
//! to invalidate when a source changes — never the order work is performed.
//!
//! Edges for a dependent are replaced wholesale each time that source is
//! reparsed or rescanned, so stale edges cannot accumulate even through
//! cyclic reference graphs.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::base::Source;

/// Bidirectional dependency index keyed by source identity.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// dependent → sources it depends on
    forward: FxHashMap<Source, FxHashSet<Source>>,
    /// dependency → sources depending on it
    reverse: FxHashMap<Source, FxHashSet<Source>>,
}

impl DependencyGraph {
    pub fn new() -> DependencyGraph {
        DependencyGraph::default()
    }

    /// Replace the dependent's entire edge set.
    ///
    /// Called after every successful parse/scan with the full set of sources
    /// the new artifacts were derived against.
    pub fn set_dependencies(&mut self, dependent: Source, dependencies: FxHashSet<Source>) {
        trace!(?dependent, count = dependencies.len(), "replacing dependency edges");
        if let Some(old) = self.forward.remove(&dependent) {
            for dependency in old {
                if let Some(dependents) = self.reverse.get_mut(&dependency) {
                    dependents.remove(&dependent);
                    if dependents.is_empty() {
                        self.reverse.remove(&dependency);
                    }
                }
            }
        }
        for &dependency in &dependencies {
            self.reverse.entry(dependency).or_default().insert(dependent);
        }
        if !dependencies.is_empty() {
            self.forward.insert(dependent, dependencies);
        }
    }

    /// Sources whose cached artifacts depend on `source`.
    pub fn dependents_of(&self, source: Source) -> Vec<Source> {
        self.reverse
            .get(&source)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sources `source` depends on.
    pub fn dependencies_of(&self, source: Source) -> Vec<Source> {
        self.forward
            .get(&source)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `dependent` currently depends on `dependency`.
    pub fn depends_on(&self, dependent: Source, dependency: Source) -> bool {
        self.forward
            .get(&dependent)
            .is_some_and(|set| set.contains(&dependency))
    }

    /// Drop a source from both directions (the source was removed).
    ///
    /// Dependents keep their edges onto the removed source: their artifacts
    /// still reference it and must be re-diagnosed, and their next reparse
    /// replaces the edges wholesale anyway.
    pub fn remove_source(&mut self, source: Source) {
        if let Some(dependencies) = self.forward.remove(&source) {
            for dependency in dependencies {
                if let Some(dependents) = self.reverse.get_mut(&dependency) {
                    dependents.remove(&source);
                    if dependents.is_empty() {
                        self.reverse.remove(&dependency);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(FxHashSet::len).sum()
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

    fn set(sources: &[Source]) -> FxHashSet<Source> {
        sources.iter().copied().collect()
    }

    #[test]
    fn test_reverse_edges() {
        let s = sources(3);
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(s[0], set(&[s[1], s[2]]));
        graph.set_dependencies(s[1], set(&[s[2]]));

        let mut dependents = graph.dependents_of(s[2]);
        dependents.sort();
        assert_eq!(dependents, vec![s[0], s[1]]);
        assert_eq!(graph.dependents_of(s[0]), Vec::new());
    }

    #[test]
    fn test_wholesale_replacement_drops_stale_edges() {
        let s = sources(3);
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(s[0], set(&[s[1]]));
        graph.set_dependencies(s[0], set(&[s[2]]));

        assert!(graph.dependents_of(s[1]).is_empty());
        assert_eq!(graph.dependents_of(s[2]), vec![s[0]]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_cyclic_edges_are_fine() {
        let s = sources(2);
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(s[0], set(&[s[1]]));
        graph.set_dependencies(s[1], set(&[s[0]]));
        assert_eq!(graph.dependents_of(s[0]), vec![s[1]]);
        assert_eq!(graph.dependents_of(s[1]), vec![s[0]]);
    }

    #[test]
    fn test_remove_source_keeps_dangling_dependents() {
        let s = sources(2);
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(s[0], set(&[s[1]]));
        graph.remove_source(s[1]);

        // s0 still depends on the removed s1; its next reparse replaces this.
        assert!(graph.depends_on(s[0], s[1]));
        assert_eq!(graph.dependents_of(s[1]), vec![s[0]]);
    }

    #[test]
    fn test_remove_dependent_clears_its_edges() {
        let s = sources(2);
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(s[0], set(&[s[1]]));
        graph.remove_source(s[0]);
        assert!(graph.dependents_of(s[1]).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }
}
