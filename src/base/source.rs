//! Interned source identities.
//!
//! A [`Source`] is a stable, copyable identity for one unit of analyzed text.
//! The [`SourceRegistry`] deduplicates path strings so identical paths share
//! the same id, and issues the monotonically increasing modification stamp
//! used for staleness comparison. Stamps are never used to order work.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// The kind of a source, refined from `Unknown` once the source is classified.
///
/// `.lmx` files are markup; `.lm` files are parts when they carry a
/// `part of` directive and libraries otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A library's defining unit.
    Library,
    /// A unit included into a library via a `part` directive.
    Part,
    /// A markup file embedding library references.
    Markup,
    /// Not yet classified.
    Unknown,
}

impl SourceKind {
    /// Kind deducible from the path alone, before any content is read.
    pub fn from_path(path: &str) -> SourceKind {
        if path.ends_with(".lmx") {
            SourceKind::Markup
        } else {
            SourceKind::Unknown
        }
    }
}

/// An opaque, monotonically increasing content version.
pub type ModificationStamp = u64;

/// Identity for one unit of analyzed text. Cheap to copy and compare.
///
/// Only the identity is stable; everything derived from the source's content
/// lives in the analysis cache and changes over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Source(u32);

impl Source {
    pub(crate) fn from_index(index: usize) -> Source {
        Source(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner for source paths.
///
/// Interning the same path twice returns the same [`Source`]. The registry
/// also owns each source's modification stamp; [`SourceRegistry::bump_stamp`]
/// is called whenever new content is supplied for a source.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    paths: Vec<SmolStr>,
    index: FxHashMap<SmolStr, Source>,
    stamps: Vec<ModificationStamp>,
    clock: ModificationStamp,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a path, returning the existing id when the path is known.
    pub fn intern(&mut self, path: &str) -> Source {
        if let Some(&source) = self.index.get(path) {
            return source;
        }
        let source = Source::from_index(self.paths.len());
        let path = SmolStr::new(path);
        self.paths.push(path.clone());
        self.index.insert(path, source);
        self.clock += 1;
        self.stamps.push(self.clock);
        source
    }

    /// Look up a path without interning it.
    pub fn get(&self, path: &str) -> Option<Source> {
        self.index.get(path).copied()
    }

    /// The path this source was interned under.
    pub fn path(&self, source: Source) -> &str {
        &self.paths[source.index()]
    }

    /// The current modification stamp for a source.
    pub fn stamp(&self, source: Source) -> ModificationStamp {
        self.stamps[source.index()]
    }

    /// Advance a source's stamp past every stamp issued so far.
    pub fn bump_stamp(&mut self, source: Source) -> ModificationStamp {
        self.clock += 1;
        self.stamps[source.index()] = self.clock;
        self.clock
    }

    /// Kind deducible from the interned path alone.
    pub fn kind_hint(&self, source: Source) -> SourceKind {
        SourceKind::from_path(self.path(source))
    }

    /// Number of known sources.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All interned sources, in interning order.
    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        (0..self.paths.len()).map(Source::from_index)
    }
}

/// Resolve a directive URI against the path of the referencing source.
///
/// Paths are URI-like strings with `/` separators. `.` and `..` segments in
/// the reference are folded; a reference that escapes the root is kept as-is
/// minus the unmatched `..` segments. Returns `None` for intrinsic (`core:`)
/// URIs, which have no backing source.
pub fn resolve_reference(base_path: &str, reference: &str) -> Option<String> {
    if reference.contains(':') {
        return None;
    }
    let base_dir = match base_path.rfind('/') {
        Some(pos) => &base_path[..pos],
        None => "",
    };
    let mut segments: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_source() {
        let mut registry = SourceRegistry::new();
        let a = registry.intern("lib/app.lm");
        let b = registry.intern("lib/app.lm");
        assert_eq!(a, b);
        assert_eq!(registry.path(a), "lib/app.lm");
    }

    #[test]
    fn test_intern_different_paths() {
        let mut registry = SourceRegistry::new();
        let a = registry.intern("a.lm");
        let b = registry.intern("b.lm");
        assert_ne!(a, b);
    }

    #[test]
    fn test_stamps_are_monotonic() {
        let mut registry = SourceRegistry::new();
        let a = registry.intern("a.lm");
        let b = registry.intern("b.lm");
        let first = registry.stamp(a);
        assert!(registry.stamp(b) > first);
        let bumped = registry.bump_stamp(a);
        assert!(bumped > registry.stamp(b));
        assert_eq!(registry.stamp(a), bumped);
    }

    #[test]
    fn test_kind_hint_from_extension() {
        let mut registry = SourceRegistry::new();
        let markup = registry.intern("index.lmx");
        let unit = registry.intern("app.lm");
        assert_eq!(registry.kind_hint(markup), SourceKind::Markup);
        assert_eq!(registry.kind_hint(unit), SourceKind::Unknown);
    }

    #[test]
    fn test_resolve_reference_sibling() {
        assert_eq!(
            resolve_reference("lib/app.lm", "util.lm"),
            Some("lib/util.lm".to_string())
        );
    }

    #[test]
    fn test_resolve_reference_parent_and_dot() {
        assert_eq!(
            resolve_reference("lib/src/app.lm", "../other/./x.lm"),
            Some("lib/other/x.lm".to_string())
        );
        assert_eq!(resolve_reference("app.lm", "x.lm"), Some("x.lm".to_string()));
    }

    #[test]
    fn test_resolve_reference_intrinsic() {
        assert_eq!(resolve_reference("app.lm", "core:web"), None);
    }
}
