//! Data descriptors and the derivation table.
//!
//! A descriptor names one derived artifact in a source's entry. The
//! derivation table below is the single declaration of which artifacts are
//! computed *from* which others; invalidating a descriptor cascades through
//! it transitively, so a stale parse can never leave a resolved unit
//! observable.

/// Name of one derived artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDescriptor {
    /// Line-offset table; derived from content only.
    LineInfo,
    /// Library / part / markup classification.
    SourceKind,
    /// Directive-level parse tree (unit files) or reference scan (markup).
    ParsedUnit,
    /// Diagnostics produced while parsing.
    ParseErrors,
    /// Libraries imported by the unit, resolved to sources.
    ImportedLibraries,
    /// Libraries exported by the unit, resolved to sources.
    ExportedLibraries,
    /// Parts included by the unit, resolved to sources.
    IncludedParts,
    /// Libraries referenced by a markup unit's script tags.
    ReferencedLibraries,
    /// Library-relative resolved unit.
    ResolvedUnit,
    /// Library-relative resolution diagnostics.
    ResolutionErrors,
    /// Library or markup element model.
    Element,
    /// Whether a library transitively imports `core:web`.
    ClientFlag,
    /// Whether a library declares `entry;`.
    EntryPointFlag,
}

impl DataDescriptor {
    /// Descriptors computed directly from this one.
    ///
    /// This is the only place derivation is declared; [`Self::cascade`]
    /// closes it transitively.
    pub fn derived(&self) -> &'static [DataDescriptor] {
        use DataDescriptor::*;
        match self {
            ParsedUnit => &[
                SourceKind,
                ParseErrors,
                ImportedLibraries,
                ExportedLibraries,
                IncludedParts,
                ReferencedLibraries,
                ResolvedUnit,
                EntryPointFlag,
            ],
            ImportedLibraries => &[ClientFlag],
            ResolvedUnit => &[ResolutionErrors, Element],
            LineInfo | SourceKind | ParseErrors | ExportedLibraries | IncludedParts
            | ReferencedLibraries | ResolutionErrors | Element | ClientFlag | EntryPointFlag => &[],
        }
    }

    /// This descriptor plus everything transitively derived from it.
    pub fn cascade(&self) -> Vec<DataDescriptor> {
        let mut result = vec![*self];
        let mut i = 0;
        while i < result.len() {
            for &derived in result[i].derived() {
                if !result.contains(&derived) {
                    result.push(derived);
                }
            }
            i += 1;
        }
        result
    }

    /// Whether the cached value is memory-heavy (counted against the cache
    /// ceiling). Everything else is cheap and survives eviction.
    pub fn is_heavy(&self) -> bool {
        matches!(
            self,
            DataDescriptor::ParsedUnit | DataDescriptor::ResolvedUnit
        )
    }
}
