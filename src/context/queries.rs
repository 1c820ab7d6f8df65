//! Non-forcing peeks and the classification query surface.
//!
//! Every `get_*` read returns what is cached right now — `None` when the
//! artifact is not currently known — and never triggers computation. The
//! classification queries sweep the cache for settled facts (kinds, flags,
//! references) without disturbing pending work.

use std::sync::Arc;

use crate::base::{Diagnostic, LineIndex, Source, SourceKind};
use crate::semantic::{LibraryElement, MarkupElement, ResolvedUnit};
use crate::syntax::{MarkupUnit, ParsedUnit};

use super::AnalysisContext;

impl AnalysisContext {
    // ---- peeks ----

    pub fn get_kind(&self, source: Source) -> Option<SourceKind> {
        self.cache.get(source)?.kind.get().copied()
    }

    pub fn get_line_info(&self, source: Source) -> Option<Arc<LineIndex>> {
        self.cache.get(source)?.line_info.get().cloned()
    }

    pub fn get_parsed_unit(&self, source: Source) -> Option<Arc<ParsedUnit>> {
        self.cache.get(source)?.unit()?.parsed_unit.get().cloned()
    }

    pub fn get_markup_unit(&self, source: Source) -> Option<Arc<MarkupUnit>> {
        self.cache.get(source)?.markup()?.parsed_unit.get().cloned()
    }

    pub fn get_resolved_unit(&self, source: Source, library: Source) -> Option<Arc<ResolvedUnit>> {
        self.cache
            .get(source)?
            .unit()?
            .resolution(library)?
            .resolved_unit
            .get()
            .cloned()
    }

    pub fn get_imported_libraries(&self, source: Source) -> Option<Arc<[Source]>> {
        self.cache.get(source)?.unit()?.imported.get().cloned()
    }

    pub fn get_exported_libraries(&self, source: Source) -> Option<Arc<[Source]>> {
        self.cache.get(source)?.unit()?.exported.get().cloned()
    }

    pub fn get_included_parts(&self, source: Source) -> Option<Arc<[Source]>> {
        self.cache.get(source)?.unit()?.parts.get().cloned()
    }

    pub fn get_library_element(&self, source: Source) -> Option<Arc<LibraryElement>> {
        self.cache.get(source)?.unit()?.element.get().cloned()
    }

    pub fn get_markup_element(&self, source: Source) -> Option<Arc<MarkupElement>> {
        self.cache.get(source)?.markup()?.element.get().cloned()
    }

    pub fn get_is_client(&self, source: Source) -> Option<bool> {
        self.cache.get(source)?.unit()?.is_client.get().copied()
    }

    pub fn get_is_entry_point(&self, source: Source) -> Option<bool> {
        self.cache.get(source)?.unit()?.is_entry_point.get().copied()
    }

    pub fn get_documentation(&self, source: Source) -> Option<String> {
        self.get_parsed_unit(source)?.documentation.clone()
    }

    /// Diagnostics cached right now: parse diagnostics plus whatever
    /// resolution diagnostics are currently valid. `None` until the source
    /// has been parsed.
    pub fn get_errors(&self, source: Source) -> Option<Vec<Diagnostic>> {
        let entry = self.cache.get(source)?;
        entry.parse_errors()?;
        Some(self.collect_available_errors(source))
    }

    // ---- classification queries ----

    /// Every known source currently classified as `kind`.
    pub fn sources_of_kind(&self, kind: SourceKind) -> Vec<Source> {
        self.cache
            .iter()
            .filter(|(_, entry)| entry.kind.get() == Some(&kind))
            .map(|(source, _)| source)
            .collect()
    }

    /// Markup sources whose scanned references include `library`.
    pub fn markup_sources_referencing(&self, library: Source) -> Vec<Source> {
        self.cache
            .iter()
            .filter(|(_, entry)| {
                entry
                    .markup()
                    .and_then(|data| data.referenced.get())
                    .is_some_and(|referenced| referenced.contains(&library))
            })
            .map(|(source, _)| source)
            .collect()
    }

    /// Libraries whose included-parts list names `part`.
    pub fn libraries_containing(&self, part: Source) -> Vec<Source> {
        let mut libraries: Vec<Source> = self
            .graph
            .dependents_of(part)
            .into_iter()
            .filter(|&dependent| {
                self.cache
                    .get(dependent)
                    .and_then(|entry| entry.unit())
                    .and_then(|data| data.parts.get())
                    .is_some_and(|parts| parts.contains(&part))
            })
            .collect();
        libraries.sort();
        libraries
    }

    /// Libraries classified as client code (importing `core:web`
    /// transitively).
    pub fn client_library_sources(&self) -> Vec<Source> {
        self.cache
            .iter()
            .filter(|(_, entry)| {
                entry
                    .unit()
                    .is_some_and(|data| data.is_client.get() == Some(&true))
            })
            .map(|(source, _)| source)
            .collect()
    }

    /// Entry-point libraries not classified as client code.
    pub fn server_library_sources(&self) -> Vec<Source> {
        self.cache
            .iter()
            .filter(|(_, entry)| {
                entry.unit().is_some_and(|data| {
                    data.is_client.get() == Some(&false)
                        && data.is_entry_point.get() == Some(&true)
                })
            })
            .map(|(source, _)| source)
            .collect()
    }

    /// Sources with a computation currently in flight. Consumers performing
    /// cross-file edits should treat these as unsafe until they settle.
    pub fn in_process_sources(&self) -> Vec<Source> {
        self.cache
            .iter()
            .filter(|(_, entry)| entry.has_in_process())
            .map(|(source, _)| source)
            .collect()
    }

    /// Scheduler snapshot in precedence order.
    pub fn pending_sources(&self) -> Vec<Source> {
        self.work.iter().collect()
    }

    /// Every source the context has an entry for.
    pub fn known_sources(&self) -> Vec<Source> {
        self.cache.sources().collect()
    }

    // ---- shared collection ----

    /// Parse diagnostics plus every currently valid resolution diagnostic
    /// list for a source.
    pub(super) fn collect_available_errors(&self, source: Source) -> Vec<Diagnostic> {
        let Some(entry) = self.cache.get(source) else {
            return Vec::new();
        };
        let mut errors: Vec<Diagnostic> = entry
            .parse_errors()
            .map(|parse| parse.to_vec())
            .unwrap_or_default();
        if let Some(data) = entry.unit() {
            let mut owners: Vec<Source> = data.resolved_in().collect();
            owners.sort();
            for library in owners {
                if let Some(resolution) = data.resolution(library) {
                    if let Some(resolution_errors) = resolution.errors.get() {
                        errors.extend(resolution_errors.iter().cloned());
                    }
                }
            }
        } else if let Some(data) = entry.markup() {
            if let Some(resolution_errors) = data.resolution_errors.get() {
                errors.extend(resolution_errors.iter().cloned());
            }
        }
        errors
    }
}
