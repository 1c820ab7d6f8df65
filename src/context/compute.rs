//! Forcing reads and the computations behind them.
//!
//! Every `compute_*` operation returns the cached value when it is valid and
//! otherwise runs the minimal synchronous computation, caching the result.
//! Computations may compute prerequisite descriptors (a resolved unit needs
//! the parsed units of everything it references); recursion depth is bounded
//! by dependency depth, and the in-process marker converts reentrancy into a
//! [`AnalysisError::Cycle`] instead of infinite recursion.
//!
//! A descriptor in the error state re-raises the recorded failure without
//! recomputation; supplying new content resets it for one more attempt.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use text_size::TextRange;
use tracing::{debug, trace};

use crate::AnalysisError;
use crate::base::{Diagnostic, LineIndex, Source, SourceKind, resolve_reference};
use crate::cache::{CacheState, DataDescriptor};
use crate::semantic::{
    LibraryElement, MarkupElement, ResolvedUnit, TargetInfo, resolve_markup, resolve_unit,
};
use crate::syntax::{DirectiveKind, MarkupUnit, ParsedUnit, parse_unit, scan_markup};

use super::AnalysisContext;

impl AnalysisContext {
    // ---- public forcing reads ----

    /// Classify a source, parsing it if its kind is not evident from the
    /// path alone.
    pub fn compute_kind(&mut self, source: Source) -> Result<SourceKind, AnalysisError> {
        if self.is_markup_source(source) {
            let hint = self.registry.kind_hint(source);
            let entry = self.cache.entry_mut(source, hint);
            if !entry.kind.is_valid() {
                entry.kind.set(SourceKind::Markup);
            }
            return Ok(SourceKind::Markup);
        }
        let unit = self.ensure_unit_parsed(source)?;
        Ok(if unit.is_part() {
            SourceKind::Part
        } else {
            SourceKind::Library
        })
    }

    /// Line-offset table for a source. Computed from content alone; never
    /// triggers a parse.
    pub fn compute_line_info(&mut self, source: Source) -> Result<Arc<LineIndex>, AnalysisError> {
        let hint = self.registry.kind_hint(source);
        {
            let entry = self.cache.entry_mut(source, hint);
            match entry.line_info.state() {
                CacheState::Valid => {
                    if let Some(info) = entry.line_info.get() {
                        return Ok(info.clone());
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(source, DataDescriptor::LineInfo));
                }
                CacheState::Error => return Err(self.recorded_failure(source)),
                CacheState::Invalid => {}
            }
        }
        match self.read_content(source) {
            Ok(text) => {
                let info = Arc::new(LineIndex::new(&text));
                self.cache
                    .entry_mut(source, hint)
                    .line_info
                    .set(info.clone());
                Ok(info)
            }
            Err(err) => {
                let entry = self.cache.entry_mut(source, hint);
                entry.line_info.set_error();
                entry.record_failure(err.clone());
                Err(err)
            }
        }
    }

    /// All diagnostics currently producible for a source: parse diagnostics
    /// plus resolution diagnostics in every library the source is analyzed
    /// in.
    pub fn compute_errors(&mut self, source: Source) -> Result<Vec<Diagnostic>, AnalysisError> {
        if self.is_markup_source(source) {
            self.ensure_markup_parsed(source)?;
            self.ensure_markup_resolved(source)?;
            return Ok(self.collect_available_errors(source));
        }
        let unit = self.ensure_unit_parsed(source)?;
        if unit.is_part() {
            for owner in self.libraries_containing(source) {
                match self.ensure_unit_resolved(source, owner) {
                    Ok(_) => {}
                    // The owner's own breakage surfaces on the owner.
                    Err(err) if err.is_content_unavailable() => continue,
                    Err(err) => return Err(err),
                }
            }
        } else {
            self.ensure_unit_resolved(source, source)?;
        }
        Ok(self.collect_available_errors(source))
    }

    /// Directive-level parse tree of a unit source; `None` for markup.
    pub fn compute_parsed_unit(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<ParsedUnit>>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        self.ensure_unit_parsed(source).map(Some)
    }

    /// Reference scan of a markup source; `None` for unit sources.
    pub fn compute_markup_unit(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<MarkupUnit>>, AnalysisError> {
        if !self.is_markup_source(source) {
            return Ok(None);
        }
        self.ensure_markup_parsed(source).map(Some)
    }

    /// Resolution of `source` as part of `library`; `None` for markup.
    pub fn compute_resolved_unit(
        &mut self,
        source: Source,
        library: Source,
    ) -> Result<Option<Arc<ResolvedUnit>>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        self.ensure_unit_resolved(source, library).map(Some)
    }

    /// Libraries a unit imports; `None` for markup.
    pub fn compute_imported_libraries(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<[Source]>>, AnalysisError> {
        self.compute_unit_list(source, |data| data.imported.get().cloned())
    }

    /// Libraries a unit exports; `None` for markup.
    pub fn compute_exported_libraries(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<[Source]>>, AnalysisError> {
        self.compute_unit_list(source, |data| data.exported.get().cloned())
    }

    /// Parts a unit includes; `None` for markup.
    pub fn compute_included_parts(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<[Source]>>, AnalysisError> {
        self.compute_unit_list(source, |data| data.parts.get().cloned())
    }

    /// Element model of a library; `None` for parts and markup.
    pub fn compute_library_element(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<LibraryElement>>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        let unit = self.ensure_unit_parsed(source)?;
        if unit.is_part() {
            return Ok(None);
        }
        self.ensure_library_element(source).map(Some)
    }

    /// Element model of a markup unit; `None` for unit sources.
    pub fn compute_markup_element(
        &mut self,
        source: Source,
    ) -> Result<Option<Arc<MarkupElement>>, AnalysisError> {
        if !self.is_markup_source(source) {
            return Ok(None);
        }
        self.ensure_markup_resolved(source)?;
        Ok(self
            .cache
            .get(source)
            .and_then(|entry| entry.markup())
            .and_then(|data| data.element.get().cloned()))
    }

    /// Whether a library transitively imports `core:web`; `None` for parts
    /// and markup.
    pub fn compute_is_client(&mut self, source: Source) -> Result<Option<bool>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        let unit = self.ensure_unit_parsed(source)?;
        if unit.is_part() {
            return Ok(None);
        }
        self.ensure_client_flag(source).map(Some)
    }

    /// Whether a library declares `entry;`; `None` for parts and markup.
    pub fn compute_is_entry_point(
        &mut self,
        source: Source,
    ) -> Result<Option<bool>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        let unit = self.ensure_unit_parsed(source)?;
        Ok(if unit.is_part() {
            None
        } else {
            Some(unit.has_entry)
        })
    }

    /// Doc comment block of a library's defining unit; `None` for parts,
    /// markup, and undocumented libraries.
    pub fn compute_documentation(
        &mut self,
        source: Source,
    ) -> Result<Option<String>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        let unit = self.ensure_unit_parsed(source)?;
        if unit.is_part() {
            return Ok(None);
        }
        Ok(unit.documentation.clone())
    }

    fn compute_unit_list(
        &mut self,
        source: Source,
        read: impl Fn(&crate::cache::UnitData) -> Option<Arc<[Source]>>,
    ) -> Result<Option<Arc<[Source]>>, AnalysisError> {
        if self.is_markup_source(source) {
            return Ok(None);
        }
        self.ensure_unit_parsed(source)?;
        Ok(self
            .cache
            .get(source)
            .and_then(|entry| entry.unit())
            .and_then(read))
    }

    // ---- internal computations ----

    /// Parse a unit source, discovering its dependency edges and enqueueing
    /// newly discovered sources.
    pub(super) fn ensure_unit_parsed(
        &mut self,
        source: Source,
    ) -> Result<Arc<ParsedUnit>, AnalysisError> {
        let hint = self.registry.kind_hint(source);
        {
            let entry = self.cache.entry_mut(source, hint);
            let Some(data) = entry.unit_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(source),
                    "markup source has no unit artifacts",
                ));
            };
            match data.parsed_unit.state() {
                CacheState::Valid => {
                    if let Some(unit) = data.parsed_unit.get().cloned() {
                        self.cache.touch(source);
                        return Ok(unit);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(source, DataDescriptor::ParsedUnit));
                }
                CacheState::Error => return Err(self.recorded_failure(source)),
                CacheState::Invalid => data.parsed_unit.mark_in_process(),
            }
        }

        let text = match self.read_content(source) {
            Ok(text) => text,
            Err(err) => {
                self.record_content_failure(source, err.clone());
                return Err(err);
            }
        };
        let stamp = self.registry.stamp(source);
        let (unit, diagnostics) = parse_unit(source, &text, stamp);

        // Resolve directive URIs to source identities.
        let base_path = self.registry.path(source).to_owned();
        let mut imported = Vec::new();
        let mut exported = Vec::new();
        let mut parts = Vec::new();
        let mut dependencies = FxHashSet::default();
        let mut discovered = Vec::new();
        for directive in &unit.directives {
            let Some(target_path) = resolve_reference(&base_path, &directive.uri) else {
                continue;
            };
            let target = self.registry.intern(&target_path);
            if !self.cache.contains(target) {
                discovered.push(target);
            }
            dependencies.insert(target);
            match directive.kind {
                DirectiveKind::Import => imported.push(target),
                DirectiveKind::Export => exported.push(target),
                DirectiveKind::Part => parts.push(target),
            }
        }

        let unit = Arc::new(unit);
        let kind = if unit.is_part() {
            SourceKind::Part
        } else {
            SourceKind::Library
        };
        {
            let entry = self.cache.entry_mut(source, hint);
            if !entry.line_info.is_valid() {
                entry.line_info.set(Arc::new(LineIndex::new(&text)));
            }
            entry.kind.set(kind);
            if let Some(data) = entry.unit_mut() {
                data.parsed_unit.set(unit.clone());
                data.parse_errors.set(Arc::from(diagnostics));
                data.imported.set(Arc::from(imported));
                data.exported.set(Arc::from(exported));
                data.parts.set(Arc::from(parts));
                data.is_entry_point.set(unit.has_entry);
            }
        }
        self.graph.set_dependencies(source, dependencies);
        self.enqueue_discovered(discovered);
        self.cache.touch(source);
        self.enforce_cache_ceiling();
        debug!(path = %base_path, ?kind, "parsed unit");
        Ok(unit)
    }

    /// Scan a markup source, discovering referenced libraries.
    pub(super) fn ensure_markup_parsed(
        &mut self,
        source: Source,
    ) -> Result<Arc<MarkupUnit>, AnalysisError> {
        let hint = self.registry.kind_hint(source);
        {
            let entry = self.cache.entry_mut(source, hint);
            let Some(data) = entry.markup_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(source),
                    "unit source has no markup artifacts",
                ));
            };
            match data.parsed_unit.state() {
                CacheState::Valid => {
                    if let Some(unit) = data.parsed_unit.get().cloned() {
                        self.cache.touch(source);
                        return Ok(unit);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(source, DataDescriptor::ParsedUnit));
                }
                CacheState::Error => return Err(self.recorded_failure(source)),
                CacheState::Invalid => data.parsed_unit.mark_in_process(),
            }
        }

        let text = match self.read_content(source) {
            Ok(text) => text,
            Err(err) => {
                self.record_content_failure(source, err.clone());
                return Err(err);
            }
        };
        let stamp = self.registry.stamp(source);
        let (unit, diagnostics) = scan_markup(source, &text, stamp);

        let base_path = self.registry.path(source).to_owned();
        let mut referenced = Vec::new();
        let mut dependencies = FxHashSet::default();
        let mut discovered = Vec::new();
        for script in &unit.script_refs {
            let Some(target_path) = resolve_reference(&base_path, &script.uri) else {
                continue;
            };
            let target = self.registry.intern(&target_path);
            if !self.cache.contains(target) {
                discovered.push(target);
            }
            dependencies.insert(target);
            referenced.push(target);
        }

        let unit = Arc::new(unit);
        {
            let entry = self.cache.entry_mut(source, hint);
            if !entry.line_info.is_valid() {
                entry.line_info.set(Arc::new(LineIndex::new(&text)));
            }
            entry.kind.set(SourceKind::Markup);
            if let Some(data) = entry.markup_mut() {
                data.parsed_unit.set(unit.clone());
                data.parse_errors.set(Arc::from(diagnostics));
                data.referenced.set(Arc::from(referenced));
            }
        }
        self.graph.set_dependencies(source, dependencies);
        self.enqueue_discovered(discovered);
        self.cache.touch(source);
        self.enforce_cache_ceiling();
        debug!(path = %base_path, "scanned markup");
        Ok(unit)
    }

    /// Resolve a unit as part of `library`, computing prerequisite parses of
    /// the owning library and every directive target.
    pub(super) fn ensure_unit_resolved(
        &mut self,
        source: Source,
        library: Source,
    ) -> Result<Arc<ResolvedUnit>, AnalysisError> {
        let hint = self.registry.kind_hint(source);
        {
            let entry = self.cache.entry_mut(source, hint);
            let Some(data) = entry.unit_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(source),
                    "markup source has no unit artifacts",
                ));
            };
            let resolution = data.resolution_mut(library);
            match resolution.resolved_unit.state() {
                CacheState::Valid => {
                    if let Some(resolved) = resolution.resolved_unit.get().cloned() {
                        self.cache.touch(source);
                        return Ok(resolved);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(source, DataDescriptor::ResolvedUnit));
                }
                CacheState::Error => return Err(self.recorded_failure(source)),
                CacheState::Invalid => resolution.resolved_unit.mark_in_process(),
            }
        }

        // Keystroke fast path: a tracked body edit reuses the previous
        // resolution instead of reparsing.
        if let Some((resolved, errors)) = self.try_incremental_resolution(source, library) {
            let entry = self.cache.entry_mut(source, hint);
            if let Some(data) = entry.unit_mut() {
                let resolution = data.resolution_mut(library);
                resolution.resolved_unit.set(resolved.clone());
                resolution.errors.set(errors);
            }
            self.cache.touch(source);
            self.enforce_cache_ceiling();
            debug!(path = %self.registry.path(source), "reused resolution for body edit");
            return Ok(resolved);
        }

        let unit = match self.ensure_unit_parsed(source) {
            Ok(unit) => unit,
            Err(err) => {
                self.abandon_resolution(source, library, &err);
                return Err(err);
            }
        };
        let library_unit = if library == source {
            unit.clone()
        } else {
            match self.ensure_unit_parsed(library) {
                Ok(unit) => unit,
                Err(err) => {
                    // The owner is broken, not this unit: leave the slot
                    // invalid so a repaired owner gets another attempt.
                    self.reset_resolution(source, library);
                    return Err(err);
                }
            }
        };
        let library_name: Option<SmolStr> =
            library_unit.library_name.as_ref().map(|(n, _)| n.clone());

        let base_path = self.registry.path(source).to_owned();
        let mut targets = Vec::with_capacity(unit.directives.len());
        for directive in &unit.directives {
            match self.target_info(&base_path, &directive.uri) {
                Ok(info) => targets.push(info),
                Err(err) => {
                    self.reset_resolution(source, library);
                    return Err(err);
                }
            }
        }

        let (resolved, diagnostics) =
            resolve_unit(&unit, library, library_name.as_deref(), &targets);
        let resolved = Arc::new(resolved);
        {
            let entry = self.cache.entry_mut(source, hint);
            if let Some(data) = entry.unit_mut() {
                let resolution = data.resolution_mut(library);
                resolution.resolved_unit.set(resolved.clone());
                resolution.errors.set(Arc::from(diagnostics));
            }
        }
        self.cache.touch(source);
        self.enforce_cache_ceiling();
        trace!(path = %base_path, "resolved unit");
        Ok(resolved)
    }

    /// Validate a markup unit's script references and build its element.
    pub(super) fn ensure_markup_resolved(
        &mut self,
        source: Source,
    ) -> Result<Arc<[Diagnostic]>, AnalysisError> {
        let hint = self.registry.kind_hint(source);
        {
            let entry = self.cache.entry_mut(source, hint);
            let Some(data) = entry.markup_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(source),
                    "unit source has no markup artifacts",
                ));
            };
            match data.resolution_errors.state() {
                CacheState::Valid => {
                    if let Some(errors) = data.resolution_errors.get().cloned() {
                        return Ok(errors);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(source, DataDescriptor::ResolutionErrors));
                }
                CacheState::Error => return Err(self.recorded_failure(source)),
                CacheState::Invalid => data.resolution_errors.mark_in_process(),
            }
        }

        let unit = match self.ensure_markup_parsed(source) {
            Ok(unit) => unit,
            Err(err) => {
                self.abandon_markup_resolution(source, &err);
                return Err(err);
            }
        };
        let base_path = self.registry.path(source).to_owned();
        let mut targets = Vec::with_capacity(unit.script_refs.len());
        for script in &unit.script_refs {
            match self.target_info(&base_path, &script.uri) {
                Ok(info) => targets.push(info),
                Err(err) => {
                    if let Some(data) =
                        self.cache.entry_mut(source, hint).markup_mut()
                    {
                        data.resolution_errors.invalidate();
                    }
                    return Err(err);
                }
            }
        }

        let (referenced, diagnostics) = resolve_markup(&unit, &targets);
        let errors: Arc<[Diagnostic]> = Arc::from(diagnostics);
        let element = Arc::new(MarkupElement { source, referenced });
        {
            let entry = self.cache.entry_mut(source, hint);
            if let Some(data) = entry.markup_mut() {
                data.resolution_errors.set(errors.clone());
                data.element.set(element);
            }
        }
        trace!(path = %base_path, "resolved markup references");
        Ok(errors)
    }

    /// Build a library's element from its resolved defining unit.
    pub(super) fn ensure_library_element(
        &mut self,
        library: Source,
    ) -> Result<Arc<LibraryElement>, AnalysisError> {
        let hint = self.registry.kind_hint(library);
        {
            let entry = self.cache.entry_mut(library, hint);
            let Some(data) = entry.unit_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(library),
                    "markup source has no unit artifacts",
                ));
            };
            match data.element.state() {
                CacheState::Valid => {
                    if let Some(element) = data.element.get().cloned() {
                        return Ok(element);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(library, DataDescriptor::Element));
                }
                CacheState::Error => return Err(self.recorded_failure(library)),
                CacheState::Invalid => data.element.mark_in_process(),
            }
        }

        let resolved = match self.ensure_unit_resolved(library, library) {
            Ok(resolved) => resolved,
            Err(err) => {
                let entry = self.cache.entry_mut(library, hint);
                if let Some(data) = entry.unit_mut() {
                    if err.is_content_unavailable() {
                        data.element.set_error();
                    } else {
                        data.element.invalidate();
                    }
                }
                return Err(err);
            }
        };
        let unit = match self.ensure_unit_parsed(library) {
            Ok(unit) => unit,
            Err(err) => {
                if let Some(data) = self.cache.entry_mut(library, hint).unit_mut() {
                    data.element.invalidate();
                }
                return Err(err);
            }
        };
        let element = Arc::new(LibraryElement::from_resolved(
            &resolved,
            unit.library_name.as_ref().map(|(n, _)| n.clone()),
            unit.has_entry,
            unit.documentation.clone(),
        ));
        if let Some(data) = self.cache.entry_mut(library, hint).unit_mut() {
            data.element.set(element.clone());
        }
        Ok(element)
    }

    /// Walk the import closure for the `core:web` intrinsic.
    pub(super) fn ensure_client_flag(&mut self, library: Source) -> Result<bool, AnalysisError> {
        let hint = self.registry.kind_hint(library);
        {
            let entry = self.cache.entry_mut(library, hint);
            let Some(data) = entry.unit_mut() else {
                return Err(AnalysisError::content_unavailable(
                    self.registry.path(library),
                    "markup source has no unit artifacts",
                ));
            };
            match data.is_client.state() {
                CacheState::Valid => {
                    if let Some(&flag) = data.is_client.get() {
                        return Ok(flag);
                    }
                }
                CacheState::InProcess => {
                    return Err(self.cycle_error(library, DataDescriptor::ClientFlag));
                }
                CacheState::Error => return Err(self.recorded_failure(library)),
                CacheState::Invalid => data.is_client.mark_in_process(),
            }
        }

        let mut visited: FxHashSet<Source> = FxHashSet::default();
        let mut stack = vec![library];
        let mut is_client = false;
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let unit = match self.ensure_unit_parsed(current) {
                Ok(unit) => unit,
                // A broken import is diagnosed at resolution; it cannot make
                // the closure client-classified.
                Err(err) if err.is_content_unavailable() => continue,
                Err(err) => {
                    if let Some(data) = self.cache.entry_mut(library, hint).unit_mut() {
                        data.is_client.invalidate();
                    }
                    return Err(err);
                }
            };
            if unit.directives.iter().any(|d| {
                matches!(d.kind, DirectiveKind::Import | DirectiveKind::Export)
                    && d.uri == "core:web"
            }) {
                is_client = true;
                break;
            }
            if let Some(data) = self.cache.get(current).and_then(|e| e.unit()) {
                if let Some(imported) = data.imported.get() {
                    stack.extend(imported.iter().copied());
                }
                if let Some(exported) = data.exported.get() {
                    stack.extend(exported.iter().copied());
                }
            }
        }
        if let Some(data) = self.cache.entry_mut(library, hint).unit_mut() {
            data.is_client.set(is_client);
        }
        Ok(is_client)
    }

    // ---- shared helpers ----

    /// What the engine knows about one directive target right now, parsing
    /// the target if needed.
    fn target_info(&mut self, base_path: &str, uri: &str) -> Result<TargetInfo, AnalysisError> {
        if uri.starts_with("core:") {
            return Ok(TargetInfo::intrinsic());
        }
        let Some(target_path) = resolve_reference(base_path, uri) else {
            return Ok(TargetInfo::missing());
        };
        let target = self.registry.intern(&target_path);
        if SourceKind::from_path(&target_path) == SourceKind::Markup {
            let readable =
                self.overlay.contains_key(&target) || self.provider.exists(&target_path);
            return Ok(if readable {
                TargetInfo::known(target, SourceKind::Markup, None)
            } else {
                TargetInfo::unreadable(target)
            });
        }
        match self.ensure_unit_parsed(target) {
            Ok(unit) => {
                let kind = if unit.is_part() {
                    SourceKind::Part
                } else {
                    SourceKind::Library
                };
                let part_of = unit.part_of.as_ref().map(|(n, _)| n.clone());
                Ok(TargetInfo::known(target, kind, part_of))
            }
            Err(err) if err.is_content_unavailable() => Ok(TargetInfo::unreadable(target)),
            Err(err) => Err(err),
        }
    }

    /// Reuse the tracked resolution for a body-only edit burst.
    fn try_incremental_resolution(
        &mut self,
        source: Source,
        library: Source,
    ) -> Option<(Arc<ResolvedUnit>, Arc<[Diagnostic]>)> {
        let incremental = self.incremental.as_ref()?;
        if incremental.source != source
            || incremental.resolved_unit.library != library
            || !incremental.is_body_edit()
        {
            return None;
        }
        let stamp = self.registry.stamp(source);
        let edit = TextRange::at(incremental.offset, incremental.old_length);
        let delta = incremental.length_delta();
        let resolved = Arc::new(incremental.resolved_unit.shifted(edit, delta, stamp));
        let errors = incremental.resolution_errors.clone();
        // Keep tracking against the refreshed resolution so the next
        // contiguous edit in the burst reuses it too.
        if let Some(incremental) = self.incremental.as_mut() {
            incremental.resolved_unit = resolved.clone();
        }
        Some((resolved, errors))
    }

    /// Enqueue sources discovered during a parse, under kind-hint classes.
    fn enqueue_discovered(&mut self, discovered: Vec<Source>) {
        for target in discovered {
            let hint = self.registry.kind_hint(target);
            self.cache.entry_mut(target, hint);
            let class = self.class_for(target);
            self.work.add(target, class);
        }
    }

    /// Record an unreadable source: affected descriptors move to the error
    /// state and the source leaves the scheduler for good (resupplying
    /// content resets it).
    fn record_content_failure(&mut self, source: Source, err: AnalysisError) {
        debug!(path = %self.registry.path(source), %err, "content read failed");
        let hint = self.registry.kind_hint(source);
        let entry = self.cache.entry_mut(source, hint);
        entry.record_content_error(err);
        self.work.remove(source);
    }

    fn abandon_resolution(&mut self, source: Source, library: Source, err: &AnalysisError) {
        let hint = self.registry.kind_hint(source);
        if let Some(data) = self.cache.entry_mut(source, hint).unit_mut() {
            let resolution = data.resolution_mut(library);
            if err.is_content_unavailable() {
                resolution.resolved_unit.set_error();
                resolution.errors.set_error();
            } else {
                resolution.resolved_unit.invalidate();
            }
        }
    }

    fn reset_resolution(&mut self, source: Source, library: Source) {
        let hint = self.registry.kind_hint(source);
        if let Some(data) = self.cache.entry_mut(source, hint).unit_mut() {
            data.resolution_mut(library).resolved_unit.invalidate();
        }
    }

    fn abandon_markup_resolution(&mut self, source: Source, err: &AnalysisError) {
        let hint = self.registry.kind_hint(source);
        if let Some(data) = self.cache.entry_mut(source, hint).markup_mut() {
            if err.is_content_unavailable() {
                data.resolution_errors.set_error();
                data.element.set_error();
            } else {
                data.resolution_errors.invalidate();
            }
        }
    }

    fn cycle_error(&self, source: Source, descriptor: DataDescriptor) -> AnalysisError {
        AnalysisError::Cycle {
            path: self.registry.path(source).to_owned(),
            descriptor,
        }
    }

    fn recorded_failure(&self, source: Source) -> AnalysisError {
        self.cache
            .get(source)
            .and_then(|entry| entry.failure().cloned())
            .unwrap_or_else(|| {
                AnalysisError::content_unavailable(
                    self.registry.path(source),
                    "analysis previously failed",
                )
            })
    }
}
