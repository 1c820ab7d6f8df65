//! Per-source cache records.
//!
//! One [`SourceEntry`] exists per known source. Unit sources (libraries and
//! parts) and markup sources carry different artifact sets; the library-
//! relative artifacts of a unit (resolved unit, resolution errors) are keyed
//! by the owning library's source, one record per library the unit is
//! analyzed in.
//!
//! Entries expose typed slots for reads and descriptor-driven invalidation
//! for writes, so the derivation cascade is applied in exactly one place.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::AnalysisError;
use crate::base::{Diagnostic, LineIndex, Source, SourceKind};
use crate::semantic::{LibraryElement, MarkupElement, ResolvedUnit};
use crate::syntax::{MarkupUnit, ParsedUnit};

use super::descriptor::DataDescriptor;
use super::state::{CacheSlot, CacheState};

/// Library-relative artifacts of one unit, for one owning library.
#[derive(Debug, Clone, Default)]
pub struct ResolutionData {
    pub resolved_unit: CacheSlot<Arc<ResolvedUnit>>,
    pub errors: CacheSlot<Arc<[Diagnostic]>>,
}

/// Artifacts of a library or part source.
#[derive(Debug, Clone, Default)]
pub struct UnitData {
    pub parsed_unit: CacheSlot<Arc<ParsedUnit>>,
    pub parse_errors: CacheSlot<Arc<[Diagnostic]>>,
    pub imported: CacheSlot<Arc<[Source]>>,
    pub exported: CacheSlot<Arc<[Source]>>,
    pub parts: CacheSlot<Arc<[Source]>>,
    pub element: CacheSlot<Arc<LibraryElement>>,
    pub is_client: CacheSlot<bool>,
    pub is_entry_point: CacheSlot<bool>,
    resolution: FxHashMap<Source, ResolutionData>,
}

impl UnitData {
    /// Resolution record for one owning library, if present.
    pub fn resolution(&self, library: Source) -> Option<&ResolutionData> {
        self.resolution.get(&library)
    }

    /// Resolution record for one owning library, created on demand.
    pub fn resolution_mut(&mut self, library: Source) -> &mut ResolutionData {
        self.resolution.entry(library).or_default()
    }

    /// Libraries this unit has resolution records for.
    pub fn resolved_in(&self) -> impl Iterator<Item = Source> + '_ {
        self.resolution.keys().copied()
    }

    fn for_each_resolution(&mut self, f: impl Fn(&mut ResolutionData)) {
        for data in self.resolution.values_mut() {
            f(data);
        }
    }
}

/// Artifacts of a markup source.
#[derive(Debug, Clone, Default)]
pub struct MarkupData {
    pub parsed_unit: CacheSlot<Arc<MarkupUnit>>,
    pub parse_errors: CacheSlot<Arc<[Diagnostic]>>,
    pub referenced: CacheSlot<Arc<[Source]>>,
    pub resolution_errors: CacheSlot<Arc<[Diagnostic]>>,
    pub element: CacheSlot<Arc<MarkupElement>>,
}

/// Kind-specific artifact set.
#[derive(Debug, Clone)]
pub enum EntryData {
    Unit(UnitData),
    Markup(MarkupData),
}

/// Cache record for one source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub line_info: CacheSlot<Arc<LineIndex>>,
    pub kind: CacheSlot<SourceKind>,
    data: EntryData,
    /// Recorded terminal failure, re-raised by forcing reads while the
    /// affected descriptors are in the error state.
    failure: Option<AnalysisError>,
}

impl SourceEntry {
    /// Create an entry with every descriptor invalid. The kind hint decides
    /// the artifact set; `Markup` hints get markup artifacts, everything
    /// else gets unit artifacts.
    pub fn new(kind_hint: SourceKind) -> SourceEntry {
        let data = match kind_hint {
            SourceKind::Markup => EntryData::Markup(MarkupData::default()),
            _ => EntryData::Unit(UnitData::default()),
        };
        SourceEntry {
            line_info: CacheSlot::new(),
            kind: CacheSlot::new(),
            data,
            failure: None,
        }
    }

    pub fn unit(&self) -> Option<&UnitData> {
        match &self.data {
            EntryData::Unit(data) => Some(data),
            EntryData::Markup(_) => None,
        }
    }

    pub fn unit_mut(&mut self) -> Option<&mut UnitData> {
        match &mut self.data {
            EntryData::Unit(data) => Some(data),
            EntryData::Markup(_) => None,
        }
    }

    pub fn markup(&self) -> Option<&MarkupData> {
        match &self.data {
            EntryData::Markup(data) => Some(data),
            EntryData::Unit(_) => None,
        }
    }

    pub fn markup_mut(&mut self) -> Option<&mut MarkupData> {
        match &mut self.data {
            EntryData::Markup(data) => Some(data),
            EntryData::Unit(_) => None,
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self.data, EntryData::Markup(_))
    }

    /// The recorded terminal failure, if any descriptor is in error state.
    pub fn failure(&self) -> Option<&AnalysisError> {
        self.failure.as_ref()
    }

    pub fn record_failure(&mut self, failure: AnalysisError) {
        self.failure = Some(failure);
    }

    /// The source's content could not be read: every content-derived
    /// descriptor moves to the error state and the failure is recorded for
    /// re-raising. Resupplying content (via [`SourceEntry::invalidate_all`])
    /// grants one more attempt.
    pub fn record_content_error(&mut self, failure: AnalysisError) {
        self.failure = Some(failure);
        self.line_info.set_error();
        self.kind.set_error();
        match &mut self.data {
            EntryData::Unit(data) => {
                data.parsed_unit.set_error();
                data.parse_errors.set_error();
                data.imported.set_error();
                data.exported.set_error();
                data.parts.set_error();
                data.element.set_error();
                data.is_client.set_error();
                data.is_entry_point.set_error();
                data.for_each_resolution(|resolution| {
                    resolution.resolved_unit.set_error();
                    resolution.errors.set_error();
                });
            }
            EntryData::Markup(data) => {
                data.parsed_unit.set_error();
                data.parse_errors.set_error();
                data.referenced.set_error();
                data.resolution_errors.set_error();
                data.element.set_error();
            }
        }
    }

    /// Force one descriptor (and everything derived from it) back to the
    /// invalid state, dropping cached values.
    pub fn invalidate(&mut self, descriptor: DataDescriptor) {
        for descriptor in descriptor.cascade() {
            self.invalidate_one(descriptor);
        }
    }

    /// Content changed or was resupplied: everything must be recomputed,
    /// and a recorded failure gets one more attempt.
    pub fn invalidate_all(&mut self) {
        self.failure = None;
        self.line_info.invalidate();
        self.kind.invalidate();
        self.invalidate(DataDescriptor::ParsedUnit);
    }

    fn invalidate_one(&mut self, descriptor: DataDescriptor) {
        use DataDescriptor::*;
        match (&mut self.data, descriptor) {
            (_, LineInfo) => self.line_info.invalidate(),
            (_, SourceKind) => self.kind.invalidate(),
            (EntryData::Unit(data), ParsedUnit) => data.parsed_unit.invalidate(),
            (EntryData::Unit(data), ParseErrors) => data.parse_errors.invalidate(),
            (EntryData::Unit(data), ImportedLibraries) => data.imported.invalidate(),
            (EntryData::Unit(data), ExportedLibraries) => data.exported.invalidate(),
            (EntryData::Unit(data), IncludedParts) => data.parts.invalidate(),
            (EntryData::Unit(data), Element) => data.element.invalidate(),
            (EntryData::Unit(data), ClientFlag) => data.is_client.invalidate(),
            (EntryData::Unit(data), EntryPointFlag) => data.is_entry_point.invalidate(),
            (EntryData::Unit(data), ResolvedUnit) => {
                data.for_each_resolution(|r| r.resolved_unit.invalidate());
            }
            (EntryData::Unit(data), ResolutionErrors) => {
                data.for_each_resolution(|r| r.errors.invalidate());
            }
            (EntryData::Unit(_), ReferencedLibraries) => {}
            (EntryData::Markup(data), ParsedUnit) => data.parsed_unit.invalidate(),
            (EntryData::Markup(data), ParseErrors) => data.parse_errors.invalidate(),
            (EntryData::Markup(data), ReferencedLibraries) => data.referenced.invalidate(),
            (EntryData::Markup(data), ResolutionErrors) => data.resolution_errors.invalidate(),
            (EntryData::Markup(data), Element) => data.element.invalidate(),
            (EntryData::Markup(_), _) => {}
        }
    }

    /// Whether any descriptor is being computed right now.
    pub fn has_in_process(&self) -> bool {
        if self.line_info.is_in_process() || self.kind.is_in_process() {
            return true;
        }
        match &self.data {
            EntryData::Unit(data) => {
                data.parsed_unit.is_in_process()
                    || data.element.is_in_process()
                    || data.is_client.is_in_process()
                    || data
                        .resolution
                        .values()
                        .any(|r| r.resolved_unit.is_in_process())
            }
            EntryData::Markup(data) => {
                data.parsed_unit.is_in_process() || data.element.is_in_process()
            }
        }
    }

    /// Number of memory-heavy artifacts currently held.
    pub fn heavy_count(&self) -> usize {
        match &self.data {
            EntryData::Unit(data) => {
                usize::from(data.parsed_unit.is_valid())
                    + data
                        .resolution
                        .values()
                        .filter(|r| r.resolved_unit.is_valid())
                        .count()
            }
            EntryData::Markup(data) => usize::from(data.parsed_unit.is_valid()),
        }
    }

    /// Demote heavy artifacts to invalid, keeping everything cheap.
    ///
    /// Unlike [`SourceEntry::invalidate`] this does not cascade: the content
    /// has not changed, so lists, diagnostics, and elements computed from
    /// the dropped artifacts are still current. A later forcing read
    /// recomputes the heavy values transparently.
    pub fn flush_heavy(&mut self) -> usize {
        let mut flushed = 0;
        match &mut self.data {
            EntryData::Unit(data) => {
                if data.parsed_unit.is_valid() {
                    data.parsed_unit.invalidate();
                    flushed += 1;
                }
                for resolution in data.resolution.values_mut() {
                    if resolution.resolved_unit.is_valid() {
                        resolution.resolved_unit.invalidate();
                        flushed += 1;
                    }
                }
            }
            EntryData::Markup(data) => {
                if data.parsed_unit.is_valid() {
                    data.parsed_unit.invalidate();
                    flushed += 1;
                }
            }
        }
        flushed
    }

    /// State of the parse artifact, whichever artifact set the entry has.
    pub fn parse_state(&self) -> CacheState {
        match &self.data {
            EntryData::Unit(data) => data.parsed_unit.state(),
            EntryData::Markup(data) => data.parsed_unit.state(),
        }
    }

    /// Parse diagnostics, whichever artifact set the entry has.
    pub fn parse_errors(&self) -> Option<&Arc<[Diagnostic]>> {
        match &self.data {
            EntryData::Unit(data) => data.parse_errors.get(),
            EntryData::Markup(data) => data.parse_errors.get(),
        }
    }
}
