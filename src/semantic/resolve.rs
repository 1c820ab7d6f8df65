//! Directive resolution.
//!
//! Resolving a unit checks every URI-bearing directive against its target:
//! the target must exist and be readable, imports and exports must name
//! libraries, included parts must declare `part of` the including library's
//! name. Markup resolution checks script references the same way.
//!
//! Resolution never fails as such; a broken target is a diagnostic on the
//! referencing unit, not an engine failure.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{Diagnostic, DiagnosticCode, ModificationStamp, Source, SourceKind};
use crate::syntax::{Directive, DirectiveKind, MarkupUnit, ParsedUnit, ScriptRef};

/// What the engine knows about one directive's target at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// A `core:` URI; always resolvable, no backing source.
    Intrinsic,
    /// The target source could not be read.
    Unreadable,
    /// The target parsed; its kind and declared owner name, if any.
    Known {
        kind: SourceKind,
        part_of: Option<SmolStr>,
    },
}

/// Target of one directive, paired with its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// The interned target, absent for intrinsic URIs.
    pub target: Option<Source>,
    pub status: TargetStatus,
}

impl TargetInfo {
    pub fn intrinsic() -> TargetInfo {
        TargetInfo {
            target: None,
            status: TargetStatus::Intrinsic,
        }
    }

    pub fn unreadable(target: Source) -> TargetInfo {
        TargetInfo {
            target: Some(target),
            status: TargetStatus::Unreadable,
        }
    }

    /// A URI that maps to no source at all (e.g. an unknown scheme).
    pub fn missing() -> TargetInfo {
        TargetInfo {
            target: None,
            status: TargetStatus::Unreadable,
        }
    }

    pub fn known(target: Source, kind: SourceKind, part_of: Option<SmolStr>) -> TargetInfo {
        TargetInfo {
            target: Some(target),
            status: TargetStatus::Known { kind, part_of },
        }
    }
}

/// One directive with its validated target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub kind: DirectiveKind,
    pub uri: SmolStr,
    pub uri_range: TextRange,
    /// The target source when the reference resolved cleanly.
    pub target: Option<Source>,
    pub intrinsic: bool,
}

/// The library-relative resolution result for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub source: Source,
    /// Defining unit of the library this unit was resolved as part of.
    /// Equal to `source` when the unit is itself a library.
    pub library: Source,
    pub references: Vec<ResolvedReference>,
    /// Where the unit's opaque body begins, when it has one. Edits at or
    /// past this offset cannot change the directive layer.
    pub header_end: Option<TextSize>,
    /// Content version of `source` this resolution was computed from.
    pub stamp: ModificationStamp,
}

impl ResolvedUnit {
    /// Shift all reference ranges after `offset` by `delta` bytes, producing
    /// the resolution for an edited content version whose directive layer is
    /// unchanged. Used by the incremental edit path.
    pub fn shifted(&self, offset: TextRange, delta: i64, stamp: ModificationStamp) -> ResolvedUnit {
        let shift = |range: TextRange| -> TextRange {
            if range.start() >= offset.end() {
                let start = (u32::from(range.start()) as i64 + delta) as u32;
                let end = (u32::from(range.end()) as i64 + delta) as u32;
                TextRange::new(start.into(), end.into())
            } else {
                range
            }
        };
        ResolvedUnit {
            source: self.source,
            library: self.library,
            references: self
                .references
                .iter()
                .map(|r| ResolvedReference {
                    uri_range: shift(r.uri_range),
                    ..r.clone()
                })
                .collect(),
            header_end: self.header_end,
            stamp,
        }
    }
}

/// Resolve one unit as part of the given library.
///
/// `library_name` is the owning library's declared name (used to validate
/// included parts and `part of` agreement); `targets` must align one-to-one
/// with `unit.directives`.
pub fn resolve_unit(
    unit: &ParsedUnit,
    library: Source,
    library_name: Option<&str>,
    targets: &[TargetInfo],
) -> (ResolvedUnit, Vec<Diagnostic>) {
    debug_assert_eq!(unit.directives.len(), targets.len());
    let mut references = Vec::with_capacity(unit.directives.len());
    let mut diagnostics = Vec::new();

    for (directive, info) in unit.directives.iter().zip(targets) {
        references.push(resolve_directive(
            unit.source,
            directive,
            info,
            library_name,
            &mut diagnostics,
        ));
    }

    (
        ResolvedUnit {
            source: unit.source,
            library,
            references,
            header_end: unit.body_start,
            stamp: unit.stamp,
        },
        diagnostics,
    )
}

fn resolve_directive(
    source: Source,
    directive: &Directive,
    info: &TargetInfo,
    library_name: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> ResolvedReference {
    let mut reference = ResolvedReference {
        kind: directive.kind,
        uri: directive.uri.clone(),
        uri_range: directive.uri_range,
        target: None,
        intrinsic: false,
    };
    match &info.status {
        TargetStatus::Intrinsic => {
            reference.intrinsic = true;
        }
        TargetStatus::Unreadable => {
            diagnostics.push(Diagnostic::error(
                source,
                directive.uri_range,
                DiagnosticCode::UriNotFound,
                format!("'{}' names no readable source", directive.uri),
            ));
        }
        TargetStatus::Known { kind, part_of } => match directive.kind {
            DirectiveKind::Import | DirectiveKind::Export => {
                if *kind == SourceKind::Library {
                    reference.target = info.target;
                } else {
                    diagnostics.push(Diagnostic::error(
                        source,
                        directive.uri_range,
                        DiagnosticCode::TargetNotLibrary,
                        format!("'{}' is not a library", directive.uri),
                    ));
                }
            }
            DirectiveKind::Part => match part_of {
                None => {
                    diagnostics.push(Diagnostic::error(
                        source,
                        directive.uri_range,
                        DiagnosticCode::TargetIsLibrary,
                        format!("'{}' declares no 'part of'", directive.uri),
                    ));
                }
                Some(declared) => {
                    if library_name.is_some_and(|name| name == declared.as_str()) {
                        reference.target = info.target;
                    } else {
                        diagnostics.push(Diagnostic::error(
                            source,
                            directive.uri_range,
                            DiagnosticCode::PartOfNameMismatch,
                            format!(
                                "'{}' is part of '{}', not of '{}'",
                                directive.uri,
                                declared,
                                library_name.unwrap_or("<unnamed>"),
                            ),
                        ));
                    }
                }
            },
        },
    }
    reference
}

/// Resolve one markup unit's script references.
///
/// `targets` must align one-to-one with `unit.script_refs`.
pub fn resolve_markup(
    unit: &MarkupUnit,
    targets: &[TargetInfo],
) -> (Vec<Source>, Vec<Diagnostic>) {
    debug_assert_eq!(unit.script_refs.len(), targets.len());
    let mut referenced = Vec::new();
    let mut diagnostics = Vec::new();

    for (script, info) in unit.script_refs.iter().zip(targets) {
        resolve_script_ref(unit.source, script, info, &mut referenced, &mut diagnostics);
    }

    (referenced, diagnostics)
}

fn resolve_script_ref(
    source: Source,
    script: &ScriptRef,
    info: &TargetInfo,
    referenced: &mut Vec<Source>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &info.status {
        TargetStatus::Intrinsic => {}
        TargetStatus::Unreadable => {
            diagnostics.push(Diagnostic::error(
                source,
                script.uri_range,
                DiagnosticCode::DanglingScriptReference,
                format!("'{}' names no readable source", script.uri),
            ));
        }
        TargetStatus::Known { kind, .. } => {
            if *kind == SourceKind::Library {
                if let Some(target) = info.target {
                    referenced.push(target);
                }
            } else {
                diagnostics.push(Diagnostic::error(
                    source,
                    script.uri_range,
                    DiagnosticCode::ScriptIsNotLibrary,
                    format!("'{}' is not a library", script.uri),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRegistry;
    use crate::syntax::parse_unit;

    fn fixture(text: &str) -> (SourceRegistry, ParsedUnit) {
        let mut registry = SourceRegistry::new();
        let source = registry.intern("lib.lm");
        let (unit, _) = parse_unit(source, text, 1);
        (registry, unit)
    }

    #[test]
    fn test_clean_library_resolution() {
        let (mut registry, unit) =
            fixture("library app;\nimport \"util.lm\";\npart \"impl.lm\";\n");
        let util = registry.intern("util.lm");
        let impl_part = registry.intern("impl.lm");
        let targets = vec![
            TargetInfo::known(util, SourceKind::Library, None),
            TargetInfo::known(impl_part, SourceKind::Part, Some(SmolStr::new("app"))),
        ];
        let (resolved, diags) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        assert!(diags.is_empty());
        assert_eq!(resolved.references[0].target, Some(util));
        assert_eq!(resolved.references[1].target, Some(impl_part));
    }

    #[test]
    fn test_import_of_part_is_diagnosed() {
        let (mut registry, unit) = fixture("library app;\nimport \"p.lm\";\n");
        let part = registry.intern("p.lm");
        let targets = vec![TargetInfo::known(
            part,
            SourceKind::Part,
            Some(SmolStr::new("other")),
        )];
        let (resolved, diags) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::TargetNotLibrary);
        assert_eq!(resolved.references[0].target, None);
    }

    #[test]
    fn test_part_of_mismatch() {
        let (mut registry, unit) = fixture("library app;\npart \"p.lm\";\n");
        let part = registry.intern("p.lm");
        let targets = vec![TargetInfo::known(
            part,
            SourceKind::Part,
            Some(SmolStr::new("elsewhere")),
        )];
        let (_, diags) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::PartOfNameMismatch);
    }

    #[test]
    fn test_unreadable_target() {
        let (mut registry, unit) = fixture("library app;\nimport \"gone.lm\";\n");
        let gone = registry.intern("gone.lm");
        let targets = vec![TargetInfo::unreadable(gone)];
        let (_, diags) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UriNotFound);
    }

    #[test]
    fn test_intrinsic_import_is_clean() {
        let (_, unit) = fixture("library app;\nimport \"core:web\";\n");
        let targets = vec![TargetInfo::intrinsic()];
        let (resolved, diags) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        assert!(diags.is_empty());
        assert!(resolved.references[0].intrinsic);
        assert_eq!(resolved.references[0].target, None);
    }

    #[test]
    fn test_shifted_moves_trailing_ranges_only() {
        let (mut registry, unit) =
            fixture("library app;\nimport \"a.lm\";\nimport \"b.lm\";\n");
        let a = registry.intern("a.lm");
        let b = registry.intern("b.lm");
        let targets = vec![
            TargetInfo::known(a, SourceKind::Library, None),
            TargetInfo::known(b, SourceKind::Library, None),
        ];
        let (resolved, _) = resolve_unit(&unit, unit.source, Some("app"), &targets);
        let first = resolved.references[0].uri_range;
        let second = resolved.references[1].uri_range;
        // An edit between the two references shifts only the second.
        let edit = TextRange::new(first.end() + text_size::TextSize::new(1), second.start());
        let shifted = resolved.shifted(edit, 3, 2);
        assert_eq!(shifted.references[0].uri_range, first);
        assert_eq!(
            u32::from(shifted.references[1].uri_range.start()),
            u32::from(second.start()) + 3
        );
        assert_eq!(shifted.stamp, 2);
    }
}
