//! Element models.
//!
//! An element is the engine's durable semantic summary of a source: what a
//! consumer asks about after resolution has settled. Elements are built from
//! resolved units and shared behind `Arc` by the cache.

use smol_str::SmolStr;

use crate::base::Source;
use crate::syntax::DirectiveKind;

use super::resolve::ResolvedUnit;

/// Semantic summary of a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryElement {
    /// The library's defining unit.
    pub source: Source,
    /// Declared name, absent for an unnamed library.
    pub name: Option<SmolStr>,
    /// Libraries imported by the defining unit, resolved.
    pub imported: Vec<Source>,
    /// Libraries exported by the defining unit, resolved.
    pub exported: Vec<Source>,
    /// Parts included by the defining unit, resolved.
    pub parts: Vec<Source>,
    /// Whether the library declares `entry;`.
    pub is_entry_point: bool,
    /// Doc comment block preceding the `library` directive.
    pub documentation: Option<String>,
}

impl LibraryElement {
    /// Build the element for a library from its resolved defining unit.
    pub fn from_resolved(
        resolved: &ResolvedUnit,
        name: Option<SmolStr>,
        is_entry_point: bool,
        documentation: Option<String>,
    ) -> LibraryElement {
        let collect = |kind: DirectiveKind| -> Vec<Source> {
            resolved
                .references
                .iter()
                .filter(|r| r.kind == kind)
                .filter_map(|r| r.target)
                .collect()
        };
        LibraryElement {
            source: resolved.source,
            name,
            imported: collect(DirectiveKind::Import),
            exported: collect(DirectiveKind::Export),
            parts: collect(DirectiveKind::Part),
            is_entry_point,
            documentation,
        }
    }
}

/// Semantic summary of a markup unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub source: Source,
    /// Libraries the markup references through script tags, resolved.
    pub referenced: Vec<Source>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{SourceKind, SourceRegistry};
    use crate::semantic::resolve::{TargetInfo, resolve_unit};
    use crate::syntax::parse_unit;

    #[test]
    fn test_element_collects_by_directive_kind() {
        let mut registry = SourceRegistry::new();
        let source = registry.intern("app.lm");
        let util = registry.intern("util.lm");
        let part = registry.intern("impl.lm");
        let (unit, _) = parse_unit(
            source,
            "/// App.\nlibrary app;\nentry;\nimport \"util.lm\";\npart \"impl.lm\";\n",
            1,
        );
        let targets = vec![
            TargetInfo::known(util, SourceKind::Library, None),
            TargetInfo::known(part, SourceKind::Part, Some(SmolStr::new("app"))),
        ];
        let (resolved, _) = resolve_unit(&unit, source, Some("app"), &targets);
        let element = LibraryElement::from_resolved(
            &resolved,
            unit.library_name.as_ref().map(|(n, _)| n.clone()),
            unit.has_entry,
            unit.documentation.clone(),
        );
        assert_eq!(element.name.as_deref(), Some("app"));
        assert_eq!(element.imported, vec![util]);
        assert!(element.exported.is_empty());
        assert_eq!(element.parts, vec![part]);
        assert!(element.is_entry_point);
        assert_eq!(element.documentation.as_deref(), Some("App."));
    }
}
