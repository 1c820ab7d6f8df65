//! Parsed unit types.
//!
//! A [`ParsedUnit`] is the directive-level parse tree of one `.lm` file; a
//! [`MarkupUnit`] is the reference list scanned from one `.lmx` file. Both
//! are immutable once built and shared behind `Arc` by the cache.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{ModificationStamp, Source};

/// Which URI-bearing directive produced a [`Directive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Import,
    Export,
    Part,
}

/// One `import`/`export`/`part` directive, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// The URI literal's contents, without quotes.
    pub uri: SmolStr,
    /// Range of the URI literal, quotes included.
    pub uri_range: TextRange,
    /// `import ... as alias`, when present.
    pub alias: Option<SmolStr>,
}

/// Directive-level parse tree of one unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUnit {
    pub source: Source,
    /// Name from a `library` directive, with the name's range.
    pub library_name: Option<(SmolStr, TextRange)>,
    /// Name from a `part of` directive, with the name's range.
    pub part_of: Option<(SmolStr, TextRange)>,
    /// Whether an `entry;` directive is present.
    pub has_entry: bool,
    /// Doc comment block immediately preceding the `library` directive.
    pub documentation: Option<String>,
    /// URI-bearing directives in declaration order.
    pub directives: Vec<Directive>,
    /// Offset where the opaque body begins, if the file has one.
    pub body_start: Option<TextSize>,
    /// Content version this unit was parsed from.
    pub stamp: ModificationStamp,
}

impl ParsedUnit {
    /// Whether this unit declares itself a part of some library.
    pub fn is_part(&self) -> bool {
        self.part_of.is_some()
    }

    pub fn imports(&self) -> impl Iterator<Item = &Directive> {
        self.directives
            .iter()
            .filter(|d| d.kind == DirectiveKind::Import)
    }

    pub fn exports(&self) -> impl Iterator<Item = &Directive> {
        self.directives
            .iter()
            .filter(|d| d.kind == DirectiveKind::Export)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Directive> {
        self.directives
            .iter()
            .filter(|d| d.kind == DirectiveKind::Part)
    }

    /// The range of the first directive whose span contains or follows
    /// `range`, used by the incremental path to decide whether an edit can
    /// avoid reparsing.
    pub fn directive_span_intersects(&self, range: TextRange) -> bool {
        let mut spans: Vec<TextRange> = self.directives.iter().map(|d| d.uri_range).collect();
        if let Some((_, r)) = &self.library_name {
            spans.push(*r);
        }
        if let Some((_, r)) = &self.part_of {
            spans.push(*r);
        }
        spans.iter().any(|span| span.intersect(range).is_some())
    }
}

/// One `<script src="...">` reference in a markup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRef {
    /// The `src` attribute's value.
    pub uri: SmolStr,
    /// Range of the attribute value, quotes included.
    pub uri_range: TextRange,
}

/// Reference list scanned from one markup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupUnit {
    pub source: Source,
    pub script_refs: Vec<ScriptRef>,
    /// Content version this unit was scanned from.
    pub stamp: ModificationStamp,
}
