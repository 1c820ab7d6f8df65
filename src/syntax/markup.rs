//! Markup scanner.
//!
//! Markup files are not parsed into a tree; the engine only needs the
//! library references they embed. The scanner walks the text for
//! `<script ... src="uri" ...>` tags (self-closing or not) and records each
//! `src` value with its range. Everything else is skipped.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{Diagnostic, DiagnosticCode, ModificationStamp, Source};

use super::ast::{MarkupUnit, ScriptRef};

/// Scan one markup file for script references.
///
/// Like unit parsing this always succeeds, producing a (possibly empty)
/// reference list plus diagnostics for malformed tags.
pub fn scan_markup(
    source: Source,
    text: &str,
    stamp: ModificationStamp,
) -> (MarkupUnit, Vec<Diagnostic>) {
    let mut script_refs = Vec::new();
    let mut diagnostics = Vec::new();
    let mut rest = text;
    let mut base = 0u32;

    while let Some(tag_pos) = find_script_tag(rest) {
        let tag_start = base + tag_pos as u32;
        let after_tag = &rest[tag_pos + "<script".len()..];
        let after_tag_base = tag_start + "<script".len() as u32;

        match after_tag.find('>') {
            Some(close) => {
                let attrs = &after_tag[..close];
                match find_src_attribute(attrs) {
                    Some((value_start, value_len)) => {
                        let start = after_tag_base + value_start as u32;
                        // Range covers the quotes around the value.
                        let uri_range = TextRange::at(
                            TextSize::new(start - 1),
                            TextSize::new(value_len as u32 + 2),
                        );
                        script_refs.push(ScriptRef {
                            uri: SmolStr::new(&attrs[value_start..value_start + value_len]),
                            uri_range,
                        });
                    }
                    None => {
                        diagnostics.push(Diagnostic::error(
                            source,
                            TextRange::at(
                                TextSize::new(tag_start),
                                TextSize::new("<script".len() as u32),
                            ),
                            DiagnosticCode::MissingScriptSource,
                            "script tag has no src attribute",
                        ));
                    }
                }
                rest = &after_tag[close + 1..];
                base = after_tag_base + close as u32 + 1;
            }
            None => {
                diagnostics.push(Diagnostic::error(
                    source,
                    TextRange::at(
                        TextSize::new(tag_start),
                        TextSize::new("<script".len() as u32),
                    ),
                    DiagnosticCode::UnclosedScriptTag,
                    "script tag never closes",
                ));
                break;
            }
        }
    }

    (
        MarkupUnit {
            source,
            script_refs,
            stamp,
        },
        diagnostics,
    )
}

/// Position of the next `<script` tag whose name ends there (not `<scripted`).
fn find_script_tag(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = text[from..].find("<script") {
        let pos = from + pos;
        let after = text[pos + "<script".len()..].chars().next();
        match after {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => from = pos + "<script".len(),
            _ => return Some(pos),
        }
    }
    None
}

/// `(value_start, value_len)` of the `src="..."` attribute value within
/// `attrs`, offsets relative to `attrs`.
fn find_src_attribute(attrs: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(pos) = attrs[from..].find("src") {
        let pos = from + pos;
        // Must be a standalone attribute name.
        let before_ok = pos == 0
            || attrs[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
        let after = &attrs[pos + 3..];
        let eq = after.find(|c: char| !c.is_whitespace());
        if before_ok && eq.is_some_and(|i| after[i..].starts_with('=')) {
            let after_eq = &after[eq.unwrap_or(0) + 1..];
            let quote_rel = after_eq.find(|c: char| !c.is_whitespace())?;
            if after_eq[quote_rel..].starts_with('"') {
                let value_start_in_after_eq = quote_rel + 1;
                let value = &after_eq[value_start_in_after_eq..];
                let end = value.find('"')?;
                let value_start =
                    pos + 3 + eq.unwrap_or(0) + 1 + value_start_in_after_eq;
                return Some((value_start, end));
            }
        }
        from = pos + 3;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRegistry;

    fn scan(text: &str) -> (MarkupUnit, Vec<Diagnostic>) {
        let mut registry = SourceRegistry::new();
        let source = registry.intern("index.lmx");
        scan_markup(source, text, 1)
    }

    #[test]
    fn test_single_script_ref() {
        let (unit, diags) = scan(r#"<page><script src="app.lm"></script></page>"#);
        assert!(diags.is_empty());
        assert_eq!(unit.script_refs.len(), 1);
        assert_eq!(unit.script_refs[0].uri, "app.lm");
    }

    #[test]
    fn test_self_closing_and_multiple() {
        let (unit, diags) = scan(
            r#"<page>
<script src="a.lm"/>
<script type="module" src="b.lm"/>
</page>"#,
        );
        assert!(diags.is_empty());
        let uris: Vec<&str> = unit.script_refs.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["a.lm", "b.lm"]);
    }

    #[test]
    fn test_missing_src() {
        let (unit, diags) = scan(r#"<script type="module"></script>"#);
        assert!(unit.script_refs.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::MissingScriptSource);
    }

    #[test]
    fn test_unclosed_tag() {
        let (_, diags) = scan(r#"<script src="a.lm""#);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UnclosedScriptTag);
    }

    #[test]
    fn test_uri_range_covers_quoted_value() {
        let text = r#"<script src="app.lm">"#;
        let (unit, _) = scan(text);
        let range = unit.script_refs[0].uri_range;
        assert_eq!(&text[range], "\"app.lm\"");
    }

    #[test]
    fn test_no_refs_in_plain_markup() {
        let (unit, diags) = scan("<page><title>hello</title></page>");
        assert!(unit.script_refs.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_script_prefix_of_longer_name_is_skipped() {
        let (unit, _) = scan(r#"<scripted src="x.lm"/>"#);
        assert!(unit.script_refs.is_empty());
    }
}
