//! Recursive-descent parser for the Lumen directive layer.
//!
//! The parser consumes directives from the top of a unit file and stops at
//! the first token that cannot begin one; everything from there on is the
//! opaque body. Recovery is per-directive: a malformed directive skips to the
//! next `;` (or the next directive keyword) and parsing continues.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{Diagnostic, DiagnosticCode, ModificationStamp, Source};

use super::ast::{Directive, DirectiveKind, ParsedUnit};
use super::lexer::{Token, TokenKind, tokenize};

/// Parse the directive layer of one unit file.
///
/// Always succeeds: malformed input produces a degenerate unit plus
/// diagnostics, never a failure.
pub fn parse_unit(
    source: Source,
    text: &str,
    stamp: ModificationStamp,
) -> (ParsedUnit, Vec<Diagnostic>) {
    let tokens = tokenize(text);
    let mut parser = Parser {
        source,
        tokens: &tokens,
        pos: 0,
        text_len: TextSize::of(text),
        diagnostics: Vec::new(),
        unit: ParsedUnit {
            source,
            library_name: None,
            part_of: None,
            has_entry: false,
            documentation: None,
            directives: Vec::new(),
            body_start: None,
            stamp,
        },
    };
    parser.run();
    (parser.unit, parser.diagnostics)
}

struct Parser<'a> {
    source: Source,
    tokens: &'a [Token<'a>],
    pos: usize,
    text_len: TextSize,
    diagnostics: Vec<Diagnostic>,
    unit: ParsedUnit,
}

impl<'a> Parser<'a> {
    fn run(&mut self) {
        loop {
            let doc = self.skip_trivia_collecting_doc();
            let Some(token) = self.peek() else {
                return;
            };
            match token.kind {
                TokenKind::LibraryKw => self.library_directive(doc),
                TokenKind::PartKw => self.part_directive(),
                TokenKind::ImportKw => self.uri_directive(DirectiveKind::Import),
                TokenKind::ExportKw => self.uri_directive(DirectiveKind::Export),
                TokenKind::EntryKw => self.entry_directive(),
                _ => {
                    // First non-directive token: the opaque body starts here.
                    self.unit.body_start = Some(token.offset);
                    return;
                }
            }
        }
    }

    // ---- directives ----

    fn library_directive(&mut self, doc: Option<String>) {
        let keyword = self.bump();
        let Some((name, range)) = self.dotted_name() else {
            self.error_at(keyword.range(), DiagnosticCode::ExpectedName, "expected a library name");
            self.recover();
            return;
        };
        self.expect_semicolon(range);
        if self.unit.library_name.is_some() {
            self.error_at(
                range,
                DiagnosticCode::DuplicateLibraryDirective,
                "a unit may declare only one library",
            );
            return;
        }
        if self.unit.part_of.is_some() {
            self.error_at(
                range,
                DiagnosticCode::ConflictingUnitDirectives,
                "a unit cannot be both a library and a part",
            );
            return;
        }
        self.unit.library_name = Some((name, range));
        self.unit.documentation = doc;
    }

    fn part_directive(&mut self) {
        let keyword = self.bump();
        self.skip_trivia();
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::OfKw) => {
                self.bump();
                let Some((name, range)) = self.dotted_name() else {
                    self.error_at(
                        keyword.range(),
                        DiagnosticCode::ExpectedName,
                        "expected the owning library's name",
                    );
                    self.recover();
                    return;
                };
                self.expect_semicolon(range);
                if self.unit.library_name.is_some() {
                    self.error_at(
                        range,
                        DiagnosticCode::ConflictingUnitDirectives,
                        "a unit cannot be both a library and a part",
                    );
                    return;
                }
                if self.unit.part_of.is_some() {
                    // Keep the first declaration; later ones are duplicates.
                    self.error_at(
                        range,
                        DiagnosticCode::ConflictingUnitDirectives,
                        "a unit may declare only one owning library",
                    );
                    return;
                }
                self.unit.part_of = Some((name, range));
            }
            _ => self.finish_uri_directive(DirectiveKind::Part, keyword),
        }
    }

    fn uri_directive(&mut self, kind: DirectiveKind) {
        let keyword = self.bump();
        self.finish_uri_directive(kind, keyword);
    }

    fn finish_uri_directive(&mut self, kind: DirectiveKind, keyword: Token<'a>) {
        self.skip_trivia();
        let Some(token) = self.peek() else {
            self.error_at(keyword.range(), DiagnosticCode::ExpectedUri, "expected a URI string");
            return;
        };
        match token.kind {
            TokenKind::String => {
                let uri_range = token.range();
                let uri = SmolStr::new(token.text.trim_matches('"'));
                self.bump();
                let alias = if kind == DirectiveKind::Import {
                    self.import_alias()
                } else {
                    None
                };
                self.expect_semicolon(uri_range);
                self.unit.directives.push(Directive {
                    kind,
                    uri,
                    uri_range,
                    alias,
                });
            }
            TokenKind::UnterminatedString => {
                self.error_at(
                    token.range(),
                    DiagnosticCode::UnterminatedString,
                    "unterminated URI string",
                );
                self.bump();
                self.recover();
            }
            _ => {
                self.error_at(keyword.range(), DiagnosticCode::ExpectedUri, "expected a URI string");
                self.recover();
            }
        }
    }

    fn import_alias(&mut self) -> Option<SmolStr> {
        self.skip_trivia();
        if self.peek().map(|t| t.kind) != Some(TokenKind::AsKw) {
            return None;
        }
        self.bump();
        self.skip_trivia();
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                let alias = SmolStr::new(token.text);
                self.bump();
                Some(alias)
            }
            _ => None,
        }
    }

    fn entry_directive(&mut self) {
        let keyword = self.bump();
        self.expect_semicolon(keyword.range());
        self.unit.has_entry = true;
    }

    // ---- helper parsing ----

    /// `ident (. ident)*`, with trivia allowed around the dots.
    fn dotted_name(&mut self) -> Option<(SmolStr, TextRange)> {
        self.skip_trivia();
        let first = self.peek()?;
        if first.kind != TokenKind::Ident {
            return None;
        }
        let start = first.offset;
        let mut end = first.range().end();
        let mut name = String::from(first.text);
        self.bump();
        loop {
            self.skip_trivia();
            if self.peek().map(|t| t.kind) != Some(TokenKind::Dot) {
                break;
            }
            let checkpoint = self.pos;
            self.bump();
            self.skip_trivia();
            match self.peek() {
                Some(token) if token.kind == TokenKind::Ident => {
                    name.push('.');
                    name.push_str(token.text);
                    end = token.range().end();
                    self.bump();
                }
                _ => {
                    self.pos = checkpoint;
                    break;
                }
            }
        }
        Some((SmolStr::new(name), TextRange::new(start, end)))
    }

    fn expect_semicolon(&mut self, anchor: TextRange) {
        self.skip_trivia();
        if self.peek().map(|t| t.kind) == Some(TokenKind::Semicolon) {
            self.bump();
        } else {
            self.error_at(
                anchor,
                DiagnosticCode::ExpectedSemicolon,
                "expected ';' after directive",
            );
        }
    }

    /// Skip to just after the next `;`, or to the next directive keyword.
    fn recover(&mut self) {
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Semicolon {
                self.bump();
                return;
            }
            if token.kind.starts_directive() {
                return;
            }
            self.bump();
        }
    }

    // ---- token access ----

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Token<'a> {
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn skip_trivia(&mut self) {
        while let Some(token) = self.peek() {
            if !token.kind.is_trivia() {
                break;
            }
            if token.kind == TokenKind::BlockComment && !token.text.ends_with("*/") {
                self.error_at(
                    token.range(),
                    DiagnosticCode::UnterminatedComment,
                    "unterminated block comment",
                );
            }
            self.pos += 1;
        }
    }

    /// Skip trivia, returning the text of a contiguous trailing doc block.
    fn skip_trivia_collecting_doc(&mut self) -> Option<String> {
        let mut doc_lines: Vec<&str> = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::DocComment => {
                    doc_lines.push(token.text.trim_start_matches('/').trim());
                    self.pos += 1;
                }
                TokenKind::Whitespace => {
                    // A blank line detaches an earlier doc block.
                    if token.text.matches('\n').count() > 1 {
                        doc_lines.clear();
                    }
                    self.pos += 1;
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    doc_lines.clear();
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join("\n"))
        }
    }

    fn error_at(&mut self, range: TextRange, code: DiagnosticCode, message: &str) {
        let range = if range.end() <= self.text_len {
            range
        } else {
            TextRange::new(self.text_len, self.text_len)
        };
        self.diagnostics
            .push(Diagnostic::error(self.source, range, code, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRegistry;

    fn parse(text: &str) -> (ParsedUnit, Vec<Diagnostic>) {
        let mut registry = SourceRegistry::new();
        let source = registry.intern("test.lm");
        parse_unit(source, text, 1)
    }

    #[test]
    fn test_library_with_imports_and_parts() {
        let (unit, diags) = parse(
            r#"library app.core;
import "util.lm";
export "api.lm";
part "impl.lm";
"#,
        );
        assert!(diags.is_empty());
        assert_eq!(unit.library_name.as_ref().unwrap().0, "app.core");
        assert_eq!(unit.imports().count(), 1);
        assert_eq!(unit.exports().count(), 1);
        assert_eq!(unit.parts().count(), 1);
        assert!(!unit.is_part());
        assert!(unit.body_start.is_none());
    }

    #[test]
    fn test_part_of_unit() {
        let (unit, diags) = parse("part of app.core;\n");
        assert!(diags.is_empty());
        assert!(unit.is_part());
        assert_eq!(unit.part_of.as_ref().unwrap().0, "app.core");
    }

    #[test]
    fn test_entry_and_alias() {
        let (unit, diags) = parse("library tool;\nentry;\nimport \"x.lm\" as x;\n");
        assert!(diags.is_empty());
        assert!(unit.has_entry);
        assert_eq!(unit.imports().next().unwrap().alias.as_deref(), Some("x"));
    }

    #[test]
    fn test_doc_comment_attaches_to_library() {
        let (unit, _) = parse("/// The core library.\n/// Second line.\nlibrary app;\n");
        assert_eq!(
            unit.documentation.as_deref(),
            Some("The core library.\nSecond line.")
        );
    }

    #[test]
    fn test_blank_line_detaches_doc_comment() {
        let (unit, _) = parse("/// Stray.\n\n\nlibrary app;\n");
        assert_eq!(unit.documentation, None);
    }

    #[test]
    fn test_body_is_opaque() {
        let (unit, diags) = parse("library app;\nfn main() { let x = 1; }\n");
        assert!(diags.is_empty());
        assert!(unit.body_start.is_some());
        assert_eq!(unit.library_name.as_ref().unwrap().0, "app");
    }

    #[test]
    fn test_missing_semicolon_recovers() {
        let (unit, diags) = parse("library app\nimport \"x.lm\";\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::ExpectedSemicolon);
        assert_eq!(unit.imports().count(), 1);
    }

    #[test]
    fn test_missing_uri_recovers() {
        let (unit, diags) = parse("import ;\nimport \"ok.lm\";\n");
        assert!(diags.iter().any(|d| d.code == DiagnosticCode::ExpectedUri));
        assert_eq!(unit.imports().count(), 1);
    }

    #[test]
    fn test_conflicting_library_and_part_of() {
        let (unit, diags) = parse("library a;\npart of b;\n");
        assert!(
            diags
                .iter()
                .any(|d| d.code == DiagnosticCode::ConflictingUnitDirectives)
        );
        // The first declaration wins.
        assert!(unit.library_name.is_some());
        assert!(unit.part_of.is_none());
    }

    #[test]
    fn test_duplicate_library() {
        let (unit, diags) = parse("library a;\nlibrary b;\n");
        assert!(
            diags
                .iter()
                .any(|d| d.code == DiagnosticCode::DuplicateLibraryDirective)
        );
        assert_eq!(unit.library_name.as_ref().unwrap().0, "a");
    }

    #[test]
    fn test_garbage_is_degenerate_unit() {
        let (unit, diags) = parse("%%% not a unit at all");
        assert!(diags.is_empty());
        assert!(unit.library_name.is_none());
        assert_eq!(unit.body_start, Some(TextSize::new(0)));
    }

    #[test]
    fn test_unterminated_string() {
        let (_, diags) = parse("import \"broken;\n");
        assert!(
            diags
                .iter()
                .any(|d| d.code == DiagnosticCode::UnterminatedString)
        );
    }
}
