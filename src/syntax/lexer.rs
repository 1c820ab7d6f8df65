//! Logos-based lexer for the Lumen directive layer.
//!
//! Fast tokenization using the logos crate. The lexer skips nothing: trivia
//! tokens are produced so the parser can capture doc comments and detect
//! unterminated trivia.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl<'a> Token<'a> {
    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, TextSize::of(self.text))
    }
}

/// Lexer wrapping the logos-generated tokenizer.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => TokenKind::Error,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Token kinds surfaced to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    DocComment,
    BlockComment,
    LibraryKw,
    PartKw,
    OfKw,
    ImportKw,
    ExportKw,
    EntryKw,
    AsKw,
    Ident,
    String,
    /// A string literal missing its closing quote.
    UnterminatedString,
    Dot,
    Semicolon,
    Error,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::DocComment
                | TokenKind::BlockComment
        )
    }

    /// Whether this token can begin a directive.
    pub fn starts_directive(&self) -> bool {
        matches!(
            self,
            TokenKind::LibraryKw
                | TokenKind::PartKw
                | TokenKind::ImportKw
                | TokenKind::ExportKw
                | TokenKind::EntryKw
        )
    }
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> TokenKind {
        match token {
            LogosToken::Whitespace => TokenKind::Whitespace,
            LogosToken::LineComment => TokenKind::LineComment,
            LogosToken::DocComment => TokenKind::DocComment,
            LogosToken::BlockComment => TokenKind::BlockComment,
            LogosToken::LibraryKw => TokenKind::LibraryKw,
            LogosToken::PartKw => TokenKind::PartKw,
            LogosToken::OfKw => TokenKind::OfKw,
            LogosToken::ImportKw => TokenKind::ImportKw,
            LogosToken::ExportKw => TokenKind::ExportKw,
            LogosToken::EntryKw => TokenKind::EntryKw,
            LogosToken::AsKw => TokenKind::AsKw,
            LogosToken::Ident => TokenKind::Ident,
            LogosToken::String => TokenKind::String,
            LogosToken::UnterminatedString => TokenKind::UnterminatedString,
            LogosToken::Dot => TokenKind::Dot,
            LogosToken::Semicolon => TokenKind::Semicolon,
        }
    }
}

/// Logos token enum - maps to TokenKind.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"")] // Don't skip anything, we want all tokens
enum LogosToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"///[^\n]*", priority = 4)]
    DocComment,

    #[regex(r"//[^\n]*", priority = 3)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    BlockComment,

    #[token("library")]
    LibraryKw,

    #[token("part")]
    PartKw,

    #[token("of")]
    OfKw,

    #[token("import")]
    ImportKw,

    #[token("export")]
    ExportKw,

    #[token("entry")]
    EntryKw,

    #[token("as")]
    AsKw,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r#""([^"\\\n]|\\.)*"#, priority = 1)]
    UnterminatedString,

    #[token(".")]
    Dot,

    #[token(";")]
    Semicolon,
}
