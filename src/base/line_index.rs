//! Offset to line/column conversion.
//!
//! A [`LineIndex`] is the cheapest derived artifact the engine caches: a
//! table of line start offsets computed once per content version, queried by
//! every diagnostic consumer.

use text_size::TextSize;

/// A zero-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Table of line start offsets for one content snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> LineIndex {
        let mut line_starts = vec![TextSize::new(0)];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(offset as u32 + 1));
            }
        }
        LineIndex {
            line_starts,
            text_len: TextSize::of(text),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Start offset of a zero-based line, if the line exists.
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Convert an offset into a zero-based line/column pair.
    ///
    /// Offsets past the end of the text clamp to the final position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = u32::from(offset) - u32::from(self.line_starts[line]);
        LineCol {
            line: line as u32,
            col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_one_line() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
    }

    #[test]
    fn test_line_col_round_trip() {
        let index = LineIndex::new("library a;\nimport \"b.lm\";\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::new(9)), LineCol { line: 0, col: 9 });
        assert_eq!(index.line_col(TextSize::new(11)), LineCol { line: 1, col: 0 });
        assert_eq!(index.line_col(TextSize::new(18)), LineCol { line: 1, col: 7 });
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(TextSize::new(99)), LineCol { line: 0, col: 2 });
    }

    #[test]
    fn test_line_start() {
        let index = LineIndex::new("a\nb\n");
        assert_eq!(index.line_start(1), Some(TextSize::new(2)));
        assert_eq!(index.line_start(3), None);
    }
}
