//! Line-local caret stepping over char offsets.

use core::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::unicode::{next_grapheme_boundary, prev_grapheme_boundary};

/// A caret navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretMove {
    /// One grapheme (one visual slot in mixed-direction lines) to the left
    /// on screen.
    CharLeft,
    CharRight,
    /// Start of the current or previous UAX-29 word.
    WordPrevious,
    /// End of the current or next word.
    WordNext,
    /// Start of the visual line.
    LineStart,
    LineEnd,
    /// One visual line up, keeping the remembered column.
    LineUp,
    LineDown,
    /// One client-area height up.
    PageUp,
    PageDown,
    DocumentStart,
    DocumentEnd,
}

impl CaretMove {
    /// Moves that keep the remembered column for the next vertical move.
    pub fn is_vertical(self) -> bool {
        matches!(
            self,
            CaretMove::LineUp | CaretMove::LineDown | CaretMove::PageUp | CaretMove::PageDown
        )
    }
}

/// Kind of a word segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordBoundaryKind {
    /// A run of word characters.
    Word,
    /// Whitespace, punctuation and the like.
    NonWord,
}

/// A word or non-word segment, in chars.
#[derive(Debug, Clone)]
pub struct WordBoundary {
    pub range: Range<usize>,
    pub kind: WordBoundaryKind,
}

/// Split `text` at UAX-29 word bounds.
pub fn word_boundaries(text: &str) -> Vec<WordBoundary> {
    let mut result = Vec::new();
    let mut start = 0usize;
    for segment in text.split_word_bounds() {
        let end = start + segment.chars().count();
        let kind = if segment.chars().any(char::is_alphanumeric) {
            WordBoundaryKind::Word
        } else {
            WordBoundaryKind::NonWord
        };
        result.push(WordBoundary {
            range: start..end,
            kind,
        });
        start = end;
    }
    result
}

/// Previous grapheme boundary, staying put at the start of the line.
pub fn prev_char(text: &str, offset: usize) -> usize {
    prev_grapheme_boundary(text, offset).unwrap_or(0)
}

/// Next grapheme boundary, staying put at the end of the line.
pub fn next_char(text: &str, offset: usize) -> usize {
    next_grapheme_boundary(text, offset).unwrap_or_else(|| offset.max(text.chars().count()))
}

/// Start of the word containing or preceding `offset`.
pub fn prev_word_start(text: &str, offset: usize) -> usize {
    word_boundaries(text)
        .into_iter()
        .filter(|b| b.kind == WordBoundaryKind::Word && b.range.start < offset)
        .map(|b| b.range.start)
        .last()
        .unwrap_or(0)
}

/// End of the word containing or following `offset`.
pub fn next_word_end(text: &str, offset: usize) -> usize {
    word_boundaries(text)
        .into_iter()
        .find(|b| b.kind == WordBoundaryKind::Word && b.range.end > offset)
        .map(|b| b.range.end)
        .unwrap_or_else(|| text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_steps_cover_whole_clusters() {
        let text = "Hello 👨‍👩‍👧‍👦 World";
        let emoji_start = 6;
        let emoji_end = emoji_start + "👨‍👩‍👧‍👦".chars().count();
        assert_eq!(next_char(text, emoji_start), emoji_end);
        assert_eq!(prev_char(text, emoji_end), emoji_start);
        assert_eq!(prev_char(text, 0), 0);
        let len = text.chars().count();
        assert_eq!(next_char(text, len), len);
    }

    #[test]
    fn word_steps() {
        let text = "Hello, world! Test";
        assert_eq!(prev_word_start(text, 10), 7);
        assert_eq!(prev_word_start(text, 7), 0);
        assert_eq!(prev_word_start(text, 0), 0);
        assert_eq!(prev_word_start(text, 16), 14);

        assert_eq!(next_word_end(text, 0), 5);
        assert_eq!(next_word_end(text, 2), 5);
        assert_eq!(next_word_end(text, 5), 12);
        assert_eq!(next_word_end(text, 18), 18);
    }

    #[test]
    fn word_offsets_are_chars() {
        let text = "héllo wörld";
        let words: Vec<_> = word_boundaries(text)
            .into_iter()
            .filter(|w| w.kind == WordBoundaryKind::Word)
            .map(|w| w.range)
            .collect();
        assert_eq!(words, vec![0..5, 6..11]);
        assert_eq!(next_word_end(text, 5), 11);
    }
}
