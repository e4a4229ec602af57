//! Unicode utilities shared by the editing core.
//!
//! All public offsets in this crate count Unicode scalar values (chars), not
//! bytes. The helpers here translate between the two and walk extended
//! grapheme clusters so the caret never lands inside a combining sequence.

pub mod graphemes;

pub use graphemes::{
    grapheme_clusters, is_grapheme_boundary, next_grapheme_boundary, prev_grapheme_boundary,
};

/// Number of chars in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the char at `char_offset`, clamped to `text.len()`.
pub fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Char offset of the byte index `byte_offset` (which must be a char boundary).
pub fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset.min(text.len())].chars().count()
}

/// Slice `text` by char offsets.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end.max(start));
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_chars_and_bytes() {
        let text = "aדb";
        assert_eq!(char_len(text), 3);
        assert_eq!(byte_offset(text, 1), 1);
        assert_eq!(byte_offset(text, 2), 3);
        assert_eq!(byte_offset(text, 9), text.len());
        assert_eq!(char_offset(text, 3), 2);
        assert_eq!(char_slice(text, 1, 3), "דb");
    }
}
