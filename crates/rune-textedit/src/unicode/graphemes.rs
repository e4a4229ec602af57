use core::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use super::char_offset;

/// Char ranges of every extended grapheme cluster in `text`, in order.
pub fn grapheme_clusters(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for g in text.graphemes(true) {
        let len = g.chars().count();
        out.push(start..start + len);
        start += len;
    }
    out
}

/// Returns `true` if char offset `offset` is at a grapheme cluster boundary.
///
/// `offset` is clamped to the text length.
pub fn is_grapheme_boundary(text: &str, offset: usize) -> bool {
    let len = text.chars().count();
    let offset = offset.min(len);
    if offset == 0 || offset == len {
        return true;
    }
    for (byte_idx, _) in text.grapheme_indices(true) {
        let idx = char_offset(text, byte_idx);
        if idx == offset {
            return true;
        }
        if idx > offset {
            break;
        }
    }
    false
}

/// Start of the grapheme cluster before `offset`, or `None` at the start.
///
/// If `offset` lies inside a cluster, the start of that cluster is returned.
pub fn prev_grapheme_boundary(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 || text.is_empty() {
        return None;
    }
    let mut prev = None;
    for range in grapheme_clusters(text) {
        if range.start >= offset {
            break;
        }
        prev = Some(range.start);
        if offset <= range.end {
            break;
        }
    }
    prev
}

/// End of the grapheme cluster after `offset`, or `None` at the end.
///
/// If `offset` lies inside a cluster, the end of that cluster is returned.
pub fn next_grapheme_boundary(text: &str, offset: usize) -> Option<usize> {
    grapheme_clusters(text)
        .into_iter()
        .find(|range| offset < range.end)
        .map(|range| range.end)
}
