use core::ops::Range;

use unicode_linebreak::{BreakOpportunity, linebreaks};
use unicode_segmentation::UnicodeSegmentation;

use crate::measure::MeasurementService;
use crate::style::StyleRun;
use crate::unicode::char_offset;

/// Kind of line break at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreakKind {
    /// Required line break (end of text, or a forced break char).
    Mandatory,
    /// Optional line break opportunity.
    Opportunity,
}

/// A line break opportunity in the text.
#[derive(Debug, Clone, Copy)]
pub struct LineBreak {
    /// Char offset *after* the break.
    pub offset: usize,
    pub kind: LineBreakKind,
}

/// Compute all line break opportunities in `text` using UAX-14 via the
/// `unicode-linebreak` crate. The end of text is always a mandatory break.
pub fn compute_line_breaks(text: &str) -> Vec<LineBreak> {
    linebreaks(text)
        .map(|(byte, opp)| LineBreak {
            offset: char_offset(text, byte),
            kind: match opp {
                BreakOpportunity::Mandatory => LineBreakKind::Mandatory,
                BreakOpportunity::Allowed => LineBreakKind::Opportunity,
            },
        })
        .collect()
}

/// Greedily split one logical line into visual sub-lines no wider than
/// `max_width`.
///
/// Breaks at the last fitting UAX-14 opportunity. Whitespace before an
/// opportunity hangs past `max_width` and stays on the earlier sub-line. A
/// word wider than `max_width` is split at grapheme boundaries, and every
/// sub-line takes at least one grapheme. Returned ranges are line relative,
/// contiguous, and cover the whole line (an empty line yields `[0..0]`).
pub fn wrap_line(
    text: &str,
    runs: &[StyleRun],
    measurer: &dyn MeasurementService,
    max_width: f32,
) -> Vec<Range<usize>> {
    let len = text.chars().count();
    if len == 0 {
        return vec![0..0];
    }
    let breaks = compute_line_breaks(text);
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0usize;

    while start < len {
        let fits = |end: usize| measurer.width(text, runs, start, end) <= max_width;
        let hanging_fits = |end: usize| {
            let mut visible_end = end;
            while visible_end > start && chars[visible_end - 1].is_whitespace() {
                visible_end -= 1;
            }
            fits(visible_end)
        };

        let mut best_end = None;
        for br in breaks.iter().filter(|b| b.offset > start) {
            let end = br.offset.min(len);
            if hanging_fits(end) {
                best_end = Some(end);
                if br.kind == LineBreakKind::Mandatory && end < len {
                    break;
                }
            } else {
                break;
            }
        }

        let end = match best_end {
            Some(end) => end,
            None => grapheme_fill(text, start, len, &fits),
        };
        out.push(start..end);
        start = end;
    }
    out
}

/// Longest run of whole graphemes from `start` that fits, but at least one.
fn grapheme_fill(text: &str, start: usize, len: usize, fits: &dyn Fn(usize) -> bool) -> usize {
    let mut end = start;
    let mut first = None;
    let mut offset = 0usize;
    for g in text.graphemes(true) {
        let g_len = g.chars().count();
        let g_end = offset + g_len;
        offset = g_end;
        if g_end <= start {
            continue;
        }
        first.get_or_insert(g_end);
        if fits(g_end) {
            end = g_end;
        } else {
            break;
        }
    }
    if end > start {
        end
    } else {
        first.unwrap_or(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasurer;

    #[test]
    fn line_breaks_are_char_offsets() {
        let breaks = compute_line_breaks("añb cd");
        assert!(breaks.iter().any(|b| b.offset == 4 && b.kind == LineBreakKind::Opportunity));
        let last = breaks.last().map(|b| (b.offset, b.kind));
        assert_eq!(last, Some((6, LineBreakKind::Mandatory)));
    }

    #[test]
    fn wraps_at_word_opportunities() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        // "hello " is 60px; "hello world" would be 110px.
        let lines = wrap_line("hello world", &[], &m, 70.0);
        assert_eq!(lines, vec![0..6, 6..11]);
    }

    #[test]
    fn trailing_space_hangs_on_a_full_line() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        // "hello" fills 50px exactly; the space after it does not count.
        assert_eq!(wrap_line("hello world", &[], &m, 50.0), vec![0..6, 6..11]);
        assert_eq!(wrap_line("ab   cd", &[], &m, 20.0), vec![0..5, 5..7]);
    }

    #[test]
    fn long_words_fall_back_to_graphemes() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let lines = wrap_line("abcdefgh", &[], &m, 30.0);
        assert_eq!(lines, vec![0..3, 3..6, 6..8]);
    }

    #[test]
    fn always_consumes_a_grapheme() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let lines = wrap_line("ab", &[], &m, 1.0);
        assert_eq!(lines, vec![0..1, 1..2]);
    }

    #[test]
    fn empty_and_fitting_lines() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        assert_eq!(wrap_line("", &[], &m, 50.0), vec![0..0]);
        assert_eq!(wrap_line("abc", &[], &m, 50.0), vec![0..3]);
    }
}
