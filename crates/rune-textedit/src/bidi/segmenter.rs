use unicode_bidi::Level;

use super::{BaseDirection, BidiRun, group_runs, levels_per_char, visual_index_map};
use crate::error::{EditError, Result};
use crate::measure::MeasurementService;
use crate::selection::CaretDirection;
use crate::style::StyleRun;
use crate::unicode::{char_len, char_slice};

/// Host callback that splits a line into independently reordered segments.
///
/// Returned offsets are line relative, start at 0 and strictly increase.
pub trait BidiSegmentProvider {
    fn segments(&self, line_offset: usize, line: &str) -> Option<Vec<usize>>;
}

/// Which side of a char the caret hugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Leading,
    Trailing,
}

/// Direction analysis of one line.
///
/// Segments are reordered independently and laid out in base-direction
/// order, so text never migrates across a segment boundary. Caret positions
/// are modeled as visual slots `0..=len` (slot `s` sits left of the char at
/// visual index `s`), which makes left/right movement exact at direction
/// changes.
#[derive(Debug, Clone)]
pub struct BidiSegmenter<'a> {
    text: &'a str,
    len: usize,
    base: BaseDirection,
    segments: Vec<usize>,
    levels: Vec<Level>,
    visual: Vec<usize>,
    logical_to_visual: Vec<usize>,
    runs: Vec<BidiRun>,
}

impl<'a> BidiSegmenter<'a> {
    /// Analyze `text`. `segments`, when given, must begin at 0, strictly
    /// increase, and not exceed the line length.
    pub fn new(text: &'a str, base: BaseDirection, segments: Option<&[usize]>) -> Result<Self> {
        let len = char_len(text);
        let segments = merge_segments(segments, len)?;
        Ok(Self::build(text, len, base, segments))
    }

    /// Analyze `text` as a single segment.
    pub fn unsegmented(text: &'a str, base: BaseDirection) -> Self {
        Self::build(text, char_len(text), base, vec![0])
    }

    fn build(text: &'a str, len: usize, base: BaseDirection, segments: Vec<usize>) -> Self {
        let base = base.resolve(text);

        let mut levels = Vec::with_capacity(len);
        let mut visual_segments = Vec::with_capacity(segments.len());
        for (i, &start) in segments.iter().enumerate() {
            let end = segments.get(i + 1).copied().unwrap_or(len);
            let segment_levels = levels_per_char(char_slice(text, start, end), base);
            let order: Vec<usize> = visual_index_map(&segment_levels)
                .into_iter()
                .map(|local| local + start)
                .collect();
            levels.extend(segment_levels);
            visual_segments.push(order);
        }
        if base.is_rtl() {
            visual_segments.reverse();
        }
        let visual: Vec<usize> = visual_segments.into_iter().flatten().collect();
        let mut logical_to_visual = vec![0; len];
        for (v, &logical) in visual.iter().enumerate() {
            logical_to_visual[logical] = v;
        }
        let runs = group_runs(&visual, &levels, &segments);

        Self {
            text,
            len,
            base,
            segments,
            levels,
            visual,
            logical_to_visual,
            runs,
        }
    }

    pub fn text(&self) -> &str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolved base direction.
    pub fn base(&self) -> BaseDirection {
        self.base
    }

    /// Effective segment starts (always begins with 0).
    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    /// Direction runs in visual order.
    pub fn runs(&self) -> &[BidiRun] {
        &self.runs
    }

    /// Whether the char at `offset` is shown right to left. Offsets at or past
    /// the end report the base direction.
    pub fn is_rtl(&self, offset: usize) -> bool {
        match self.levels.get(offset) {
            Some(level) => level.is_rtl(),
            None => self.base.is_rtl(),
        }
    }

    /// Whether any char of the line is right to left.
    pub fn has_rtl(&self) -> bool {
        self.levels.iter().any(|level| level.is_rtl())
    }

    /// Visual position of logical char `offset`.
    pub fn visual_index(&self, offset: usize) -> Option<usize> {
        self.logical_to_visual.get(offset).copied()
    }

    /// Logical char shown at visual position `index`.
    pub fn logical_index(&self, index: usize) -> Option<usize> {
        self.visual.get(index).copied()
    }

    /// The char a caret at `offset` hugs, and on which side.
    fn anchor_char(&self, offset: usize, direction: CaretDirection) -> Option<(usize, Edge)> {
        if self.len == 0 {
            return None;
        }
        let prefer_previous = match direction {
            CaretDirection::Forward => offset > 0,
            CaretDirection::Backward => offset >= self.len,
        };
        if prefer_previous {
            Some((offset.min(self.len) - 1, Edge::Trailing))
        } else {
            Some((offset, Edge::Leading))
        }
    }

    /// Visual slot of a caret at `offset`.
    pub fn caret_slot(&self, offset: usize, direction: CaretDirection) -> usize {
        let Some((ch, edge)) = self.anchor_char(offset, direction) else {
            return 0;
        };
        let v = self.logical_to_visual[ch];
        match (edge, self.is_rtl(ch)) {
            (Edge::Leading, false) | (Edge::Trailing, true) => v,
            (Edge::Leading, true) | (Edge::Trailing, false) => v + 1,
        }
    }

    /// Caret offset for the slot just left of visual char `ch`.
    fn left_of(&self, ch: usize) -> (usize, CaretDirection) {
        if self.is_rtl(ch) {
            (ch + 1, CaretDirection::Forward)
        } else {
            (ch, CaretDirection::Backward)
        }
    }

    /// Caret offset for the slot just right of visual char `ch`.
    fn right_of(&self, ch: usize) -> (usize, CaretDirection) {
        if self.is_rtl(ch) {
            (ch, CaretDirection::Backward)
        } else {
            (ch + 1, CaretDirection::Forward)
        }
    }

    /// Caret offset for visual slot `slot`.
    pub fn slot_offset(&self, slot: usize) -> (usize, CaretDirection) {
        if self.len == 0 {
            return (0, CaretDirection::Backward);
        }
        if slot >= self.len {
            self.right_of(self.visual[self.len - 1])
        } else {
            self.left_of(self.visual[slot])
        }
    }

    /// Move the caret one char to the left on screen.
    ///
    /// Inside an RTL run this advances the logical offset; at a direction
    /// change the caret lands on the adjacent run's boundary on the correct
    /// visual side. Returns `None` at the left edge of the line.
    pub fn move_left(
        &self,
        offset: usize,
        direction: CaretDirection,
    ) -> Option<(usize, CaretDirection)> {
        let slot = self.caret_slot(offset, direction);
        if slot == 0 {
            return None;
        }
        Some(self.left_of(self.visual[slot - 1]))
    }

    /// Move the caret one char to the right on screen. Returns `None` at the
    /// right edge of the line.
    pub fn move_right(
        &self,
        offset: usize,
        direction: CaretDirection,
    ) -> Option<(usize, CaretDirection)> {
        let slot = self.caret_slot(offset, direction);
        if slot >= self.len {
            return None;
        }
        Some(self.right_of(self.visual[slot]))
    }

    /// Offset reached by moving toward the logical start of the line in
    /// screen terms: left for LTR bases, right for RTL bases.
    pub fn visual_line_start(&self) -> (usize, CaretDirection) {
        if self.base.is_rtl() {
            self.slot_offset(self.len)
        } else {
            self.slot_offset(0)
        }
    }

    /// Measured width of every run, in visual order.
    fn run_widths(&self, measurer: &dyn MeasurementService, style: &[StyleRun]) -> Vec<f32> {
        self.runs
            .iter()
            .map(|run| measurer.width(self.text, style, run.start, run.end))
            .collect()
    }

    /// Total width of the line.
    pub fn width(&self, measurer: &dyn MeasurementService, style: &[StyleRun]) -> f32 {
        self.run_widths(measurer, style).iter().sum()
    }

    /// X of a caret at `offset`, measured from the left edge of the line.
    ///
    /// Walks runs in visual order summing their widths, then measures within
    /// the run holding the caret's char.
    pub fn caret_x(
        &self,
        offset: usize,
        direction: CaretDirection,
        measurer: &dyn MeasurementService,
        style: &[StyleRun],
    ) -> f32 {
        let Some((ch, edge)) = self.anchor_char(offset, direction) else {
            return 0.0;
        };
        let mut run_x = 0.0f32;
        for (run, width) in self.runs.iter().zip(self.run_widths(measurer, style)) {
            if run.contains(ch) {
                let split = match edge {
                    Edge::Leading => ch,
                    Edge::Trailing => ch + 1,
                };
                return if run.rtl {
                    run_x + measurer.width(self.text, style, split, run.end)
                } else {
                    run_x + measurer.width(self.text, style, run.start, split)
                };
            }
            run_x += width;
        }
        run_x
    }

    /// Caret offset nearest to `x`.
    ///
    /// Prefix widths are only monotonic within one run, so the search walks
    /// runs in visual order and binary-searches inside the run under `x`. The
    /// caret goes to whichever edge of the hit char is closer.
    pub fn offset_at_x(
        &self,
        x: f32,
        measurer: &dyn MeasurementService,
        style: &[StyleRun],
    ) -> (usize, CaretDirection) {
        if self.len == 0 || x <= 0.0 {
            return self.slot_offset(0);
        }
        let mut run_x = 0.0f32;
        for (run, width) in self.runs.iter().zip(self.run_widths(measurer, style)) {
            if x >= run_x + width {
                run_x += width;
                continue;
            }
            let local = x - run_x;
            if run.rtl {
                // Left edge of char k is width(k + 1, end); it shrinks as k grows.
                let edge = |k: usize| measurer.width(self.text, style, k, run.end);
                let ch = first_true(run.start, run.end, |k| edge(k + 1) <= local);
                let left = edge(ch + 1);
                let right = edge(ch);
                return if local >= (left + right) / 2.0 {
                    self.right_of(ch)
                } else {
                    self.left_of(ch)
                };
            }
            let edge = |k: usize| measurer.width(self.text, style, run.start, k);
            let ch = first_true(run.start, run.end, |k| local < edge(k + 1));
            let left = edge(ch);
            let right = edge(ch + 1);
            return if local < (left + right) / 2.0 {
                self.left_of(ch)
            } else {
                self.right_of(ch)
            };
        }
        self.slot_offset(self.len)
    }
}

/// Smallest `k` in `lo..hi` with `pred(k)`, assuming `pred` flips from false
/// to true once. Returns `hi - 1` if it never does.
fn first_true(lo: usize, hi: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi_excl) = (lo, hi);
    while lo < hi_excl {
        let mid = lo + (hi_excl - lo) / 2;
        if pred(mid) {
            hi_excl = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo.min(hi.saturating_sub(1))
}

/// Check host-supplied segment starts against a line of `len` chars.
pub fn validate_segments(segments: &[usize], len: usize) -> Result<()> {
    merge_segments(Some(segments), len).map(|_| ())
}

fn merge_segments(segments: Option<&[usize]>, len: usize) -> Result<Vec<usize>> {
    let Some(segments) = segments else {
        return Ok(vec![0]);
    };
    match segments.first() {
        Some(0) => {}
        Some(first) => {
            return Err(EditError::argument(format!(
                "bidi segments must start at 0, got {first}"
            )));
        }
        None => return Ok(vec![0]),
    }
    for pair in segments.windows(2) {
        if pair[1] <= pair[0] {
            return Err(EditError::argument(format!(
                "bidi segments must strictly increase ({} then {})",
                pair[0], pair[1]
            )));
        }
    }
    if let Some(&last) = segments.last() {
        if last > len {
            return Err(EditError::argument(format!(
                "bidi segment {last} exceeds line length {len}"
            )));
        }
    }
    // A segment starting at the line end is empty.
    Ok(segments
        .iter()
        .copied()
        .filter(|&start| start == 0 || start < len)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasurer;

    const MIXED: &str = "abcדגהxyz";

    fn seg(text: &str) -> BidiSegmenter<'_> {
        BidiSegmenter::new(text, BaseDirection::Ltr, None).unwrap()
    }

    #[test]
    fn moving_left_from_ltr_into_rtl_follows_visual_adjacency() {
        let bidi = seg(MIXED);
        // Caret before 'x'; the char visually to its left is 'ד' (logical 3).
        let (offset, direction) = bidi.move_left(6, CaretDirection::Backward).unwrap();
        assert_ne!(offset, 5);
        assert_eq!(offset, 4);
        assert_eq!(direction, CaretDirection::Forward);
    }

    #[test]
    fn moving_left_through_rtl_run_advances_logically() {
        let bidi = seg(MIXED);
        let mut caret = (7, CaretDirection::Forward);
        let mut seen = Vec::new();
        while let Some(next) = bidi.move_left(caret.0, caret.1) {
            caret = next;
            seen.push(caret.0);
        }
        assert_eq!(seen, vec![6, 4, 5, 6, 2, 1, 0]);
    }

    #[test]
    fn moving_right_is_inverse_of_left() {
        let bidi = seg(MIXED);
        let mut caret = (0, CaretDirection::Backward);
        let mut seen = Vec::new();
        while let Some(next) = bidi.move_right(caret.0, caret.1) {
            caret = next;
            seen.push(caret.0);
        }
        // Crossing the RTL run walks its logical offsets downward.
        assert_eq!(seen, vec![1, 2, 3, 5, 4, 3, 7, 8, 9]);
        assert_eq!(caret, (9, CaretDirection::Forward));
    }

    #[test]
    fn caret_x_matches_visual_slots() {
        let bidi = seg(MIXED);
        let m = MonospaceMeasurer::new(10.0, 16.0);
        for slot in 0..=bidi.len() {
            let (offset, direction) = bidi.slot_offset(slot);
            assert_eq!(bidi.caret_slot(offset, direction), slot);
            assert_eq!(bidi.caret_x(offset, direction, &m, &[]), slot as f32 * 10.0);
        }
    }

    #[test]
    fn offset_at_x_inside_rtl_run() {
        let bidi = seg(MIXED);
        let m = MonospaceMeasurer::new(10.0, 16.0);
        // Visual: a b c ה ג ד x y z; x=41 is the left half of 'ג' (logical 4),
        // whose left edge is logical offset 5.
        assert_eq!(bidi.offset_at_x(41.0, &m, &[]), (5, CaretDirection::Forward));
        // Right half of 'ג' maps to its right edge, logical offset 4.
        assert_eq!(bidi.offset_at_x(48.0, &m, &[]), (4, CaretDirection::Backward));
        assert_eq!(bidi.offset_at_x(12.0, &m, &[]), (1, CaretDirection::Backward));
        assert_eq!(bidi.offset_at_x(500.0, &m, &[]), (9, CaretDirection::Forward));
        assert_eq!(bidi.offset_at_x(-5.0, &m, &[]), (0, CaretDirection::Backward));
    }

    #[test]
    fn rtl_base_reverses_layout() {
        let bidi = BidiSegmenter::new("דגה", BaseDirection::Rtl, None).unwrap();
        assert!(bidi.is_rtl(0));
        assert!(bidi.is_rtl(3));
        assert_eq!(bidi.visual_index(0), Some(2));
        // Line start in an RTL paragraph is the right edge.
        assert_eq!(bidi.visual_line_start(), (0, CaretDirection::Backward));
        assert_eq!(
            bidi.move_left(0, CaretDirection::Backward),
            Some((1, CaretDirection::Forward))
        );
    }

    #[test]
    fn segments_are_reordered_independently() {
        // Without segments the two Hebrew words form one run.
        let whole = seg("אב|גד");
        assert_eq!(whole.logical_index(0), Some(4));
        let split = BidiSegmenter::new("אב|גד", BaseDirection::Ltr, Some(&[0, 3])).unwrap();
        assert_eq!(split.segments(), &[0, 3]);
        // "אב|" stays left of "גד".
        let first_three: Vec<_> = (0..3).filter_map(|v| split.logical_index(v)).collect();
        assert!(first_three.iter().all(|&l| l < 3));
        assert!(split.runs().iter().all(|run| run.end <= 3 || run.start >= 3));
    }

    #[test]
    fn rejects_malformed_segments() {
        for bad in [&[1usize, 2][..], &[0, 2, 2], &[0, 5]] {
            assert!(matches!(
                BidiSegmenter::new("abc", BaseDirection::Ltr, Some(bad)),
                Err(EditError::InvalidArgument(_))
            ));
        }
        let ok = BidiSegmenter::new("abc", BaseDirection::Ltr, Some(&[0, 3])).unwrap();
        assert_eq!(ok.segments(), &[0]);
    }

    #[test]
    fn empty_line() {
        let bidi = seg("");
        assert_eq!(bidi.move_left(0, CaretDirection::Forward), None);
        assert_eq!(bidi.move_right(0, CaretDirection::Forward), None);
        let m = MonospaceMeasurer::default();
        assert_eq!(bidi.caret_x(0, CaretDirection::Forward, &m, &[]), 0.0);
        assert_eq!(bidi.offset_at_x(30.0, &m, &[]), (0, CaretDirection::Backward));
    }
}
