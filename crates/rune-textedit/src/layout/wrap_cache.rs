use core::ops::Range;

use log::debug;

use crate::content::{ContentChange, TextChangeEvent, TextContent};
use crate::error::Result;
use crate::selection::CaretDirection;

/// One visual sub-line of a wrapped logical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualLine {
    /// Absolute char offset of the first char.
    pub start: usize,
    /// Length in chars, delimiter excluded.
    pub len: usize,
    /// Index of the logical line this sub-line belongs to.
    pub logical: usize,
}

impl VisualLine {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// What a partial rewrap did to the visual line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrapOutcome {
    /// Visual lines produced for the edited logical lines.
    pub visual_lines: Range<usize>,
    /// Number of visual lines they replaced.
    pub old_visual_count: usize,
    /// Total number of visual lines changed.
    pub line_count_changed: bool,
    /// Some sub-line boundary moved other than by the edit's own shift.
    pub wrapping_changed: bool,
}

/// Visual line table for word-wrapped layout.
///
/// Wrapping is recomputed eagerly: fully when the wrap width changes, and for
/// the edited logical lines only after a text change.
#[derive(Debug, Clone, Default)]
pub struct WrapCache {
    lines: Vec<VisualLine>,
    /// Index of the first visual line of each logical line.
    first_visual: Vec<usize>,
    width: f32,
}

impl WrapCache {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[VisualLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&VisualLine> {
        self.lines.get(index)
    }

    pub fn offset_at_line(&self, index: usize) -> Option<usize> {
        self.line(index).map(|line| line.start)
    }

    pub fn line_range(&self, index: usize) -> Option<Range<usize>> {
        self.line(index).map(VisualLine::range)
    }

    pub fn logical_line(&self, index: usize) -> Option<usize> {
        self.line(index).map(|line| line.logical)
    }

    /// Visual lines belonging to logical line `logical`.
    pub fn visual_lines_of(&self, logical: usize) -> Range<usize> {
        let start = self.first_visual.get(logical).copied().unwrap_or(self.lines.len());
        let end = self
            .first_visual
            .get(logical + 1)
            .copied()
            .unwrap_or(self.lines.len());
        start..end
    }

    /// Visual line whose start is the greatest not exceeding `offset`.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        self.lines
            .partition_point(|line| line.start <= offset)
            .saturating_sub(1)
    }

    /// Visual line holding a caret at `offset`.
    ///
    /// At a wrap seam the offset is both the end of one sub-line and the
    /// start of the next; a `Forward` caret stays on the earlier one.
    pub fn line_at_caret(&self, offset: usize, direction: CaretDirection) -> usize {
        let index = self.line_at_offset(offset);
        match (direction, index.checked_sub(1)) {
            (CaretDirection::Forward, Some(prev))
                if self.lines[index].start == offset
                    && self.lines[prev].logical == self.lines[index].logical =>
            {
                prev
            }
            _ => index,
        }
    }

    /// Visual line `l` with `start(l) < offset <= end(l)`.
    ///
    /// Used to find the former top line again after a rewrap: the end offset
    /// of a sub-line survives a rewrap of the lines before it.
    pub fn line_at_end_offset(&self, offset: usize) -> usize {
        let candidate = self
            .lines
            .partition_point(|line| line.start < offset)
            .saturating_sub(1);
        match self.lines.get(candidate) {
            Some(line) if line.start < offset && offset <= line.end() => candidate,
            _ => self.line_at_offset(offset),
        }
    }

    /// Rewrap every logical line.
    ///
    /// `wrap(line, text)` returns the line-relative sub-line ranges of one
    /// logical line.
    pub fn rewrap_all(
        &mut self,
        content: &dyn TextContent,
        mut wrap: impl FnMut(usize, &str) -> Vec<Range<usize>>,
    ) -> Result<()> {
        let mut lines = Vec::with_capacity(content.line_count());
        for logical in 0..content.line_count() {
            wrap_logical(content, logical, &mut wrap, &mut lines)?;
        }
        debug!(
            "full rewrap at width {}: {} logical -> {} visual lines",
            self.width,
            content.line_count(),
            lines.len()
        );
        self.lines = lines;
        self.rebuild_index();
        Ok(())
    }

    /// Rewrap the logical lines touched by `change`.
    pub fn text_changed(
        &mut self,
        change: &ContentChange,
        content: &dyn TextContent,
        mut wrap: impl FnMut(usize, &str) -> Vec<Range<usize>>,
    ) -> Result<RewrapOutcome> {
        let event = match change {
            ContentChange::Replaced(event) => event,
            ContentChange::Reset { .. } => {
                let old_count = self.lines.len();
                self.rewrap_all(content, wrap)?;
                return Ok(RewrapOutcome {
                    visual_lines: 0..self.lines.len(),
                    old_visual_count: old_count,
                    line_count_changed: old_count != self.lines.len(),
                    wrapping_changed: true,
                });
            }
        };

        let old_total = self.lines.len();
        let first_logical = event.start_line;
        let old_first = self.visual_lines_of(first_logical).start;
        let old_end = self
            .visual_lines_of(first_logical + event.replace_line_count)
            .end;
        let old_starts: Vec<usize> = self.lines[old_first..old_end]
            .iter()
            .map(|line| line.start)
            .collect();

        let mut fresh = Vec::new();
        for logical in first_logical..=first_logical + event.new_line_count {
            wrap_logical(content, logical, &mut wrap, &mut fresh)?;
        }
        let fresh_count = fresh.len();
        let wrapping_changed = boundaries_moved(&old_starts, &fresh, event);

        let line_delta = event.line_delta();
        let char_delta = event.char_delta();
        for line in &mut self.lines[old_end..] {
            line.logical = (line.logical as isize + line_delta) as usize;
            line.start = (line.start as isize + char_delta) as usize;
        }
        self.lines.splice(old_first..old_end, fresh);
        self.rebuild_index();

        Ok(RewrapOutcome {
            visual_lines: old_first..old_first + fresh_count,
            old_visual_count: old_end - old_first,
            line_count_changed: old_total != self.lines.len(),
            wrapping_changed,
        })
    }

    fn rebuild_index(&mut self) {
        self.first_visual.clear();
        for (index, line) in self.lines.iter().enumerate() {
            if self.first_visual.len() == line.logical {
                self.first_visual.push(index);
            }
        }
    }
}

fn wrap_logical(
    content: &dyn TextContent,
    logical: usize,
    wrap: &mut impl FnMut(usize, &str) -> Vec<Range<usize>>,
    out: &mut Vec<VisualLine>,
) -> Result<()> {
    let text = content.line(logical)?;
    let line_start = content.offset_at_line(logical)?;
    let ranges = wrap(logical, text);
    if ranges.is_empty() {
        out.push(VisualLine {
            start: line_start,
            len: 0,
            logical,
        });
        return Ok(());
    }
    out.extend(ranges.into_iter().map(|range| VisualLine {
        start: line_start + range.start,
        len: range.len(),
        logical,
    }));
    Ok(())
}

/// Compare sub-line starts before and after an edit, after carrying the old
/// starts across the edit.
fn boundaries_moved(old_starts: &[usize], fresh: &[VisualLine], event: &TextChangeEvent) -> bool {
    if old_starts.len() != fresh.len() {
        return true;
    }
    let replaced_end = event.replaced_end();
    old_starts.iter().zip(fresh).any(|(&old, new)| {
        let carried = if old <= event.start {
            Some(old)
        } else if old >= replaced_end {
            Some((old as isize + event.char_delta()) as usize)
        } else {
            None
        };
        carried != Some(new.start)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DefaultContent;
    use crate::layout::wrap_line;
    use crate::measure::MonospaceMeasurer;

    const WIDTH: f32 = 60.0;

    fn wrapper(m: &MonospaceMeasurer) -> impl FnMut(usize, &str) -> Vec<Range<usize>> + '_ {
        move |_, text| wrap_line(text, &[], m, WIDTH)
    }

    fn starts(cache: &WrapCache) -> Vec<usize> {
        cache.lines().iter().map(|l| l.start).collect()
    }

    #[test]
    fn full_rewrap_splits_long_lines() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let content = DefaultContent::new("aaaa bbbb cccc\nxy");
        let mut cache = WrapCache::new(WIDTH);
        cache.rewrap_all(&content, wrapper(&m)).unwrap();
        assert_eq!(starts(&cache), vec![0, 5, 10, 15]);
        assert_eq!(cache.visual_lines_of(0), 0..3);
        assert_eq!(cache.visual_lines_of(1), 3..4);
        assert_eq!(cache.logical_line(3), Some(1));
        assert_eq!(cache.line_range(2), Some(10..14));
    }

    #[test]
    fn offsets_and_seams() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let content = DefaultContent::new("aaaa bbbb cccc\nxy");
        let mut cache = WrapCache::new(WIDTH);
        cache.rewrap_all(&content, wrapper(&m)).unwrap();
        assert_eq!(cache.line_at_offset(5), 1);
        assert_eq!(cache.line_at_caret(5, CaretDirection::Backward), 1);
        assert_eq!(cache.line_at_caret(5, CaretDirection::Forward), 0);
        // A logical line start is never a seam.
        assert_eq!(cache.line_at_caret(15, CaretDirection::Forward), 3);
        assert_eq!(cache.line_at_end_offset(5), 0);
        assert_eq!(cache.line_at_end_offset(14), 2);
        assert_eq!(cache.line_at_end_offset(0), 0);
    }

    #[test]
    fn local_edit_without_reflow_keeps_wrapping() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let mut content = DefaultContent::new("aaaa bbbb cccc\nxy");
        let mut cache = WrapCache::new(WIDTH);
        cache.rewrap_all(&content, wrapper(&m)).unwrap();

        let event = content.replace_range(16, 0, "z").unwrap();
        let outcome = cache
            .text_changed(&ContentChange::Replaced(event), &content, wrapper(&m))
            .unwrap();
        assert!(!outcome.line_count_changed);
        assert!(!outcome.wrapping_changed);
        assert_eq!(outcome.visual_lines, 3..4);
    }

    #[test]
    fn reflowing_edit_reports_changes_and_shifts_following_lines() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let mut content = DefaultContent::new("aaaa bbbb cccc\nxy");
        let mut cache = WrapCache::new(WIDTH);
        cache.rewrap_all(&content, wrapper(&m)).unwrap();

        // "aaa" makes the first word too long for its sub-line.
        let event = content.replace_range(0, 0, "aaa").unwrap();
        let outcome = cache
            .text_changed(&ContentChange::Replaced(event), &content, wrapper(&m))
            .unwrap();
        assert!(outcome.wrapping_changed);
        assert_eq!(cache.logical_line(cache.line_count() - 1), Some(1));
        assert_eq!(starts(&cache), vec![0, 6, 13, 18]);
    }

    #[test]
    fn inserting_a_line_break_changes_count() {
        let m = MonospaceMeasurer::new(10.0, 16.0);
        let mut content = DefaultContent::new("ab\ncd");
        let mut cache = WrapCache::new(WIDTH);
        cache.rewrap_all(&content, wrapper(&m)).unwrap();
        let event = content.replace_range(1, 0, "\n").unwrap();
        let outcome = cache
            .text_changed(&ContentChange::Replaced(event), &content, wrapper(&m))
            .unwrap();
        assert!(outcome.line_count_changed);
        assert_eq!(starts(&cache), vec![0, 2, 4]);
        assert_eq!(cache.visual_lines_of(2), 2..3);
    }
}
