//! Keyboard and pointer navigation.

use log::trace;

use super::{EditorView, ViewUpdate};
use crate::content::TextContent;
use crate::measure::MeasurementService;
use crate::selection::{
    Caret, CaretDirection, CaretMove, next_char, next_word_end, prev_char, prev_word_start,
};

impl<C: TextContent, M: MeasurementService> EditorView<C, M> {
    /// Move the caret, or with `extend` the focus end of the selection, and
    /// scroll it into view.
    ///
    /// Plain horizontal moves with a selection collapse to the selection
    /// edge on that side. Vertical moves keep the caret's pixel column across
    /// lines of different length.
    pub fn move_caret(&mut self, movement: CaretMove, extend: bool) -> ViewUpdate {
        let caret = *self.selection.caret();
        let mut column_x = None;
        let (offset, direction) = match movement {
            CaretMove::CharLeft if !extend && self.selection.has_selection() => {
                (self.selection.range().start, CaretDirection::Backward)
            }
            CaretMove::CharRight if !extend && self.selection.has_selection() => {
                (self.selection.range().end, CaretDirection::Forward)
            }
            CaretMove::CharLeft => self.char_left(caret.offset, caret.direction),
            CaretMove::CharRight => self.char_right(caret.offset, caret.direction),
            CaretMove::WordPrevious => {
                (self.word_previous(caret.offset), CaretDirection::Backward)
            }
            CaretMove::WordNext => (self.word_next(caret.offset), CaretDirection::Forward),
            CaretMove::LineStart => self.line_start(&caret),
            CaretMove::LineEnd => self.line_end(&caret),
            CaretMove::LineUp | CaretMove::LineDown | CaretMove::PageUp | CaretMove::PageDown => {
                let lines = match movement {
                    CaretMove::LineUp => -1,
                    CaretMove::LineDown => 1,
                    CaretMove::PageUp => -(self.scroll.viewport().page_lines() as isize),
                    _ => self.scroll.viewport().page_lines() as isize,
                };
                let x = caret
                    .column_x
                    .unwrap_or_else(|| self.x_at(caret.offset, caret.direction));
                column_x = Some(x);
                self.vertical_target(&caret, lines, x)
            }
            CaretMove::DocumentStart => (0, CaretDirection::Backward),
            CaretMove::DocumentEnd => (self.content.char_count(), CaretDirection::Forward),
        };
        trace!("{movement:?} from {} to {offset} ({direction:?})", caret.offset);

        let change = if extend {
            self.selection.extend_to(offset, direction)
        } else {
            self.selection.move_caret(offset, direction)
        };
        self.selection.set_column_x(column_x);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        self.show_caret(&mut update);
        update
    }

    /// Caret position nearest to client point `(x, y)`.
    pub fn offset_at_point(&self, x: f32, y: f32) -> (usize, CaretDirection) {
        let vp = self.scroll.viewport();
        let index = vp.line_at_y(y).min(self.line_count().saturating_sub(1));
        self.offset_in_line(index, x + vp.horizontal)
    }

    /// Place the caret at client point `(x, y)`; with `extend` the selection
    /// grows or shrinks to it instead.
    pub fn click(&mut self, x: f32, y: f32, extend: bool) -> ViewUpdate {
        let (offset, direction) = self.offset_at_point(x, y);
        let change = if extend {
            self.selection.extend_to(offset, direction)
        } else {
            self.selection.move_caret(offset, direction)
        };
        self.selection.set_column_x(None);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        self.show_caret(&mut update);
        update
    }

    /// Caret position on visual line `index` nearest to content x `x`.
    fn offset_in_line(&self, index: usize, x: f32) -> (usize, CaretDirection) {
        let Some(layout) = self.line_layout(index) else {
            return (self.content.char_count(), CaretDirection::Forward);
        };
        let bidi = self.segmenter(&layout);
        let (local, direction) = bidi.offset_at_x(x, &self.measurer, &layout.runs);
        (layout.line.start + local, direction)
    }

    /// One step on visual line `index`, or `None` at its edge.
    fn step_on_line(
        &self,
        index: usize,
        offset: usize,
        direction: CaretDirection,
        leftward: bool,
    ) -> Option<(usize, CaretDirection)> {
        let layout = self.line_layout(index)?;
        let local = layout.local(offset);
        let moved = if self.is_direction_sensitive(index) {
            let bidi = self.segmenter(&layout);
            if leftward {
                bidi.move_left(local, direction)
            } else {
                bidi.move_right(local, direction)
            }
        } else if leftward {
            (local > 0).then(|| (prev_char(layout.text, local), CaretDirection::Backward))
        } else {
            (local < layout.line.len)
                .then(|| (next_char(layout.text, local), CaretDirection::Forward))
        };
        moved.map(|(local, direction)| (layout.line.start + local, direction))
    }

    fn char_left(&self, offset: usize, direction: CaretDirection) -> (usize, CaretDirection) {
        let index = self.visual_line_at(offset, direction);
        self.step_on_line(index, offset, direction, true)
            .or_else(|| self.cross_line_edge(index, true))
            .unwrap_or((offset, direction))
    }

    fn char_right(&self, offset: usize, direction: CaretDirection) -> (usize, CaretDirection) {
        let index = self.visual_line_at(offset, direction);
        self.step_on_line(index, offset, direction, false)
            .or_else(|| self.cross_line_edge(index, false))
            .unwrap_or((offset, direction))
    }

    /// Continue a horizontal move past the edge of visual line `index`.
    ///
    /// Reading order decides the neighbour: in a right-to-left paragraph the
    /// left edge leads to the next line and the right edge to the previous
    /// one. Landing is on the neighbour's logical start or end, which sits on
    /// the edge facing the caret.
    fn cross_line_edge(&self, index: usize, leftward: bool) -> Option<(usize, CaretDirection)> {
        let current = self.metrics.visual_line(&self.content, index)?;
        if leftward == self.is_rtl_line(index) {
            let next = self.metrics.visual_line(&self.content, index + 1)?;
            if next.logical == current.logical {
                // Wrap seam: the offset is shared, so take one more step.
                return Some(
                    self.step_on_line(index + 1, next.start, CaretDirection::Backward, leftward)
                        .unwrap_or((next.start, CaretDirection::Backward)),
                );
            }
            return Some((next.start, CaretDirection::Backward));
        }
        let prev_index = index.checked_sub(1)?;
        let prev = self.metrics.visual_line(&self.content, prev_index)?;
        if prev.logical == current.logical {
            return Some(
                self.step_on_line(prev_index, prev.end(), CaretDirection::Forward, leftward)
                    .unwrap_or((prev.end(), CaretDirection::Forward)),
            );
        }
        // The delimiter between the lines is skipped as a whole.
        Some((prev.end(), CaretDirection::Forward))
    }

    /// Start of the previous word, crossing to the end of the previous line
    /// from a line start.
    fn word_previous(&self, offset: usize) -> usize {
        let content = &self.content;
        let Ok(line) = content.line_at_offset(offset) else {
            return offset;
        };
        let (Ok(start), Ok(text)) = (content.offset_at_line(line), content.line(line)) else {
            return offset;
        };
        if offset > start {
            return start + prev_word_start(text, offset - start);
        }
        match line.checked_sub(1) {
            Some(prev) => match (content.offset_at_line(prev), content.line_len(prev)) {
                (Ok(prev_start), Ok(len)) => prev_start + len,
                _ => offset,
            },
            None => offset,
        }
    }

    /// End of the next word, crossing to the start of the next line from a
    /// line end.
    fn word_next(&self, offset: usize) -> usize {
        let content = &self.content;
        let Ok(line) = content.line_at_offset(offset) else {
            return offset;
        };
        let (Ok(start), Ok(text), Ok(len)) = (
            content.offset_at_line(line),
            content.line(line),
            content.line_len(line),
        ) else {
            return offset;
        };
        if offset < start + len {
            return start + next_word_end(text, offset - start);
        }
        content.offset_at_line(line + 1).unwrap_or(offset)
    }

    fn line_start(&self, caret: &Caret) -> (usize, CaretDirection) {
        let index = self.visual_line_at(caret.offset, caret.direction);
        match self.metrics.visual_line(&self.content, index) {
            Some(line) => (line.start, CaretDirection::Backward),
            None => (caret.offset, caret.direction),
        }
    }

    fn line_end(&self, caret: &Caret) -> (usize, CaretDirection) {
        let index = self.visual_line_at(caret.offset, caret.direction);
        match self.metrics.visual_line(&self.content, index) {
            Some(line) => (line.end(), CaretDirection::Forward),
            None => (caret.offset, caret.direction),
        }
    }

    /// Position `lines` visual lines above (negative) or below the caret,
    /// nearest to content x `x`. Stays put when there is no line to go to.
    fn vertical_target(&self, caret: &Caret, lines: isize, x: f32) -> (usize, CaretDirection) {
        let index = self.visual_line_at(caret.offset, caret.direction);
        let last = self.line_count().saturating_sub(1);
        let target = index.saturating_add_signed(lines).min(last);
        if target == index {
            return (caret.offset, caret.direction);
        }
        self.offset_in_line(target, x)
    }
}
