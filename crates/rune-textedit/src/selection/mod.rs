//! Caret and selection state machine.
//!
//! The controller is the single owner of caret and selection state. Every
//! transition returns a [`SelectionChange`] naming exactly the char spans
//! whose highlight changed, which the view turns into a redraw plan.

pub mod caret;
pub mod movement;

use core::ops::Range;

pub use caret::{Caret, CaretDirection};
pub use movement::{
    CaretMove, WordBoundary, WordBoundaryKind, next_char, next_word_end, prev_char,
    prev_word_start, word_boundaries,
};

use crate::content::TextChangeEvent;

/// Growth state of the selection relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    NoSelection,
    /// Anchor is the start; the caret moves the end.
    GrowingForward,
    /// Anchor is the end; the caret moves the start.
    GrowingBackward,
}

/// An anchored selection. `focus` always equals the caret offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    anchor: usize,
    focus: usize,
}

impl Selection {
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }

    /// Selected chars in logical order.
    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.range().contains(&offset)
    }

    pub fn state(&self) -> SelectionState {
        match self.focus.cmp(&self.anchor) {
            core::cmp::Ordering::Equal => SelectionState::NoSelection,
            core::cmp::Ordering::Greater => SelectionState::GrowingForward,
            core::cmp::Ordering::Less => SelectionState::GrowingBackward,
        }
    }
}

/// Outcome of one caret/selection transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionChange {
    pub old: Range<usize>,
    pub new: Range<usize>,
    /// Spans (post-transition offsets) whose selection highlight changed.
    pub redraw: Vec<Range<usize>>,
    /// Set when an extend gesture crossed the anchor.
    pub crossed_anchor: bool,
    pub caret_moved: bool,
}

impl SelectionChange {
    /// Nothing on screen changed.
    pub fn is_empty(&self) -> bool {
        self.redraw.is_empty() && !self.caret_moved
    }

    pub fn selection_changed(&self) -> bool {
        self.old != self.new
    }
}

/// Spans that are selected in exactly one of `old` and `new`.
pub fn selection_delta(old: &Range<usize>, new: &Range<usize>) -> Vec<Range<usize>> {
    if old == new {
        return Vec::new();
    }
    if old.is_empty() {
        return if new.is_empty() { Vec::new() } else { vec![new.clone()] };
    }
    if new.is_empty() {
        return vec![old.clone()];
    }
    if old.end <= new.start || new.end <= old.start {
        let (first, second) = if old.start <= new.start { (old, new) } else { (new, old) };
        return vec![first.clone(), second.clone()];
    }
    let mut spans = Vec::with_capacity(2);
    if old.start != new.start {
        spans.push(old.start.min(new.start)..old.start.max(new.start));
    }
    if old.end != new.end {
        spans.push(old.end.min(new.end)..old.end.max(new.end));
    }
    spans
}

/// Owner of the caret and the selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    caret: Caret,
    selection: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caret(&self) -> &Caret {
        &self.caret
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn range(&self) -> Range<usize> {
        self.selection.range()
    }

    pub fn state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Record the line the view resolved for the caret offset.
    pub fn set_caret_line(&mut self, line: usize) {
        self.caret.line = line;
    }

    pub fn set_column_x(&mut self, x: Option<f32>) {
        self.caret.column_x = x;
    }

    fn apply(
        &mut self,
        selection: Selection,
        direction: CaretDirection,
        crossed: bool,
    ) -> SelectionChange {
        let old = self.selection.range();
        let old_caret = self.caret.offset;
        self.selection = selection;
        self.caret.offset = selection.focus;
        self.caret.direction = direction;
        let new = selection.range();
        SelectionChange {
            redraw: selection_delta(&old, &new),
            old,
            new,
            crossed_anchor: crossed,
            caret_moved: old_caret != self.caret.offset,
        }
    }

    /// Move the caret to `offset`, dropping any selection.
    pub fn move_caret(&mut self, offset: usize, direction: CaretDirection) -> SelectionChange {
        self.apply(Selection::collapsed(offset), direction, false)
    }

    /// Move the caret to `offset` while extending the selection.
    ///
    /// Moving away from the anchor grows the selection, moving back shrinks
    /// it. Crossing the anchor makes the previous focus the new anchor and
    /// flips the growth direction.
    pub fn extend_to(&mut self, offset: usize, direction: CaretDirection) -> SelectionChange {
        let current = self.selection;
        let crossed = match current.state() {
            SelectionState::NoSelection => false,
            SelectionState::GrowingForward => offset < current.anchor,
            SelectionState::GrowingBackward => offset > current.anchor,
        };
        let next = if crossed {
            Selection::new(current.focus, offset)
        } else {
            Selection::new(current.anchor, offset)
        };
        self.apply(next, direction, crossed)
    }

    /// Select `start..end` with the caret at `end`. Reversed bounds select
    /// backward.
    pub fn set_selection(&mut self, start: usize, end: usize) -> SelectionChange {
        self.apply(Selection::new(start, end), CaretDirection::Backward, false)
    }

    pub fn collapse(&mut self, offset: usize) -> SelectionChange {
        self.move_caret(offset, CaretDirection::Backward)
    }

    pub fn select_all(&mut self, char_count: usize) -> SelectionChange {
        self.set_selection(0, char_count)
    }

    /// Caret and selection back to the buffer start.
    pub fn reset(&mut self) -> SelectionChange {
        let change = self.collapse(0);
        self.caret = Caret::default();
        change
    }

    /// Track an edit of the buffer.
    ///
    /// A selection wholly before the edit is untouched. One wholly after it
    /// shifts so the same text stays selected. One that intersects the
    /// replaced span collapses behind the inserted text. The returned
    /// `redraw` names the stale highlight fragments in post-edit offsets.
    pub fn text_changed(&mut self, event: &TextChangeEvent) -> SelectionChange {
        let sel = self.selection;
        let (start, end) = (sel.start(), sel.end());
        let edit_start = event.start;
        let replaced_end = event.replaced_end();
        let new_end = event.new_end();
        let old = sel.range();

        if end <= edit_start {
            return SelectionChange {
                old: old.clone(),
                new: old,
                ..SelectionChange::default()
            };
        }

        let mut redraw = Vec::new();
        if start < edit_start {
            redraw.push(start..edit_start);
        }
        if end > replaced_end && start < replaced_end {
            redraw.push(new_end..(end + new_end - replaced_end));
        }

        let next = if end > edit_start && start < replaced_end {
            Selection::collapsed(new_end)
        } else {
            let shift = |o: usize| (o + new_end).saturating_sub(replaced_end);
            Selection::new(shift(sel.anchor), shift(sel.focus))
        };
        let old_caret = self.caret.offset;
        self.selection = next;
        self.caret.offset = next.focus;
        self.caret.column_x = None;
        SelectionChange {
            old,
            new: next.range(),
            redraw,
            crossed_anchor: false,
            caret_moved: old_caret != self.caret.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: usize, replaced: usize, inserted: usize) -> TextChangeEvent {
        TextChangeEvent::normalize(start, 0, replaced as i64, 0, inserted, 0)
            .expect("valid event")
    }

    #[test]
    fn extend_grows_shrinks_and_crosses_once() {
        let mut sel = SelectionController::new();
        sel.move_caret(5, CaretDirection::Backward);

        let grow = sel.extend_to(10, CaretDirection::Forward);
        assert_eq!(sel.state(), SelectionState::GrowingForward);
        assert_eq!(grow.redraw, vec![5..10]);
        assert!(!grow.crossed_anchor);

        let cross = sel.extend_to(3, CaretDirection::Backward);
        assert!(cross.crossed_anchor);
        assert_eq!(sel.selection().anchor(), 10);
        assert_eq!(sel.range(), 3..10);
        assert_eq!(sel.state(), SelectionState::GrowingBackward);
        assert_eq!(cross.redraw, vec![3..5]);
        assert_eq!(sel.caret().offset, 3);

        let shrink = sel.extend_to(6, CaretDirection::Forward);
        assert!(!shrink.crossed_anchor);
        assert_eq!(sel.range(), 6..10);
        assert_eq!(shrink.redraw, vec![3..6]);
    }

    #[test]
    fn extending_back_to_anchor_clears_selection() {
        let mut sel = SelectionController::new();
        sel.move_caret(2, CaretDirection::Backward);
        sel.extend_to(4, CaretDirection::Forward);
        let change = sel.extend_to(2, CaretDirection::Backward);
        assert_eq!(sel.state(), SelectionState::NoSelection);
        assert_eq!(change.redraw, vec![2..4]);
        assert!(!change.crossed_anchor);
    }

    #[test]
    fn move_caret_reports_old_highlight() {
        let mut sel = SelectionController::new();
        sel.set_selection(2, 8);
        let change = sel.move_caret(20, CaretDirection::Backward);
        assert_eq!(change.redraw, vec![2..8]);
        assert!(change.caret_moved);
        assert!(!sel.has_selection());
    }

    #[test]
    fn delta_of_disjoint_and_overlapping_ranges() {
        assert_eq!(selection_delta(&(0..3), &(5..8)), vec![0..3, 5..8]);
        assert_eq!(selection_delta(&(0..5), &(2..8)), vec![0..2, 5..8]);
        assert_eq!(selection_delta(&(2..8), &(2..8)), Vec::<Range<usize>>::new());
        assert_eq!(selection_delta(&(4..4), &(2..3)), vec![2..3]);
    }

    #[test]
    fn edit_before_selection_shifts_it() {
        let mut sel = SelectionController::new();
        sel.set_selection(10, 15);
        let change = sel.text_changed(&event(2, 1, 4));
        assert_eq!(sel.range(), 13..18);
        assert_eq!(sel.caret().offset, 18);
        assert!(change.redraw.is_empty());
    }

    #[test]
    fn edit_after_selection_leaves_it() {
        let mut sel = SelectionController::new();
        sel.set_selection(1, 3);
        let change = sel.text_changed(&event(5, 2, 0));
        assert_eq!(sel.range(), 1..3);
        assert!(change.is_empty());
    }

    #[test]
    fn edit_inside_selection_collapses_behind_insert() {
        let mut sel = SelectionController::new();
        sel.set_selection(2, 10);
        let change = sel.text_changed(&event(4, 2, 3));
        assert_eq!(sel.range(), 7..7);
        assert_eq!(sel.caret().offset, 7);
        // Head fragment 2..4 and tail fragment after the insert both lose
        // their highlight.
        assert_eq!(change.redraw, vec![2..4, 7..11]);
    }

    #[test]
    fn caret_inside_deleted_span_moves_to_edit_start() {
        let mut sel = SelectionController::new();
        sel.move_caret(6, CaretDirection::Forward);
        sel.text_changed(&event(4, 5, 0));
        assert_eq!(sel.caret().offset, 4);
    }

    #[test]
    fn reset_returns_to_origin() {
        let mut sel = SelectionController::new();
        sel.set_selection(3, 9);
        sel.set_caret_line(2);
        sel.reset();
        assert_eq!(sel.range(), 0..0);
        assert_eq!(*sel.caret(), Caret::default());
    }
}
