//! Damage planning.
//!
//! The planner turns a change, described in visual lines and content x
//! positions, into the smallest set of blits and repaints that brings the
//! screen up to date. Every rectangle is clipped to the client area, so a
//! change that is entirely off screen produces an empty plan.

use log::debug;

use crate::measure::PixelRect;
use crate::scroll::{ScrollChange, Viewport};

/// One step of a redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedrawOp {
    /// Repaint everything inside the rectangle (client pixels).
    Repaint(PixelRect),
    /// Move a full-width band of already painted pixels vertically.
    Blit {
        source_y: f32,
        dest_y: f32,
        height: f32,
    },
    /// Move a full-height band of already painted pixels horizontally.
    BlitHorizontal {
        source_x: f32,
        dest_x: f32,
        width: f32,
    },
}

/// Ordered redraw steps. Blits run before the repaints that follow them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedrawPlan {
    ops: Vec<RedrawOp>,
}

impl RedrawPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[RedrawOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Repaint rectangles of the plan.
    pub fn repaints(&self) -> impl Iterator<Item = PixelRect> + '_ {
        self.ops.iter().filter_map(|op| match op {
            RedrawOp::Repaint(rect) => Some(*rect),
            _ => None,
        })
    }

    pub fn has_blit(&self) -> bool {
        self.ops
            .iter()
            .any(|op| !matches!(op, RedrawOp::Repaint(_)))
    }

    fn push(&mut self, op: RedrawOp) {
        self.ops.push(op);
    }

    /// Append `other`'s steps after this plan's.
    pub fn merge(&mut self, other: RedrawPlan) {
        self.ops.extend(other.ops);
    }
}

/// What a text change did, in visual lines of the layout.
///
/// `first_line` holds the change start. Before the change the edit spanned
/// `first_line..=first_line + replaced_lines`; afterwards the new text spans
/// `first_line..=first_line + inserted_lines`. X values are content pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeExtent {
    pub first_line: usize,
    pub replaced_lines: usize,
    pub inserted_lines: usize,
    /// X of the change start on `first_line`.
    pub start_x: f32,
    /// X of the end of the inserted text on its last line.
    pub end_x: f32,
    /// The change runs up to the end of its last line.
    pub reaches_line_end: bool,
    /// Text after the change moved because the change altered width.
    pub trailing_shifted: bool,
    /// A bold run starts or ends inside the changed span.
    pub bold_transition: bool,
    /// The line is laid out with mixed directions.
    pub direction_sensitive: bool,
}

impl ChangeExtent {
    /// An edit that stays on one line.
    pub fn single_line(line: usize, start_x: f32, end_x: f32) -> Self {
        Self {
            first_line: line,
            replaced_lines: 0,
            inserted_lines: 0,
            start_x,
            end_x,
            reaches_line_end: false,
            trailing_shifted: false,
            bold_transition: false,
            direction_sensitive: false,
        }
    }

    /// Whether the tail of the line must be repainted to the client edge.
    fn needs_line_tail(&self) -> bool {
        self.reaches_line_end
            || self.trailing_shifted
            || self.bold_transition
            || self.direction_sensitive
    }
}

/// Plans repaints against one viewport snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RedrawPlanner {
    viewport: Viewport,
}

impl RedrawPlanner {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    fn repaint(&self, plan: &mut RedrawPlan, rect: PixelRect) {
        if let Some(clipped) = rect.intersect(&self.viewport.client_rect()) {
            plan.push(RedrawOp::Repaint(clipped));
        }
    }

    /// Rows `first..=last` as one full-width block.
    fn block(&self, plan: &mut RedrawPlan, first: usize, last: usize) {
        if last < first {
            return;
        }
        let vp = &self.viewport;
        let top = vp.line_y(first);
        let height = (last - first + 1) as f32 * vp.line_height;
        self.repaint(plan, PixelRect::new(0.0, top, vp.client_width, height));
    }

    /// Part of one line from content x `start_x` to `end_x`, or to the right
    /// client edge when `end_x` is `None`.
    fn line_span(&self, plan: &mut RedrawPlan, line: usize, start_x: f32, end_x: Option<f32>) {
        let vp = &self.viewport;
        let left = vp.client_x(start_x);
        let right = end_x.map_or(vp.client_width, |x| vp.client_x(x));
        let (left, right) = if right < left { (right, left) } else { (left, right) };
        self.repaint(
            plan,
            PixelRect::new(left, vp.line_y(line), right - left, vp.line_height),
        );
    }

    /// Whole client area.
    pub fn plan_full(&self) -> RedrawPlan {
        let mut plan = RedrawPlan::new();
        self.repaint(&mut plan, self.viewport.client_rect());
        plan
    }

    /// Full-width repaint of visual lines `first..=last`.
    pub fn plan_lines(&self, first: usize, last: usize) -> RedrawPlan {
        let mut plan = RedrawPlan::new();
        self.block(&mut plan, first, last);
        plan
    }

    /// Repaint a span of text from `(first_line, start_x)` to
    /// `(last_line, end_x)`; `end_x` of `None` runs to the right edge.
    ///
    /// Used for selection and style changes, which never move other text.
    pub fn plan_range(
        &self,
        first_line: usize,
        start_x: f32,
        last_line: usize,
        end_x: Option<f32>,
    ) -> RedrawPlan {
        let mut plan = RedrawPlan::new();
        if first_line == last_line {
            self.line_span(&mut plan, first_line, start_x, end_x);
            return plan;
        }
        self.line_span(&mut plan, first_line, start_x, None);
        self.block(&mut plan, first_line + 1, last_line.saturating_sub(1));
        self.line_span(&mut plan, last_line, self.viewport.horizontal, end_x);
        plan
    }

    /// Plan for a text change.
    pub fn plan_text_change(&self, change: &ChangeExtent) -> RedrawPlan {
        if change.replaced_lines == change.inserted_lines {
            self.plan_in_place(change)
        } else {
            self.plan_line_shift(change)
        }
    }

    /// The change kept the visual line count: only its own lines need paint.
    fn plan_in_place(&self, change: &ChangeExtent) -> RedrawPlan {
        let mut plan = RedrawPlan::new();
        let first = change.first_line;
        let last = first + change.inserted_lines;
        let tail = change.needs_line_tail();
        let start_x = if change.direction_sensitive {
            self.viewport.horizontal
        } else {
            change.start_x
        };

        if first == last {
            let end_x = (!tail).then_some(change.end_x);
            self.line_span(&mut plan, first, start_x, end_x);
            return plan;
        }
        self.line_span(&mut plan, first, start_x, None);
        self.block(&mut plan, first + 1, last - 1);
        let end_x = (!tail).then_some(change.end_x);
        self.line_span(&mut plan, last, self.viewport.horizontal, end_x);
        plan
    }

    /// The change inserted or removed lines: move the text below with a blit
    /// and repaint the changed lines and the band the blit exposed.
    fn plan_line_shift(&self, change: &ChangeExtent) -> RedrawPlan {
        let vp = &self.viewport;
        let mut plan = RedrawPlan::new();
        let first = change.first_line;
        let first_y = vp.line_y(first);
        if first_y >= vp.client_height {
            return plan;
        }
        if first_y + vp.line_height <= 0.0 {
            // Everything on screen moved; nothing survives to blit.
            return self.plan_full();
        }

        let source_y = vp.line_y(first + change.replaced_lines + 1);
        let dest_y = vp.line_y(first + change.inserted_lines + 1);
        let height = vp.client_height - source_y.max(dest_y);
        if height > 0.0 {
            debug!("blit {source_y} -> {dest_y} ({height}px)");
            plan.push(RedrawOp::Blit {
                source_y,
                dest_y,
                height,
            });
            if dest_y < source_y {
                // Text moved up; the bottom band is uncovered.
                let band_top = vp.client_height - (source_y - dest_y);
                self.repaint(
                    &mut plan,
                    PixelRect::new(0.0, band_top, vp.client_width, source_y - dest_y),
                );
            }
        } else {
            // The moved text lands below the client area.
            self.repaint(
                &mut plan,
                PixelRect::new(0.0, dest_y.min(source_y), vp.client_width, vp.client_height),
            );
        }

        let start_x = if change.direction_sensitive {
            vp.horizontal
        } else {
            change.start_x
        };
        self.line_span(&mut plan, first, start_x, None);
        self.block(&mut plan, first + 1, first + change.inserted_lines);
        plan
    }

    /// Plan for a scroll: shift the surviving pixels and repaint what the
    /// scroll exposed.
    pub fn plan_scroll(&self, change: &ScrollChange) -> RedrawPlan {
        let vp = &self.viewport;
        let dy = change.dy();
        let dx = change.dx();
        if dy.abs() >= vp.client_height || dx.abs() >= vp.client_width {
            return self.plan_full();
        }
        let mut plan = RedrawPlan::new();
        if dy > 0.0 {
            plan.push(RedrawOp::Blit {
                source_y: dy,
                dest_y: 0.0,
                height: vp.client_height - dy,
            });
            self.repaint(
                &mut plan,
                PixelRect::new(0.0, vp.client_height - dy, vp.client_width, dy),
            );
        } else if dy < 0.0 {
            plan.push(RedrawOp::Blit {
                source_y: 0.0,
                dest_y: -dy,
                height: vp.client_height + dy,
            });
            self.repaint(&mut plan, PixelRect::new(0.0, 0.0, vp.client_width, -dy));
        }
        if dx > 0.0 {
            plan.push(RedrawOp::BlitHorizontal {
                source_x: dx,
                dest_x: 0.0,
                width: vp.client_width - dx,
            });
            self.repaint(
                &mut plan,
                PixelRect::new(vp.client_width - dx, 0.0, dx, vp.client_height),
            );
        } else if dx < 0.0 {
            plan.push(RedrawOp::BlitHorizontal {
                source_x: 0.0,
                dest_x: -dx,
                width: vp.client_width + dx,
            });
            self.repaint(&mut plan, PixelRect::new(0.0, 0.0, -dx, vp.client_height));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 visible lines of 20px, 400px wide, scrolled to line 10.
    fn planner() -> RedrawPlanner {
        RedrawPlanner::new(Viewport {
            vertical: 200.0,
            horizontal: 0.0,
            client_width: 400.0,
            client_height: 200.0,
            line_height: 20.0,
        })
    }

    fn repaints(plan: &RedrawPlan) -> Vec<PixelRect> {
        plan.repaints().collect()
    }

    #[test]
    fn single_char_edit_off_screen_plans_nothing() {
        let planner = planner();
        assert!(planner.plan_text_change(&ChangeExtent::single_line(3, 8.0, 16.0)).is_empty());
        assert!(planner.plan_text_change(&ChangeExtent::single_line(40, 8.0, 16.0)).is_empty());
    }

    #[test]
    fn single_char_edit_repaints_only_the_span() {
        let plan = planner().plan_text_change(&ChangeExtent::single_line(12, 8.0, 16.0));
        assert_eq!(repaints(&plan), vec![PixelRect::new(8.0, 40.0, 8.0, 20.0)]);
    }

    #[test]
    fn width_changing_edit_repaints_to_right_edge() {
        let mut change = ChangeExtent::single_line(12, 8.0, 16.0);
        change.trailing_shifted = true;
        let plan = planner().plan_text_change(&change);
        assert_eq!(repaints(&plan), vec![PixelRect::new(8.0, 40.0, 392.0, 20.0)]);

        let mut change = ChangeExtent::single_line(12, 8.0, 16.0);
        change.direction_sensitive = true;
        let plan = planner().plan_text_change(&change);
        assert_eq!(repaints(&plan), vec![PixelRect::new(0.0, 40.0, 400.0, 20.0)]);
    }

    #[test]
    fn multi_line_in_place_change_uses_one_middle_block() {
        let change = ChangeExtent {
            replaced_lines: 3,
            inserted_lines: 3,
            ..ChangeExtent::single_line(11, 30.0, 50.0)
        };
        let plan = planner().plan_text_change(&change);
        assert_eq!(
            repaints(&plan),
            vec![
                PixelRect::new(30.0, 20.0, 370.0, 20.0),
                PixelRect::new(0.0, 40.0, 400.0, 40.0),
                PixelRect::new(0.0, 80.0, 50.0, 20.0),
            ]
        );
    }

    #[test]
    fn inserting_a_line_blits_the_rest_down() {
        let change = ChangeExtent {
            inserted_lines: 1,
            ..ChangeExtent::single_line(12, 24.0, 0.0)
        };
        let plan = planner().plan_text_change(&change);
        assert_eq!(
            plan.ops()[0],
            RedrawOp::Blit {
                source_y: 60.0,
                dest_y: 80.0,
                height: 120.0
            }
        );
        assert_eq!(
            repaints(&plan),
            vec![
                PixelRect::new(24.0, 40.0, 376.0, 20.0),
                PixelRect::new(0.0, 60.0, 400.0, 20.0),
            ]
        );
    }

    #[test]
    fn deleting_lines_repaints_the_exposed_bottom_band() {
        let change = ChangeExtent {
            replaced_lines: 2,
            ..ChangeExtent::single_line(12, 24.0, 24.0)
        };
        let plan = planner().plan_text_change(&change);
        assert_eq!(
            plan.ops()[0],
            RedrawOp::Blit {
                source_y: 100.0,
                dest_y: 60.0,
                height: 100.0
            }
        );
        assert_eq!(
            repaints(&plan),
            vec![
                PixelRect::new(0.0, 160.0, 400.0, 40.0),
                PixelRect::new(24.0, 40.0, 376.0, 20.0),
            ]
        );
    }

    #[test]
    fn line_shift_above_viewport_repaints_everything() {
        let change = ChangeExtent {
            inserted_lines: 2,
            ..ChangeExtent::single_line(2, 0.0, 0.0)
        };
        assert_eq!(planner().plan_text_change(&change), planner().plan_full());
    }

    #[test]
    fn selection_range_spans_lines() {
        let plan = planner().plan_range(10, 40.0, 12, Some(16.0));
        assert_eq!(
            repaints(&plan),
            vec![
                PixelRect::new(40.0, 0.0, 360.0, 20.0),
                PixelRect::new(0.0, 20.0, 400.0, 20.0),
                PixelRect::new(0.0, 40.0, 16.0, 20.0),
            ]
        );
    }

    #[test]
    fn scrolling_blits_and_repaints_the_band() {
        let change = ScrollChange {
            old_vertical: 200.0,
            new_vertical: 240.0,
            old_horizontal: 0.0,
            new_horizontal: 0.0,
        };
        let plan = planner().plan_scroll(&change);
        assert_eq!(
            plan.ops(),
            &[
                RedrawOp::Blit {
                    source_y: 40.0,
                    dest_y: 0.0,
                    height: 160.0
                },
                RedrawOp::Repaint(PixelRect::new(0.0, 160.0, 400.0, 40.0)),
            ]
        );

        let far = ScrollChange {
            new_vertical: 900.0,
            ..change
        };
        assert_eq!(planner().plan_scroll(&far), planner().plan_full());
    }
}
