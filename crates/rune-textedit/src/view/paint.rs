//! Running a redraw plan against the host surface.

use log::trace;

use super::EditorView;
use crate::content::TextContent;
use crate::measure::{DrawService, LineDraw, MeasurementService, PixelRect};
use crate::redraw::{RedrawOp, RedrawPlan};

impl<C: TextContent, M: MeasurementService> EditorView<C, M> {
    /// Execute `plan`: blits first as ordered, then for each damaged
    /// rectangle a clear followed by every visual line that intersects it.
    pub fn execute(&self, plan: &RedrawPlan, draw: &mut dyn DrawService) {
        for op in plan.ops() {
            match *op {
                RedrawOp::Blit {
                    source_y,
                    dest_y,
                    height,
                } => draw.blit(source_y, dest_y, height),
                RedrawOp::BlitHorizontal {
                    source_x,
                    dest_x,
                    width,
                } => draw.blit_horizontal(source_x, dest_x, width),
                RedrawOp::Repaint(rect) => self.repaint(rect, draw),
            }
        }
    }

    fn repaint(&self, rect: PixelRect, draw: &mut dyn DrawService) {
        draw.clear(rect);
        let line_count = self.line_count();
        if line_count == 0 || rect.is_empty() {
            return;
        }
        let vp = self.scroll.viewport();
        let first = vp.line_at_y(rect.y);
        // A rect ending exactly on a line boundary does not touch the next line.
        let last = vp
            .line_at_y((rect.bottom() - 0.5).max(rect.y))
            .min(line_count - 1);
        trace!("repaint {rect:?}: lines {first}..={last}");

        let selection = self.selection.range();
        for index in first..=last {
            let Some(layout) = self.line_layout(index) else {
                continue;
            };
            let background = match (
                self.content.line(layout.line.logical),
                self.content.offset_at_line(layout.line.logical),
            ) {
                (Ok(text), Ok(offset)) => {
                    self.backgrounds
                        .line_background(layout.line.logical, offset, text)
                }
                _ => None,
            };
            let line = layout.line;
            let selected = (selection.start < line.end() && selection.end > line.start)
                .then(|| {
                    selection.start.max(line.start) - line.start
                        ..selection.end.min(line.end()) - line.start
                });
            draw.draw_line(&LineDraw {
                index,
                text: layout.text,
                y: vp.line_y(index),
                x: vp.client_x(0.0),
                runs: &layout.runs,
                background,
                selection: selected,
                clip: rect,
            });
        }
    }
}
