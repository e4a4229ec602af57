//! Scroll offsets and the pixel/line arithmetic of the viewport.

use core::ops::Range;

use log::trace;

use crate::measure::PixelRect;

/// Snapshot of the scroll state and client area.
///
/// Visual line `i` occupies `[i * line_height, (i + 1) * line_height)` in
/// content pixels; the viewport shows `[vertical, vertical + client_height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub vertical: f32,
    pub horizontal: f32,
    pub client_width: f32,
    pub client_height: f32,
    pub line_height: f32,
}

impl Viewport {
    pub fn client_rect(&self) -> PixelRect {
        PixelRect::new(0.0, 0.0, self.client_width, self.client_height)
    }

    /// Client y of the top of visual line `line`.
    pub fn line_y(&self, line: usize) -> f32 {
        line as f32 * self.line_height - self.vertical
    }

    /// Client x of content x `x`.
    pub fn client_x(&self, x: f32) -> f32 {
        x - self.horizontal
    }

    /// First line whose top is inside the client area.
    pub fn top_index(&self) -> usize {
        if self.line_height <= 0.0 {
            return 0;
        }
        (self.vertical / self.line_height).ceil() as usize
    }

    /// First line with any pixel inside the client area.
    pub fn partial_top_index(&self) -> usize {
        if self.line_height <= 0.0 {
            return 0;
        }
        (self.vertical / self.line_height).floor() as usize
    }

    /// Last line with any pixel inside the client area, given `line_count`
    /// visual lines.
    pub fn partial_bottom_index(&self, line_count: usize) -> usize {
        if self.line_height <= 0.0 || line_count == 0 {
            return 0;
        }
        let bottom = ((self.vertical + self.client_height) / self.line_height).ceil() as usize;
        bottom.saturating_sub(1).min(line_count - 1)
    }

    /// Last line fully inside the client area (at least the top line).
    pub fn bottom_index(&self, line_count: usize) -> usize {
        if self.line_height <= 0.0 || line_count == 0 {
            return 0;
        }
        let fully = ((self.vertical + self.client_height) / self.line_height).floor() as usize;
        fully
            .saturating_sub(1)
            .max(self.top_index())
            .min(line_count - 1)
    }

    /// Lines with any pixel on screen.
    pub fn visible_lines(&self, line_count: usize) -> Range<usize> {
        if line_count == 0 {
            return 0..0;
        }
        self.partial_top_index().min(line_count)..self.partial_bottom_index(line_count) + 1
    }

    /// Number of lines that fit entirely in the client area, at least one.
    pub fn page_lines(&self) -> usize {
        if self.line_height <= 0.0 {
            return 1;
        }
        ((self.client_height / self.line_height).floor() as usize).max(1)
    }

    /// Visual line under client y `y`.
    pub fn line_at_y(&self, y: f32) -> usize {
        if self.line_height <= 0.0 {
            return 0;
        }
        ((y + self.vertical).max(0.0) / self.line_height).floor() as usize
    }
}

/// Result of a scroll. Old and new offsets are in content pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollChange {
    pub old_vertical: f32,
    pub new_vertical: f32,
    pub old_horizontal: f32,
    pub new_horizontal: f32,
}

impl ScrollChange {
    /// Positive when content moved up (scrolled down).
    pub fn dy(&self) -> f32 {
        self.new_vertical - self.old_vertical
    }

    pub fn dx(&self) -> f32 {
        self.new_horizontal - self.old_horizontal
    }
}

/// Owner of the scroll offsets.
///
/// Offsets clamp to `[0, content - client]` on every change; each mutator
/// returns the change it made, or `None` if nothing moved.
#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    viewport: Viewport,
    content_width: f32,
    content_height: f32,
}

impl ScrollCoordinator {
    pub fn new(client_width: f32, client_height: f32, line_height: f32) -> Self {
        Self {
            viewport: Viewport {
                vertical: 0.0,
                horizontal: 0.0,
                client_width,
                client_height,
                line_height,
            },
            content_width: 0.0,
            content_height: 0.0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn vertical(&self) -> f32 {
        self.viewport.vertical
    }

    pub fn horizontal(&self) -> f32 {
        self.viewport.horizontal
    }

    pub fn top_index(&self) -> usize {
        self.viewport.top_index()
    }

    pub fn partial_top_index(&self) -> usize {
        self.viewport.partial_top_index()
    }

    pub fn partial_bottom_index(&self, line_count: usize) -> usize {
        self.viewport.partial_bottom_index(line_count)
    }

    pub fn content_size(&self) -> (f32, f32) {
        (self.content_width, self.content_height)
    }

    fn max_vertical(&self) -> f32 {
        (self.content_height - self.viewport.client_height).max(0.0)
    }

    fn max_horizontal(&self) -> f32 {
        (self.content_width - self.viewport.client_width).max(0.0)
    }

    fn scroll_to(&mut self, vertical: f32, horizontal: f32) -> Option<ScrollChange> {
        let vertical = vertical.clamp(0.0, self.max_vertical());
        let horizontal = horizontal.clamp(0.0, self.max_horizontal());
        let change = ScrollChange {
            old_vertical: self.viewport.vertical,
            new_vertical: vertical,
            old_horizontal: self.viewport.horizontal,
            new_horizontal: horizontal,
        };
        if change.dy() == 0.0 && change.dx() == 0.0 {
            return None;
        }
        trace!("scroll {change:?}");
        self.viewport.vertical = vertical;
        self.viewport.horizontal = horizontal;
        Some(change)
    }

    /// Update the scrollable extent and re-clamp the offsets.
    pub fn set_content_size(&mut self, width: f32, height: f32) -> Option<ScrollChange> {
        self.content_width = width;
        self.content_height = height;
        self.scroll_to(self.viewport.vertical, self.viewport.horizontal)
    }

    /// Change the client area and re-clamp the offsets.
    pub fn resize(&mut self, client_width: f32, client_height: f32) -> Option<ScrollChange> {
        self.viewport.client_width = client_width;
        self.viewport.client_height = client_height;
        self.scroll_to(self.viewport.vertical, self.viewport.horizontal)
    }

    pub fn set_vertical(&mut self, pixel: f32) -> Option<ScrollChange> {
        self.scroll_to(pixel, self.viewport.horizontal)
    }

    pub fn set_horizontal(&mut self, pixel: f32) -> Option<ScrollChange> {
        self.scroll_to(self.viewport.vertical, pixel)
    }

    /// Scroll so visual line `line` is at the top.
    pub fn set_top_index(&mut self, line: usize) -> Option<ScrollChange> {
        self.set_vertical(line as f32 * self.viewport.line_height)
    }

    /// Scroll by whole lines; negative scrolls up.
    pub fn scroll_lines(&mut self, delta: isize) -> Option<ScrollChange> {
        let top = self.top_index() as isize + delta;
        self.set_top_index(top.max(0) as usize)
    }

    /// Scroll the minimum needed for content x `x` (plus `caret_width`) on
    /// visual line `line` to be visible.
    ///
    /// Horizontal moves are at least a quarter of the client width; vertical
    /// moves are whole lines.
    pub fn show_location(
        &mut self,
        x: f32,
        caret_width: f32,
        line: usize,
    ) -> Option<ScrollChange> {
        let vp = self.viewport;
        let quarter = vp.client_width / 4.0;
        let mut horizontal = vp.horizontal;
        if x < vp.horizontal {
            horizontal = x.min(vp.horizontal - quarter).max(0.0);
        } else if x + caret_width > vp.horizontal + vp.client_width {
            horizontal = (x + caret_width - vp.client_width).max(vp.horizontal + quarter);
            // Allow scrolling to the caret even if widths are not yet known.
            self.content_width = self.content_width.max(x + caret_width);
        }

        let mut vertical = vp.vertical;
        if line < vp.top_index() {
            vertical = line as f32 * vp.line_height;
        } else if vp.line_height > 0.0
            && (line + 1) as f32 * vp.line_height > vp.vertical + vp.client_height
        {
            let first = (line + 1).saturating_sub(vp.page_lines());
            vertical = first as f32 * vp.line_height;
        }
        self.scroll_to(vertical, horizontal)
    }
}
