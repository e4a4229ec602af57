//! Seams to the host's font and drawing machinery.
//!
//! The core never touches glyphs. It asks a [`MeasurementService`] for widths
//! and hands clipped line data to a [`DrawService`].

use core::ops::Range;

use crate::style::{Color, StyleRun, is_bold_at};

/// Pixel measurements of styled line text.
///
/// Offsets are chars within `text`; `runs` are line relative.
pub trait MeasurementService {
    /// Width of `text[start..end]` laid out in logical order.
    fn width(&self, text: &str, runs: &[StyleRun], start: usize, end: usize) -> f32;

    /// Char boundary nearest to `x` (measured from the start of `text`),
    /// rounding to the closer half of the char under `x`.
    fn offset_at_x(&self, text: &str, runs: &[StyleRun], x: f32) -> usize;

    /// Height of one line in pixels.
    fn line_height(&self) -> f32;
}

/// An axis-aligned rectangle in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Intersection with `other`, if any area remains.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let rect = PixelRect::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }
}

/// Everything needed to paint one visual line.
#[derive(Debug, Clone)]
pub struct LineDraw<'a> {
    /// Visual line index.
    pub index: usize,
    pub text: &'a str,
    /// Top of the line in client pixels.
    pub y: f32,
    /// Left edge of the text in client pixels (horizontal scroll applied).
    pub x: f32,
    pub runs: &'a [StyleRun],
    pub background: Option<Color>,
    /// Selected chars of this line, line relative.
    pub selection: Option<Range<usize>>,
    /// Damaged area being repainted.
    pub clip: PixelRect,
}

/// Host drawing surface.
pub trait DrawService {
    fn draw_line(&mut self, line: &LineDraw<'_>);

    /// Move already-painted pixels vertically within the client area.
    fn blit(&mut self, source_y: f32, dest_y: f32, height: f32);

    /// Move already-painted pixels horizontally within the client area.
    fn blit_horizontal(&mut self, source_x: f32, dest_x: f32, width: f32);

    /// Fill `rect` with the widget background.
    fn clear(&mut self, rect: PixelRect);
}

/// Fixed-advance measurement; bold chars are wider by `bold_extra`.
///
/// Stands in for a real font in tests and the demo driver.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub advance: f32,
    pub bold_extra: f32,
    pub line_height: f32,
}

impl MonospaceMeasurer {
    pub fn new(advance: f32, line_height: f32) -> Self {
        Self {
            advance,
            bold_extra: 0.0,
            line_height,
        }
    }

    pub fn with_bold_extra(mut self, extra: f32) -> Self {
        self.bold_extra = extra;
        self
    }

    fn char_width(&self, runs: &[StyleRun], offset: usize) -> f32 {
        if is_bold_at(runs, offset) {
            self.advance + self.bold_extra
        } else {
            self.advance
        }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(8.0, 16.0)
    }
}

impl MeasurementService for MonospaceMeasurer {
    fn width(&self, text: &str, runs: &[StyleRun], start: usize, end: usize) -> f32 {
        let end = end.min(text.chars().count());
        (start..end).map(|i| self.char_width(runs, i)).sum()
    }

    fn offset_at_x(&self, text: &str, runs: &[StyleRun], x: f32) -> usize {
        let len = text.chars().count();
        let mut left = 0.0f32;
        for i in 0..len {
            let w = self.char_width(runs, i);
            if x < left + w / 2.0 {
                return i;
            }
            left += w;
        }
        len
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextStyle;

    #[test]
    fn monospace_widths_account_for_bold() {
        let m = MonospaceMeasurer::new(10.0, 20.0).with_bold_extra(2.0);
        let runs = [StyleRun::new(1, 2, TextStyle::bold())];
        assert_eq!(m.width("abcd", &[], 0, 4), 40.0);
        assert_eq!(m.width("abcd", &runs, 0, 4), 44.0);
        assert_eq!(m.width("abcd", &runs, 2, 9), 22.0);
    }

    #[test]
    fn offset_at_x_rounds_to_nearest_half() {
        let m = MonospaceMeasurer::new(10.0, 20.0);
        assert_eq!(m.offset_at_x("abc", &[], -3.0), 0);
        assert_eq!(m.offset_at_x("abc", &[], 4.9), 0);
        assert_eq!(m.offset_at_x("abc", &[], 5.0), 1);
        assert_eq!(m.offset_at_x("abc", &[], 26.0), 3);
        assert_eq!(m.offset_at_x("abc", &[], 500.0), 3);
    }

    #[test]
    fn rect_intersection() {
        let a = PixelRect::new(0.0, 0.0, 100.0, 50.0);
        let b = PixelRect::new(80.0, 40.0, 50.0, 50.0);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(80.0, 40.0, 20.0, 10.0)));
        let c = PixelRect::new(0.0, 60.0, 10.0, 10.0);
        assert_eq!(a.intersect(&c), None);
    }
}
