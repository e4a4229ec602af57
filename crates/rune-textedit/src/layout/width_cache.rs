use core::ops::Range;

use log::{debug, trace};

use crate::content::{ContentChange, TextChangeEvent};

/// Per-line pixel widths for the unwrapped layout.
///
/// Entries stay `None` until a line is measured, and go back to `None`
/// whenever the line's text or styling changes. The widest known line is
/// tracked so the horizontal scroll extent is available without measuring
/// the whole buffer.
#[derive(Debug, Clone, Default)]
pub struct WidthCache {
    widths: Vec<Option<f32>>,
    max_width: f32,
    max_line: Option<usize>,
    /// The widest line was invalidated and the maximum only covers lines
    /// measured since; `refresh_max` rebuilds it from all known widths.
    max_stale: bool,
}

impl WidthCache {
    pub fn new(line_count: usize) -> Self {
        Self {
            widths: vec![None; line_count],
            max_width: 0.0,
            max_line: None,
            max_stale: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.widths.len()
    }

    /// Cached width of `line`, or `None` if it must be measured first.
    pub fn width(&self, line: usize) -> Option<f32> {
        self.widths.get(line).copied().flatten()
    }

    /// Widest measured line width.
    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    pub fn max_line(&self) -> Option<usize> {
        self.max_line
    }

    /// Whether a lazy `reset` left the maximum awaiting `refresh_max`.
    pub fn is_max_stale(&self) -> bool {
        self.max_stale
    }

    /// Rebuild a stale maximum from the widths still known.
    pub fn refresh_max(&mut self) {
        if self.max_stale {
            self.rescan_max();
        }
    }

    /// Measure every unknown line in `lines`.
    ///
    /// New widths raise the maximum; a stale maximum is not rebuilt here.
    pub fn calculate(&mut self, lines: Range<usize>, mut measure: impl FnMut(usize) -> f32) {
        let end = lines.end.min(self.widths.len());
        for line in lines.start.min(end)..end {
            if self.widths[line].is_some() {
                continue;
            }
            let width = measure(line);
            trace!("measured line {line}: {width}px");
            self.widths[line] = Some(width);
            if width > self.max_width || self.max_line.is_none() {
                self.max_width = width;
                self.max_line = Some(line);
            }
        }
    }

    /// Forget the widths of `lines`.
    ///
    /// If the widest line is among them the running maximum is dropped, and
    /// with `recalc_max_eagerly` immediately rebuilt from the widths still
    /// known. Otherwise it stays stale until `refresh_max` or the next text
    /// change.
    pub fn reset(&mut self, lines: Range<usize>, recalc_max_eagerly: bool) {
        let end = lines.end.min(self.widths.len());
        let start = lines.start.min(end);
        for slot in &mut self.widths[start..end] {
            *slot = None;
        }
        if self.max_line.is_some_and(|max| (start..end).contains(&max)) {
            self.drop_max();
            if recalc_max_eagerly {
                self.rescan_max();
            }
        }
    }

    /// Drop everything and resize to `line_count` unknown lines.
    pub fn reset_all(&mut self, line_count: usize) {
        *self = Self::new(line_count);
    }

    /// Track a content change, then measure what is visible.
    ///
    /// `visible` is the post-edit range of lines in the viewport.
    pub fn text_changed(
        &mut self,
        change: &ContentChange,
        visible: Range<usize>,
        measure: impl FnMut(usize) -> f32,
    ) {
        match change {
            ContentChange::Reset { line_count, .. } => self.reset_all(*line_count),
            ContentChange::Replaced(event) => self.shift(event),
        }
        self.refresh_max();
        self.calculate(visible, measure);
    }

    fn shift(&mut self, event: &TextChangeEvent) {
        let first = event.start_line.min(self.widths.len());
        let replaced_end = (first + event.replace_line_count + 1).min(self.widths.len());
        let inserted = event.new_line_count + 1;
        self.widths
            .splice(first..replaced_end, std::iter::repeat_n(None, inserted));

        match self.max_line {
            Some(max) if max >= replaced_end => {
                self.max_line = Some((max as isize + event.line_delta()) as usize);
            }
            Some(max) if max >= first => self.drop_max(),
            _ => {}
        }
    }

    fn drop_max(&mut self) {
        self.max_line = None;
        self.max_width = 0.0;
        self.max_stale = true;
    }

    /// Rebuild the maximum from known widths without measuring anything.
    fn rescan_max(&mut self) {
        let best = self
            .widths
            .iter()
            .enumerate()
            .filter_map(|(line, width)| width.map(|w| (line, w)))
            .fold(None, |best: Option<(usize, f32)>, (line, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((line, w)),
            });
        debug!("width cache max rescan -> {best:?}");
        self.max_stale = false;
        match best {
            Some((line, width)) => {
                self.max_line = Some(line);
                self.max_width = width;
            }
            None => {
                self.max_line = None;
                self.max_width = 0.0;
            }
        }
    }
}
