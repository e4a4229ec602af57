//! The editor state struct.
//!
//! [`EditorView`] owns the content, styling, line metrics, selection and
//! scroll state, and is the only place that mutates them. Every mutator runs
//! the same propagation: content, then styles and backgrounds, then the line
//! metrics cache, then selection and caret, then the redraw planner, and
//! finally scroll clamping. The result is a [`ViewUpdate`] carrying the
//! redraw plan and the change notifications, in that order.

mod navigation;
mod paint;

use core::ops::Range;

use log::{debug, warn};
use rune_config::{EditorConfig, Orientation};

use crate::bidi::{BaseDirection, BidiSegmentProvider, BidiSegmenter, validate_segments};
use crate::content::{ContentChange, DefaultContent, TextChangeEvent, TextContent};
use crate::error::{EditError, Result};
use crate::layout::{LineMetrics, RewrapOutcome, VisualLine, WidthCache, WrapCache, wrap_line};
use crate::measure::{MeasurementService, MonospaceMeasurer};
use crate::redraw::{ChangeExtent, RedrawPlan, RedrawPlanner};
use crate::scroll::{ScrollChange, ScrollCoordinator, Viewport};
use crate::selection::{Caret, CaretDirection, SelectionChange, SelectionController};
use crate::style::{
    BackgroundSource, Color, LineBackgroundProvider, LineBackgrounds, StyleProvider, StyleRun,
    StyleSource, StyleStore, clip_runs, has_weight_transition,
};
use crate::unicode::char_slice;

/// Construction options of an [`EditorView`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub word_wrap: bool,
    pub orientation: BaseDirection,
    pub recalc_max_eagerly: bool,
    pub client_width: f32,
    pub client_height: f32,
    pub caret_width: f32,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            word_wrap: false,
            orientation: BaseDirection::Ltr,
            recalc_max_eagerly: false,
            client_width: 640.0,
            client_height: 480.0,
            caret_width: 1.0,
        }
    }
}

impl From<&EditorConfig> for ViewOptions {
    fn from(config: &EditorConfig) -> Self {
        Self {
            word_wrap: config.editor.word_wrap,
            orientation: match config.editor.orientation {
                Orientation::Ltr => BaseDirection::Ltr,
                Orientation::Rtl => BaseDirection::Rtl,
                Orientation::Auto => BaseDirection::Auto,
            },
            recalc_max_eagerly: config.editor.recalc_max_eagerly,
            client_width: config.viewport.client_width,
            client_height: config.viewport.client_height,
            caret_width: config.editor.caret_width,
        }
    }
}

/// A notification produced by a view operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Content(ContentChange),
    Selection(SelectionChange),
    Scroll(ScrollChange),
}

/// Outcome of a view operation: what to repaint and what changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewUpdate {
    pub plan: RedrawPlan,
    pub events: Vec<ViewEvent>,
}

impl ViewUpdate {
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty() && self.events.is_empty()
    }

    pub fn selection_change(&self) -> Option<&SelectionChange> {
        self.events.iter().find_map(|event| match event {
            ViewEvent::Selection(change) => Some(change),
            _ => None,
        })
    }

    pub fn scroll_change(&self) -> Option<&ScrollChange> {
        self.events.iter().find_map(|event| match event {
            ViewEvent::Scroll(change) => Some(change),
            _ => None,
        })
    }
}

/// One visual line prepared for measuring, hit testing or drawing.
struct LineLayout<'a> {
    index: usize,
    line: VisualLine,
    /// Sub-line text.
    text: &'a str,
    /// Style runs relative to the sub-line.
    runs: Vec<StyleRun>,
    segments: Option<Vec<usize>>,
}

impl LineLayout<'_> {
    /// Sub-line relative offset of `offset`, clamped to the sub-line.
    fn local(&self, offset: usize) -> usize {
        offset.saturating_sub(self.line.start).min(self.line.len)
    }
}

/// Editable styled text view.
///
/// Mutators take `&mut self` for the whole propagation; providers and the
/// measurement service only see shared borrows of line data, so nothing can
/// modify the buffer while a change is being propagated.
pub struct EditorView<C: TextContent = DefaultContent, M: MeasurementService = MonospaceMeasurer> {
    content: C,
    measurer: M,
    styles: StyleSource,
    backgrounds: BackgroundSource,
    bidi_segments: Option<Box<dyn BidiSegmentProvider>>,
    metrics: LineMetrics,
    selection: SelectionController,
    scroll: ScrollCoordinator,
    options: ViewOptions,
}

impl<C: TextContent, M: MeasurementService> EditorView<C, M> {
    pub fn new(content: C, measurer: M, options: ViewOptions) -> Result<Self> {
        let line_count = content.line_count();
        let scroll = ScrollCoordinator::new(
            options.client_width,
            options.client_height,
            measurer.line_height(),
        );
        let metrics = if options.word_wrap {
            LineMetrics::Wrap(WrapCache::new(options.client_width))
        } else {
            LineMetrics::Width(WidthCache::new(line_count))
        };
        let mut view = Self {
            content,
            measurer,
            styles: StyleSource::default(),
            backgrounds: BackgroundSource::Internal(LineBackgrounds::new(line_count)),
            bidi_segments: None,
            metrics,
            selection: SelectionController::new(),
            scroll,
            options,
        };
        view.rebuild_metrics()?;
        Ok(view)
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn metrics(&self) -> &LineMetrics {
        &self.metrics
    }

    pub fn scroll(&self) -> &ScrollCoordinator {
        &self.scroll
    }

    pub fn caret(&self) -> &Caret {
        self.selection.caret()
    }

    pub fn caret_offset(&self) -> usize {
        self.selection.caret().offset
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.range()
    }

    pub fn selection_controller(&self) -> &SelectionController {
        &self.selection
    }

    pub fn is_word_wrap(&self) -> bool {
        self.metrics.is_wrapped()
    }

    /// Number of visual lines.
    pub fn line_count(&self) -> usize {
        self.metrics.visual_line_count(&self.content)
    }

    pub fn top_index(&self) -> usize {
        self.scroll.top_index()
    }

    pub fn line_height(&self) -> f32 {
        self.measurer.line_height()
    }

    /// Caret position in client pixels: left x and top y of its line.
    pub fn caret_location(&self) -> (f32, f32) {
        let caret = self.selection.caret();
        let line = self.visual_line_at(caret.offset, caret.direction);
        let x = self.x_at(caret.offset, caret.direction);
        let vp = self.scroll.viewport();
        (vp.client_x(x), vp.line_y(line))
    }

    // --- line data -------------------------------------------------------

    fn logical_runs(&self, logical: usize) -> Result<Vec<StyleRun>> {
        let text = self.content.line(logical)?;
        let start = self.content.offset_at_line(logical)?;
        let len = self.content.line_len(logical)?;
        Ok(self.styles.line_runs(start, text, len))
    }

    fn logical_width(&self, logical: usize) -> f32 {
        let (Ok(text), Ok(runs)) = (self.content.line(logical), self.logical_runs(logical)) else {
            return 0.0;
        };
        let len = text.chars().count();
        self.measurer.width(text, &runs, 0, len)
    }

    fn logical_segments(
        &self,
        logical: usize,
        line_start: usize,
        text: &str,
    ) -> Option<Vec<usize>> {
        let provider = self.bidi_segments.as_ref()?;
        let segments = provider.segments(line_start, text)?;
        match validate_segments(&segments, text.chars().count()) {
            Ok(()) => Some(segments),
            Err(err) => {
                warn!("bidi segment provider returned bad segments for line {logical}: {err}");
                None
            }
        }
    }

    fn line_layout(&self, index: usize) -> Option<LineLayout<'_>> {
        let line = self.metrics.visual_line(&self.content, index)?;
        let logical_text = self.content.line(line.logical).ok()?;
        let line_start = self.content.offset_at_line(line.logical).ok()?;
        let from = line.start - line_start;
        let to = from + line.len;
        let runs = self.logical_runs(line.logical).ok()?;
        let segments = self
            .logical_segments(line.logical, line_start, logical_text)
            .map(|segments| {
                let mut local = vec![0];
                local.extend(
                    segments
                        .into_iter()
                        .filter(|&s| s > from && s < to)
                        .map(|s| s - from),
                );
                local
            });
        Some(LineLayout {
            index,
            line,
            text: char_slice(logical_text, from, to),
            runs: clip_runs(&runs, from, to),
            segments,
        })
    }

    fn segmenter<'a>(&self, layout: &LineLayout<'a>) -> BidiSegmenter<'a> {
        let base = self.options.orientation;
        let Some(segments) = &layout.segments else {
            return BidiSegmenter::unsegmented(layout.text, base);
        };
        BidiSegmenter::new(layout.text, base, Some(segments.as_slice())).unwrap_or_else(|err| {
            warn!("ignoring bidi segments of line {}: {err}", layout.index);
            BidiSegmenter::unsegmented(layout.text, base)
        })
    }

    fn visual_line_at(&self, offset: usize, direction: CaretDirection) -> usize {
        self.metrics.visual_line_at(&self.content, offset, direction)
    }

    /// Content x of a caret at `offset`.
    fn x_at(&self, offset: usize, direction: CaretDirection) -> f32 {
        let index = self.visual_line_at(offset, direction);
        let Some(layout) = self.line_layout(index) else {
            return 0.0;
        };
        let bidi = self.segmenter(&layout);
        bidi.caret_x(layout.local(offset), direction, &self.measurer, &layout.runs)
    }

    /// Whether visual line `index` needs direction-aware handling.
    fn is_direction_sensitive(&self, index: usize) -> bool {
        if self.options.orientation != BaseDirection::Ltr {
            return true;
        }
        self.line_layout(index)
            .is_some_and(|layout| crate::bidi::has_rtl(layout.text))
    }

    /// Whether visual line `index` reads right to left as a paragraph.
    fn is_rtl_line(&self, index: usize) -> bool {
        match self.options.orientation {
            BaseDirection::Ltr => false,
            base => self
                .line_layout(index)
                .is_some_and(|layout| base.resolve(layout.text).is_rtl()),
        }
    }

    // --- metrics ---------------------------------------------------------

    fn wrap_width(&self) -> f32 {
        (self.scroll.viewport().client_width - self.options.caret_width).max(1.0)
    }

    /// Rebuild the line metrics from scratch for the current mode.
    fn rebuild_metrics(&mut self) -> Result<()> {
        let wrap_width = self.wrap_width();
        match &mut self.metrics {
            LineMetrics::Width(cache) => cache.reset_all(self.content.line_count()),
            LineMetrics::Wrap(cache) => cache.set_width(wrap_width),
        }
        if let LineMetrics::Wrap(cache) = &mut self.metrics {
            let (content, styles, measurer) = (&self.content, &self.styles, &self.measurer);
            let width = cache.width();
            cache.rewrap_all(content, |logical, text| {
                wrap_logical_line(content, styles, measurer, width, logical, text)
            })?;
        }
        self.measure_visible();
        self.sync_scroll_extent();
        Ok(())
    }

    /// Measure unknown widths of the lines on screen.
    fn measure_visible(&mut self) {
        let LineMetrics::Width(cache) = &self.metrics else {
            return;
        };
        let visible = self.visible_lines();
        let measured: Vec<(usize, f32)> = visible
            .clone()
            .filter(|&line| cache.width(line).is_none())
            .map(|line| (line, self.logical_width(line)))
            .collect();
        if let LineMetrics::Width(cache) = &mut self.metrics {
            cache.calculate(visible, |line| {
                measured
                    .iter()
                    .find_map(|&(l, width)| (l == line).then_some(width))
                    .unwrap_or(0.0)
            });
        }
    }

    fn visible_lines(&self) -> Range<usize> {
        self.scroll.viewport().visible_lines(self.line_count())
    }

    /// Push the content extent into the scroll coordinator.
    ///
    /// A stale maximum width never shrinks the horizontal extent, so the
    /// offset is not clamped until the maximum is settled.
    fn sync_scroll_extent(&mut self) -> Option<ScrollChange> {
        let height = self.line_count() as f32 * self.measurer.line_height();
        let width = match &self.metrics {
            LineMetrics::Width(cache) if cache.is_max_stale() => {
                let (current, _) = self.scroll.content_size();
                (cache.max_width() + self.options.caret_width).max(current)
            }
            LineMetrics::Width(cache) => cache.max_width() + self.options.caret_width,
            LineMetrics::Wrap(_) => self.scroll.viewport().client_width,
        };
        self.scroll.set_content_size(width, height)
    }

    /// Rebuild a maximum width left stale by a lazy reset.
    fn settle_max_width(&mut self) {
        if let LineMetrics::Width(cache) = &mut self.metrics {
            cache.refresh_max();
        }
        self.sync_scroll_extent();
    }

    /// Rewrap or remeasure logical lines `first..=last` after their styling
    /// changed. Returns the rewrap outcome in wrap mode.
    fn restyle_lines(&mut self, first: usize, last: usize) -> Result<Option<RewrapOutcome>> {
        let outcome = match &mut self.metrics {
            LineMetrics::Width(cache) => {
                cache.reset(first..last + 1, self.options.recalc_max_eagerly);
                None
            }
            LineMetrics::Wrap(cache) => {
                let event = TextChangeEvent {
                    start: self.content.offset_at_line(first)?,
                    start_line: first,
                    replace_char_count: 0,
                    replace_line_count: last - first,
                    new_char_count: 0,
                    new_line_count: last - first,
                };
                let (content, styles, measurer) = (&self.content, &self.styles, &self.measurer);
                let width = cache.width();
                Some(cache.text_changed(&ContentChange::Replaced(event), content, |logical, text| {
                    wrap_logical_line(content, styles, measurer, width, logical, text)
                })?)
            }
        };
        self.measure_visible();
        Ok(outcome)
    }

    // --- planning helpers -----------------------------------------------

    fn planner(&self) -> RedrawPlanner {
        RedrawPlanner::new(self.scroll.viewport())
    }

    /// Repaint plan for chars `start..end`.
    fn plan_span(&self, start: usize, end: usize) -> RedrawPlan {
        let first = self.visual_line_at(start, CaretDirection::Backward);
        let last = self.visual_line_at(end, CaretDirection::Forward).max(first);
        if (first..=last).any(|line| self.is_direction_sensitive(line)) {
            return self.planner().plan_lines(first, last);
        }
        let start_x = self.x_at(start, CaretDirection::Backward);
        let end_x = self.x_at(end, CaretDirection::Forward);
        self.planner().plan_range(first, start_x, last, Some(end_x))
    }

    fn plan_selection(&self, change: &SelectionChange) -> RedrawPlan {
        let mut plan = RedrawPlan::new();
        for span in &change.redraw {
            plan.merge(self.plan_span(span.start, span.end));
        }
        plan
    }

    /// Refresh the caret line, collect the selection event, and plan the
    /// highlight repaint.
    fn finish_selection(&mut self, change: SelectionChange, update: &mut ViewUpdate) {
        let caret = *self.selection.caret();
        let line = self.content.line_at_offset(caret.offset).unwrap_or(0);
        self.selection.set_caret_line(line);
        update.plan.merge(self.plan_selection(&change));
        if !change.is_empty() || change.selection_changed() {
            update.events.push(ViewEvent::Selection(change));
        }
    }

    /// Re-clamp the scroll offsets. If they moved since `old` the whole
    /// viewport is repainted.
    fn finish_scroll(&mut self, old: Viewport, update: &mut ViewUpdate) {
        self.sync_scroll_extent();
        if let Some(event) = self.scroll_event(old) {
            self.measure_visible();
            update.plan = self.planner().plan_full();
            update.events.push(event);
        }
    }

    /// Record a scroll and plan its blit. Steps already in `update` were
    /// planned against the old offsets, so they degrade to a full repaint.
    fn apply_scroll(&mut self, change: Option<ScrollChange>, update: &mut ViewUpdate) {
        let Some(change) = change else {
            return;
        };
        self.measure_visible();
        let clamped = self.sync_scroll_extent().is_some();
        let change = ScrollChange {
            new_vertical: self.scroll.vertical(),
            new_horizontal: self.scroll.horizontal(),
            ..change
        };
        update.plan = if clamped || !update.plan.is_empty() {
            self.planner().plan_full()
        } else {
            self.planner().plan_scroll(&change)
        };
        update.events.push(ViewEvent::Scroll(change));
    }

    /// Scroll event for a jump from `old`, if the offsets moved.
    fn scroll_event(&self, old: Viewport) -> Option<ViewEvent> {
        let new = self.scroll.viewport();
        (old.vertical != new.vertical || old.horizontal != new.horizontal).then_some(
            ViewEvent::Scroll(ScrollChange {
                old_vertical: old.vertical,
                new_vertical: new.vertical,
                old_horizontal: old.horizontal,
                new_horizontal: new.horizontal,
            }),
        )
    }

    /// Scroll the caret into view.
    fn show_caret(&mut self, update: &mut ViewUpdate) {
        let caret = *self.selection.caret();
        let line = self.visual_line_at(caret.offset, caret.direction);
        let x = self.x_at(caret.offset, caret.direction);
        let change = self.scroll.show_location(x, self.options.caret_width, line);
        self.apply_scroll(change, update);
    }

    // --- text -------------------------------------------------------------

    /// Replace `length` chars at `start` with `text`.
    ///
    /// Fails with `InvalidRange` or `InvalidArgument` before anything is
    /// modified.
    pub fn replace_text_range(
        &mut self,
        start: usize,
        length: usize,
        text: &str,
    ) -> Result<ViewUpdate> {
        let end = start
            .checked_add(length)
            .ok_or_else(|| EditError::range(format!("length {length} overflows at {start}")))?;
        self.content.validate_caret_offset(start)?;
        self.content.validate_caret_offset(end)?;

        // Geometry of the old text.
        let old_viewport = self.scroll.viewport();
        let first_line = self.visual_line_at(start, CaretDirection::Backward);
        let old_last_line = self.visual_line_at(end, CaretDirection::Backward);
        let old_end_x = self.x_at(end, CaretDirection::Backward);
        let start_x = self.x_at(start, CaretDirection::Backward);
        let was_direction_sensitive = (first_line..=old_last_line)
            .any(|line| self.is_direction_sensitive(line));
        let old_top_end = self.top_line_end();

        let event = self.content.replace_range(start, length, text)?;
        let change = ContentChange::Replaced(event);
        debug!("replace_text_range {event:?}");

        if let Some(store) = self.styles.store_mut() {
            store.text_changed(&event);
        }
        if let Some(backgrounds) = self.backgrounds.backgrounds_mut() {
            backgrounds.text_changed(&event);
        }

        let rewrap = self.update_metrics(&change)?;

        let sel_change = self.selection.text_changed(&event);

        let mut update = ViewUpdate::default();
        let full_repaint = rewrap
            .as_ref()
            .is_some_and(|outcome| self.rewrap_needs_full_repaint(outcome));
        if full_repaint {
            if let Some(top_end) = old_top_end {
                let top_end = carry_offset(top_end, &event);
                self.restore_top_line(top_end);
            }
            self.measure_visible();
            update.plan = self.planner().plan_full();
        } else {
            let new_end = event.new_end();
            let last_line = self.visual_line_at(new_end, CaretDirection::Backward);
            let end_x = self.x_at(new_end, CaretDirection::Backward);
            let line_end = self
                .metrics
                .visual_line(&self.content, last_line)
                .map_or(new_end, |line| line.end());
            let runs = self.logical_runs(event.start_line).unwrap_or_default();
            let line_start = self.content.offset_at_line(event.start_line).unwrap_or(0);
            let extent = ChangeExtent {
                first_line,
                replaced_lines: old_last_line - first_line,
                inserted_lines: last_line.saturating_sub(first_line),
                start_x,
                end_x,
                reaches_line_end: new_end >= line_end,
                trailing_shifted: (end_x - old_end_x).abs() > f32::EPSILON
                    || old_last_line - first_line != last_line.saturating_sub(first_line),
                bold_transition: has_weight_transition(
                    &runs,
                    start.saturating_sub(line_start),
                    new_end.saturating_sub(line_start) + 1,
                ),
                direction_sensitive: was_direction_sensitive
                    || (first_line..=last_line).any(|line| self.is_direction_sensitive(line)),
            };
            update.plan = self.planner().plan_text_change(&extent);
        }
        update.events.push(ViewEvent::Content(change));
        self.finish_selection(sel_change, &mut update);
        self.finish_scroll(old_viewport, &mut update);
        Ok(update)
    }

    /// Replace the whole buffer. Caret and selection go back to offset 0 and
    /// the view scrolls to the origin.
    pub fn set_text(&mut self, text: &str) -> Result<ViewUpdate> {
        let old = self.scroll.viewport();
        let change = self.content.set_text(text);
        let line_count = self.content.line_count();
        if let Some(store) = self.styles.store_mut() {
            store.clear();
        }
        if let Some(backgrounds) = self.backgrounds.backgrounds_mut() {
            backgrounds.reset(line_count);
        }
        self.scroll.set_vertical(0.0);
        self.scroll.set_horizontal(0.0);
        self.update_metrics(&change)?;
        self.sync_scroll_extent();
        let sel_change = self.selection.reset();

        let mut update = ViewUpdate {
            plan: self.planner().plan_full(),
            events: vec![ViewEvent::Content(change)],
        };
        if !sel_change.is_empty() || sel_change.selection_changed() {
            update.events.push(ViewEvent::Selection(sel_change));
        }
        update.events.extend(self.scroll_event(old));
        Ok(update)
    }

    /// Feed a content change to the line metrics cache.
    fn update_metrics(&mut self, change: &ContentChange) -> Result<Option<RewrapOutcome>> {
        let outcome = match &mut self.metrics {
            LineMetrics::Width(cache) => {
                if let ContentChange::Reset { line_count, .. } = change {
                    cache.reset_all(*line_count);
                } else {
                    // Measurement happens below, once the viewport is known.
                    cache.text_changed(change, 0..0, |_| 0.0);
                }
                None
            }
            LineMetrics::Wrap(cache) => {
                let (content, styles, measurer) = (&self.content, &self.styles, &self.measurer);
                let width = cache.width();
                Some(cache.text_changed(change, content, |logical, text| {
                    wrap_logical_line(content, styles, measurer, width, logical, text)
                })?)
            }
        };
        self.measure_visible();
        Ok(outcome)
    }

    fn rewrap_needs_full_repaint(&self, outcome: &RewrapOutcome) -> bool {
        let visible = self.visible_lines();
        if outcome.line_count_changed {
            // Everything from the rewrapped lines down moves.
            return outcome.visual_lines.start < visible.end;
        }
        outcome.wrapping_changed
            && outcome.visual_lines.start < visible.end
            && visible.start < outcome.visual_lines.end.max(outcome.visual_lines.start + 1)
    }

    /// End offset of the top visual line, in wrap mode.
    fn top_line_end(&self) -> Option<usize> {
        match &self.metrics {
            LineMetrics::Wrap(cache) => cache.line(self.scroll.top_index()).map(VisualLine::end),
            LineMetrics::Width(_) => None,
        }
    }

    /// Scroll so the visual line ending at `top_end` is at the top again.
    fn restore_top_line(&mut self, top_end: usize) {
        if let LineMetrics::Wrap(cache) = &self.metrics {
            let line = cache.line_at_end_offset(top_end);
            self.sync_scroll_extent();
            self.scroll.set_top_index(line);
        }
    }

    // --- layout mode ------------------------------------------------------

    /// Switch word wrap on or off. The line at the top of the viewport stays
    /// at the top.
    pub fn set_word_wrap(&mut self, wrap: bool) -> Result<ViewUpdate> {
        if wrap == self.metrics.is_wrapped() {
            return Ok(ViewUpdate::default());
        }
        let old = self.scroll.viewport();
        let top_offset = self
            .metrics
            .visual_line(&self.content, self.scroll.top_index())
            .map_or(0, |line| line.start);
        self.metrics = if wrap {
            LineMetrics::Wrap(WrapCache::new(self.wrap_width()))
        } else {
            LineMetrics::Width(WidthCache::new(self.content.line_count()))
        };
        self.options.word_wrap = wrap;
        self.rebuild_metrics()?;

        let top = self.visual_line_at(top_offset, CaretDirection::Backward);
        self.scroll.set_top_index(top);
        if wrap {
            self.scroll.set_horizontal(0.0);
        }
        self.measure_visible();
        self.sync_scroll_extent();
        Ok(ViewUpdate {
            plan: self.planner().plan_full(),
            events: self.scroll_event(old).into_iter().collect(),
        })
    }

    /// Change the client area. In wrap mode a width change rewraps every
    /// line, keeping the top line in place.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<ViewUpdate> {
        let old = self.scroll.viewport();
        let top_end = self.top_line_end();
        self.options.client_width = width;
        self.options.client_height = height;
        self.scroll.resize(width, height);

        if self.metrics.is_wrapped() && width != old.client_width {
            self.rebuild_metrics()?;
            if let Some(top_end) = top_end {
                self.restore_top_line(top_end);
            }
        }
        self.measure_visible();
        self.settle_max_width();
        Ok(ViewUpdate {
            plan: self.planner().plan_full(),
            events: self.scroll_event(old).into_iter().collect(),
        })
    }

    // --- scrolling --------------------------------------------------------

    /// Scroll so visual line `line` is at the top.
    pub fn set_top_index(&mut self, line: usize) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        let change = self.scroll.set_top_index(line);
        self.apply_scroll(change, &mut update);
        update
    }

    /// Scroll horizontally to content x `pixel`, clamped against the
    /// settled maximum line width.
    pub fn set_horizontal_offset(&mut self, pixel: f32) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        let old = self.scroll.viewport();
        self.settle_max_width();
        self.scroll.set_horizontal(pixel);
        let new = self.scroll.viewport();
        let change = (new.horizontal != old.horizontal).then_some(ScrollChange {
            old_vertical: old.vertical,
            new_vertical: new.vertical,
            old_horizontal: old.horizontal,
            new_horizontal: new.horizontal,
        });
        self.apply_scroll(change, &mut update);
        update
    }

    /// Scroll by whole lines; negative scrolls up.
    pub fn scroll_lines(&mut self, delta: isize) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        let change = self.scroll.scroll_lines(delta);
        self.apply_scroll(change, &mut update);
        update
    }

    // --- selection --------------------------------------------------------

    /// Place the caret at `offset`, dropping the selection, and scroll it
    /// into view.
    pub fn set_caret_offset(&mut self, offset: usize) -> Result<ViewUpdate> {
        self.content.validate_caret_offset(offset)?;
        let change = self.selection.collapse(offset);
        self.selection.set_column_x(None);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        self.show_caret(&mut update);
        Ok(update)
    }

    /// Select `start..end`; the caret goes to `end`.
    pub fn set_selection(&mut self, start: usize, end: usize) -> Result<ViewUpdate> {
        self.content.validate_caret_offset(start)?;
        self.content.validate_caret_offset(end)?;
        let change = self.selection.set_selection(start, end);
        self.selection.set_column_x(None);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        self.show_caret(&mut update);
        Ok(update)
    }

    pub fn select_all(&mut self) -> ViewUpdate {
        let change = self.selection.select_all(self.content.char_count());
        self.selection.set_column_x(None);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        update
    }

    /// Move the caret to `offset` while growing or shrinking the selection.
    pub fn extend_selection(&mut self, offset: usize) -> Result<ViewUpdate> {
        self.content.validate_caret_offset(offset)?;
        let change = self.selection.extend_to(offset, CaretDirection::Backward);
        self.selection.set_column_x(None);
        let mut update = ViewUpdate::default();
        self.finish_selection(change, &mut update);
        self.show_caret(&mut update);
        Ok(update)
    }

    /// Selected text, delimiters included.
    pub fn selection_text(&self) -> Result<String> {
        let range = self.selection.range();
        self.content.text_range(range.start, range.len())
    }

    // --- styles -----------------------------------------------------------

    fn check_span(&self, start: usize, length: usize) -> Result<usize> {
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.content.char_count())
            .ok_or_else(|| {
                EditError::range(format!(
                    "style range {start}+{length} beyond char count {}",
                    self.content.char_count()
                ))
            })?;
        Ok(end)
    }

    /// Plan for a restyled span `start..end` of logical lines.
    fn restyle(&mut self, start: usize, end: usize) -> Result<ViewUpdate> {
        let old = self.scroll.viewport();
        let first = self.content.line_at_offset(start)?;
        let last = self.content.line_at_offset(end)?;
        let top_end = self.top_line_end();
        let outcome = self.restyle_lines(first, last)?;
        let mut update = ViewUpdate::default();
        if outcome.is_some_and(|outcome| self.rewrap_needs_full_repaint(&outcome)) {
            if let Some(top_end) = top_end {
                self.restore_top_line(top_end);
            }
            self.measure_visible();
            update.plan = self.planner().plan_full();
        } else {
            // Weight changes move the rest of each line.
            let first_visual = self.visual_line_at(start, CaretDirection::Backward);
            let last_visual = self.visual_line_at(end, CaretDirection::Forward).max(first_visual);
            let start_x = if self.is_direction_sensitive(first_visual) {
                self.scroll.horizontal()
            } else {
                self.x_at(start, CaretDirection::Backward)
            };
            update.plan = self
                .planner()
                .plan_range(first_visual, start_x, last_visual, None);
        }
        self.finish_scroll(old, &mut update);
        Ok(update)
    }

    /// Apply `run` on top of the internal styles.
    ///
    /// Ignored (with a warning) while a style provider is installed.
    pub fn set_style_range(&mut self, run: StyleRun) -> Result<ViewUpdate> {
        let end = self.check_span(run.start, run.length)?;
        let Some(store) = self.styles.store_mut() else {
            warn!("set_style_range ignored: an external style provider is installed");
            return Ok(ViewUpdate::default());
        };
        store.set_style_range(run);
        self.restyle(run.start, end)
    }

    /// Replace the internal styles of `start..start + length` with `runs`.
    ///
    /// Ignored (with a warning) while a style provider is installed.
    pub fn replace_style_ranges(
        &mut self,
        start: usize,
        length: usize,
        runs: &[StyleRun],
    ) -> Result<ViewUpdate> {
        let end = self.check_span(start, length)?;
        let Some(store) = self.styles.store_mut() else {
            warn!("replace_style_ranges ignored: an external style provider is installed");
            return Ok(ViewUpdate::default());
        };
        store.replace_style_ranges(start, length, runs)?;
        self.restyle(start, end)
    }

    /// Internal style runs, absolute offsets.
    pub fn style_runs(&self) -> &[StyleRun] {
        match &self.styles {
            StyleSource::Internal(store) => store.runs(),
            StyleSource::External(_) => &[],
        }
    }

    /// Color `count` logical lines starting at `first`.
    ///
    /// Ignored (with a warning) while a background provider is installed.
    pub fn set_line_background(
        &mut self,
        first: usize,
        count: usize,
        color: Option<Color>,
    ) -> Result<ViewUpdate> {
        let Some(backgrounds) = self.backgrounds.backgrounds_mut() else {
            warn!("set_line_background ignored: an external background provider is installed");
            return Ok(ViewUpdate::default());
        };
        backgrounds.set(first, count, color)?;
        let mut update = ViewUpdate::default();
        if count > 0 {
            let visual = self.metrics.visual_lines_of(first..first + count);
            if !visual.is_empty() {
                update.plan = self.planner().plan_lines(visual.start, visual.end - 1);
            }
        }
        Ok(update)
    }

    /// Install or remove the host style provider. Removing it starts over
    /// with empty internal styles.
    pub fn set_style_provider(
        &mut self,
        provider: Option<Box<dyn StyleProvider>>,
    ) -> Result<ViewUpdate> {
        let old = self.scroll.viewport();
        self.styles = match provider {
            Some(provider) => StyleSource::External(provider),
            None => StyleSource::Internal(StyleStore::new()),
        };
        self.rebuild_metrics()?;
        let mut update = ViewUpdate {
            plan: self.planner().plan_full(),
            events: Vec::new(),
        };
        self.finish_scroll(old, &mut update);
        Ok(update)
    }

    /// Install or remove the host line background provider.
    pub fn set_background_provider(
        &mut self,
        provider: Option<Box<dyn LineBackgroundProvider>>,
    ) -> ViewUpdate {
        self.backgrounds = match provider {
            Some(provider) => BackgroundSource::External(provider),
            None => BackgroundSource::Internal(LineBackgrounds::new(self.content.line_count())),
        };
        ViewUpdate {
            plan: self.planner().plan_full(),
            events: Vec::new(),
        }
    }

    /// Install or remove the host bidi segment provider.
    pub fn set_bidi_segment_provider(
        &mut self,
        provider: Option<Box<dyn BidiSegmentProvider>>,
    ) -> ViewUpdate {
        self.bidi_segments = provider;
        ViewUpdate {
            plan: self.planner().plan_full(),
            events: Vec::new(),
        }
    }
}

/// Wrap one logical line with its styles.
fn wrap_logical_line(
    content: &dyn TextContent,
    styles: &StyleSource,
    measurer: &dyn MeasurementService,
    width: f32,
    logical: usize,
    text: &str,
) -> Vec<Range<usize>> {
    let runs = match content.offset_at_line(logical) {
        Ok(start) => styles.line_runs(start, text, text.chars().count()),
        Err(_) => Vec::new(),
    };
    wrap_line(text, &runs, measurer, width)
}

/// Where `offset` ends up after `event`.
fn carry_offset(offset: usize, event: &TextChangeEvent) -> usize {
    if offset <= event.start {
        offset
    } else if offset >= event.replaced_end() {
        (offset as isize + event.char_delta()) as usize
    } else {
        event.new_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::PixelRect;
    use crate::style::TextStyle;

    fn options(width: f32, height: f32) -> ViewOptions {
        ViewOptions {
            client_width: width,
            client_height: height,
            ..ViewOptions::default()
        }
    }

    fn view(text: &str, width: f32, height: f32) -> EditorView {
        EditorView::new(
            DefaultContent::new(text),
            MonospaceMeasurer::new(10.0, 20.0).with_bold_extra(2.0),
            options(width, height),
        )
        .unwrap()
    }

    fn numbered(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("line {i:02}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn invalid_edits_leave_everything_untouched() {
        let mut v = view("ab\r\ncd", 200.0, 100.0);
        v.set_selection(0, 1).unwrap();
        assert!(matches!(
            v.replace_text_range(3, 0, "x"),
            Err(EditError::InvalidArgument(_))
        ));
        assert!(matches!(
            v.replace_text_range(5, 3, "x"),
            Err(EditError::InvalidRange(_))
        ));
        assert_eq!(v.content().text(), "ab\r\ncd");
        assert_eq!(v.selection(), 0..1);
    }

    #[test]
    fn edit_below_viewport_plans_nothing() {
        let mut v = view(&numbered(20), 200.0, 60.0);
        let update = v.replace_text_range(15 * 8 + 5, 1, "X").unwrap();
        assert!(update.plan.is_empty());
        assert!(matches!(update.events[..], [ViewEvent::Content(_)]));
    }

    #[test]
    fn edit_before_selection_shifts_it_and_reports() {
        let mut v = view("hello world", 200.0, 100.0);
        v.set_selection(6, 11).unwrap();
        let update = v.replace_text_range(0, 0, ">> ").unwrap();
        assert_eq!(v.selection(), 9..14);
        assert_eq!(v.selection_text().unwrap(), "world");
        let change = update.selection_change().unwrap();
        assert_eq!(change.old, 6..11);
        assert_eq!(change.new, 9..14);
    }

    #[test]
    fn set_text_resets_caret_scroll_and_styles() {
        let mut v = view(&numbered(20), 200.0, 60.0);
        v.set_style_range(StyleRun::new(0, 4, TextStyle::bold())).unwrap();
        v.set_caret_offset(100).unwrap();
        assert!(v.top_index() > 0);
        let update = v.set_text("fresh").unwrap();
        assert_eq!(v.caret_offset(), 0);
        assert_eq!(v.top_index(), 0);
        assert!(v.style_runs().is_empty());
        assert_eq!(update.plan, v.planner().plan_full());
        assert!(update.scroll_change().is_some());
    }

    #[test]
    fn word_wrap_round_trip_restores_lines() {
        let text = "alpha beta gamma delta\nshort\nepsilon zeta eta theta";
        let mut v = view(text, 101.0, 200.0);
        assert_eq!(v.line_count(), 3);
        v.set_word_wrap(true).unwrap();
        assert!(v.line_count() > 3);
        let wrapped = v.line_count();
        v.set_caret_offset(12).unwrap();
        v.set_word_wrap(false).unwrap();
        assert_eq!(v.line_count(), 3);
        assert_eq!(v.caret_offset(), 12);
        v.set_word_wrap(true).unwrap();
        assert_eq!(v.line_count(), wrapped);
    }

    #[test]
    fn resize_rewraps_in_wrap_mode() {
        let mut v = view("aaaa bbbb cccc dddd", 101.0, 200.0);
        v.set_word_wrap(true).unwrap();
        let narrow = v.line_count();
        v.resize(301.0, 200.0).unwrap();
        assert!(v.line_count() < narrow);
        assert_eq!(v.line_count(), 1);
    }

    fn top_line(v: &EditorView) -> VisualLine {
        v.metrics().visual_line(v.content(), v.top_index()).unwrap()
    }

    #[test]
    fn resize_keeps_the_top_line_by_end_offset() {
        let words = (0..40).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        // Two words per sub-line at 80px, three at 120px.
        let mut v = view(&words, 81.0, 100.0);
        v.set_word_wrap(true).unwrap();
        assert_eq!(v.line_count(), 20);
        v.set_top_index(6);
        let top_end = top_line(&v).end();
        assert_eq!(top_end, 56);

        v.resize(121.0, 100.0).unwrap();
        assert_eq!(v.line_count(), 14);
        let top = top_line(&v);
        assert!(top.start < top_end && top_end <= top.end());
        assert_eq!(v.top_index(), 4);
    }

    #[test]
    fn rewrap_above_the_top_line_keeps_its_text() {
        let text = vec!["w00 w01 w02 w03"; 20].join("\n");
        let mut v = view(&text, 81.0, 100.0);
        v.set_word_wrap(true).unwrap();
        v.set_top_index(10);
        let before = top_line(&v);
        let before_text = v.content().text_range(before.start, before.len).unwrap();

        // The first logical line grows from two sub-lines to three.
        let update = v.replace_text_range(0, 0, "xxxx ").unwrap();
        assert_eq!(v.line_count(), 41);
        assert_eq!(v.top_index(), 11);
        let after = top_line(&v);
        assert_eq!(
            v.content().text_range(after.start, after.len).unwrap(),
            before_text
        );
        assert_eq!(update.plan, v.planner().plan_full());
        assert!(update.scroll_change().is_some());
    }

    #[test]
    fn offscreen_rewrap_that_adds_a_line_plans_nothing() {
        let text = (0..50).map(|i| format!("row {i:02}")).collect::<Vec<_>>().join("\n");
        let mut v = view(&text, 61.0, 100.0);
        v.set_word_wrap(true).unwrap();
        assert_eq!(v.line_count(), 50);

        let end_of_row_40 = 40 * 7 + 6;
        let update = v.replace_text_range(end_of_row_40, 0, "x").unwrap();
        assert_eq!(v.line_count(), 51);
        assert!(update.plan.is_empty());
        assert!(matches!(update.events[..], [ViewEvent::Content(_)]));
    }

    #[test]
    fn lazy_max_width_holds_the_horizontal_offset() {
        let text = "aaaaaaaaaa\naaaaaaaaa";
        let mut v = view(text, 60.0, 100.0);
        // The bold second line (108px) becomes the widest.
        v.set_style_range(StyleRun::new(11, 9, TextStyle::bold())).unwrap();
        v.set_horizontal_offset(49.0);
        assert_eq!(v.scroll().horizontal(), 49.0);

        let update = v.replace_style_ranges(11, 9, &[]).unwrap();
        assert!(update.scroll_change().is_none());
        assert_eq!(v.scroll().horizontal(), 49.0);

        let update = v.set_horizontal_offset(1000.0);
        assert_eq!(v.scroll().horizontal(), 41.0);
        assert_eq!(update.scroll_change().map(|c| c.old_horizontal), Some(49.0));
    }

    #[test]
    fn eager_max_width_clamps_on_restyle() {
        let mut v = EditorView::new(
            DefaultContent::new("aaaaaaaaaa\naaaaaaaaa"),
            MonospaceMeasurer::new(10.0, 20.0).with_bold_extra(2.0),
            ViewOptions {
                recalc_max_eagerly: true,
                ..options(60.0, 100.0)
            },
        )
        .unwrap();
        v.set_style_range(StyleRun::new(11, 9, TextStyle::bold())).unwrap();
        v.set_horizontal_offset(49.0);

        let update = v.replace_style_ranges(11, 9, &[]).unwrap();
        assert_eq!(v.scroll().horizontal(), 41.0);
        assert!(update.scroll_change().is_some());
    }

    struct Everything;

    impl StyleProvider for Everything {
        fn line_style(&self, line_offset: usize, line: &str) -> Vec<StyleRun> {
            vec![StyleRun::new(line_offset, line.chars().count(), TextStyle::bold())]
        }
    }

    #[test]
    fn internal_styles_are_ignored_under_a_provider() {
        let mut v = view("abc\ndef", 200.0, 100.0);
        v.set_style_provider(Some(Box::new(Everything))).unwrap();
        let update = v.set_style_range(StyleRun::new(0, 2, TextStyle::default())).unwrap();
        assert!(update.is_empty());
        assert!(v.style_runs().is_empty());
        // Bold chars are 12px wide under the provider.
        assert_eq!(v.caret_location(), (0.0, 0.0));
        v.set_caret_offset(2).unwrap();
        assert_eq!(v.caret_location(), (24.0, 0.0));
    }

    #[test]
    fn bolding_repaints_to_the_line_end() {
        let mut v = view("abcdef\nxyz", 200.0, 100.0);
        let update = v.set_style_range(StyleRun::new(2, 2, TextStyle::bold())).unwrap();
        let rects: Vec<PixelRect> = update.plan.repaints().collect();
        assert_eq!(rects, vec![PixelRect::new(20.0, 0.0, 180.0, 20.0)]);
    }

    #[test]
    fn backgrounds_follow_inserted_lines() {
        let mut v = view("a\nb\nc", 200.0, 100.0);
        let blue = Color::rgb(0, 0, 255);
        v.set_line_background(1, 1, Some(blue)).unwrap();
        v.replace_text_range(0, 0, "new\n").unwrap();
        match &v.backgrounds {
            BackgroundSource::Internal(backgrounds) => {
                assert_eq!(backgrounds.get(1), None);
                assert_eq!(backgrounds.get(2), Some(blue));
            }
            BackgroundSource::External(_) => panic!("expected internal backgrounds"),
        }
    }

    #[test]
    fn scrolling_blits_and_reports() {
        let mut v = view(&numbered(30), 200.0, 100.0);
        let update = v.scroll_lines(2);
        assert_eq!(v.top_index(), 2);
        assert!(update.plan.has_blit());
        let change = update.scroll_change().unwrap();
        assert_eq!(change.dy(), 40.0);
    }

    #[test]
    fn config_maps_to_options() {
        let mut config = EditorConfig::default();
        config.editor.word_wrap = true;
        config.editor.orientation = Orientation::Rtl;
        config.viewport.client_width = 320.0;
        let options = ViewOptions::from(&config);
        assert!(options.word_wrap);
        assert_eq!(options.orientation, BaseDirection::Rtl);
        assert_eq!(options.client_width, 320.0);
    }
}
