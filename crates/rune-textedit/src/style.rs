//! Style runs, line backgrounds, and the internal/external source switch.
//!
//! Styling comes from exactly one place per aspect: either the core's own
//! storage ([`StyleStore`], [`LineBackgrounds`]) or a host provider. The two
//! are never merged; installing a provider retires the internal storage.

use log::warn;

use crate::content::TextChangeEvent;
use crate::error::{EditError, Result};

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

/// Attributes applied to a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub bold: bool,
}

impl TextStyle {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// A styled span of text. Offsets are chars; absolute in storage, line
/// relative once handed to measurement or drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    pub start: usize,
    pub length: usize,
    pub style: TextStyle,
}

impl StyleRun {
    pub fn new(start: usize, length: usize, style: TextStyle) -> Self {
        Self {
            start,
            length,
            style,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }
}

/// Check that `runs` are sorted, non-overlapping, and inside
/// `[start, start + len]`.
pub fn validate_runs(runs: &[StyleRun], start: usize, len: usize) -> Result<()> {
    let limit = start + len;
    let mut cursor = start;
    for (i, run) in runs.iter().enumerate() {
        if run.start < cursor {
            return Err(EditError::argument(format!(
                "style run {i} at {} overlaps or is out of order (expected >= {cursor})",
                run.start
            )));
        }
        if run.end() > limit {
            return Err(EditError::argument(format!(
                "style run {i} ends at {} past {limit}",
                run.end()
            )));
        }
        cursor = run.end();
    }
    Ok(())
}

/// Whether the char at `offset` is bold.
pub fn is_bold_at(runs: &[StyleRun], offset: usize) -> bool {
    runs.iter()
        .find(|run| run.contains(offset))
        .is_some_and(|run| run.style.bold)
}

/// Whether font weight changes anywhere in `[start, end)`, including the
/// edge against the char just before `start`.
pub fn has_weight_transition(runs: &[StyleRun], start: usize, end: usize) -> bool {
    let from = start.saturating_sub(1);
    if end <= from {
        return false;
    }
    let first = is_bold_at(runs, from);
    (from + 1..end).any(|offset| is_bold_at(runs, offset) != first)
}

/// Runs clipped to `[start, end)` and rebased so `start` becomes 0.
pub fn clip_runs(runs: &[StyleRun], start: usize, end: usize) -> Vec<StyleRun> {
    runs.iter()
        .filter(|run| run.end() > start && run.start < end)
        .map(|run| {
            let s = run.start.max(start);
            let e = run.end().min(end);
            StyleRun::new(s - start, e - s, run.style)
        })
        .collect()
}

/// Document-wide style storage used when no [`StyleProvider`] is installed.
#[derive(Debug, Clone, Default)]
pub struct StyleStore {
    runs: Vec<StyleRun>,
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[StyleRun] {
        &self.runs
    }

    /// Apply `run`, replacing whatever styles covered its span. A default
    /// style clears the span.
    pub fn set_style_range(&mut self, run: StyleRun) {
        self.clear_range(run.start, run.end());
        if !run.style.is_default() && run.length > 0 {
            let at = self.runs.partition_point(|r| r.start < run.start);
            self.runs.insert(at, run);
        }
        self.coalesce();
    }

    /// Replace the styles in `[start, start + length)` with `runs`, which must
    /// be sorted, non-overlapping, and inside that span.
    pub fn replace_style_ranges(
        &mut self,
        start: usize,
        length: usize,
        runs: &[StyleRun],
    ) -> Result<()> {
        validate_runs(runs, start, length)?;
        self.clear_range(start, start + length);
        let at = self.runs.partition_point(|r| r.start < start);
        self.runs.splice(
            at..at,
            runs.iter()
                .copied()
                .filter(|run| !run.style.is_default() && run.length > 0),
        );
        self.coalesce();
        Ok(())
    }

    /// Remove styling from `[start, end)`, splitting runs that straddle it.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut out = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs.drain(..) {
            if run.end() <= start || run.start >= end {
                out.push(run);
                continue;
            }
            if run.start < start {
                out.push(StyleRun::new(run.start, start - run.start, run.style));
            }
            if run.end() > end {
                out.push(StyleRun::new(end, run.end() - end, run.style));
            }
        }
        self.runs = out;
    }

    /// Runs intersecting `[start, start + len)`, rebased to `start`.
    pub fn line_runs(&self, start: usize, len: usize) -> Vec<StyleRun> {
        let first = self.runs.partition_point(|run| run.end() <= start);
        clip_runs(&self.runs[first..], start, start + len)
    }

    /// Keep styles attached to the same text across an edit.
    ///
    /// Runs after the edit shift; runs inside the replaced span are dropped;
    /// a run that strictly contains the edit absorbs the inserted text.
    pub fn text_changed(&mut self, event: &TextChangeEvent) {
        let start = event.start;
        let replaced_end = event.replaced_end();
        let delta = event.char_delta();
        let mut out = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.end() <= start {
                out.push(run);
            } else if run.start >= replaced_end {
                let shifted = (run.start as isize + delta) as usize;
                out.push(StyleRun::new(shifted, run.length, run.style));
            } else if run.start < start && run.end() > replaced_end {
                let length = run.length - event.replace_char_count + event.new_char_count;
                out.push(StyleRun::new(run.start, length, run.style));
            } else {
                if run.start < start {
                    out.push(StyleRun::new(run.start, start - run.start, run.style));
                }
                if run.end() > replaced_end {
                    out.push(StyleRun::new(
                        event.new_end(),
                        run.end() - replaced_end,
                        run.style,
                    ));
                }
            }
        }
        self.runs = out;
        self.coalesce();
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    fn coalesce(&mut self) {
        let mut out: Vec<StyleRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match out.last_mut() {
                Some(prev) if prev.end() == run.start && prev.style == run.style => {
                    prev.length += run.length;
                }
                _ => out.push(run),
            }
        }
        self.runs = out;
    }
}

/// Per-line background colors used when no [`LineBackgroundProvider`] is
/// installed.
#[derive(Debug, Clone)]
pub struct LineBackgrounds {
    colors: Vec<Option<Color>>,
}

impl LineBackgrounds {
    pub fn new(line_count: usize) -> Self {
        Self {
            colors: vec![None; line_count.max(1)],
        }
    }

    pub fn get(&self, line: usize) -> Option<Color> {
        self.colors.get(line).copied().flatten()
    }

    /// Set `count` lines starting at `first`.
    pub fn set(&mut self, first: usize, count: usize, color: Option<Color>) -> Result<()> {
        let end = first
            .checked_add(count)
            .filter(|end| *end <= self.colors.len())
            .ok_or_else(|| {
                EditError::range(format!(
                    "lines {first}+{count} beyond line count {}",
                    self.colors.len()
                ))
            })?;
        self.colors[first..end].fill(color);
        Ok(())
    }

    /// Drop the backgrounds of removed lines and open empty slots for
    /// inserted ones; the first edited line keeps its color.
    pub fn text_changed(&mut self, event: &TextChangeEvent) {
        let first = (event.start_line + 1).min(self.colors.len());
        let removed_end = (first + event.replace_line_count).min(self.colors.len());
        self.colors.splice(
            first..removed_end,
            std::iter::repeat_n(None, event.new_line_count),
        );
    }

    pub fn reset(&mut self, line_count: usize) {
        self.colors = vec![None; line_count.max(1)];
    }

    pub fn line_count(&self) -> usize {
        self.colors.len()
    }
}

/// Host callback supplying style runs per line.
///
/// Returned runs use absolute offsets (`line_offset` based) and must be
/// sorted and non-overlapping.
pub trait StyleProvider {
    fn line_style(&self, line_offset: usize, line: &str) -> Vec<StyleRun>;
}

/// Host callback supplying a background color per line.
pub trait LineBackgroundProvider {
    fn line_background(&self, line_offset: usize, line: &str) -> Option<Color>;
}

/// Where style runs come from.
pub enum StyleSource {
    Internal(StyleStore),
    External(Box<dyn StyleProvider>),
}

impl Default for StyleSource {
    fn default() -> Self {
        StyleSource::Internal(StyleStore::new())
    }
}

impl StyleSource {
    /// Runs for a line, relative to the line start.
    ///
    /// Malformed provider output cannot be rejected before the fact, so the
    /// line renders unstyled and a warning is logged.
    pub fn line_runs(&self, line_offset: usize, line: &str, line_len: usize) -> Vec<StyleRun> {
        match self {
            StyleSource::Internal(store) => store.line_runs(line_offset, line_len),
            StyleSource::External(provider) => {
                let runs = provider.line_style(line_offset, line);
                match validate_runs(&runs, line_offset, line_len) {
                    Ok(()) => clip_runs(&runs, line_offset, line_offset + line_len),
                    Err(err) => {
                        warn!("style provider returned malformed runs at {line_offset}: {err}");
                        Vec::new()
                    }
                }
            }
        }
    }

    pub fn store_mut(&mut self) -> Option<&mut StyleStore> {
        match self {
            StyleSource::Internal(store) => Some(store),
            StyleSource::External(_) => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, StyleSource::External(_))
    }
}

/// Where line backgrounds come from.
pub enum BackgroundSource {
    Internal(LineBackgrounds),
    External(Box<dyn LineBackgroundProvider>),
}

impl BackgroundSource {
    pub fn line_background(&self, line: usize, line_offset: usize, text: &str) -> Option<Color> {
        match self {
            BackgroundSource::Internal(backgrounds) => backgrounds.get(line),
            BackgroundSource::External(provider) => provider.line_background(line_offset, text),
        }
    }

    pub fn backgrounds_mut(&mut self) -> Option<&mut LineBackgrounds> {
        match self {
            BackgroundSource::Internal(backgrounds) => Some(backgrounds),
            BackgroundSource::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);

    fn fg(color: Color) -> TextStyle {
        TextStyle {
            foreground: Some(color),
            ..TextStyle::default()
        }
    }

    fn change(start: usize, replaced: usize, inserted: usize) -> TextChangeEvent {
        TextChangeEvent {
            start,
            start_line: 0,
            replace_char_count: replaced,
            replace_line_count: 0,
            new_char_count: inserted,
            new_line_count: 0,
        }
    }

    #[test]
    fn validate_rejects_overlap_and_overflow() {
        let ok = [
            StyleRun::new(0, 2, TextStyle::bold()),
            StyleRun::new(2, 3, fg(RED)),
        ];
        assert!(validate_runs(&ok, 0, 5).is_ok());
        let overlapping = [
            StyleRun::new(0, 3, TextStyle::bold()),
            StyleRun::new(2, 1, fg(RED)),
        ];
        assert!(matches!(
            validate_runs(&overlapping, 0, 5),
            Err(EditError::InvalidArgument(_))
        ));
        let unsorted = [
            StyleRun::new(3, 1, TextStyle::bold()),
            StyleRun::new(0, 1, fg(RED)),
        ];
        assert!(validate_runs(&unsorted, 0, 5).is_err());
        assert!(validate_runs(&[StyleRun::new(4, 3, fg(RED))], 0, 5).is_err());
    }

    #[test]
    fn weight_transition_detection() {
        let runs = [StyleRun::new(3, 2, TextStyle::bold())];
        assert!(!has_weight_transition(&runs, 0, 3));
        assert!(has_weight_transition(&runs, 0, 4));
        assert!(has_weight_transition(&runs, 5, 7));
        assert!(!has_weight_transition(&runs, 4, 5));
    }

    #[test]
    fn set_style_range_splits_existing() {
        let mut store = StyleStore::new();
        store.set_style_range(StyleRun::new(0, 10, fg(RED)));
        store.set_style_range(StyleRun::new(3, 2, TextStyle::bold()));
        assert_eq!(
            store.runs(),
            &[
                StyleRun::new(0, 3, fg(RED)),
                StyleRun::new(3, 2, TextStyle::bold()),
                StyleRun::new(5, 5, fg(RED)),
            ]
        );
        store.set_style_range(StyleRun::new(3, 2, fg(RED)));
        assert_eq!(store.runs(), &[StyleRun::new(0, 10, fg(RED))]);
    }

    #[test]
    fn line_runs_are_rebased() {
        let mut store = StyleStore::new();
        store.set_style_range(StyleRun::new(2, 6, TextStyle::bold()));
        assert_eq!(
            store.line_runs(5, 5),
            vec![StyleRun::new(0, 3, TextStyle::bold())]
        );
        assert!(store.line_runs(8, 4).is_empty());
    }

    #[test]
    fn text_changed_shifts_and_clips() {
        let mut store = StyleStore::new();
        store.set_style_range(StyleRun::new(0, 2, TextStyle::bold()));
        store.set_style_range(StyleRun::new(4, 4, fg(RED)));
        store.set_style_range(StyleRun::new(10, 2, TextStyle::bold()));
        // Replace [5, 9) with one char.
        store.text_changed(&change(5, 4, 1));
        assert_eq!(
            store.runs(),
            &[
                StyleRun::new(0, 2, TextStyle::bold()),
                StyleRun::new(4, 1, fg(RED)),
                StyleRun::new(7, 2, TextStyle::bold()),
            ]
        );
    }

    #[test]
    fn insertion_inside_run_extends_it() {
        let mut store = StyleStore::new();
        store.set_style_range(StyleRun::new(2, 4, TextStyle::bold()));
        store.text_changed(&change(4, 0, 3));
        assert_eq!(store.runs(), &[StyleRun::new(2, 7, TextStyle::bold())]);
        // Inserting at the run start pushes it right instead.
        store.text_changed(&change(2, 0, 1));
        assert_eq!(store.runs(), &[StyleRun::new(3, 7, TextStyle::bold())]);
    }

    #[test]
    fn replace_style_ranges_validates_first() {
        let mut store = StyleStore::new();
        store.set_style_range(StyleRun::new(0, 4, fg(RED)));
        let bad = [StyleRun::new(1, 5, TextStyle::bold())];
        assert!(store.replace_style_ranges(0, 4, &bad).is_err());
        assert_eq!(store.runs(), &[StyleRun::new(0, 4, fg(RED))]);
        store
            .replace_style_ranges(0, 4, &[StyleRun::new(1, 1, TextStyle::bold())])
            .unwrap();
        assert_eq!(store.runs(), &[StyleRun::new(1, 1, TextStyle::bold())]);
    }

    #[test]
    fn backgrounds_follow_line_changes() {
        let mut backgrounds = LineBackgrounds::new(4);
        backgrounds.set(2, 2, Some(RED)).unwrap();
        let mut event = change(0, 0, 2);
        event.new_line_count = 2;
        backgrounds.text_changed(&event);
        assert_eq!(backgrounds.line_count(), 6);
        assert_eq!(backgrounds.get(4), Some(RED));
        assert_eq!(backgrounds.get(2), None);
        assert!(backgrounds.set(5, 2, None).is_err());
    }

    struct Bad;

    impl StyleProvider for Bad {
        fn line_style(&self, line_offset: usize, _line: &str) -> Vec<StyleRun> {
            vec![StyleRun::new(line_offset, 100, TextStyle::bold())]
        }
    }

    #[test]
    fn malformed_provider_output_renders_unstyled() {
        let source = StyleSource::External(Box::new(Bad));
        assert!(source.line_runs(0, "abc", 3).is_empty());
    }
}
