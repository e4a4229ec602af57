pub mod line_breaker;
pub mod width_cache;
pub mod wrap_cache;

use core::ops::Range;

pub use line_breaker::{LineBreak, LineBreakKind, compute_line_breaks, wrap_line};
pub use width_cache::WidthCache;
pub use wrap_cache::{RewrapOutcome, VisualLine, WrapCache};

use crate::content::TextContent;
use crate::selection::CaretDirection;

/// Line metrics for the active layout mode.
///
/// Without word wrap every logical line is one visual line and only widths
/// are cached; with word wrap the visual line table is authoritative and the
/// content width is the wrap width.
#[derive(Debug, Clone)]
pub enum LineMetrics {
    Width(WidthCache),
    Wrap(WrapCache),
}

impl LineMetrics {
    pub fn is_wrapped(&self) -> bool {
        matches!(self, LineMetrics::Wrap(_))
    }

    pub fn visual_line_count(&self, content: &dyn TextContent) -> usize {
        match self {
            LineMetrics::Width(_) => content.line_count(),
            LineMetrics::Wrap(cache) => cache.line_count(),
        }
    }

    /// Visual line holding a caret at `offset`.
    pub fn visual_line_at(
        &self,
        content: &dyn TextContent,
        offset: usize,
        direction: CaretDirection,
    ) -> usize {
        match self {
            LineMetrics::Width(_) => content.line_at_offset(offset).unwrap_or(0),
            LineMetrics::Wrap(cache) => cache.line_at_caret(offset, direction),
        }
    }

    /// Absolute char span and logical line of visual line `index`.
    pub fn visual_line(&self, content: &dyn TextContent, index: usize) -> Option<VisualLine> {
        match self {
            LineMetrics::Width(_) => {
                let start = content.offset_at_line(index).ok()?;
                let len = content.line_len(index).ok()?;
                Some(VisualLine {
                    start,
                    len,
                    logical: index,
                })
            }
            LineMetrics::Wrap(cache) => cache.line(index).copied(),
        }
    }

    /// Visual lines covering logical lines `logical`.
    pub fn visual_lines_of(&self, logical: Range<usize>) -> Range<usize> {
        match self {
            LineMetrics::Width(_) => logical,
            LineMetrics::Wrap(cache) => {
                if logical.is_empty() {
                    let at = cache.visual_lines_of(logical.start).start;
                    return at..at;
                }
                cache.visual_lines_of(logical.start).start
                    ..cache.visual_lines_of(logical.end - 1).end
            }
        }
    }
}
