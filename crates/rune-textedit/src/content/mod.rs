//! Line-indexed text storage and structured change notifications.
//!
//! [`TextContent`] is the seam hosts implement to supply their own storage;
//! [`DefaultContent`] is the built-in implementation. Every mutation returns a
//! [`ContentChange`] describing the edit in terms of the *pre-edit* line
//! structure so downstream caches can shift their per-line state.

mod default_content;
mod prefix_sums;

pub use default_content::DefaultContent;
pub use prefix_sums::PrefixSums;

use crate::error::{EditError, Result};

/// Line break sequence terminating a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineDelimiter {
    /// Last line of the buffer.
    #[default]
    None,
    Lf,
    CrLf,
    Cr,
}

impl LineDelimiter {
    /// Length of the delimiter in chars.
    pub fn len(self) -> usize {
        match self {
            LineDelimiter::None => 0,
            LineDelimiter::Lf | LineDelimiter::Cr => 1,
            LineDelimiter::CrLf => 2,
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, LineDelimiter::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineDelimiter::None => "",
            LineDelimiter::Lf => "\n",
            LineDelimiter::CrLf => "\r\n",
            LineDelimiter::Cr => "\r",
        }
    }
}

/// A replace edit, expressed against the line structure before the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChangeEvent {
    /// Char offset where the edit starts.
    pub start: usize,
    /// Line containing `start`.
    pub start_line: usize,
    /// Number of chars removed.
    pub replace_char_count: usize,
    /// Number of line breaks removed.
    pub replace_line_count: usize,
    /// Number of chars inserted.
    pub new_char_count: usize,
    /// Number of line breaks inserted.
    pub new_line_count: usize,
}

impl TextChangeEvent {
    /// Build an event from counts where a negative `replace_char_count`
    /// means the removed span lies *before* `start`.
    ///
    /// Content implementations that report backward deletes this way must
    /// route them through here before handing the event to caches.
    pub fn normalize(
        start: usize,
        start_line: usize,
        replace_char_count: i64,
        replace_line_count: usize,
        new_char_count: usize,
        new_line_count: usize,
    ) -> Result<Self> {
        let (start, replace_char_count) = if replace_char_count < 0 {
            let back = replace_char_count.unsigned_abs() as usize;
            let start = start.checked_sub(back).ok_or_else(|| {
                EditError::range(format!(
                    "backward delete of {back} chars before offset {start}"
                ))
            })?;
            (start, back)
        } else {
            (start, replace_char_count as usize)
        };
        Ok(Self {
            start,
            start_line,
            replace_char_count,
            replace_line_count,
            new_char_count,
            new_line_count,
        })
    }

    /// Net change in line count.
    pub fn line_delta(&self) -> isize {
        self.new_line_count as isize - self.replace_line_count as isize
    }

    /// Net change in char count.
    pub fn char_delta(&self) -> isize {
        self.new_char_count as isize - self.replace_char_count as isize
    }

    /// End of the inserted text after the edit.
    pub fn new_end(&self) -> usize {
        self.start + self.new_char_count
    }

    /// End of the removed text before the edit.
    pub fn replaced_end(&self) -> usize {
        self.start + self.replace_char_count
    }
}

/// What a content mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChange {
    /// A range was replaced.
    Replaced(TextChangeEvent),
    /// The whole buffer was replaced.
    Reset { line_count: usize, char_count: usize },
}

/// Line-oriented text storage.
///
/// Offsets are char offsets. Line text never includes its delimiter.
pub trait TextContent {
    /// Total number of chars, delimiters included.
    fn char_count(&self) -> usize;

    /// Number of lines; an empty buffer has one empty line.
    fn line_count(&self) -> usize;

    /// Line containing `offset`, for `0 <= offset <= char_count`.
    fn line_at_offset(&self, offset: usize) -> Result<usize>;

    /// Char offset at the start of `line`.
    fn offset_at_line(&self, line: usize) -> Result<usize>;

    /// Text of `line` without its delimiter.
    fn line(&self, line: usize) -> Result<&str>;

    /// Length of `line` in chars, delimiter excluded.
    fn line_len(&self, line: usize) -> Result<usize>;

    /// Delimiter terminating `line`.
    fn line_delimiter(&self, line: usize) -> Result<LineDelimiter>;

    /// Text of `[start, start + length)`, delimiters included.
    fn text_range(&self, start: usize, length: usize) -> Result<String>;

    /// Replace `[start, start + length)` with `text`.
    fn replace_range(&mut self, start: usize, length: usize, text: &str)
    -> Result<TextChangeEvent>;

    /// Replace the whole buffer.
    fn set_text(&mut self, text: &str) -> ContentChange;

    /// Whole buffer as a string.
    fn text(&self) -> String {
        self.text_range(0, self.char_count()).unwrap_or_default()
    }

    /// `true` if `offset` falls strictly inside a multi-char delimiter.
    fn is_inside_delimiter(&self, offset: usize) -> bool {
        let Ok(line) = self.line_at_offset(offset) else {
            return false;
        };
        let (Ok(start), Ok(len), Ok(delim)) = (
            self.offset_at_line(line),
            self.line_len(line),
            self.line_delimiter(line),
        ) else {
            return false;
        };
        let delim_start = start + len;
        offset > delim_start && offset < delim_start + delim.len()
    }

    /// Check that `offset` may hold a caret or selection endpoint.
    fn validate_caret_offset(&self, offset: usize) -> Result<()> {
        if offset > self.char_count() {
            return Err(EditError::range(format!(
                "offset {offset} beyond char count {}",
                self.char_count()
            )));
        }
        if self.is_inside_delimiter(offset) {
            return Err(EditError::argument(format!(
                "offset {offset} is inside a line delimiter"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backward_delete() {
        let event = TextChangeEvent::normalize(10, 0, -3, 0, 0, 0).unwrap();
        assert_eq!(event.start, 7);
        assert_eq!(event.replace_char_count, 3);
        assert_eq!(event.char_delta(), -3);
    }

    #[test]
    fn rejects_backward_delete_past_start() {
        let err = TextChangeEvent::normalize(2, 0, -3, 0, 0, 0).unwrap_err();
        assert!(matches!(err, EditError::InvalidRange(_)));
    }

    #[test]
    fn forward_counts_pass_through() {
        let event = TextChangeEvent::normalize(4, 1, 2, 1, 5, 0).unwrap();
        assert_eq!(event.start, 4);
        assert_eq!(event.line_delta(), -1);
        assert_eq!(event.new_end(), 9);
        assert_eq!(event.replaced_end(), 6);
    }
}
