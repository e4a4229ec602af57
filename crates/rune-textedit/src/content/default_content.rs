use log::trace;

use super::{ContentChange, LineDelimiter, PrefixSums, TextChangeEvent, TextContent};
use crate::error::{EditError, Result};
use crate::unicode::{byte_offset, char_len};

#[derive(Debug, Clone, Default)]
struct Line {
    text: String,
    len: usize,
    delimiter: LineDelimiter,
}

impl Line {
    fn new(text: String, delimiter: LineDelimiter) -> Self {
        let len = char_len(&text);
        Self {
            text,
            len,
            delimiter,
        }
    }

    fn full_len(&self) -> usize {
        self.len + self.delimiter.len()
    }
}

/// Split `text` into lines on `\n`, `\r\n` and `\r`.
///
/// Always yields at least one line; the last line has no delimiter.
fn split_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let delimiter = match ch {
            '\n' => LineDelimiter::Lf,
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                LineDelimiter::CrLf
            }
            '\r' => LineDelimiter::Cr,
            _ => {
                current.push(ch);
                continue;
            }
        };
        lines.push(Line::new(std::mem::take(&mut current), delimiter));
    }
    lines.push(Line::new(current, LineDelimiter::None));
    lines
}

/// Built-in [`TextContent`]: one `String` per line plus a prefix-sum index of
/// line starts.
#[derive(Debug, Clone)]
pub struct DefaultContent {
    lines: Vec<Line>,
    starts: PrefixSums,
    char_count: usize,
}

impl Default for DefaultContent {
    fn default() -> Self {
        Self::new("")
    }
}

impl DefaultContent {
    pub fn new(text: &str) -> Self {
        let lines = split_lines(text);
        let starts = PrefixSums::from_lengths(lines.iter().map(Line::full_len));
        let char_count = lines.iter().map(Line::full_len).sum();
        Self {
            lines,
            starts,
            char_count,
        }
    }

    fn check_line(&self, line: usize) -> Result<&Line> {
        self.lines.get(line).ok_or_else(|| {
            EditError::range(format!(
                "line {line} out of bounds ({} lines)",
                self.lines.len()
            ))
        })
    }

    fn line_start(&self, line: usize) -> usize {
        self.starts.start_of(line).unwrap_or(self.char_count)
    }

    /// First char that would follow the insertion point once `text` is in
    /// place, looking through the rest of the edited line and its delimiter.
    fn first_char_after_start(&self, text: &str, end_line: usize, end_in_line: usize) -> Option<char> {
        if let Some(ch) = text.chars().next() {
            return Some(ch);
        }
        let line = &self.lines[end_line];
        line.text
            .chars()
            .nth(end_in_line)
            .or_else(|| line.delimiter.as_str().chars().next())
    }
}

impl TextContent for DefaultContent {
    fn char_count(&self) -> usize {
        self.char_count
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_at_offset(&self, offset: usize) -> Result<usize> {
        if offset > self.char_count {
            return Err(EditError::range(format!(
                "offset {offset} beyond char count {}",
                self.char_count
            )));
        }
        Ok(self.starts.line_at(offset))
    }

    fn offset_at_line(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        Ok(self.line_start(line))
    }

    fn line(&self, line: usize) -> Result<&str> {
        Ok(&self.check_line(line)?.text)
    }

    fn line_len(&self, line: usize) -> Result<usize> {
        Ok(self.check_line(line)?.len)
    }

    fn line_delimiter(&self, line: usize) -> Result<LineDelimiter> {
        Ok(self.check_line(line)?.delimiter)
    }

    fn text_range(&self, start: usize, length: usize) -> Result<String> {
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.char_count)
            .ok_or_else(|| {
                EditError::range(format!(
                    "range {start}+{length} beyond char count {}",
                    self.char_count
                ))
            })?;
        let mut out = String::new();
        if length == 0 {
            return Ok(out);
        }
        let mut line = self.starts.line_at(start);
        let mut offset = start;
        while offset < end && line < self.lines.len() {
            let line_start = self.line_start(line);
            let data = &self.lines[line];
            let from = offset - line_start;
            let to = (end - line_start).min(data.full_len());
            for ch in data
                .text
                .chars()
                .chain(data.delimiter.as_str().chars())
                .skip(from)
                .take(to - from)
            {
                out.push(ch);
            }
            offset = line_start + to;
            line += 1;
        }
        Ok(out)
    }

    fn replace_range(
        &mut self,
        start: usize,
        length: usize,
        text: &str,
    ) -> Result<TextChangeEvent> {
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.char_count)
            .ok_or_else(|| {
                EditError::range(format!(
                    "replace {start}+{length} beyond char count {}",
                    self.char_count
                ))
            })?;
        for offset in [start, end] {
            if self.is_inside_delimiter(offset) {
                return Err(EditError::argument(format!(
                    "replace boundary {offset} splits a line delimiter"
                )));
            }
        }

        let start_line = self.starts.line_at(start);
        let end_line = self.starts.line_at(end);
        let start_in_line = start - self.line_start(start_line);
        let end_in_line = end - self.line_start(end_line);

        if start_in_line == 0
            && start_line > 0
            && self.lines[start_line - 1].delimiter == LineDelimiter::Cr
            && self.first_char_after_start(text, end_line, end_in_line) == Some('\n')
        {
            return Err(EditError::argument(format!(
                "replace at {start} would fuse a carriage return with a line feed"
            )));
        }

        let first = &self.lines[start_line];
        let last = &self.lines[end_line];
        let mut region = String::with_capacity(first.text.len() + text.len() + last.text.len());
        region.push_str(&first.text[..byte_offset(&first.text, start_in_line)]);
        region.push_str(text);
        region.push_str(&last.text[byte_offset(&last.text, end_in_line)..]);
        region.push_str(last.delimiter.as_str());
        let closes_with_delimiter = !last.delimiter.is_empty();

        let mut replacement = split_lines(&region);
        if closes_with_delimiter {
            // The trailing piece is the start of the line after `end_line`.
            replacement.pop();
        }

        let replace_line_count = end_line - start_line;
        let new_line_count = replacement.len() - 1;
        let new_char_count = char_len(text);

        self.lines.splice(start_line..=end_line, replacement);
        self.starts
            .rebuild_from(start_line, self.lines[start_line..].iter().map(Line::full_len));
        self.char_count = self.char_count - length + new_char_count;

        trace!(
            "replace_range start={start} len={length} inserted={new_char_count} lines -{replace_line_count}/+{new_line_count}"
        );

        Ok(TextChangeEvent {
            start,
            start_line,
            replace_char_count: length,
            replace_line_count,
            new_char_count,
            new_line_count,
        })
    }

    fn set_text(&mut self, text: &str) -> ContentChange {
        *self = Self::new(text);
        ContentChange::Reset {
            line_count: self.lines.len(),
            char_count: self.char_count,
        }
    }
}
