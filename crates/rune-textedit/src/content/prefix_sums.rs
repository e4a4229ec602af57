/// Prefix sums of line lengths for O(log n) offset→line and O(1)
/// line→offset lookups.
///
/// Each entry is the char offset at which a line starts. Lengths include the
/// line delimiter so the next line starts right after it.
#[derive(Debug, Clone, Default)]
pub struct PrefixSums {
    starts: Vec<usize>,
}

impl PrefixSums {
    /// Build from per-line lengths (delimiter included).
    pub fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let mut starts = Vec::new();
        let mut cursor = 0usize;
        for len in lengths {
            starts.push(cursor);
            cursor += len;
        }
        Self { starts }
    }

    /// Recompute starts from `first` onwards after the lines at and after
    /// `first` changed. Entries before `first` are kept.
    pub fn rebuild_from(&mut self, first: usize, lengths: impl IntoIterator<Item = usize>) {
        let mut cursor = if first == 0 {
            0
        } else {
            self.starts.get(first).copied().unwrap_or(0)
        };
        self.starts.truncate(first);
        for len in lengths {
            self.starts.push(cursor);
            cursor += len;
        }
    }

    /// Index of the line containing `offset`.
    ///
    /// An offset equal to a line start belongs to that line.
    pub fn line_at(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Char offset at the start of `line`.
    pub fn start_of(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_lines() {
        let sums = PrefixSums::from_lengths([4, 1, 3]);
        assert_eq!(sums.start_of(0), Some(0));
        assert_eq!(sums.start_of(1), Some(4));
        assert_eq!(sums.start_of(2), Some(5));
        assert_eq!(sums.line_at(0), 0);
        assert_eq!(sums.line_at(3), 0);
        assert_eq!(sums.line_at(4), 1);
        assert_eq!(sums.line_at(5), 2);
        assert_eq!(sums.line_at(99), 2);
    }

    #[test]
    fn rebuild_keeps_prefix() {
        let mut sums = PrefixSums::from_lengths([4, 1, 3]);
        sums.rebuild_from(1, [2, 2, 2]);
        assert_eq!(sums.len(), 4);
        assert_eq!(sums.start_of(1), Some(4));
        assert_eq!(sums.start_of(3), Some(8));
    }
}
