/// Which neighbour the caret was last moved toward.
///
/// An offset between two runs of opposite direction, or at the seam between
/// a wrapped visual line and the next, has two screen positions. `Forward`
/// keeps the caret attached to the char before the offset, `Backward` to the
/// char after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaretDirection {
    Forward,
    #[default]
    Backward,
}

/// Caret state owned by the selection controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Caret {
    /// Char offset in the buffer.
    pub offset: usize,
    /// Logical line containing `offset`.
    pub line: usize,
    /// Horizontal pixel remembered for vertical navigation. Cleared by any
    /// horizontal move.
    pub column_x: Option<f32>,
    pub direction: CaretDirection,
}

impl Caret {
    pub fn new(offset: usize, line: usize) -> Self {
        Self {
            offset,
            line,
            column_x: None,
            direction: CaretDirection::default(),
        }
    }

    pub fn with_direction(mut self, direction: CaretDirection) -> Self {
        self.direction = direction;
        self
    }
}

impl Default for Caret {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_caret_has_no_column_and_backward_direction() {
        let caret = Caret::new(4, 1);
        assert_eq!(caret.offset, 4);
        assert_eq!(caret.line, 1);
        assert_eq!(caret.column_x, None);
        assert_eq!(caret.direction, CaretDirection::Backward);
        let caret = caret.with_direction(CaretDirection::Forward);
        assert_eq!(caret.direction, CaretDirection::Forward);
    }
}
