//! Error types for the editing core.

use thiserror::Error;

/// Result type for editing operations.
pub type Result<T> = std::result::Result<T, EditError>;

/// Errors raised at the API boundary, before any state is mutated.
///
/// None of these are retryable: they signal a caller bug (an offset that was
/// never valid for the current buffer, or malformed range data).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Offset, length or line index outside the buffer, or start > end.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Offset inside a multi-character line delimiter, or malformed
    /// style/segment data.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EditError {
    pub(crate) fn range(msg: impl Into<String>) -> Self {
        EditError::InvalidRange(msg.into())
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        EditError::InvalidArgument(msg.into())
    }
}
