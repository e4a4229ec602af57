//! Bidirectional text support built on `unicode-bidi`.
//!
//! - Per-char embedding levels and base direction detection
//! - Visual reordering into direction-consistent runs
//! - Caret placement and movement that follow visual adjacency

pub mod levels;
pub mod reorder;
pub mod segmenter;

pub use levels::{BaseDirection, has_rtl, is_rtl_char, levels_per_char};
pub use reorder::{BidiRun, group_runs, visual_index_map};
pub use segmenter::{BidiSegmentProvider, BidiSegmenter, validate_segments};
