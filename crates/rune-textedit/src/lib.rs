//! rune-textedit: editing core for a styled, multi-line text widget.
//!
//! - content: line-indexed text buffer and change events
//! - layout: width cache (unwrapped) and visual line table (word wrap)
//! - bidi: per-line direction analysis and visual caret movement
//! - selection: caret and anchor/focus selection state machine
//! - redraw / scroll: minimal repaint planning against the viewport
//! - view: the `EditorView` state struct tying it all together
//!
//! All public offsets are char offsets into the buffer. Glyph shaping and
//! painting are delegated to the host through [`MeasurementService`] and
//! [`DrawService`].

pub mod bidi;
pub mod content;
pub mod error;
pub mod layout;
pub mod measure;
pub mod redraw;
pub mod scroll;
pub mod selection;
pub mod style;
pub mod unicode;
pub mod view;

pub use bidi::{BaseDirection, BidiSegmentProvider, BidiSegmenter};
pub use content::{ContentChange, DefaultContent, LineDelimiter, TextChangeEvent, TextContent};
pub use error::{EditError, Result};
pub use layout::{LineMetrics, VisualLine, WidthCache, WrapCache};
pub use measure::{DrawService, LineDraw, MeasurementService, MonospaceMeasurer, PixelRect};
pub use redraw::{ChangeExtent, RedrawOp, RedrawPlan, RedrawPlanner};
pub use scroll::{ScrollChange, ScrollCoordinator, Viewport};
pub use selection::{
    Caret, CaretDirection, CaretMove, Selection, SelectionChange, SelectionController,
    SelectionState,
};
pub use style::{
    BackgroundSource, Color, LineBackgroundProvider, StyleProvider, StyleRun, StyleSource,
    TextStyle,
};
pub use view::{EditorView, ViewEvent, ViewOptions, ViewUpdate};
