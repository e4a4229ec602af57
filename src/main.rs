//! Scripted editing session against the editing core.
//!
//! Loads `rune-edit.toml` (plus `RUNE_EDIT_*` overrides), builds a view over a
//! fixed-advance measurer and logs every redraw step the session produces.
//! Run with `RUST_LOG=debug` to see the core's own planning decisions.

use anyhow::Result;
use log::info;
use rune_config::EditorConfig;
use rune_textedit::{
    CaretMove, Color, DefaultContent, DrawService, EditorView, LineDraw, MonospaceMeasurer,
    PixelRect, StyleRun, TextStyle, ViewEvent, ViewOptions, ViewUpdate,
};

const SAMPLE: &str = "The quick brown fox\r\njumps over the lazy dog.\n\
abc \u{5d3}\u{5d2}\u{5d4} xyz\nmixed line endings\rand a last line";

/// Draw service that logs what it is asked to do.
#[derive(Default)]
struct LogSurface {
    lines_drawn: usize,
}

impl DrawService for LogSurface {
    fn draw_line(&mut self, line: &LineDraw<'_>) {
        self.lines_drawn += 1;
        info!(
            "  draw line {} at y={} x={} {:?} selection={:?} background={:?}",
            line.index, line.y, line.x, line.text, line.selection, line.background
        );
    }

    fn blit(&mut self, source_y: f32, dest_y: f32, height: f32) {
        info!("  blit y {source_y} -> {dest_y} ({height}px)");
    }

    fn blit_horizontal(&mut self, source_x: f32, dest_x: f32, width: f32) {
        info!("  blit x {source_x} -> {dest_x} ({width}px)");
    }

    fn clear(&mut self, rect: PixelRect) {
        info!(
            "  clear {}x{} at ({}, {})",
            rect.width, rect.height, rect.x, rect.y
        );
    }
}

fn report(step: &str, view: &EditorView, update: &ViewUpdate, surface: &mut LogSurface) {
    info!("{step}");
    for event in &update.events {
        match event {
            ViewEvent::Content(change) => info!("  content: {change:?}"),
            ViewEvent::Selection(change) => {
                info!("  selection: {:?} -> {:?}", change.old, change.new)
            }
            ViewEvent::Scroll(change) => info!(
                "  scroll: ({}, {}) -> ({}, {})",
                change.old_horizontal,
                change.old_vertical,
                change.new_horizontal,
                change.new_vertical
            ),
        }
    }
    view.execute(&update.plan, surface);
}

fn main() -> Result<()> {
    env_logger::init();

    let config = EditorConfig::load();
    let line_height = config
        .editor
        .line_height
        .unwrap_or(config.measure.char_advance * 2.0);
    let measurer = MonospaceMeasurer::new(config.measure.char_advance, line_height)
        .with_bold_extra(config.measure.bold_extra);
    let options = ViewOptions::from(&config);
    info!("options: {options:?}");

    let mut view = EditorView::new(DefaultContent::new(SAMPLE), measurer, options)?;
    let mut surface = LogSurface::default();

    let update = view.set_text(SAMPLE)?;
    report("initial paint", &view, &update, &mut surface);

    let update = view.replace_text_range(4, 5, "slow")?;
    report("replace \"quick\" with \"slow\"", &view, &update, &mut surface);

    let update = view.replace_text_range(0, 0, "Title\n")?;
    report("insert a line at the top", &view, &update, &mut surface);

    let update = view.set_style_range(StyleRun::new(0, 5, TextStyle::bold()))?;
    report("bold the title", &view, &update, &mut surface);

    let update = view.set_line_background(1, 1, Some(Color::rgb(255, 255, 200)))?;
    report("highlight line 1", &view, &update, &mut surface);

    let update = view.set_caret_offset(6)?;
    report("caret to line 1", &view, &update, &mut surface);
    for _ in 0..3 {
        let update = view.move_caret(CaretMove::WordNext, true);
        report("extend by word", &view, &update, &mut surface);
    }
    let update = view.move_caret(CaretMove::LineDown, true);
    report("extend down a line", &view, &update, &mut surface);

    let update = view.move_caret(CaretMove::DocumentEnd, false);
    report("caret to document end", &view, &update, &mut surface);

    let update = view.set_word_wrap(!view.is_word_wrap())?;
    report("toggle word wrap", &view, &update, &mut surface);

    let update = view.resize(120.0, 48.0)?;
    report("shrink the client area", &view, &update, &mut surface);

    let update = view.set_top_index(2);
    report("scroll to line 2", &view, &update, &mut surface);

    info!(
        "done: {} visual lines, {} draw_line calls, selection {:?}",
        view.line_count(),
        surface.lines_drawn,
        view.selection()
    );
    Ok(())
}
