/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::EditorConfig::load();

    println!("=== rune-edit configuration ===\n");

    println!("Editor:");
    println!("  Word wrap: {}", config.editor.word_wrap);
    println!("  Orientation: {:?}", config.editor.orientation);
    println!("  Recalc max eagerly: {}", config.editor.recalc_max_eagerly);
    println!("  Line height: {:?}", config.editor.line_height);
    println!("  Caret width: {}", config.editor.caret_width);
    println!();

    println!("Viewport:");
    println!(
        "  Client: {}x{}",
        config.viewport.client_width, config.viewport.client_height
    );
    println!();

    println!("Measure:");
    println!("  Char advance: {}", config.measure.char_advance);
    println!("  Bold extra: {}", config.measure.bold_extra);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
