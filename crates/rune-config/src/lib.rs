//! rune-edit configuration
//!
//! Settings are read from `rune-edit.toml` and may be overridden through
//! `RUNE_EDIT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "rune-edit.toml";

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Layout and caret behavior
    pub editor: EditorSection,
    /// Initial client area
    pub viewport: ViewportSection,
    /// Fixed-advance measurement used by the driver
    pub measure: MeasureSection,
}

/// Paragraph base direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Ltr,
    Rtl,
    /// Taken from the first strong char of each line.
    Auto,
}

impl Orientation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ltr" => Some(Orientation::Ltr),
            "rtl" => Some(Orientation::Rtl),
            "auto" => Some(Orientation::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSection {
    /// Wrap lines at the client width
    pub word_wrap: bool,
    pub orientation: Orientation,
    /// Rebuild the widest-line record as soon as it is invalidated instead of
    /// on the next measurement
    pub recalc_max_eagerly: bool,
    /// Line height in pixels; the measurement service decides when unset
    pub line_height: Option<f32>,
    /// Caret width in pixels
    pub caret_width: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportSection {
    pub client_width: f32,
    pub client_height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasureSection {
    /// Advance of every char in pixels
    pub char_advance: f32,
    /// Extra advance of bold chars
    pub bold_extra: f32,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            word_wrap: false,
            orientation: Orientation::Ltr,
            recalc_max_eagerly: false,
            line_height: None,
            caret_width: 1.0,
        }
    }
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            client_width: 640.0,
            client_height: 480.0,
        }
    }
}

impl Default for MeasureSection {
    fn default() -> Self {
        Self {
            char_advance: 8.0,
            bold_extra: 1.0,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl EditorConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `rune-edit.toml` from the current directory, or the defaults if
    /// it is missing or unreadable
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Apply environment overrides; they take precedence over the file.
    /// Unparsable values are ignored.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RUNE_EDIT_WORD_WRAP") {
            self.editor.word_wrap = parse_flag(&val);
        }
        let orientation = lookup("RUNE_EDIT_ORIENTATION").and_then(|v| Orientation::parse(&v));
        if let Some(orientation) = orientation {
            self.editor.orientation = orientation;
        }
        let number = |key: &str| lookup(key).and_then(|v| v.parse::<f32>().ok());
        if let Some(height) = number("RUNE_EDIT_LINE_HEIGHT") {
            self.editor.line_height = Some(height);
        }
        if let Some(width) = number("RUNE_EDIT_CLIENT_WIDTH") {
            self.viewport.client_width = width;
        }
        if let Some(height) = number("RUNE_EDIT_CLIENT_HEIGHT") {
            self.viewport.client_height = height;
        }
        if let Some(advance) = number("RUNE_EDIT_CHAR_ADVANCE") {
            self.measure.char_advance = advance;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune-edit.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
