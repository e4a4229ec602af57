use unicode_bidi::{BidiClass, BidiInfo, LTR_LEVEL, Level, RTL_LEVEL, bidi_class};

/// Base direction hint for paragraph analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseDirection {
    /// Detect paragraph base direction from text (first strong char).
    Auto,
    /// Force overall left-to-right base direction.
    #[default]
    Ltr,
    /// Force overall right-to-left base direction.
    Rtl,
}

impl BaseDirection {
    pub fn to_level(self) -> Option<Level> {
        match self {
            BaseDirection::Auto => None,
            BaseDirection::Ltr => Some(LTR_LEVEL),
            BaseDirection::Rtl => Some(RTL_LEVEL),
        }
    }

    /// Resolve `Auto` against `text`; explicit directions pass through.
    pub fn resolve(self, text: &str) -> BaseDirection {
        match self {
            BaseDirection::Auto => {
                let info = BidiInfo::new(text, None);
                match info.paragraphs.first() {
                    Some(para) if para.level.is_rtl() => BaseDirection::Rtl,
                    _ => BaseDirection::Ltr,
                }
            }
            other => other,
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, BaseDirection::Rtl)
    }
}

/// Whether `ch` is a strong or embedding right-to-left char.
pub fn is_rtl_char(ch: char) -> bool {
    matches!(
        bidi_class(ch),
        BidiClass::R | BidiClass::AL | BidiClass::RLE | BidiClass::RLO | BidiClass::RLI
    )
}

/// Cheap test for whether a line needs bidi treatment at all.
pub fn has_rtl(text: &str) -> bool {
    text.chars().any(is_rtl_char)
}

/// Embedding level of each char of `text` (UAX-9 via `unicode-bidi`).
///
/// `unicode-bidi` reports levels per byte; multi-byte chars collapse to one
/// entry here so the result is indexed by char offset.
pub fn levels_per_char(text: &str, base: BaseDirection) -> Vec<Level> {
    let info = BidiInfo::new(text, base.to_level());
    text.char_indices()
        .map(|(byte_idx, _)| info.levels[byte_idx])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_auto_direction() {
        assert_eq!(BaseDirection::Auto.resolve("אבג abc"), BaseDirection::Rtl);
        assert_eq!(BaseDirection::Auto.resolve("abc אבג"), BaseDirection::Ltr);
        assert_eq!(BaseDirection::Ltr.resolve("אבג"), BaseDirection::Ltr);
    }

    #[test]
    fn levels_are_per_char() {
        let text = "a אב";
        let levels = levels_per_char(text, BaseDirection::Ltr);
        assert_eq!(levels.len(), 4);
        assert!(levels[0].is_ltr());
        assert!(levels[2].is_rtl());
        assert!(levels[3].is_rtl());
    }

    #[test]
    fn detects_rtl_chars() {
        assert!(has_rtl("abc דגה"));
        assert!(has_rtl("سلام"));
        assert!(!has_rtl("plain 123"));
    }
}
