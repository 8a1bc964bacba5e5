//! Font metrics for text measurement.
//!
//! Widths are kept per character in font units. They come either from the
//! loaded TrueType file (via `ttf-parser`) or, for the builtin Helvetica
//! faces, from the Adobe Font Metrics tables below.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Millimetres per typographic point.
pub const PT_TO_MM: f32 = 0.352_777_78;

/// Character widths for one font face
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Character widths in font units
    widths: HashMap<char, u16>,
    /// Width used for characters missing from the table
    default_width: u16,
    /// Units per em (1000 for Type1, usually 1000/2048 for TrueType)
    pub units_per_em: u16,
}

impl FontMetrics {
    /// Get the width of a character in font units
    pub fn char_width(&self, c: char) -> u16 {
        *self.widths.get(&c).unwrap_or(&self.default_width)
    }

    /// Get the width of a string in points
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let total_units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        (total_units as f32 / self.units_per_em as f32) * font_size
    }

    /// Get the width of a string in millimetres
    pub fn string_width_mm(&self, text: &str, font_size: f32) -> f32 {
        self.string_width(text, font_size) * PT_TO_MM
    }

    /// Build metrics from a TrueType/OpenType font file.
    pub fn from_ttf(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let advance = |c: char| {
            face.glyph_index(c)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
        };

        let mut widths = HashMap::new();
        for c in TTF_RANGES.iter().flat_map(|r| r.clone()) {
            if let Some(w) = advance(c) {
                widths.insert(c, w);
            }
        }

        let units_per_em = face.units_per_em();
        let default_width = advance('?').unwrap_or(units_per_em / 2);

        Ok(FontMetrics {
            widths,
            default_width,
            units_per_em,
        })
    }

    fn from_ascii_table(table: &[u16; 95]) -> Self {
        let widths = (' '..='~').zip(table.iter().copied()).collect();
        FontMetrics {
            widths,
            default_width: 556,
            units_per_em: 1000,
        }
    }
}

/// Character ranges measured when loading a TrueType font.
const TTF_RANGES: [std::ops::RangeInclusive<char>; 3] = [
    ' '..='~',
    '\u{A0}'..='\u{17F}',
    '\u{2010}'..='\u{2044}',
];

// ============================================================================
// HELVETICA METRICS
// ============================================================================

// Adobe Font Metrics widths for ' '..='~', in 1/1000 em
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

static HELVETICA: OnceLock<FontMetrics> = OnceLock::new();
static HELVETICA_BOLD: OnceLock<FontMetrics> = OnceLock::new();

pub fn helvetica() -> &'static FontMetrics {
    HELVETICA.get_or_init(|| FontMetrics::from_ascii_table(&HELVETICA_WIDTHS))
}

pub fn helvetica_bold() -> &'static FontMetrics {
    HELVETICA_BOLD.get_or_init(|| FontMetrics::from_ascii_table(&HELVETICA_BOLD_WIDTHS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_width() {
        let metrics = helvetica();

        // "Hello" at 12pt
        let width = metrics.string_width("Hello", 12.0);
        // H=722, e=556, l=222, l=222, o=556 = 2278 units
        // 2278/1000 * 12 = 27.336
        assert!((width - 27.336).abs() < 0.01);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = helvetica().string_width("DEPARTURE", 10.0);
        let bold = helvetica_bold().string_width("DEPARTURE", 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_width_in_mm() {
        // 278/1000 * 10pt = 2.78pt
        let w = helvetica().string_width_mm(" ", 10.0);
        assert!((w - 2.78 * PT_TO_MM).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_char_uses_default() {
        assert_eq!(helvetica().char_width('\u{4E2D}'), 556);
    }

    #[test]
    fn test_garbage_is_not_a_font() {
        assert!(FontMetrics::from_ttf(b"definitely not a font").is_err());
    }
}
