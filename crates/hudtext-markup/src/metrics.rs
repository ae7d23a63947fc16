//! Layout constants and per-character advance widths.
//!
//! The hint surface renders with a proportional font whose exact glyph
//! table is not available to us, so widths are approximated: each character
//! gets an advance expressed as a fraction of the font size (an "em"
//! fraction), scaled by its Unicode display width so that wide glyphs count
//! double and zero-width characters count for nothing.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

/// Default font size of the hint surface, in pixels.
pub const DEFAULT_SIZE: f32 = 34.7;

/// Default line height of the hint surface, in pixels.
pub const DEFAULT_LINE_HEIGHT: f32 = 40.665;

/// Pixels per `em` unit.
pub const EMS_TO_PIXELS: f32 = 34.7;

/// Usable width of a single line, in pixels.
pub const DISPLAY_WIDTH: f32 = 1200.0;

/// Size of a small-caps capital relative to the current font size.
pub const SMALLCAPS_RATIO: f32 = 0.8;

/// Measurement constants threaded through a compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    /// Font size used when no `<size>` scope is open, and the base for `%` sizes.
    pub default_size: f32,
    /// Line height used when no `<line-height>` is set, and the base for `%` heights.
    pub default_line_height: f32,
    /// Conversion factor for `em` measurements.
    pub ems_to_pixels: f32,
    /// Usable line width; lines wider than this wrap or overflow.
    pub display_width: f32,
    /// Scale applied to lowercase letters rendered as small capitals.
    pub smallcaps_ratio: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_SIZE,
            default_line_height: DEFAULT_LINE_HEIGHT,
            ems_to_pixels: EMS_TO_PIXELS,
            display_width: DISPLAY_WIDTH,
            smallcaps_ratio: SMALLCAPS_RATIO,
        }
    }
}

/// Returns the advance of `c` as a fraction of the font size.
pub fn advance(c: char) -> f32 {
    let columns = c.width().unwrap_or(0) as f32;

    let em = match c {
        ' ' => 0.25,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' | '`' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '"' | '-' => 0.38,
        'm' | 'w' | 'M' | 'W' | '@' => 0.85,
        c if c.is_ascii_uppercase() || c.is_ascii_digit() => 0.62,
        _ => 0.52,
    };

    em * columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_is_narrower_than_letters() {
        assert!(advance(' ') < advance('a'));
        assert!(advance('a') < advance('M'));
    }

    #[test]
    fn wide_glyphs_count_double() {
        assert_eq!(advance('漢'), 0.52 * 2.0);
    }

    #[test]
    fn zero_width_characters_have_no_advance() {
        assert_eq!(advance('\u{200B}'), 0.0);
    }

    #[test]
    fn defaults_match_constants() {
        let metrics = LayoutMetrics::default();
        assert_eq!(metrics.default_size, DEFAULT_SIZE);
        assert_eq!(metrics.display_width, DISPLAY_WIDTH);
    }
}
