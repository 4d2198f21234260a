//! Heuristic text measurement for the built-in Helvetica face.
//!
//! No font file is consulted; widths come from a per-glyph em-width class
//! table. That is accurate enough to size stamp boxes and wrap summary
//! lines, and it keeps the layout engine free of rasterizer dependencies.
//! Callers treat a measurement failure as non-fatal and substitute a
//! default width.

use anyhow::{anyhow, Result};

/// Line height factor for body lines.
pub const LINE_SPACING: f32 = 1.4;

/// Line height factor for report titles.
pub const TITLE_SPACING: f32 = 1.8;

/// Rendered width of `text` at `font_size` points.
pub fn text_width(text: &str, font_size: f32) -> Result<f32> {
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(anyhow!("invalid font size: {}", font_size));
    }
    let em_sum: f32 = text.chars().map(glyph_em_width).sum();
    Ok(em_sum * font_size)
}

/// Approximate Helvetica advance width in em units, by glyph class.
fn glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.28,
        'i' | 'l' | 'j' | '!' | '|' | '\'' => 0.22,
        'I' => 0.28,
        '.' | ',' | ':' | ';' | '`' => 0.28,
        'f' | 't' | 'r' => 0.33,
        '-' | '_' => 0.33,
        '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' => 0.33,
        'm' | 'M' | 'w' | 'W' | '@' | '%' | '&' | '#' => 0.85,
        '\u{25CF}' => 0.80, // the bullet glyph
        c if c.is_ascii_digit() => 0.56,
        c if c.is_ascii_uppercase() => 0.70,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.28,
        c if c.is_ascii_punctuation() => 0.45,
        _ => 0.60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero_wide() {
        assert_eq!(text_width("", 12.0).unwrap(), 0.0);
    }

    #[test]
    fn test_width_grows_with_text_and_size() {
        let short = text_width("BWL", 12.0).unwrap();
        let long = text_width("BWL (x10)", 12.0).unwrap();
        assert!(long > short);
        let big = text_width("BWL", 24.0).unwrap();
        assert!((big - short * 2.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_font_size_is_an_error() {
        assert!(text_width("BWL", 0.0).is_err());
        assert!(text_width("BWL", f32::NAN).is_err());
    }
}
