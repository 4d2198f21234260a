//! Named pattern matchers for the extraction heuristics.
//!
//! Each waybill heuristic (order id, SKU start, xN multiplier, bare
//! integer, trailing digits) gets its own matcher returning a structured
//! match, so the edge cases of every rule are testable on their own.

use regex::Regex;

/// The compiled pattern set. Built once per extraction run.
pub struct Patterns {
    order_id: Regex,
    sku_start: Regex,
    x_multiplier: Regex,
    bare_integer: Regex,
    trailing_digits: Regex,
}

/// A trailing run of digits at the end of an SKU part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingDigits {
    pub value: u32,
    pub digit_len: usize,
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            order_id: Regex::new(r"(?i)Order ID:\s*(\d+)").expect("hard-coded pattern compiles"),
            sku_start: Regex::new(r"(?i)C[ _][A-Z0-9_/\-\s]+").expect("hard-coded pattern compiles"),
            x_multiplier: Regex::new(r"(?i)x(\d+)").expect("hard-coded pattern compiles"),
            bare_integer: Regex::new(r"^\d+$").expect("hard-coded pattern compiles"),
            trailing_digits: Regex::new(r"(\d+)$").expect("hard-coded pattern compiles"),
        }
    }

    /// First `Order ID: <digits>` occurrence in a page's text.
    pub fn find_order_id(&self, text: &str) -> Option<String> {
        self.order_id
            .captures(text)
            .map(|c| c[1].to_string())
    }

    /// Whether a word token opens an SKU candidate span. The pattern may
    /// match anywhere inside the token, not just at its start.
    pub fn is_sku_start(&self, word: &str) -> bool {
        self.sku_start.is_match(word)
    }

    /// Inline `xN` multiplier inside joined span text. Returns the value of
    /// the first occurrence and the text with every occurrence removed.
    /// A value that does not fit a u32 leaves the text untouched and the
    /// multiplier at its previous value, mirroring the lenient parse.
    pub fn take_x_multiplier(&self, text: &str) -> Option<(u32, String)> {
        let caps = self.x_multiplier.captures(text)?;
        let value: u32 = caps[1].parse().ok()?;
        let stripped = self.x_multiplier.replace_all(text, "").trim().to_string();
        Some((value, stripped))
    }

    /// `xN` value inside a standalone token (external multiplier search).
    pub fn x_multiplier_value(&self, word: &str) -> Option<u32> {
        self.x_multiplier
            .captures(word.trim())
            .and_then(|c| c[1].parse().ok())
    }

    /// A token that is nothing but digits. Values too large for a u32
    /// are treated as no match.
    pub fn bare_integer(&self, word: &str) -> Option<u32> {
        let trimmed = word.trim();
        if self.bare_integer.is_match(trimmed) {
            trimmed.parse().ok()
        } else {
            None
        }
    }

    /// Whether a token looks like a bare integer at all, regardless of
    /// whether its value fits. Used when deciding what a span may absorb.
    pub fn is_bare_integer(&self, word: &str) -> bool {
        self.bare_integer.is_match(word.trim())
    }

    /// Digit run at the end of an SKU part, e.g. the `2` in `BWL2`.
    pub fn trailing_digits(&self, text: &str) -> Option<TrailingDigits> {
        let caps = self.trailing_digits.captures(text)?;
        let digits = &caps[1];
        let value: u32 = digits.parse().ok()?;
        Some(TrailingDigits {
            value,
            digit_len: digits.len(),
        })
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}
