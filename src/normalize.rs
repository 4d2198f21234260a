//! SKU text normalization.
//!
//! Transforms the joined span text (after inline `xN` stripping) plus the
//! raw resolved quantity into zero or more `(sku, quantity)` pairs. The
//! rules are order-dependent: prefix strip, whitespace collapse, separator
//! split, trailing-digit multiplier, B1T1 doubling, alias lookup.

use crate::patterns::Patterns;

/// Apply the full transform chain. `raw_quantity` is the base quantity
/// already multiplied by any `xN` multipliers; each sub-part produced by a
/// `/` or `+` split inherits it as its own starting multiplier.
pub fn normalize_span(
    text: &str,
    raw_quantity: u32,
    patterns: &Patterns,
    aliases: &[(String, String)],
) -> Vec<(String, u32)> {
    let mut processed = text.to_string();
    if let Some(rest) = processed.strip_prefix("C_") {
        processed = rest.to_string();
    } else if let Some(rest) = processed.strip_prefix("C ") {
        processed = rest.to_string();
    }
    let processed = collapse_whitespace(&processed);

    if processed.contains('/') || processed.contains('+') {
        processed
            .split(|c| c == '/' || c == '+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| finish_part(part, raw_quantity, patterns, aliases))
            .collect()
    } else {
        finish_part(&processed, raw_quantity, patterns, aliases)
            .into_iter()
            .collect()
    }
}

/// Trailing-digit multiplier, B1T1 doubling and alias lookup for one
/// (sub-)part. Returns None when the part normalizes to an empty SKU or a
/// zero quantity; nothing downstream wants those records.
fn finish_part(
    part: &str,
    raw_quantity: u32,
    patterns: &Patterns,
    aliases: &[(String, String)],
) -> Option<(String, u32)> {
    let stripped = part.trim();
    let mut quantity = raw_quantity;

    let mut sku = match patterns.trailing_digits(stripped) {
        Some(trailing) => {
            quantity = quantity.saturating_mul(trailing.value);
            stripped[..stripped.len() - trailing.digit_len]
                .trim_matches(|c| c == '_' || c == '-')
                .to_string()
        }
        None => stripped.trim_matches('-').to_string(),
    };

    if sku.to_uppercase().contains("B1T1") {
        sku = remove_b1t1(&sku).trim_matches(|c| c == '_' || c == '-').to_string();
        quantity = quantity.saturating_mul(2);
    }

    let lookup = alias_key(&sku);
    for (key, value) in aliases {
        if lookup == alias_key(key) {
            sku = value.clone();
            break;
        }
    }

    if sku.is_empty() || quantity == 0 {
        None
    } else {
        Some((sku, quantity))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every case-insensitive `B1T1` occurrence. When the occurrence
/// sits between two `-`/`_` separators, one of them is dropped too, so
/// `SKU-B1T1-ABC` becomes `SKU-ABC` rather than `SKU--ABC`.
fn remove_b1t1(text: &str) -> String {
    const NEEDLE: &[u8] = b"B1T1";
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].len() >= NEEDLE.len() && bytes[i..i + NEEDLE.len()].eq_ignore_ascii_case(NEEDLE)
        {
            let before_sep = out.last().is_some_and(|b| *b == b'-' || *b == b'_');
            let after = bytes.get(i + NEEDLE.len());
            let after_sep = after.is_some_and(|b| *b == b'-' || *b == b'_');
            if before_sep && after_sep {
                out.pop();
            }
            i += NEEDLE.len();
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Canonical form used for alias comparison: `-` and whitespace runs
/// collapse to single spaces, ends trimmed, uppercased.
fn alias_key(text: &str) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for ch in text.chars() {
        if ch == '-' || ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_uppercase());
        }
    }
    out
}
