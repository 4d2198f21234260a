//! SKU/quantity extraction engine.
//!
//! One pass per document: resolve per-page order ids, then scan each
//! page's words in reading order, clustering adjacent tokens into SKU
//! candidate spans and resolving quantities and multipliers through
//! spatial search windows around each span.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::StampResult;
use crate::geom::{Rect, WordToken};
use crate::normalize::normalize_span;
use crate::patterns::Patterns;
use crate::reader::{self, DocumentPages};

/// Sentinel order id for pages without an `Order ID:` header.
pub const UNKNOWN_ORDER: &str = "UNKNOWN_ORDER";

/// Literal marker used to detect orders split across two pages: present on
/// the first page of an order, absent on a continuation page. This is
/// content sniffing, not a structural signal; see DESIGN.md.
pub const PAYMENT_MARKER: &str = "Payment";

/// One resolved SKU occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuRecord {
    pub sku: String,
    pub quantity: u32,
    pub page_num: usize,
    pub order_id: String,
    pub bbox: Rect,
}

/// Extraction entry point: open the document and produce the ordered
/// record sequence. An empty result means no candidate spans matched
/// anywhere, which is distinct from a failure to open the file.
pub fn extract(path: &Path, config: &ExtractionConfig) -> StampResult<Vec<SkuRecord>> {
    let doc = reader::load_document(path)?;
    Ok(extract_records(&doc, config))
}

/// Run the extraction heuristics over already-loaded pages.
pub fn extract_records(doc: &DocumentPages, config: &ExtractionConfig) -> Vec<SkuRecord> {
    let patterns = Patterns::new();
    let order_ids = resolve_order_ids(doc, &patterns);

    for (page_num, order_id) in order_ids.iter().enumerate() {
        debug!(page = page_num + 1, order_id = %order_id, "resolved order id");
    }

    let mut records = Vec::new();
    for (page_num, page) in doc.pages().iter().enumerate() {
        let page_records = scan_page(
            &page.words,
            page_num,
            &order_ids[page_num],
            config,
            &patterns,
        );
        records.extend(page_records);
    }
    records
}

/// Per-page order ids with the split-order carry-over applied.
///
/// A page without its own id inherits its predecessor's id when the
/// predecessor carries the payment marker and this page does not. The
/// correction is forward-only and looks at exactly one predecessor.
pub fn resolve_order_ids(doc: &DocumentPages, patterns: &Patterns) -> Vec<String> {
    let raw: Vec<String> = doc
        .pages()
        .iter()
        .map(|page| {
            patterns
                .find_order_id(&page.text)
                .unwrap_or_else(|| UNKNOWN_ORDER.to_string())
        })
        .collect();

    let mut resolved = raw.clone();
    for page in 1..raw.len() {
        if raw[page] == UNKNOWN_ORDER
            && raw[page - 1] != UNKNOWN_ORDER
            && doc.pages()[page - 1].text.contains(PAYMENT_MARKER)
            && !doc.pages()[page].text.contains(PAYMENT_MARKER)
        {
            debug!(
                page = page + 1,
                order_id = %raw[page - 1],
                "continuation page inherits previous order id"
            );
            resolved[page] = raw[page - 1].clone();
        }
    }
    resolved
}

/// Scan one page's words, emitting records for every candidate span.
fn scan_page(
    words: &[WordToken],
    page_num: usize,
    order_id: &str,
    config: &ExtractionConfig,
    patterns: &Patterns,
) -> Vec<SkuRecord> {
    let mut records = Vec::new();
    let mut idx = 0;

    while idx < words.len() {
        if !patterns.is_sku_start(&words[idx].text) {
            idx += 1;
            continue;
        }

        let opener = &words[idx];
        let mut parts = vec![opener.text.trim().to_string()];
        let mut bbox = opener.bbox;

        // absorb nearby tokens into a multi-word span, but never a bare
        // integer: that is most likely the adjacent quantity column
        let mut cursor = idx + 1;
        while cursor < words.len() && cursor < idx + config.max_words_to_look_ahead {
            let next = &words[cursor];
            let vertical_ok =
                (next.bbox.y0 - opener.bbox.y0).abs() <= config.quantity_search_range_y;
            let horizontal_ok = (next.bbox.x0 - opener.bbox.x0)
                < config.x_multiplier_search_range_x + config.search_overshoot_x;
            if vertical_ok && horizontal_ok && !patterns.is_bare_integer(&next.text) {
                parts.push(next.text.trim().to_string());
                bbox = bbox.union(&next.bbox);
                cursor += 1;
            } else {
                break;
            }
        }

        let joined = parts.join(" ").trim().to_string();
        let (mut multiplier, span_text) = match patterns.take_x_multiplier(&joined) {
            Some((value, stripped)) => (value, stripped),
            None => (1, joined),
        };

        let base_quantity = find_base_quantity(&words[cursor..], &bbox, config, patterns);
        if let Some(external) = find_external_multiplier(&words[cursor..], &bbox, config, patterns)
        {
            multiplier = multiplier.saturating_mul(external);
        }

        let raw_quantity = base_quantity.saturating_mul(multiplier);
        for (sku, quantity) in
            normalize_span(&span_text, raw_quantity, patterns, &config.sku_aliases)
        {
            debug!(
                sku = %sku,
                quantity,
                span_width = bbox.width(),
                span_height = bbox.height(),
                "matched sku span"
            );
            records.push(SkuRecord {
                sku,
                quantity,
                page_num,
                order_id: order_id.to_string(),
                bbox,
            });
        }

        idx = cursor;
    }

    records
}

/// First bare positive integer to the right of the span, on the same line
/// or the line below. Defaults to 1 when nothing qualifies.
fn find_base_quantity(
    rest: &[WordToken],
    bbox: &Rect,
    config: &ExtractionConfig,
    patterns: &Patterns,
) -> u32 {
    for word in rest {
        let dy = word.bbox.y0 - bbox.y0;
        let dx = word.bbox.x0 - bbox.x1;
        if dy >= 0.0 && dy <= config.quantity_search_range_y && dx > 0.0 && dx <= config.quantity_search_range_x {
            if let Some(value) = patterns.bare_integer(&word.text) {
                if value > 0 && value < config.max_quantity {
                    return value;
                }
            }
        } else if dx > config.quantity_search_range_x + config.search_overshoot_x {
            break;
        }
    }
    1
}

/// `xN` token to the right of the span within the wider horizontal but
/// same-line-only vertical window. Runs over the same candidate range as
/// the quantity search, whether or not a quantity was found.
fn find_external_multiplier(
    rest: &[WordToken],
    bbox: &Rect,
    config: &ExtractionConfig,
    patterns: &Patterns,
) -> Option<u32> {
    for word in rest {
        let dy = word.bbox.y0 - bbox.y0;
        let dx = word.bbox.x0 - bbox.x1;
        if dy >= 0.0
            && dy <= config.x_multiplier_same_line_y_range
            && dx > 0.0
            && dx <= config.x_multiplier_search_range_x
        {
            if let Some(value) = patterns.x_multiplier_value(&word.text) {
                return Some(value);
            }
        } else if dx > config.x_multiplier_search_range_x + config.search_overshoot_x {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::PageData;

    fn word(text: &str, x0: f32, y0: f32, x1: f32) -> WordToken {
        WordToken::new(Rect::new(x0, y0, x1, y0 + 12.0), text, 0)
    }

    fn page(text: &str, words: Vec<WordToken>) -> PageData {
        PageData {
            width: 612.0,
            height: 792.0,
            text: text.to_string(),
            words,
        }
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[test]
    fn test_span_with_adjacent_quantity() {
        let doc = DocumentPages::from_pages(vec![page(
            "Order ID: 100\nPayment due",
            vec![word("C_BWL", 50.0, 100.0, 90.0), word("2", 110.0, 100.0, 118.0)],
        )]);
        let records = extract_records(&doc, &config());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sku, "BWL");
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].order_id, "100");
        assert_eq!(records[0].page_num, 0);
    }

    #[test]
    fn test_absorbed_x_multiplier_token() {
        // "x3" is not a bare integer, so the span swallows it and the
        // inline multiplier rule picks it up
        let doc = DocumentPages::from_pages(vec![page(
            "Order ID: 100",
            vec![word("C_BWL", 50.0, 100.0, 90.0), word("x3", 95.0, 100.0, 110.0)],
        )]);
        let records = extract_records(&doc, &config());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sku, "BWL");
        assert_eq!(records[0].quantity, 3);
    }

    #[test]
    fn test_external_multiplier_multiplies_base_quantity() {
        // the bare integer stops the span, becomes the base quantity, and
        // the xN token further right multiplies it
        let doc = DocumentPages::from_pages(vec![page(
            "Order ID: 100",
            vec![
                word("C_BWL", 50.0, 100.0, 90.0),
                word("7", 110.0, 100.0, 118.0),
                word("x2", 150.0, 100.0, 165.0),
            ],
        )]);
        let records = extract_records(&doc, &config());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 14);
    }

    #[test]
    fn test_quantity_on_line_below_but_not_above() {
        let below = DocumentPages::from_pages(vec![page(
            "",
            vec![word("C_BWL", 50.0, 100.0, 90.0), word("4", 110.0, 130.0, 118.0)],
        )]);
        let records = extract_records(&below, &config());
        assert_eq!(records[0].quantity, 4);

        let above = DocumentPages::from_pages(vec![page(
            "",
            vec![word("C_BWL", 50.0, 100.0, 90.0), word("4", 110.0, 70.0, 118.0)],
        )]);
        let records = extract_records(&above, &config());
        assert_eq!(records[0].quantity, 1);
    }

    #[test]
    fn test_oversized_quantities_are_page_noise() {
        let doc = DocumentPages::from_pages(vec![page(
            "",
            vec![
                word("C_BWL", 50.0, 100.0, 90.0),
                word("1500", 100.0, 100.0, 120.0),
                word("3", 130.0, 100.0, 138.0),
            ],
        )]);
        let records = extract_records(&doc, &config());
        // 1500 is rejected, the scan continues and finds 3
        assert_eq!(records[0].quantity, 3);
    }

    #[test]
    fn test_split_order_inherits_order_id() {
        let doc = DocumentPages::from_pages(vec![
            page(
                "Order ID: 555\nPayment: COD",
                vec![word("C_BWL", 50.0, 100.0, 90.0)],
            ),
            page("continuation page", vec![word("C_CBV", 50.0, 100.0, 90.0)]),
        ]);
        let records = extract_records(&doc, &config());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].order_id, "555");
        assert_eq!(records[1].order_id, "555");
        assert_eq!(records[1].page_num, 1);
    }

    #[test]
    fn test_no_carry_over_when_both_pages_have_payment() {
        let doc = DocumentPages::from_pages(vec![
            page("Order ID: 555\nPayment", vec![]),
            page("Payment", vec![word("C_CBV", 50.0, 100.0, 90.0)]),
        ]);
        let records = extract_records(&doc, &config());
        assert_eq!(records[0].order_id, UNKNOWN_ORDER);
    }

    #[test]
    fn test_lookahead_is_capped() {
        // six non-integer tokens on one line: only the first five can
        // form the span, the sixth survives as a separate word
        let words: Vec<WordToken> = (0..6)
            .map(|i| word(if i == 0 { "C_AA" } else { "BB" }, 50.0 + 20.0 * i as f32, 100.0, 60.0 + 20.0 * i as f32))
            .collect();
        let doc = DocumentPages::from_pages(vec![page("", words)]);
        let records = extract_records(&doc, &config());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sku, "AA BB BB BB BB");
    }

    #[test]
    fn test_empty_document_yields_no_records() {
        let doc = DocumentPages::from_pages(vec![page("just prose, no skus", vec![])]);
        assert!(extract_records(&doc, &config()).is_empty());
    }
}
