//! Record aggregation for stamps and summary reports.
//!
//! Everything here is a pure fold over the extracted records. BTreeMap
//! keys give the sorted iteration order the reports rely on, so no
//! separate sort passes are needed.

use std::collections::BTreeMap;

use crate::extract::{SkuRecord, PAYMENT_MARKER};

/// Per-page SKU totals, keyed by zero-based page index.
pub fn page_totals(records: &[SkuRecord]) -> BTreeMap<usize, BTreeMap<String, u32>> {
    let mut totals: BTreeMap<usize, BTreeMap<String, u32>> = BTreeMap::new();
    for record in records {
        *totals
            .entry(record.page_num)
            .or_default()
            .entry(record.sku.clone())
            .or_insert(0) += record.quantity;
    }
    totals
}

/// Document-wide SKU totals.
pub fn global_totals(records: &[SkuRecord]) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.sku.clone()).or_insert(0) += record.quantity;
    }
    totals
}

/// SKU totals for one order that spans one or more pages.
#[derive(Debug, Clone)]
pub struct OrderGroup {
    pub pages: Vec<usize>,
    pub totals: BTreeMap<String, u32>,
}

/// Group records into orders, pairing a page with its successor when the
/// payment marker says they belong to one split order, then keep only
/// groups with more than one distinct SKU line. These are the mix orders
/// the pattern reports describe.
pub fn multi_sku_groups(records: &[SkuRecord], page_texts: &[String]) -> Vec<OrderGroup> {
    let by_page = page_totals(records);
    let mut groups = Vec::new();
    let mut consumed = vec![false; page_texts.len()];

    for page in 0..page_texts.len() {
        if consumed[page] {
            continue;
        }
        let Some(totals) = by_page.get(&page) else {
            continue;
        };
        let mut group = OrderGroup {
            pages: vec![page],
            totals: totals.clone(),
        };

        // a page with the payment marker whose successor lacks it is the
        // first half of a split order
        let next = page + 1;
        if next < page_texts.len()
            && page_texts[page].contains(PAYMENT_MARKER)
            && !page_texts[next].contains(PAYMENT_MARKER)
        {
            consumed[next] = true;
            if let Some(next_totals) = by_page.get(&next) {
                group.pages.push(next);
                for (sku, qty) in next_totals {
                    *group.totals.entry(sku.clone()).or_insert(0) += qty;
                }
            }
        }

        if group.totals.len() > 1 {
            groups.push(group);
        }
    }
    groups
}

/// Canonical string form of a group's totals, e.g. `"BWL (x2) / CBV (x1)"`.
/// Sorted map iteration makes equal mixes compare equal as strings.
pub fn pattern_string(totals: &BTreeMap<String, u32>) -> String {
    totals
        .iter()
        .map(|(sku, qty)| format!("{sku} (x{qty})"))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// One distinct mix pattern and how many orders share it.
#[derive(Debug, Clone)]
pub struct PatternCount {
    pub pattern: String,
    pub totals: BTreeMap<String, u32>,
    pub orders: u32,
}

/// Count distinct mix patterns across the given groups, sorted by the
/// pattern string.
pub fn pattern_counts(groups: &[OrderGroup]) -> Vec<PatternCount> {
    let mut counts: BTreeMap<String, PatternCount> = BTreeMap::new();
    for group in groups {
        let pattern = pattern_string(&group.totals);
        counts
            .entry(pattern.clone())
            .or_insert_with(|| PatternCount {
                pattern,
                totals: group.totals.clone(),
                orders: 0,
            })
            .orders += 1;
    }
    counts.into_values().collect()
}

/// Total units of each SKU committed to mix orders: per-pattern quantity
/// times the number of orders carrying that pattern, summed over patterns.
pub fn pattern_sku_totals(patterns: &[PatternCount]) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    for entry in patterns {
        for (sku, qty) in &entry.totals {
            *totals.entry(sku.clone()).or_insert(0) += qty * entry.orders;
        }
    }
    totals
}
