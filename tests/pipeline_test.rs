//! End-to-end coverage of the extraction and stamping pipeline, using
//! in-memory page data for the text side and a generated PDF for the
//! writer side.

use std::collections::BTreeMap;

use lopdf::{dictionary, Document, Object, Stream};
use tempfile::tempdir;

use waybill_stamper::aggregate;
use waybill_stamper::config::{ExtractionConfig, LayoutConfig};
use waybill_stamper::extract::{self, UNKNOWN_ORDER};
use waybill_stamper::geom::{Rect, WordToken};
use waybill_stamper::layout::{self, DrawOp, Line, ReportKind};
use waybill_stamper::reader::{DocumentPages, PageData};
use waybill_stamper::writer;

fn word(text: &str, x0: f32, y0: f32, x1: f32, page: usize) -> WordToken {
    WordToken::new(Rect::new(x0, y0, x1, y0 + 12.0), text, page)
}

fn page(text: &str, words: Vec<WordToken>) -> PageData {
    PageData {
        width: 612.0,
        height: 792.0,
        text: text.to_string(),
        words,
    }
}

fn write_blank_pdf(path: &std::path::Path, page_count: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..page_count {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// A two-page document: page one is a mix order paired with a
/// continuation page. The whole chain from words to summary lines should
/// agree on SKU names and totals.
#[test]
fn extraction_feeds_aggregation_end_to_end() {
    let doc = DocumentPages::from_pages(vec![
        page(
            "Order ID: 9001\nPayment: prepaid",
            vec![
                word("C_WASH-L", 50.0, 100.0, 100.0, 0),
                word("2", 120.0, 100.0, 128.0, 0),
                word("C_CBV", 50.0, 200.0, 90.0, 0),
                word("1", 120.0, 200.0, 128.0, 0),
            ],
        ),
        page(
            "continuation without the marker",
            vec![
                word("C_9oz-3", 50.0, 100.0, 100.0, 1),
                word("2", 120.0, 100.0, 128.0, 1),
            ],
        ),
    ]);

    let config = ExtractionConfig::default();
    let records = extract::extract_records(&doc, &config);
    assert_eq!(records.len(), 3);

    // the alias maps WASH-L to BWL, the trailing digit multiplies
    assert_eq!(records[0].sku, "BWL");
    assert_eq!(records[0].quantity, 2);
    assert_eq!(records[2].sku, "9oz");
    assert_eq!(records[2].quantity, 6);

    // the continuation page inherits the order id
    assert_eq!(records[2].order_id, "9001");
    assert_ne!(records[2].order_id, UNKNOWN_ORDER);

    let page_texts: Vec<String> = doc.pages().iter().map(|p| p.text.clone()).collect();
    let groups = aggregate::multi_sku_groups(&records, &page_texts);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].pages, vec![0, 1]);

    let patterns = aggregate::pattern_counts(&groups);
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern, "9oz (x6) / BWL (x2) / CBV (x1)");
    assert_eq!(patterns[0].orders, 1);

    let committed = aggregate::pattern_sku_totals(&patterns);
    assert_eq!(committed["BWL"], 2);
    assert_eq!(committed["9oz"], 6);
}

/// Zero extracted records must leave the output identical in page count,
/// with no stamps and no summary pages.
#[test]
fn stamping_without_records_preserves_page_count() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("blank.pdf");
    let output = dir.path().join("blank_out.pdf");
    write_blank_pdf(&input, 4);

    let count = writer::stamp_document(&input, &output, &BTreeMap::new(), &[]).unwrap();
    assert_eq!(count, 4);
    assert_eq!(Document::load(&output).unwrap().get_pages().len(), 4);
}

/// Stamps plus all three reports applied to a real file on disk.
#[test]
fn stamping_appends_reports_after_original_pages() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("waybills.pdf");
    let output = dir.path().join("waybills_out.pdf");
    write_blank_pdf(&input, 2);

    let layout_cfg = LayoutConfig::default();
    let mut stamps = BTreeMap::new();
    stamps.insert(
        0,
        layout::plan_page_stamp(612.0, 792.0, &["BWL (x2)".to_string()], &layout_cfg),
    );

    let lines = vec![Line::bulleted("BWL (x2)"), Line::bulleted("CBV (x1)")];
    let mut summary: Vec<Vec<DrawOp>> = layout::plan_report(
        612.0,
        792.0,
        &lines,
        "All SKUs Summary",
        ReportKind::TwoColumnFit,
        &layout_cfg,
    );
    summary.extend(layout::plan_report(
        612.0,
        792.0,
        &[Line::bulleted("BWL (x2) / CBV (x1) - 1 order")],
        "Mix Orders Patterns",
        ReportKind::SingleColumn,
        &layout_cfg,
    ));

    let count = writer::stamp_document(&input, &output, &stamps, &summary).unwrap();
    assert_eq!(count, 2 + summary.len());

    let written = Document::load(&output).unwrap();
    assert_eq!(written.get_pages().len(), 2 + summary.len());

    // original page 1 now carries the stamp content stream
    let first_id = *written.get_pages().values().next().unwrap();
    let content = written.get_page_content(first_id).unwrap();
    let decoded = lopdf::content::Content::decode(&content).unwrap();
    assert!(decoded.operations.iter().any(|op| op.operator == "Tj"));
}

/// The two-column fit boundary: one page at exactly twice the
/// per-column capacity, two or more past it.
#[test]
fn two_column_report_overflows_past_double_capacity() {
    let layout_cfg = LayoutConfig::default();
    let per_column = ((792.0_f32 - 40.0 - 20.0) / (12.0 * 1.4)) as usize;

    let at_capacity: Vec<Line> = (0..per_column * 2)
        .map(|i| Line::bulleted(format!("S{i} (x1)")))
        .collect();
    let pages = layout::plan_report(
        612.0,
        792.0,
        &at_capacity,
        "All SKUs Summary",
        ReportKind::TwoColumnFit,
        &layout_cfg,
    );
    assert_eq!(pages.len(), 1);

    let over: Vec<Line> = (0..per_column * 2 + 1)
        .map(|i| Line::bulleted(format!("S{i} (x1)")))
        .collect();
    let pages = layout::plan_report(
        612.0,
        792.0,
        &over,
        "All SKUs Summary",
        ReportKind::TwoColumnFit,
        &layout_cfg,
    );
    assert!(pages.len() > 1);
}
