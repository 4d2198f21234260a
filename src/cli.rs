use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::aggregate;
use crate::config::StampConfig;
use crate::extract;
use crate::layout::{self, DrawOp, Line, ReportKind};
use crate::logging::PerformanceTimer;
use crate::reader;
use crate::writer;

/// Default output name for `<input>.pdf` when none is given.
pub fn default_output_path(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "waybill".to_string());
    pdf_path.with_file_name(format!("{stem}_SKUs_Qty_EndPage.pdf"))
}

/// Extract SKUs and stamp them onto a derivative PDF.
pub fn stamp_command(
    pdf_path: PathBuf,
    output: Option<PathBuf>,
    config: &StampConfig,
) -> Result<()> {
    println!("--- Waybill SKU Stamping Tool with Quantity (End of Page Stamp) ---");
    info!("Stamping waybill PDF: {:?}", pdf_path);
    let timer = PerformanceTimer::start("stamp pipeline");

    let output_path = output.unwrap_or_else(|| default_output_path(&pdf_path));
    println!("Output PDF will be saved as: {}", output_path.display());

    let doc = reader::load_document(&pdf_path)?;
    println!("Scanning {} pages...", doc.page_count());
    let records = extract::extract_records(&doc, &config.extraction);
    timer.checkpoint("extraction");

    if records.is_empty() {
        println!("No SKUs were identified in the PDF using the current patterns.");
        return Ok(());
    }

    println!("\nIdentified {} potential SKUs.", records.len());
    println!("--- Extracted SKUs per Page (before stamping) ---");
    for record in &records {
        println!(
            "  Page {}: SKU='{}', Quantity={}, Order ID='{}'",
            record.page_num + 1,
            record.sku,
            record.quantity,
            record.order_id
        );
    }
    println!("--------------------------------------------------");

    let layout_cfg = &config.layout;
    let page_texts: Vec<String> = doc.pages().iter().map(|p| p.text.clone()).collect();

    // per-page stamps at the bottom-left
    let mut stamps: BTreeMap<usize, Vec<DrawOp>> = BTreeMap::new();
    for (page_num, totals) in aggregate::page_totals(&records) {
        let page = &doc.pages()[page_num];
        let lines: Vec<String> = totals
            .iter()
            .map(|(sku, qty)| format!("{sku} (x{qty})"))
            .collect();
        let ops = layout::plan_page_stamp(page.width, page.height, &lines, layout_cfg);
        if !ops.is_empty() {
            stamps.insert(page_num, ops);
        }
    }

    let first = &doc.pages()[0];
    let mut summary_pages: Vec<Vec<DrawOp>> = Vec::new();

    // report 1: every SKU in the document with its grand total
    let global_lines: Vec<Line> = aggregate::global_totals(&records)
        .iter()
        .map(|(sku, qty)| Line::bulleted(format!("{sku} (x{qty})")))
        .collect();
    summary_pages.extend(layout::plan_report(
        first.width,
        first.height,
        &global_lines,
        "All SKUs Summary",
        ReportKind::TwoColumnFit,
        layout_cfg,
    ));

    // reports 2 and 3: mix order patterns and their SKU commitments
    let groups = aggregate::multi_sku_groups(&records, &page_texts);
    let patterns = aggregate::pattern_counts(&groups);
    info!("Found {} mix orders across {} patterns", groups.len(), patterns.len());

    let pattern_lines: Vec<Line> = patterns
        .iter()
        .map(|p| {
            let suffix = if p.orders > 1 {
                format!("{} orders", p.orders)
            } else {
                "1 order".to_string()
            };
            Line::bulleted(format!("{} - {}", p.pattern, suffix))
        })
        .collect();
    summary_pages.extend(layout::plan_report(
        first.width,
        first.height,
        &pattern_lines,
        "Mix Orders Patterns",
        ReportKind::SingleColumn,
        layout_cfg,
    ));

    let count_lines: Vec<Line> = aggregate::pattern_sku_totals(&patterns)
        .iter()
        .map(|(sku, qty)| Line::bulleted(format!("{sku} (x{qty})")))
        .collect();
    summary_pages.extend(layout::plan_report(
        first.width,
        first.height,
        &count_lines,
        "Mix Orders SKU Count",
        ReportKind::TwoColumnFit,
        layout_cfg,
    ));
    timer.checkpoint("layout");

    println!("\nStamping them onto a new PDF...");
    let final_pages = writer::stamp_document(&pdf_path, &output_path, &stamps, &summary_pages)?;

    println!(
        "\nSuccessfully created '{}' with SKUs and quantities.",
        output_path.display()
    );
    println!("          Pages written: {final_pages}");
    println!("          Stamped pages: {}", stamps.len());
    println!("          Summary pages: {}", summary_pages.len());

    Ok(())
}

/// Extract SKUs only and dump them as JSON.
pub fn extract_command(
    pdf_path: PathBuf,
    output: Option<PathBuf>,
    config: &StampConfig,
) -> Result<()> {
    info!("Extracting SKUs from PDF: {:?}", pdf_path);

    let records = extract::extract(&pdf_path, &config.extraction)?;

    if records.is_empty() {
        println!("No SKUs were identified in the PDF using the current patterns.");
        return Ok(());
    }

    for record in &records {
        println!(
            "  Page {}: SKU='{}', Quantity={}, Order ID='{}'",
            record.page_num + 1,
            record.sku,
            record.quantity,
            record.order_id
        );
    }

    // orders carrying more than one distinct SKU, grouped by order id
    let mut skus_by_order: BTreeMap<&str, std::collections::BTreeSet<&str>> = BTreeMap::new();
    for record in &records {
        skus_by_order
            .entry(record.order_id.as_str())
            .or_default()
            .insert(record.sku.as_str());
    }
    let mix_orders = skus_by_order.values().filter(|skus| skus.len() > 1).count();
    println!("\nOrders with more than one SKU: {mix_orders}");

    let json = serde_json::to_string_pretty(&records)?;
    match output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            println!("\nSaved {} records to {}", records.len(), path.display());
        }
        None => println!("\n{json}"),
    }

    Ok(())
}
