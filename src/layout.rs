//! Layout planning for stamps and summary pages.
//!
//! All functions here are pure: they turn report lines into draw
//! operations in top-down page coordinates, and the writer translates
//! those into PDF content streams. Keeping measurement and placement
//! out of the writer makes pagination testable without a PDF in hand.

use crate::config::LayoutConfig;
use crate::measure::{self, LINE_SPACING, TITLE_SPACING};

/// One drawing primitive, in top-down coordinates. `Text.y` is the
/// baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect { x0: f32, y0: f32, x1: f32, y1: f32, gray: f32 },
    FillCircle { cx: f32, cy: f32, radius: f32 },
    Text { x: f32, y: f32, size: f32, text: String },
}

/// One report line. Bulleted lines get a filled circle and an indent.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub bullet: bool,
}

impl Line {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bullet: false }
    }

    pub fn bulleted(text: impl Into<String>) -> Self {
        Self { text: text.into(), bullet: true }
    }
}

/// Vertical anchor of a packed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
}

/// Parameters for packing one block of lines onto one page.
#[derive(Debug, Clone)]
pub struct PackOptions<'a> {
    pub columns: usize,
    pub anchor: Anchor,
    pub title: Option<&'a str>,
    pub padding_x: f32,
    pub padding_y: f32,
    pub gray: f32,
    /// Wrap overlong lines at " / " separators or word boundaries.
    /// Two-column blocks never wrap.
    pub wrap: bool,
}

/// Which layout strategy a report uses across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Two columns when everything fits one page, otherwise a two-column
    /// first page and single-column continuation pages.
    TwoColumnFit,
    /// Single column on every page, repeating the same title.
    SingleColumn,
}

/// Shrink the title font until it fits the text area, in half-point
/// steps, never below the configured minimum.
fn fit_title_size(title: &str, max_width: f32, layout: &LayoutConfig) -> f32 {
    let mut size = layout.font_size;
    let mut width = measured_width(title, size);
    while width > max_width && size > layout.min_font_size {
        size -= 0.5;
        width = measured_width(title, size);
    }
    size
}

/// Width with a harmless fallback so layout never aborts on a glyph the
/// width table cannot price.
fn measured_width(text: &str, size: f32) -> f32 {
    measure::text_width(text, size).unwrap_or(100.0)
}

/// Greedy wrap, preferring " / " separators so SKU pattern entries break
/// between pattern parts rather than inside one.
pub fn wrap_line(text: &str, max_width: f32, size: f32) -> Vec<String> {
    if measured_width(text, size) <= max_width {
        return vec![text.to_string()];
    }
    let (separator, parts): (&str, Vec<&str>) = if text.contains(" / ") {
        (" / ", text.split(" / ").collect())
    } else {
        (" ", text.split_whitespace().collect())
    };

    let mut wrapped = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for part in parts {
        let mut candidate: Vec<&str> = current.clone();
        candidate.push(part);
        if measured_width(&candidate.join(separator), size) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                wrapped.push(current.join(separator));
            }
            current = vec![part];
        }
    }
    if !current.is_empty() {
        wrapped.push(current.join(separator));
    }
    if wrapped.is_empty() {
        wrapped.push(text.to_string());
    }
    wrapped
}

/// Wrap one line, keeping the bullet only on its first visual segment.
/// Bulleted lines wrap against the width left over after the bullet
/// indent.
fn wrap_entry(line: &Line, max_width: f32, size: f32, bullet_space: f32) -> Vec<Line> {
    let budget = if line.bullet { max_width - bullet_space } else { max_width };
    wrap_line(&line.text, budget, size)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Line { text, bullet: line.bullet && i == 0 })
        .collect()
}

/// Pack one block of lines onto one page and return its draw ops.
pub fn pack_page(
    page_width: f32,
    page_height: f32,
    lines: &[Line],
    opts: &PackOptions,
    layout: &LayoutConfig,
) -> Vec<DrawOp> {
    let available_width = page_width - 2.0 * layout.left_margin - 2.0 * opts.padding_x;
    let line_height = layout.font_size * LINE_SPACING;

    let title_size = opts.title.map(|t| fit_title_size(t, available_width, layout));
    let title_height = title_size.map_or(0.0, |s| s * TITLE_SPACING);

    let mut ops = Vec::new();

    if opts.columns == 2 {
        // column split puts the extra line on the left
        let mid = lines.len().div_ceil(2);
        let (left, right) = lines.split_at(mid);
        let column_width = (available_width - layout.column_gap) / 2.0;

        let max_column = left.len().max(right.len()) as f32 * line_height;
        let content_height = title_height + max_column + 2.0 * opts.padding_y;

        let bg_x0 = layout.left_margin;
        let bg_x1 = layout.left_margin + available_width + 2.0 * opts.padding_x;
        let bg_y0 = layout.top_margin;
        ops.push(DrawOp::FillRect {
            x0: bg_x0,
            y0: bg_y0,
            x1: bg_x1,
            y1: bg_y0 + content_height,
            gray: opts.gray,
        });

        let mut cursor = bg_y0 + opts.padding_y;
        if let (Some(title), Some(size)) = (opts.title, title_size) {
            cursor += size;
            ops.push(DrawOp::Text {
                x: layout.left_margin + opts.padding_x,
                y: cursor,
                size,
                text: title.to_string(),
            });
            cursor += size * 0.8;
        }

        let left_x = layout.left_margin + opts.padding_x;
        let right_x = left_x + column_width + layout.column_gap;
        for (column_x, column) in [(left_x, left), (right_x, right)] {
            let mut baseline = cursor + layout.font_size;
            for line in column {
                emit_line(&mut ops, line, column_x, baseline, layout);
                baseline += line_height;
            }
        }
        return ops;
    }

    // single column: wrap first, then measure the block
    let wrapped: Vec<Line> = if opts.wrap {
        lines
            .iter()
            .flat_map(|line| {
                wrap_entry(line, available_width, layout.font_size, layout.bullet_space)
            })
            .collect()
    } else {
        lines.to_vec()
    };

    let mut content_width: f32 = title_size
        .map_or(0.0, |s| measured_width(opts.title.unwrap_or_default(), s));
    for line in &wrapped {
        let mut width = measured_width(&line.text, layout.font_size);
        if line.bullet {
            width += layout.bullet_space;
        }
        content_width = content_width.max(width);
    }

    let content_height =
        title_height + wrapped.len() as f32 * line_height + 2.0 * opts.padding_y;

    let bg_x0 = layout.left_margin;
    let bg_x1 = bg_x0 + content_width + 2.0 * opts.padding_x;
    let bg_y0 = match opts.anchor {
        Anchor::Top => layout.top_margin,
        Anchor::Bottom => page_height - layout.bottom_margin - content_height,
    };
    ops.push(DrawOp::FillRect {
        x0: bg_x0,
        y0: bg_y0,
        x1: bg_x1,
        y1: bg_y0 + content_height,
        gray: opts.gray,
    });

    let mut cursor = bg_y0 + opts.padding_y;
    if let (Some(title), Some(size)) = (opts.title, title_size) {
        cursor += size;
        ops.push(DrawOp::Text {
            x: layout.left_margin + opts.padding_x,
            y: cursor,
            size,
            text: title.to_string(),
        });
        cursor += size * (TITLE_SPACING - 1.0);
    }

    let mut baseline = cursor + layout.font_size;
    for line in &wrapped {
        emit_line(&mut ops, line, layout.left_margin + opts.padding_x, baseline, layout);
        baseline += line_height;
    }
    ops
}

fn emit_line(ops: &mut Vec<DrawOp>, line: &Line, column_x: f32, baseline: f32, layout: &LayoutConfig) {
    if line.bullet {
        let bullet_x = column_x + layout.bullet_radius + 2.0;
        ops.push(DrawOp::FillCircle {
            cx: bullet_x,
            cy: baseline - layout.font_size * 0.3,
            radius: layout.bullet_radius,
        });
        ops.push(DrawOp::Text {
            x: bullet_x + layout.bullet_radius + 6.0,
            y: baseline,
            size: layout.font_size,
            text: line.text.clone(),
        });
    } else {
        ops.push(DrawOp::Text {
            x: column_x,
            y: baseline,
            size: layout.font_size,
            text: line.text.clone(),
        });
    }
}

/// Plan the per-page stamp block: bottom-left, light gray, one line per
/// SKU. Returns nothing when the page has no records.
pub fn plan_page_stamp(
    page_width: f32,
    page_height: f32,
    lines: &[String],
    layout: &LayoutConfig,
) -> Vec<DrawOp> {
    if lines.is_empty() {
        return Vec::new();
    }
    let owned: Vec<Line> = lines.iter().map(Line::plain).collect();
    let opts = PackOptions {
        columns: 1,
        anchor: Anchor::Bottom,
        title: None,
        padding_x: layout.stamp_padding_x,
        padding_y: layout.stamp_padding_y,
        gray: 0.8,
        wrap: false,
    };
    pack_page(page_width, page_height, &owned, &opts, layout)
}

/// Height estimate for one entry after wrapping, used by single-column
/// pagination. The word-wrap case is an upper-bound estimate rather than
/// a simulation.
fn estimated_entry_height(line: &Line, max_width: f32, layout: &LayoutConfig) -> f32 {
    let line_height = layout.font_size * LINE_SPACING;
    let budget = if line.bullet { max_width - layout.bullet_space } else { max_width };
    let width = measured_width(&line.text, layout.font_size);
    if width <= budget {
        return line_height;
    }
    let count = if line.text.contains(" / ") {
        wrap_line(&line.text, budget, layout.font_size).len()
    } else {
        (width / budget) as usize + 1
    };
    count.max(1) as f32 * line_height
}

/// Plan a whole report as one or more summary pages.
///
/// `label` is the bare report name; titles render as `--- {label} ---`
/// with ` (continued)` spliced in on overflow pages of two-column
/// reports.
pub fn plan_report(
    page_width: f32,
    page_height: f32,
    lines: &[Line],
    label: &str,
    kind: ReportKind,
    layout: &LayoutConfig,
) -> Vec<Vec<DrawOp>> {
    if lines.is_empty() {
        return Vec::new();
    }

    let title = format!("--- {label} ---");
    let continued = format!("--- {label} (continued) ---");
    let line_height = layout.font_size * LINE_SPACING;
    let available_height =
        page_height - 2.0 * layout.bottom_margin - 2.0 * layout.summary_padding_y;
    let available_width =
        page_width - 2.0 * layout.left_margin - 2.0 * layout.summary_padding_x;

    let two_column = |buffer: &[Line], title: &str| {
        pack_page(
            page_width,
            page_height,
            buffer,
            &PackOptions {
                columns: 2,
                anchor: Anchor::Top,
                title: Some(title),
                padding_x: layout.summary_padding_x,
                padding_y: layout.summary_padding_y,
                gray: 0.9,
                wrap: false,
            },
            layout,
        )
    };
    let single_column = |buffer: &[Line], title: &str| {
        pack_page(
            page_width,
            page_height,
            buffer,
            &PackOptions {
                columns: 1,
                anchor: Anchor::Top,
                title: Some(title),
                padding_x: layout.summary_padding_x,
                padding_y: layout.summary_padding_y,
                gray: 0.9,
                wrap: true,
            },
            layout,
        )
    };

    match kind {
        ReportKind::TwoColumnFit => {
            let max_lines_per_page = (available_height / line_height) as usize;
            if lines.len() <= max_lines_per_page * 2 {
                return vec![two_column(lines, &title)];
            }

            let mut pages = Vec::new();
            let mut buffer: Vec<Line> = Vec::new();
            let mut buffer_height = 0.0;
            for line in lines {
                if buffer_height + line_height > available_height {
                    let page = if pages.is_empty() {
                        two_column(&buffer, &title)
                    } else {
                        single_column(&buffer, &continued)
                    };
                    pages.push(page);
                    buffer = vec![line.clone()];
                    buffer_height = line_height;
                } else {
                    buffer.push(line.clone());
                    buffer_height += line_height;
                }
            }
            if !buffer.is_empty() {
                let page = if pages.is_empty() {
                    two_column(&buffer, &title)
                } else {
                    single_column(&buffer, &continued)
                };
                pages.push(page);
            }
            pages
        }
        ReportKind::SingleColumn => {
            let mut pages = Vec::new();
            let mut buffer: Vec<Line> = Vec::new();
            let mut buffer_height = 0.0;
            for line in lines {
                let entry_height = estimated_entry_height(line, available_width, layout);
                if buffer_height + entry_height > available_height {
                    if !buffer.is_empty() {
                        pages.push(single_column(&buffer, &title));
                    }
                    buffer = vec![line.clone()];
                    buffer_height = entry_height;
                } else {
                    buffer.push(line.clone());
                    buffer_height += entry_height;
                }
            }
            if !buffer.is_empty() {
                pages.push(single_column(&buffer, &title));
            }
            pages
        }
    }
}
