//! PDF synthesis: apply planned draw ops to a copy of the input document.
//!
//! The input file is opened with lopdf, each stamped page gets an extra
//! content stream appended to its `Contents`, summary pages are added to
//! the page tree, and the whole document is saved in one shot. Nothing
//! is written to disk until every page has been prepared.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{StampError, StampResult};
use crate::layout::DrawOp;

/// Resource name the stamp font is registered under. Deliberately not
/// `F1`, which waybill generators tend to use for their own fonts.
const FONT_KEY: &str = "Fstamp";

/// Bezier circle approximation constant.
const CIRCLE_K: f32 = 0.552_284_8;

/// Apply per-page stamp ops and append summary pages, then save to
/// `output`. `page_stamps` is keyed by zero-based page index; pages
/// without an entry pass through untouched. Returns the final page
/// count.
pub fn stamp_document(
    input: &Path,
    output: &Path,
    page_stamps: &BTreeMap<usize, Vec<DrawOp>>,
    summary_pages: &[Vec<DrawOp>],
) -> StampResult<usize> {
    let mut doc = Document::load(input)?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let first_page_size = pages
        .first()
        .map(|id| page_size(&doc, *id))
        .transpose()?
        .unwrap_or((612.0, 792.0));

    for (index, page_id) in pages.iter().enumerate() {
        let Some(ops) = page_stamps.get(&index) else {
            continue;
        };
        if ops.is_empty() {
            continue;
        }
        let (_, height) = page_size(&doc, *page_id)?;
        let bytes = encode_ops(ops, height)?;
        let stream_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        append_page_content(&mut doc, *page_id, stream_id)?;
        ensure_page_font(&mut doc, *page_id, font_id)?;
        debug!(page = index + 1, ops = ops.len(), "stamped page");
    }

    let (width, height) = first_page_size;
    for ops in summary_pages {
        append_summary_page(&mut doc, width, height, ops, font_id)?;
    }

    doc.save(output)
        .map_err(|e| StampError::output_write(output.display().to_string(), e))?;

    let final_count = doc.get_pages().len();
    info!(
        output = %output.display(),
        pages = final_count,
        summary_pages = summary_pages.len(),
        "wrote stamped document"
    );
    Ok(final_count)
}

/// Width and height from the page's `MediaBox`, walking `Parent` links
/// for inherited boxes.
fn page_size(doc: &Document, page_id: ObjectId) -> StampResult<(f32, f32)> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_dictionary(current)?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            let media_box = match obj {
                Object::Reference(id) => doc.get_object(*id)?.as_array()?,
                Object::Array(items) => items,
                _ => return Err(StampError::input_unreadable("malformed MediaBox entry")),
            };
            if media_box.len() != 4 {
                return Err(StampError::input_unreadable("MediaBox is not a 4-element array"));
            }
            let nums = media_box
                .iter()
                .map(object_to_f32)
                .collect::<StampResult<Vec<f32>>>()?;
            return Ok((nums[2] - nums[0], nums[3] - nums[1]));
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    Err(StampError::input_unreadable("page has no MediaBox"))
}

fn object_to_f32(obj: &Object) -> StampResult<f32> {
    match obj {
        Object::Integer(i) => Ok(*i as f32),
        Object::Real(r) => Ok(*r),
        _ => Err(StampError::input_unreadable("non-numeric MediaBox component")),
    }
}

/// Append a content stream to the page's `Contents`, preserving whatever
/// shape (single reference or array) the entry already has.
fn append_page_content(doc: &mut Document, page_id: ObjectId, stream_id: ObjectId) -> StampResult<()> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(existing)) => vec![Object::Reference(*existing), Object::Reference(stream_id)],
        Ok(Object::Array(items)) => {
            let mut items = items.clone();
            items.push(Object::Reference(stream_id));
            items
        }
        _ => vec![Object::Reference(stream_id)],
    };
    page.set("Contents", contents);
    Ok(())
}

/// Register the stamp font in the page's font resources, wherever those
/// happen to live (inline on the page, or behind references).
fn ensure_page_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> StampResult<()> {
    let mut resources_ref = None;
    let mut font_ref = None;
    {
        let page = doc.get_dictionary(page_id)?;
        if let Ok(res_obj) = page.get(b"Resources") {
            let res_dict = match res_obj {
                Object::Reference(id) => {
                    resources_ref = Some(*id);
                    doc.get_dictionary(*id).ok()
                }
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            };
            if let Some(res) = res_dict {
                if let Ok(Object::Reference(id)) = res.get(b"Font") {
                    font_ref = Some(*id);
                }
            }
        }
    }

    if let Some(fonts_id) = font_ref {
        doc.get_object_mut(fonts_id)?.as_dict_mut()?.set(FONT_KEY, font_id);
        return Ok(());
    }

    let resources: &mut Dictionary = match resources_ref {
        Some(res_id) => doc.get_object_mut(res_id)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if page.get(b"Resources").is_err() {
                page.set("Resources", Dictionary::new());
            }
            page.get_mut(b"Resources")?.as_dict_mut()?
        }
    };
    if resources.get(b"Font").is_err() {
        resources.set("Font", Dictionary::new());
    }
    resources.get_mut(b"Font")?.as_dict_mut()?.set(FONT_KEY, font_id);
    Ok(())
}

/// Add one summary page at the end of the page tree.
fn append_summary_page(
    doc: &mut Document,
    width: f32,
    height: f32,
    ops: &[DrawOp],
    font_id: ObjectId,
) -> StampResult<()> {
    let pages_id = doc.catalog()?.get(b"Pages")?.as_reference()?;
    let bytes = encode_ops(ops, height)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { FONT_KEY => font_id },
        },
    });

    let pages = doc.get_object_mut(pages_id)?.as_dict_mut()?;
    pages.get_mut(b"Kids")?.as_array_mut()?.push(page_id.into());
    let count = pages.get(b"Count")?.as_i64()?;
    pages.set("Count", count + 1);
    Ok(())
}

/// Encode draw ops into a content stream. Layout coordinates are
/// top-down, so every y flips against the page height here.
fn encode_ops(ops: &[DrawOp], page_height: f32) -> StampResult<Vec<u8>> {
    let mut operations = vec![Operation::new("q", vec![])];
    for op in ops {
        match op {
            DrawOp::FillRect { x0, y0, x1, y1, gray } => {
                operations.push(Operation::new("g", vec![(*gray).into()]));
                operations.push(Operation::new(
                    "re",
                    vec![
                        (*x0).into(),
                        (page_height - *y1).into(),
                        (*x1 - *x0).into(),
                        (*y1 - *y0).into(),
                    ],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            DrawOp::FillCircle { cx, cy, radius } => {
                let cy = page_height - *cy;
                let r = *radius;
                let k = CIRCLE_K * r;
                operations.push(Operation::new("g", vec![0.0f32.into()]));
                operations.push(Operation::new("m", vec![(*cx + r).into(), cy.into()]));
                operations.push(Operation::new(
                    "c",
                    vec![(*cx + r).into(), (cy + k).into(), (*cx + k).into(), (cy + r).into(), (*cx).into(), (cy + r).into()],
                ));
                operations.push(Operation::new(
                    "c",
                    vec![(*cx - k).into(), (cy + r).into(), (*cx - r).into(), (cy + k).into(), (*cx - r).into(), cy.into()],
                ));
                operations.push(Operation::new(
                    "c",
                    vec![(*cx - r).into(), (cy - k).into(), (*cx - k).into(), (cy - r).into(), (*cx).into(), (cy - r).into()],
                ));
                operations.push(Operation::new(
                    "c",
                    vec![(*cx + k).into(), (cy - r).into(), (*cx + r).into(), (cy - k).into(), (*cx + r).into(), cy.into()],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            DrawOp::Text { x, y, size, text } => {
                operations.push(Operation::new("g", vec![0.0f32.into()]));
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_KEY.as_bytes().to_vec()), (*size).into()],
                ));
                operations.push(Operation::new("Td", vec![(*x).into(), (page_height - *y).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
                operations.push(Operation::new("ET", vec![]));
            }
        }
    }
    operations.push(Operation::new("Q", vec![]));
    Ok(Content { operations }.encode()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn minimal_pdf(path: &Path, page_count: usize) {
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
        let kids_len = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kids_len,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_no_ops_preserves_page_count() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        minimal_pdf(&input, 3);

        let count = stamp_document(&input, &output, &BTreeMap::new(), &[]).unwrap();
        assert_eq!(count, 3);

        let written = Document::load(&output).unwrap();
        assert_eq!(written.get_pages().len(), 3);
    }

    #[test]
    fn test_stamp_appends_content_stream() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        minimal_pdf(&input, 1);

        let mut stamps = BTreeMap::new();
        stamps.insert(
            0,
            vec![
                DrawOp::FillRect { x0: 20.0, y0: 700.0, x1: 120.0, y1: 770.0, gray: 0.8 },
                DrawOp::Text { x: 30.0, y: 720.0, size: 12.0, text: "BWL (x2)".to_string() },
            ],
        );
        stamp_document(&input, &output, &stamps, &[]).unwrap();

        let written = Document::load(&output).unwrap();
        let page_id = *written.get_pages().values().next().unwrap();
        let content = written.get_page_content(page_id).unwrap();
        let decoded = Content::decode(&content).unwrap();
        assert!(decoded.operations.iter().any(|op| op.operator == "Tj"));
        assert!(decoded.operations.iter().any(|op| op.operator == "re"));
    }

    #[test]
    fn test_summary_pages_extend_page_tree() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        minimal_pdf(&input, 2);

        let summary = vec![vec![DrawOp::Text {
            x: 30.0,
            y: 42.0,
            size: 12.0,
            text: "--- All SKUs Summary ---".to_string(),
        }]];
        let count = stamp_document(&input, &output, &BTreeMap::new(), &summary).unwrap();
        assert_eq!(count, 3);

        let written = Document::load(&output).unwrap();
        assert_eq!(written.get_pages().len(), 3);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let result = stamp_document(
            &dir.path().join("absent.pdf"),
            &dir.path().join("out.pdf"),
            &BTreeMap::new(),
            &[],
        );
        assert!(result.is_err());
    }
}
