//! Positioned-text input.
//!
//! The heuristics never touch pdfium types. `load_document` reads the
//! whole file up front into `DocumentPages` (page sizes, full text, word
//! tokens in reading order); tests build the same structure in memory via
//! `DocumentPages::from_pages`.

use std::path::Path;

use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::{ErrorContext, StampError, StampResult};
use crate::geom::{Rect, WordToken};

/// One page's worth of extracted input.
#[derive(Debug, Clone)]
pub struct PageData {
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub words: Vec<WordToken>,
}

/// All pages of a document, eagerly loaded. Word coordinates are top-down
/// (y grows toward the bottom of the page).
#[derive(Debug, Clone)]
pub struct DocumentPages {
    pages: Vec<PageData>,
}

impl DocumentPages {
    pub fn from_pages(pages: Vec<PageData>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageData] {
        &self.pages
    }
}

/// Read every page of the PDF at `path` into memory.
///
/// Fails with `InputNotFound` when the path does not exist and
/// `InputUnreadable` when pdfium rejects the file.
pub fn load_document(path: &Path) -> StampResult<DocumentPages> {
    if !path.exists() {
        return Err(StampError::input_not_found(path.to_string_lossy()));
    }

    let pdfium = Pdfium::new(
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                StampError::input_unreadable(format!("failed to initialize PDFium: {}", e))
            })?,
    );

    let document = pdfium
        .load_pdf_from_file(path, None)
        .with_context("failed to load PDF")?;

    let page_count = document.pages().len();
    let mut pages = Vec::with_capacity(page_count as usize);

    for index in 0..page_count {
        let page = document.pages().get(index).map_err(|e| {
            StampError::input_unreadable_with_source(
                format!("failed to load page {}", index + 1),
            e,
            )
        })?;
        let width = page.width().value;
        let height = page.height().value;

        let text = page.text().map_err(|e| {
            StampError::input_unreadable_with_source(
                format!("failed to extract text from page {}", index + 1),
                e,
            )
        })?;
        let full_text = text.all();

        let mut words = Vec::new();
        for segment in text.segments().iter() {
            let bounds = segment.bounds();
            let segment_text = segment.text();
            if segment_text.trim().is_empty() {
                continue;
            }
            // flip to top-down coordinates
            let left = bounds.left().value;
            let right = bounds.right().value;
            let top = height - bounds.top().value;
            let bottom = height - bounds.bottom().value;
            split_segment_words(
                &segment_text,
                left,
                right,
                top,
                bottom,
                index as usize,
                &mut words,
            );
        }

        debug!(
            page = index + 1,
            words = words.len(),
            "loaded page"
        );

        pages.push(PageData {
            width,
            height,
            text: full_text,
            words,
        });
    }

    Ok(DocumentPages { pages })
}

/// Split a text segment into whitespace-delimited words, apportioning the
/// segment's horizontal extent to each word by character count. Heights
/// are taken from the segment as-is.
fn split_segment_words(
    text: &str,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    page: usize,
    out: &mut Vec<WordToken>,
) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return;
    }
    let char_width = (right - left) / chars.len() as f32;

    let mut start = None;
    for (i, ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                push_word(&chars[s..i], s, i, left, char_width, top, bottom, page, out);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        push_word(
            &chars[s..],
            s,
            chars.len(),
            left,
            char_width,
            top,
            bottom,
            page,
            out,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn push_word(
    chars: &[char],
    start: usize,
    end: usize,
    left: f32,
    char_width: f32,
    top: f32,
    bottom: f32,
    page: usize,
    out: &mut Vec<WordToken>,
) {
    let text: String = chars.iter().collect();
    let bbox = Rect::new(
        left + start as f32 * char_width,
        top,
        left + end as f32 * char_width,
        bottom,
    );
    out.push(WordToken::new(bbox, text, page));
}
