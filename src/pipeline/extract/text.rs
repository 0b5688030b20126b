//! `pdf-extract` backend: plain page text, no table structure.
//!
//! `pdf-extract` renders the whole document at once with a form feed
//! between pages. When the number of form-feed pages disagrees with the page
//! tree (it sometimes drops blank pages), or when it fails or panics, per-page
//! text comes from the content stream instead.

use crate::error::{Pdf2TableError, TableError};
use crate::pipeline::extract::layout::{load_document, text_from_content_stream};
use crate::pipeline::extract::{check_page, TableExtractor};
use crate::pipeline::input::PdfSource;
use crate::table::RawTableGrid;
use lopdf::{Document, ObjectId};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const BACKEND: &str = "text";

pub struct PlainTextExtractor {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
    /// Per-page text from `pdf-extract`, when it lines up with the page tree.
    split_pages: Option<Vec<String>>,
}

impl PlainTextExtractor {
    pub fn open(source: &PdfSource, password: Option<&str>) -> Result<Self, Pdf2TableError> {
        let document = load_document(source, BACKEND, password)?;
        let pages = document.get_pages();

        let split_pages = guarded_page_texts(source.name(), pages.len(), || {
            pdf_extract::extract_text_from_mem(source.bytes())
        });

        Ok(Self {
            document,
            pages,
            split_pages,
        })
    }

    fn fallback_text(&self, page: usize) -> Result<String, TableError> {
        let page_no = page as u32;
        if let Some(&page_id) = self.pages.get(&page_no) {
            if let Some(text) = text_from_content_stream(&self.document, page_id) {
                return Ok(text);
            }
        }
        self.document
            .extract_text(&[page_no])
            .map_err(|e| TableError::PageFailed {
                page,
                detail: e.to_string(),
            })
    }
}

impl TableExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// One single-column grid holding every non-blank line of the page.
    fn extract_table_grids(&self, page: usize) -> Result<Vec<RawTableGrid>, TableError> {
        let text = self.extract_text(page)?;
        let grid: RawTableGrid = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| vec![Some(l.to_string())])
            .collect();
        Ok(if grid.is_empty() { Vec::new() } else { vec![grid] })
    }

    fn extract_text(&self, page: usize) -> Result<String, TableError> {
        check_page(page, self.pages.len())?;
        match self
            .split_pages
            .as_ref()
            .and_then(|pages| pages.get(page - 1))
            .filter(|text| !text.trim().is_empty())
        {
            Some(text) => Ok(text.clone()),
            None => self.fallback_text(page),
        }
    }

    fn text_only(&self) -> bool {
        true
    }
}

/// Run a whole-document text extraction and split it into pages.
///
/// `None` (use the content streams) when the extraction fails, panics, or
/// yields a different number of pages than `expected_pages`. pdf-extract
/// panics on some malformed fonts.
fn guarded_page_texts<E, F>(name: &str, expected_pages: usize, extract: F) -> Option<Vec<String>>
where
    E: std::fmt::Display,
    F: FnOnce() -> Result<String, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(text)) => {
            let split = split_text_into_pages(&text);
            if split.len() == expected_pages {
                Some(split)
            } else {
                debug!(
                    "pdf-extract produced {} pages, page tree has {}; using content streams",
                    split.len(),
                    expected_pages
                );
                None
            }
        }
        Ok(Err(e)) => {
            warn!("pdf-extract failed on '{}': {}", name, e);
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked on '{}'; using content streams", name);
            None
        }
    }
}

/// Split form-feed separated text into pages, ignoring the empty tail after
/// a final form feed.
fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw_text.split('\u{000C}').map(str::to_string).collect();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}
