//! `lopdf` backend: rebuild text lines from the content stream and split
//! them into cells on tab stops or wide gaps.
//!
//! Text-positioning operators (`T*`, `Td`, `TD`) and `ET` end a line;
//! `Tj`, `TJ`, `'` and `"` contribute text. In a `TJ` array a kerning offset
//! below -100 thousandths of an em is wide enough to read as a space.
//!
//! A grid is a run of consecutive lines that each split into at least two
//! cells. A line with fewer cells ends the run.

use crate::error::{Pdf2TableError, TableError};
use crate::pipeline::extract::{check_page, load_error, TableExtractor};
use crate::pipeline::input::PdfSource;
use crate::table::RawTableGrid;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

const BACKEND: &str = "layout";

/// Kerning offset (thousandths of an em) that reads as a word gap.
const KERNING_SPACE: i64 = -100;

pub struct LayoutExtractor {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl LayoutExtractor {
    pub fn open(source: &PdfSource, password: Option<&str>) -> Result<Self, Pdf2TableError> {
        let document = load_document(source, BACKEND, password)?;
        let pages = document.get_pages();
        Ok(Self { document, pages })
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, TableError> {
        check_page(page, self.pages.len())?;
        u32::try_from(page)
            .ok()
            .and_then(|p| self.pages.get(&p).copied())
            .ok_or_else(|| TableError::PageFailed {
                page,
                detail: "page not found in page tree".to_string(),
            })
    }

    /// Page text from the content stream, falling back to lopdf's own
    /// extraction when the stream yields nothing.
    fn page_text(&self, page: usize) -> Result<String, TableError> {
        let page_id = self.page_id(page)?;
        if let Some(text) = text_from_content_stream(&self.document, page_id) {
            return Ok(text);
        }
        debug!("Page {}: content stream gave no text, using fallback", page);
        let page_no = page as u32;
        self.document
            .extract_text(&[page_no])
            .map_err(|e| TableError::PageFailed {
                page,
                detail: e.to_string(),
            })
    }
}

impl TableExtractor for LayoutExtractor {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_table_grids(&self, page: usize) -> Result<Vec<RawTableGrid>, TableError> {
        let text = self.page_text(page)?;
        Ok(grids_from_lines(&text))
    }

    fn extract_text(&self, page: usize) -> Result<String, TableError> {
        self.page_text(page)
    }
}

/// Load a document with lopdf, decrypting it when needed.
pub(crate) fn load_document(
    source: &PdfSource,
    backend: &'static str,
    password: Option<&str>,
) -> Result<Document, Pdf2TableError> {
    let mut document = Document::load_mem(source.bytes())
        .map_err(|e| load_error(source.name(), backend, password, e.to_string()))?;

    if document.is_encrypted() {
        match password {
            Some(pw) => document
                .decrypt(pw)
                .map_err(|_| Pdf2TableError::WrongPassword {
                    name: source.name().to_string(),
                })?,
            None => {
                return Err(Pdf2TableError::PasswordRequired {
                    name: source.name().to_string(),
                })
            }
        }
    }
    Ok(document)
}

/// Rebuild the text lines of one page from its content stream.
///
/// `None` when the stream cannot be decoded or contains no text.
pub(crate) fn text_from_content_stream(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => {
                    text.push_str(&Document::decode_text(encoding, bytes));
                }
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                }
                Object::Integer(value) if *value < KERNING_SPACE => text.push(' '),
                Object::Real(value) if f64::from(*value) < KERNING_SPACE as f64 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => {}
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Split a text line into cells on tabs or runs of two or more whitespace
/// characters. Single spaces stay inside a cell.
pub fn split_line_into_cells(line: &str) -> Vec<String> {
    fn flush(current: &mut String, cells: &mut Vec<String>) {
        let cell = current.trim();
        if !cell.is_empty() {
            cells.push(cell.to_string());
        }
        current.clear();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in line.trim().chars() {
        if ch == '\t' {
            flush(&mut current, &mut cells);
            whitespace_run = 0;
        } else if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                flush(&mut current, &mut cells);
            } else {
                current.push(' ');
            }
        } else {
            whitespace_run = 0;
            current.push(ch);
        }
    }
    flush(&mut current, &mut cells);
    cells
}

/// Group consecutive multi-cell lines into grids.
pub fn grids_from_lines(text: &str) -> Vec<RawTableGrid> {
    let mut grids = Vec::new();
    let mut current: RawTableGrid = Vec::new();

    for line in text.lines() {
        let cells = split_line_into_cells(line);
        if cells.len() >= 2 {
            current.push(cells.into_iter().map(Some).collect());
        } else if !current.is_empty() {
            grids.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        grids.push(current);
    }
    grids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_wide_gaps_and_tabs() {
        assert_eq!(
            split_line_into_cells("Unit Price   Qty\tTotal"),
            vec!["Unit Price", "Qty", "Total"]
        );
        assert_eq!(split_line_into_cells("  a  b  "), vec!["a", "b"]);
        assert_eq!(split_line_into_cells("one cell only"), vec!["one cell only"]);
        assert!(split_line_into_cells("   ").is_empty());
    }

    #[test]
    fn consecutive_multi_cell_lines_form_one_grid() {
        let text = "Quarterly report\n\
                    Region  Sales  Units\n\
                    North  100  4\n\
                    South  80  3\n\
                    \n\
                    Notes follow here\n\
                    a  b\n";
        let grids = grids_from_lines(text);
        assert_eq!(grids.len(), 2);
        assert_eq!(grids[0].len(), 3);
        assert_eq!(
            grids[0][0],
            vec![Some("Region".into()), Some("Sales".into()), Some("Units".into())]
        );
        assert_eq!(grids[1], vec![vec![Some("a".into()), Some("b".into())]]);
    }

    #[test]
    fn prose_yields_no_grids() {
        assert!(grids_from_lines("just some prose\nacross two lines").is_empty());
        assert!(grids_from_lines("").is_empty());
    }
}
