//! pdfium backend: rebuild table grids from positioned text segments.
//!
//! ## Algorithm
//!
//! 1. Read every text segment of the page with its bounding box
//!    (converted to a top-left origin).
//! 2. Cluster segments into rows: a segment joins the first row whose
//!    vertical centre is within `row_tolerance` points of its own.
//! 3. Walk the rows top to bottom and cut them into regions of consistent
//!    segment count (±1). Rows with a single segment end a region.
//! 4. Per region, cluster the segments' left edges (`col_tolerance` points)
//!    into column boundaries and drop each segment into the column its
//!    horizontal centre falls in. Segments sharing a cell are joined with a
//!    space; cells nothing falls into stay missing.
//!
//! ## Document lifetime
//!
//! A pdfium `PdfDocument` borrows the `Pdfium` binding, so the extractor
//! keeps the binding and a staged copy of the file and reopens the document
//! per call. pdfium loads from a path, which is why the bytes are staged.

use crate::error::{Pdf2TableError, TableError};
use crate::pipeline::extract::{check_page, load_error, TableExtractor};
use crate::pipeline::input::{PdfSource, StagedPdf};
use crate::table::{Cell, RawTableGrid};
use pdfium_render::prelude::*;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

const BACKEND: &str = "pdfium";

/// A text run with its box in points, origin at the top-left of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextSegment {
    fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Alignment tolerances for grid reconstruction.
#[derive(Debug, Clone, Copy)]
pub struct SegmentLayout {
    /// Segments whose vertical centres are within this distance share a row.
    pub row_tolerance: f32,
    /// Left edges within this distance share a column.
    pub col_tolerance: f32,
}

impl Default for SegmentLayout {
    fn default() -> Self {
        Self {
            row_tolerance: 5.0,
            col_tolerance: 10.0,
        }
    }
}

/// Bind a pdfium library: an explicit file or directory when given,
/// otherwise `./` and then the system search path.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Pdf2TableError> {
    let bindings = match library_path {
        Some(dir) if dir.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        }
        Some(file) => Pdfium::bind_to_library(file),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TableError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

pub struct PdfiumExtractor {
    pdfium: Pdfium,
    staged: StagedPdf,
    password: Option<String>,
    page_count: usize,
    layout: SegmentLayout,
}

struct PageContent {
    segments: Vec<TextSegment>,
    text: String,
}

impl PdfiumExtractor {
    pub fn open(
        source: &PdfSource,
        password: Option<&str>,
        library_path: Option<&Path>,
    ) -> Result<Self, Pdf2TableError> {
        let pdfium = bind_pdfium(library_path)?;
        let staged = source.stage()?;

        let page_count = {
            let document = pdfium
                .load_pdf_from_file(staged.path(), password)
                .map_err(|e| load_error(source.name(), BACKEND, password, format!("{:?}", e)))?;
            document.pages().len() as usize
        };

        Ok(Self {
            pdfium,
            staged,
            password: password.map(str::to_string),
            page_count,
            layout: SegmentLayout::default(),
        })
    }

    fn read_page(&self, page: usize) -> Result<PageContent, TableError> {
        check_page(page, self.page_count)?;
        let failed = |e: PdfiumError| TableError::PageFailed {
            page,
            detail: format!("{:?}", e),
        };

        let document = self
            .pdfium
            .load_pdf_from_file(self.staged.path(), self.password.as_deref())
            .map_err(failed)?;
        let pdf_page = document
            .pages()
            .get((page - 1) as u16)
            .map_err(failed)?;
        let page_height = pdf_page.height().value;
        let text = pdf_page.text().map_err(failed)?;

        let mut segments = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            segments.push(TextSegment {
                text: content.to_string(),
                x: bounds.left().value,
                y: page_height - bounds.top().value,
                width: bounds.right().value - bounds.left().value,
                height: bounds.top().value - bounds.bottom().value,
            });
        }

        debug!("Page {}: {} text segments", page, segments.len());
        Ok(PageContent {
            segments,
            text: text.all(),
        })
    }
}

impl TableExtractor for PdfiumExtractor {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn extract_table_grids(&self, page: usize) -> Result<Vec<RawTableGrid>, TableError> {
        let content = self.read_page(page)?;
        Ok(segments_to_grids(content.segments, &self.layout))
    }

    fn extract_text(&self, page: usize) -> Result<String, TableError> {
        Ok(self.read_page(page)?.text)
    }
}

// ── Grid reconstruction ──────────────────────────────────────────────────

/// Turn positioned segments into grids, one per aligned region.
pub fn segments_to_grids(mut segments: Vec<TextSegment>, layout: &SegmentLayout) -> Vec<RawTableGrid> {
    segments.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let rows = cluster_rows(&segments, layout.row_tolerance);
    find_regions(&rows)
        .iter()
        .filter_map(|region| build_grid(region, layout.col_tolerance))
        .collect()
}

fn cluster_rows(segments: &[TextSegment], tolerance: f32) -> Vec<Vec<&TextSegment>> {
    let mut rows: Vec<Vec<&TextSegment>> = Vec::new();

    for segment in segments {
        let existing = rows.iter().position(|row| {
            row.first()
                .is_some_and(|first| (segment.center_y() - first.center_y()).abs() <= tolerance)
        });
        match existing {
            Some(i) => rows[i].push(segment),
            None => rows.push(vec![segment]),
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows.sort_by(|a, b| {
        let ay = a.first().map_or(0.0, |s| s.y);
        let by = b.first().map_or(0.0, |s| s.y);
        ay.partial_cmp(&by).unwrap_or(Ordering::Equal)
    });
    rows
}

/// Cut rows into runs whose segment counts stay within ±1 of the run's
/// first row. Single-segment rows end a run.
fn find_regions<'a>(rows: &[Vec<&'a TextSegment>]) -> Vec<Vec<Vec<&'a TextSegment>>> {
    let mut regions = Vec::new();
    let mut current: Vec<Vec<&'a TextSegment>> = Vec::new();
    let mut expected: Option<usize> = None;

    for row in rows {
        let n = row.len();
        if n < 2 {
            if !current.is_empty() {
                regions.push(std::mem::take(&mut current));
            }
            expected = None;
            continue;
        }
        match expected {
            Some(cols) if n.abs_diff(cols) <= 1 => current.push(row.clone()),
            _ => {
                if !current.is_empty() {
                    regions.push(std::mem::take(&mut current));
                }
                current.push(row.clone());
                expected = Some(n);
            }
        }
    }
    if !current.is_empty() {
        regions.push(current);
    }
    regions
}

fn build_grid(region: &[Vec<&TextSegment>], col_tolerance: f32) -> Option<RawTableGrid> {
    let boundaries = column_boundaries(region, col_tolerance);
    let num_cols = boundaries.len().saturating_sub(1);
    if num_cols < 2 {
        return None;
    }

    let grid = region
        .iter()
        .map(|row| {
            let mut cells: Vec<Cell> = vec![None; num_cols];
            for segment in row {
                let col = column_index(segment, &boundaries).min(num_cols - 1);
                match &mut cells[col] {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&segment.text);
                    }
                    slot => *slot = Some(segment.text.clone()),
                }
            }
            cells
        })
        .collect();
    Some(grid)
}

/// Left edges of every column plus the right edge of the widest segment.
fn column_boundaries(region: &[Vec<&TextSegment>], tolerance: f32) -> Vec<f32> {
    let mut xs: Vec<f32> = region.iter().flatten().map(|s| s.x).collect();
    xs.sort_by(f32::total_cmp);

    let Some(&first) = xs.first() else {
        return Vec::new();
    };
    let mut boundaries = vec![first];
    for &x in &xs[1..] {
        if boundaries.last().is_some_and(|&last| x - last > tolerance) {
            boundaries.push(x);
        }
    }

    if let Some(max_right) = region
        .iter()
        .flatten()
        .map(|s| s.right())
        .max_by(f32::total_cmp)
    {
        boundaries.push(max_right);
    }
    boundaries
}

fn column_index(segment: &TextSegment, boundaries: &[f32]) -> usize {
    let center = segment.center_x();
    boundaries
        .windows(2)
        .position(|w| center >= w[0] && center < w[1])
        .unwrap_or_else(|| boundaries.len().saturating_sub(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, x: f32, y: f32, width: f32) -> TextSegment {
        TextSegment {
            text: text.to_string(),
            x,
            y,
            width,
            height: 10.0,
        }
    }

    fn texts(grid: &RawTableGrid) -> Vec<Vec<String>> {
        grid.iter()
            .map(|row| row.iter().map(|c| c.clone().unwrap_or_default()).collect())
            .collect()
    }

    #[test]
    fn aligned_segments_form_one_grid() {
        let segments = vec![
            seg("Name", 50.0, 100.0, 30.0),
            seg("Qty", 150.0, 101.0, 20.0),
            seg("Alice", 50.0, 120.0, 30.0),
            seg("3", 152.0, 119.0, 8.0),
            seg("Bob", 51.0, 140.0, 20.0),
            seg("5", 152.0, 140.0, 8.0),
        ];
        let grids = segments_to_grids(segments, &SegmentLayout::default());
        assert_eq!(grids.len(), 1);
        assert_eq!(
            texts(&grids[0]),
            vec![vec!["Name", "Qty"], vec!["Alice", "3"], vec!["Bob", "5"]]
        );
    }

    #[test]
    fn single_segment_rows_split_regions() {
        let segments = vec![
            seg("a", 50.0, 100.0, 10.0),
            seg("b", 150.0, 100.0, 10.0),
            seg("A heading line", 50.0, 130.0, 200.0),
            seg("c", 50.0, 160.0, 10.0),
            seg("d", 150.0, 160.0, 10.0),
        ];
        let grids = segments_to_grids(segments, &SegmentLayout::default());
        assert_eq!(grids.len(), 2);
        assert_eq!(texts(&grids[1]), vec![vec!["c", "d"]]);
    }

    #[test]
    fn missing_cells_stay_missing() {
        let segments = vec![
            seg("x", 50.0, 100.0, 10.0),
            seg("y", 150.0, 100.0, 10.0),
            seg("z", 250.0, 100.0, 10.0),
            seg("1", 50.0, 120.0, 10.0),
            seg("3", 250.0, 120.0, 10.0),
        ];
        let grids = segments_to_grids(segments, &SegmentLayout::default());
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0][1], vec![Some("1".into()), None, Some("3".into())]);
    }

    #[test]
    fn segments_in_same_column_are_joined() {
        let segments = vec![
            seg("left", 50.0, 100.0, 20.0),
            seg("right", 150.0, 100.0, 20.0),
            seg("more", 155.0, 100.0, 5.0),
        ];
        let grids = segments_to_grids(segments, &SegmentLayout::default());
        assert_eq!(texts(&grids[0]), vec![vec!["left", "right more"]]);
    }

    #[test]
    fn no_segments_no_grids() {
        assert!(segments_to_grids(Vec::new(), &SegmentLayout::default()).is_empty());
    }
}
