//! Table detection: score every grid a backend finds and keep the ones that
//! look like real tables.
//!
//! A grid becomes a [`TableCandidate`] when all three hold:
//!
//! | Criterion | Rule |
//! |-----------|------|
//! | size | `rows ≥ sensitivity` |
//! | shape | `cols ≥ 2` (cols = widest row) |
//! | density | `fill_ratio > 0.30` (strict) |
//!
//! Sensitivity doubles as the minimum row count: raising it biases towards
//! larger, more obviously tabular structures and also rejects genuinely small
//! tables. Grids with no rows or with nothing but blank cells never reach
//! scoring.
//!
//! Detection is a pure function of the document and the threshold; the only
//! side effects are log lines and calls to the injected progress observer.

use crate::error::TableError;
use crate::output::DetectionReport;
use crate::pipeline::extract::TableExtractor;
use crate::progress::ProgressCallback;
use crate::table::{grid_width, is_blank, RawTableGrid, TableCandidate, PREVIEW_ROWS};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Minimum number of columns for a candidate.
pub const MIN_COLUMNS: usize = 2;

/// Fill ratio a candidate must strictly exceed, as a fraction `NUM / DEN`
/// so the boundary comparison is exact.
const MIN_FILL_NUM: usize = 3;
const MIN_FILL_DEN: usize = 10;

/// Characters of page 1 kept in [`DetectionReport::first_page_preview`].
pub const PREVIEW_CHARS: usize = 1000;

/// Fill ratio a candidate must strictly exceed.
pub const MIN_FILL_RATIO: f64 = MIN_FILL_NUM as f64 / MIN_FILL_DEN as f64;

/// Count non-blank cells of a grid.
fn filled_cells(grid: &[Vec<Option<String>>]) -> usize {
    grid.iter().flatten().filter(|c| !is_blank(c)).count()
}

/// Fraction of non-blank cells over the grid's `rows × cols` bounding box.
///
/// Returns `0.0` for a grid with no rows or no columns.
pub fn fill_ratio(grid: &[Vec<Option<String>>]) -> f64 {
    let area = grid.len() * grid_width(grid);
    if area == 0 {
        return 0.0;
    }
    filled_cells(grid) as f64 / area as f64
}

/// Score a single grid. `None` when it fails any acceptance criterion.
pub fn score_grid(
    page: usize,
    table_index: usize,
    grid: &RawTableGrid,
    sensitivity: u8,
) -> Option<TableCandidate> {
    let rows = grid.len();
    let cols = grid_width(grid);
    let filled = filled_cells(grid);

    if rows == 0 || filled == 0 {
        return None;
    }

    let area = rows * cols;
    let dense_enough = filled * MIN_FILL_DEN > area * MIN_FILL_NUM;
    if rows < usize::from(sensitivity) || cols < MIN_COLUMNS || !dense_enough {
        return None;
    }

    Some(TableCandidate {
        page,
        table_index,
        rows,
        cols,
        fill_ratio: filled as f64 / area as f64,
        preview: grid.iter().take(PREVIEW_ROWS).cloned().collect(),
    })
}

/// Score every grid the backend finds on one page.
pub fn detect_page(
    extractor: &dyn TableExtractor,
    page: usize,
    sensitivity: u8,
) -> Result<Vec<TableCandidate>, TableError> {
    let grids = extractor.extract_table_grids(page)?;

    let candidates: Vec<TableCandidate> = grids
        .iter()
        .enumerate()
        .filter_map(|(idx, grid)| score_grid(page, idx, grid, sensitivity))
        .collect();

    debug!(
        "Page {}: {} grids, {} candidates",
        page,
        grids.len(),
        candidates.len()
    );
    Ok(candidates)
}

/// Scan `pages` (1-indexed, in the order given) and collect the candidates.
///
/// Pages without candidates are absent from the report. A page the backend
/// cannot read is recorded as a failure and the scan continues.
pub fn detect_tables(
    extractor: &dyn TableExtractor,
    pages: &[usize],
    sensitivity: u8,
    progress: Option<&ProgressCallback>,
) -> DetectionReport {
    let total = pages.len();
    info!(
        "Scanning {} pages for tables (sensitivity {})",
        total, sensitivity
    );
    if let Some(cb) = progress {
        cb.on_detection_start(total);
    }

    let mut candidates: BTreeMap<usize, Vec<TableCandidate>> = BTreeMap::new();
    let mut failures = Vec::new();

    for (done, &page) in pages.iter().enumerate() {
        match detect_page(extractor, page, sensitivity) {
            Ok(found) if !found.is_empty() => {
                candidates.insert(page, found);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("{}", e);
                if let Some(cb) = progress {
                    cb.on_page_error(page, &e.to_string());
                }
                failures.push(e);
            }
        }
        if let Some(cb) = progress {
            cb.on_page_scanned(done + 1, total);
        }
    }

    let report = DetectionReport {
        total_pages: extractor.page_count(),
        pages_scanned: total,
        candidates,
        failures,
        first_page_preview: first_page_preview(extractor),
        ..Default::default()
    };
    info!(
        "Detection complete: {} candidates on {} pages",
        report.candidate_count(),
        report.candidates.len()
    );
    report
}

/// The first [`PREVIEW_CHARS`] characters of page 1's text, trimmed.
///
/// Empty when the document has no pages or page 1 has no readable text.
pub fn first_page_preview(extractor: &dyn TableExtractor) -> String {
    if extractor.page_count() == 0 {
        return String::new();
    }
    match extractor.extract_text(1) {
        Ok(text) => text.trim().chars().take(PREVIEW_CHARS).collect(),
        Err(e) => {
            debug!("No first-page preview: {}", e);
            String::new()
        }
    }
}
