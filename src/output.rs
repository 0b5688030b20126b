//! Result types returned by detection and conversion.

use crate::error::TableError;
use crate::table::{Table, TableCandidate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Notice returned when detection finds nothing.
pub const NO_CANDIDATES_NOTICE: &str =
    "No tables were detected. Try a lower sensitivity or another extraction method.";

/// Notice returned when extraction produces nothing.
pub const NO_TABLES_NOTICE: &str =
    "No tables were extracted from the selected pages. Try another extraction method or page selection.";

/// Outcome of a detection scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that were scanned.
    pub pages_scanned: usize,
    /// Page number → accepted candidates. Pages without candidates are absent.
    pub candidates: BTreeMap<usize, Vec<TableCandidate>>,
    /// Pages the backend could not read.
    pub failures: Vec<TableError>,
    /// Size of the scanned PDF in bytes.
    pub input_bytes: u64,
    /// The opening text of page 1, so a caller can check it picked the
    /// right document.
    pub first_page_preview: String,
}

impl DetectionReport {
    /// Total candidates across all pages.
    pub fn candidate_count(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    /// Pages with at least one candidate, ascending.
    pub fn pages(&self) -> Vec<usize> {
        self.candidates.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// A user-facing notice when nothing qualified.
    pub fn empty_notice(&self) -> Option<&'static str> {
        self.is_empty().then_some(NO_CANDIDATES_NOTICE)
    }
}

/// A cleaned table together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// 1-indexed source page.
    pub page: usize,
    /// 0-based position among the tables of the source page.
    pub table_index: usize,
    pub table: Table,
    /// Missing or blank cells in the cleaned table.
    pub missing_values: usize,
}

impl ExtractedTable {
    pub fn new(page: usize, table_index: usize, table: Table) -> Self {
        Self {
            page,
            table_index,
            missing_values: table.empty_cells(),
            table,
        }
    }
}

/// Summary statistics for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Size of the input PDF in bytes.
    pub input_bytes: u64,
    /// Pages in the document.
    pub total_pages: usize,
    /// Candidate tables found by detection (0 when detection did not run).
    pub candidates_detected: usize,
    /// Pages chosen for extraction.
    pub selected_pages: usize,
    /// Tables in the output.
    pub tables_extracted: usize,
    /// Tables that were empty after cleaning.
    pub tables_dropped: usize,
    /// Tables or pages that failed.
    pub failed: usize,
    /// Data rows across all output tables.
    pub total_rows: usize,
    /// Missing or blank cells across all output tables.
    pub missing_values: usize,
    /// Time spent in the detection scan (0 when detection did not run).
    pub detection_duration_ms: u64,
    /// Time spent extracting and cleaning.
    pub extraction_duration_ms: u64,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// File name of the converted document; output files are named after it.
    pub source_name: String,
    /// Cleaned tables in page order, then table order within a page.
    pub tables: Vec<ExtractedTable>,
    /// Tables and pages that were skipped, with context.
    pub failures: Vec<TableError>,
    /// The detection report, when the run used auto-detection.
    pub detection: Option<DetectionReport>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// A user-facing notice when nothing was extracted.
    pub fn empty_notice(&self) -> Option<&'static str> {
        if !self.is_empty() {
            return None;
        }
        match &self.detection {
            Some(report) if report.is_empty() => Some(NO_CANDIDATES_NOTICE),
            _ => Some(NO_TABLES_NOTICE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(page: usize, table_index: usize) -> TableCandidate {
        TableCandidate {
            page,
            table_index,
            rows: 3,
            cols: 2,
            fill_ratio: 1.0,
            preview: vec![],
        }
    }

    #[test]
    fn report_counts_and_pages() {
        let mut report = DetectionReport::default();
        assert!(report.is_empty());
        assert_eq!(report.empty_notice(), Some(NO_CANDIDATES_NOTICE));

        report.candidates.insert(4, vec![candidate(4, 0), candidate(4, 1)]);
        report.candidates.insert(2, vec![candidate(2, 0)]);
        assert_eq!(report.candidate_count(), 3);
        assert_eq!(report.pages(), vec![2, 4]);
        assert_eq!(report.empty_notice(), None);
    }

    #[test]
    fn output_notice_distinguishes_detection_from_extraction() {
        let out = ConversionOutput {
            detection: Some(DetectionReport::default()),
            ..Default::default()
        };
        assert_eq!(out.empty_notice(), Some(NO_CANDIDATES_NOTICE));

        let out = ConversionOutput::default();
        assert_eq!(out.empty_notice(), Some(NO_TABLES_NOTICE));

        let out = ConversionOutput {
            tables: vec![ExtractedTable::new(1, 0, Table::default())],
            ..Default::default()
        };
        assert_eq!(out.empty_notice(), None);
    }

    #[test]
    fn extracted_table_counts_missing_values() {
        let table = Table::with_columns(
            vec![Some("a".into()), Some("b".into())],
            vec![vec![Some("1".into()), Some(String::new())], vec![None]],
        )
        .unwrap();
        let extracted = ExtractedTable::new(3, 1, table);
        assert_eq!((extracted.page, extracted.table_index), (3, 1));
        assert_eq!(extracted.missing_values, 3);
    }
}
