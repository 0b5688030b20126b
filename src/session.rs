//! Per-document conversion state: detection results and the page selection.
//!
//! A session belongs to one caller and one document. It is created from the
//! opened backend, filled by a detection run and narrowed by selection
//! calls; re-running detection (say, with another sensitivity) replaces the
//! earlier results. The orchestrator only reads
//! [`ConversionSession::selected_pages`].

use crate::config::{ConversionConfig, PageMode, PageSelection};
use crate::error::Pdf2TableError;
use crate::output::DetectionReport;
use crate::pipeline::detect::detect_tables;
use crate::pipeline::extract::TableExtractor;
use crate::progress::ProgressCallback;
use crate::table::TableCandidate;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ConversionSession {
    total_pages: usize,
    detection: Option<DetectionReport>,
    selected_pages: Vec<usize>,
}

impl ConversionSession {
    /// A fresh session for a document of `total_pages` pages with nothing
    /// detected or selected yet.
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            ..Default::default()
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Scan every page for candidates, replacing any previous results.
    ///
    /// The selection becomes the set of pages with candidates.
    pub fn run_detection(
        &mut self,
        extractor: &dyn TableExtractor,
        sensitivity: u8,
        progress: Option<&ProgressCallback>,
    ) -> &DetectionReport {
        let pages: Vec<usize> = (1..=self.total_pages).collect();
        let report = detect_tables(extractor, &pages, sensitivity, progress);
        self.selected_pages = report.pages();
        self.detection.insert(report)
    }

    /// The latest detection report, if detection has run.
    pub fn detection(&self) -> Option<&DetectionReport> {
        self.detection.as_ref()
    }

    /// Candidates by page from the latest detection run (empty before one).
    pub fn candidates(&self) -> BTreeMap<usize, Vec<TableCandidate>> {
        self.detection
            .as_ref()
            .map(|d| d.candidates.clone())
            .unwrap_or_default()
    }

    /// Pages with candidates, ascending.
    pub fn detected_pages(&self) -> Vec<usize> {
        self.detection
            .as_ref()
            .map(DetectionReport::pages)
            .unwrap_or_default()
    }

    /// Select pages explicitly.
    ///
    /// Explicitly named pages past the end of the document are an error; the
    /// end of a range is clamped to the last page.
    pub fn select(&mut self, selection: &PageSelection) -> Result<&[usize], Pdf2TableError> {
        let out_of_range = match selection {
            PageSelection::All => None,
            PageSelection::Single(p) => Some(*p),
            PageSelection::Range(start, _) => Some(*start),
            PageSelection::Set(pages) => pages.iter().copied().max(),
        }
        .filter(|&p| p > self.total_pages);

        if let Some(page) = out_of_range {
            return Err(Pdf2TableError::PageOutOfRange {
                page,
                total: self.total_pages,
            });
        }
        self.selected_pages = selection.to_pages(self.total_pages);
        debug!("Selected pages: {:?}", self.selected_pages);
        Ok(&self.selected_pages)
    }

    /// Select the detected pages that also fall within `filter`.
    pub fn select_detected(&mut self, filter: &PageSelection) -> &[usize] {
        self.selected_pages = self
            .detected_pages()
            .into_iter()
            .filter(|&p| filter.contains(p))
            .collect();
        &self.selected_pages
    }

    /// Select every page of the document.
    pub fn select_all(&mut self) -> &[usize] {
        self.selected_pages = (1..=self.total_pages).collect();
        &self.selected_pages
    }

    /// Pages the next extraction will process, ascending.
    pub fn selected_pages(&self) -> &[usize] {
        &self.selected_pages
    }

    /// Apply the page mode of `config`.
    ///
    /// Auto-detection runs detection unless it has already run, then narrows
    /// the detected pages to `config.pages`.
    pub fn resolve_selection(
        &mut self,
        extractor: &dyn TableExtractor,
        config: &ConversionConfig,
    ) -> Result<&[usize], Pdf2TableError> {
        match config.page_mode {
            PageMode::AutoDetect => {
                if self.detection.is_none() {
                    self.run_detection(
                        extractor,
                        config.sensitivity,
                        config.progress_callback.as_ref(),
                    );
                }
                let pages = self.select_detected(&config.pages);
                info!("Auto-detect selected {} pages", pages.len());
                Ok(pages)
            }
            PageMode::Manual => self.select(&config.pages),
            PageMode::All => Ok(self.select_all()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::table::RawTableGrid;

    /// Pages listed in `tables` hold one dense 4×2 grid; others are empty.
    struct Fake {
        pages: usize,
        tables: Vec<usize>,
    }

    impl TableExtractor for Fake {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn page_count(&self) -> usize {
            self.pages
        }
        fn extract_table_grids(&self, page: usize) -> Result<Vec<RawTableGrid>, TableError> {
            if self.tables.contains(&page) {
                Ok(vec![vec![vec![Some("a".into()), Some("b".into())]; 4]])
            } else {
                Ok(Vec::new())
            }
        }
        fn extract_text(&self, _page: usize) -> Result<String, TableError> {
            Ok(String::new())
        }
    }

    fn fake() -> Fake {
        Fake {
            pages: 6,
            tables: vec![2, 4, 5],
        }
    }

    #[test]
    fn detection_selects_pages_with_candidates() {
        let mut session = ConversionSession::new(6);
        assert!(session.detection().is_none());
        let report = session.run_detection(&fake(), 3, None);
        assert_eq!(report.pages(), vec![2, 4, 5]);
        assert_eq!(session.selected_pages(), &[2, 4, 5]);
        assert_eq!(session.candidates().len(), 3);
    }

    #[test]
    fn rerunning_detection_replaces_results() {
        let mut session = ConversionSession::new(6);
        session.run_detection(&fake(), 3, None);
        session.run_detection(&fake(), 5, None);
        assert!(session.candidates().is_empty());
        assert!(session.selected_pages().is_empty());
    }

    #[test]
    fn detected_pages_narrowed_by_filter() {
        let mut session = ConversionSession::new(6);
        session.run_detection(&fake(), 3, None);
        assert_eq!(session.select_detected(&PageSelection::Range(3, 6)), &[4, 5]);
    }

    #[test]
    fn explicit_selection_and_out_of_range() {
        let mut session = ConversionSession::new(6);
        assert_eq!(session.select(&PageSelection::Set(vec![5, 1, 5])).unwrap(), &[1, 5]);
        assert_eq!(session.select(&PageSelection::Range(4, 99)).unwrap(), &[4, 5, 6]);
        let err = session.select(&PageSelection::Single(7)).unwrap_err();
        assert!(matches!(err, Pdf2TableError::PageOutOfRange { page: 7, total: 6 }));
    }

    #[test]
    fn resolve_follows_page_mode() {
        let extractor = fake();

        let mut session = ConversionSession::new(6);
        let config = ConversionConfig::default();
        assert_eq!(session.resolve_selection(&extractor, &config).unwrap(), &[2, 4, 5]);

        let config = ConversionConfig::builder()
            .page_mode(PageMode::Manual)
            .pages(PageSelection::Single(3))
            .build()
            .unwrap();
        assert_eq!(session.resolve_selection(&extractor, &config).unwrap(), &[3]);

        let config = ConversionConfig::builder()
            .page_mode(PageMode::All)
            .build()
            .unwrap();
        assert_eq!(
            session.resolve_selection(&extractor, &config).unwrap(),
            &[1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn resolve_reuses_existing_detection() {
        let mut session = ConversionSession::new(6);
        session.run_detection(&fake(), 6, None);
        // Detection at 6 found nothing; resolving must not rescan at 3.
        let config = ConversionConfig::default();
        assert!(session.resolve_selection(&fake(), &config).unwrap().is_empty());
    }
}
