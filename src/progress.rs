//! Progress-callback trait for detection and extraction events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline scans and extracts each page. The core pipeline
//! never prints anything itself; the CLI renders these events with an
//! `indicatif` bar and a library caller can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2table::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ScanCounter {
//!     scanned: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for ScanCounter {
//!     fn on_page_scanned(&self, pages_done: usize, pages_total: usize) {
//!         self.scanned.store(pages_done, Ordering::SeqCst);
//!         eprintln!("scanned {pages_done}/{pages_total}");
//!     }
//! }
//!
//! let counter = Arc::new(ScanCounter { scanned: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it detects and extracts tables.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, so events arrive in page
/// order; the trait is still `Send + Sync` because the async entry points
/// move the work onto Tokio's blocking pool.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the detection scan.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be scanned
    fn on_detection_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page has been scanned for candidate tables.
    ///
    /// # Arguments
    /// * `pages_done`  — pages scanned so far
    /// * `pages_total` — pages that will be scanned in total
    fn on_page_scanned(&self, pages_done: usize, pages_total: usize) {
        let _ = (pages_done, pages_total);
    }

    /// Called before extraction of a selected page.
    ///
    /// # Arguments
    /// * `page_num`       — 1-indexed page number
    /// * `selected_total` — number of selected pages
    fn on_page_start(&self, page_num: usize, selected_total: usize) {
        let _ = (page_num, selected_total);
    }

    /// Called after a selected page has been processed, successfully or not.
    ///
    /// # Arguments
    /// * `page_num`       — 1-indexed page number
    /// * `pages_done`     — selected pages processed so far
    /// * `selected_total` — number of selected pages
    fn on_page_complete(&self, page_num: usize, pages_done: usize, selected_total: usize) {
        let _ = (page_num, pages_done, selected_total);
    }

    /// Called when a table survives cleaning.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `table_index` — 0-based index of the table on the page
    /// * `rows`        — row count after cleaning
    fn on_table_extracted(&self, page_num: usize, table_index: usize, rows: usize) {
        let _ = (page_num, table_index, rows);
    }

    /// Called when a single table is skipped.
    fn on_table_error(&self, page_num: usize, table_index: usize, error: &str) {
        let _ = (page_num, table_index, error);
    }

    /// Called when a whole page could not be read by the backend.
    fn on_page_error(&self, page_num: usize, error: &str) {
        let _ = (page_num, error);
    }

    /// Called when detection or extraction produced no qualifying tables.
    fn on_empty_result(&self, notice: &str) {
        let _ = notice;
    }

    /// Called once after every selected page has been attempted.
    ///
    /// # Arguments
    /// * `tables`   — tables in the output
    /// * `failures` — tables or pages that were skipped
    fn on_conversion_complete(&self, tables: usize, failures: usize) {
        let _ = (tables, failures);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        scanned: Mutex<Vec<(usize, usize)>>,
        tables: AtomicUsize,
        errors: AtomicUsize,
        empty: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_scanned(&self, pages_done: usize, pages_total: usize) {
            self.scanned.lock().unwrap().push((pages_done, pages_total));
        }

        fn on_table_extracted(&self, _page_num: usize, _table_index: usize, _rows: usize) {
            self.tables.fetch_add(1, Ordering::SeqCst);
        }

        fn on_table_error(&self, _page_num: usize, _table_index: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_empty_result(&self, _notice: &str) {
            self.empty.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_detection_start(5);
        cb.on_page_scanned(1, 5);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 1, 2);
        cb.on_table_extracted(1, 0, 12);
        cb.on_table_error(2, 1, "bad grid");
        cb.on_page_error(3, "unreadable");
        cb.on_empty_result("nothing found");
        cb.on_conversion_complete(1, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_scanned(1, 3);
        tracker.on_page_scanned(2, 3);
        tracker.on_page_scanned(3, 3);
        tracker.on_table_extracted(1, 0, 4);
        tracker.on_table_extracted(2, 0, 9);
        tracker.on_table_error(2, 1, "mismatch");

        assert_eq!(*tracker.scanned.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(tracker.tables.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.empty.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_detection_start(10);
        cb.on_page_scanned(1, 10);
    }
}
