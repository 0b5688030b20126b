//! Error types for the edgequake-pdf2table library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2TableError`] is **fatal**: the run cannot proceed at all (missing
//!   file, encrypted or malformed document, pdfium not available, output
//!   directory not writable). Returned as `Err(Pdf2TableError)` from the
//!   top-level `convert*` / `detect` functions.
//!
//! * [`TableError`] is **non-fatal**: one page or one table could not be turned
//!   into a grid, but every other page is fine. Collected in
//!   [`crate::output::ConversionOutput::failures`] so callers can show a
//!   partial result instead of losing the whole document to one bad table.
//!
//! An empty result (no qualifying tables anywhere) is neither: it is reported
//! through [`crate::output::ConversionOutput::empty_notice`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2table library.
#[derive(Debug, Error)]
pub enum Pdf2TableError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The extraction backend cannot parse the document at all (corrupt
    /// xref, unsupported encryption, truncated file).
    #[error("PDF '{name}' cannot be read by the {backend} backend: {detail}")]
    UnsupportedLayout {
        name: String,
        backend: &'static str,
        detail: String,
    },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The pdfium backend needs libpdfium at runtime. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the working directory.\n\
  • Use a text-layer backend instead: --method layout or --method text.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet or CSV writer rejected the data.
    #[error("Failed to export '{file_name}': {detail}")]
    ExportFailed { file_name: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page or a single table.
///
/// The orchestrator records it, reports it to the progress callback and moves
/// on to the next table.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum TableError {
    /// The backend could not read a page at all.
    #[error("Page {page}: extraction failed: {detail}")]
    PageFailed { page: usize, detail: String },

    /// One grid on a page could not be turned into a table.
    #[error("Page {page}, table {}: extraction failed: {detail}", table + 1)]
    ExtractionFailed {
        page: usize,
        table: usize,
        detail: String,
    },
}

impl TableError {
    /// The 1-based page the failure belongs to.
    pub fn page(&self) -> usize {
        match self {
            TableError::PageFailed { page, .. } | TableError::ExtractionFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_layout_display() {
        let e = Pdf2TableError::UnsupportedLayout {
            name: "report.pdf".into(),
            backend: "lopdf",
            detail: "invalid xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("report.pdf"), "got: {msg}");
        assert!(msg.contains("lopdf"), "got: {msg}");
        assert!(msg.contains("invalid xref"), "got: {msg}");
    }

    #[test]
    fn page_out_of_range_display() {
        let e = Pdf2TableError::PageOutOfRange { page: 9, total: 4 };
        assert_eq!(e.to_string(), "Page 9 is out of range (document has 4 pages)");
    }

    #[test]
    fn extraction_failed_reports_one_based_table() {
        let e = TableError::ExtractionFailed {
            page: 3,
            table: 0,
            detail: "grid has no columns".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3, table 1"), "got: {msg}");
        assert!(msg.contains("grid has no columns"));
        assert_eq!(e.page(), 3);
    }

    #[test]
    fn page_failed_display() {
        let e = TableError::PageFailed {
            page: 7,
            detail: "content stream missing".into(),
        };
        assert!(e.to_string().starts_with("Page 7:"));
        assert_eq!(e.page(), 7);
    }
}
