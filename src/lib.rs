//! # edgequake-pdf2table
//!
//! Detect, extract, clean and export the tables inside PDF documents.
//!
//! ## Why this crate?
//!
//! Tables in PDFs are only visual: there is no cell structure in the file,
//! just text drawn at positions. This crate rebuilds grids from that text,
//! scores them to find the pages that really hold tables, turns each grid
//! into a labelled table with clean, unique column names and writes the
//! result as an XLSX workbook or CSV files.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     load bytes, verify %PDF, stage to a temp file if needed
//!  ├─ 2. Extract   pdfium / lopdf / pdf-extract backend → raw grids or text
//!  ├─ 3. Detect    keep grids with rows ≥ sensitivity, ≥ 2 cols, > 30% filled
//!  ├─ 4. Assemble  header row → labels, prepend Source_Page / Table_Index
//!  ├─ 5. Clean     normalise labels, drop empty columns and blank rows
//!  └─ 6. Export    one workbook (sheet per table) or CSV file(s)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2table::{convert_to_dir, ConversionConfig, ExtractionMethod};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .method(ExtractionMethod::Layout)
//!         .sensitivity(4)
//!         .build()?;
//!     let (output, files) = convert_to_dir("statement.pdf", "out", &config).await?;
//!     if let Some(notice) = output.empty_notice() {
//!         eprintln!("{notice}");
//!     }
//!     for file in files {
//!         println!("wrote {}", file.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2table` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2table = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Backend
//!
//! | Method | Needs | Best for |
//! |--------|-------|----------|
//! | `pdfium` | libpdfium at runtime | Default: ruled and unruled tables, any layout |
//! | `layout` | nothing | Text PDFs whose columns are separated by wide gaps |
//! | `text`   | nothing | Last resort: one row per text line |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CleaningOptions, ConversionConfig, ConversionConfigBuilder, ExtractionMethod, OutputFormat,
    OutputLayout, PageMode, PageSelection,
};
pub use convert::{
    convert, convert_blocking, convert_from_bytes, convert_source, convert_sync, convert_to_dir,
    detect, detect_source, export_output, extract_tables,
};
pub use error::{Pdf2TableError, TableError};
pub use output::{ConversionOutput, ConversionStats, DetectionReport, ExtractedTable};
pub use pipeline::export::{export, write_artifacts, ExportArtifact};
pub use pipeline::extract::{open_detector, open_extractor, TableExtractor};
pub use pipeline::input::PdfSource;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ConversionSession;
pub use table::{Cell, RawTableGrid, Table, TableCandidate};
