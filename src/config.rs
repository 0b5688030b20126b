//! Configuration types for PDF table extraction.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. One struct holds every knob: which backend
//! reads the PDF, how strict detection is, which pages are processed, how
//! tables are cleaned and how they are exported.

use crate::error::Pdf2TableError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lowest accepted detection sensitivity.
pub const MIN_SENSITIVITY: u8 = 1;
/// Highest accepted detection sensitivity.
pub const MAX_SENSITIVITY: u8 = 10;

/// Configuration for a PDF-to-table conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2table::{ConversionConfig, ExtractionMethod, OutputFormat};
///
/// let config = ConversionConfig::builder()
///     .method(ExtractionMethod::Layout)
///     .output_format(OutputFormat::Csv)
///     .sensitivity(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.sensitivity, 5);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Backend used to read grids and text from the PDF. Default: [`ExtractionMethod::Pdfium`].
    pub method: ExtractionMethod,

    /// Detection sensitivity, 1–10. Default: 3.
    ///
    /// The value is the minimum number of rows a grid needs before it is
    /// offered as a candidate table, so higher values keep only larger,
    /// more obviously tabular structures.
    pub sensitivity: u8,

    /// How pages are chosen for extraction. Default: [`PageMode::AutoDetect`].
    pub page_mode: PageMode,

    /// Explicit page list. Default: all pages.
    ///
    /// In [`PageMode::Manual`] these are the pages processed. In
    /// [`PageMode::AutoDetect`] the detected pages are narrowed to this list.
    /// Ignored in [`PageMode::All`].
    pub pages: PageSelection,

    /// Record-cleaning switches. Default: all on.
    pub cleaning: CleaningOptions,

    /// Spreadsheet or delimited output. Default: [`OutputFormat::Xlsx`].
    pub output_format: OutputFormat,

    /// One sheet/file per table, or everything merged. Default: per table.
    pub output_layout: OutputLayout,

    /// Field delimiter for CSV output. Default: `b','`.
    pub csv_delimiter: u8,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit pdfium library (file or directory). Default: `./`, then the
    /// system library search path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            method: ExtractionMethod::default(),
            sensitivity: 3,
            page_mode: PageMode::default(),
            pages: PageSelection::default(),
            cleaning: CleaningOptions::default(),
            output_format: OutputFormat::default(),
            output_layout: OutputLayout::default(),
            csv_delimiter: b',',
            password: None,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("method", &self.method)
            .field("sensitivity", &self.sensitivity)
            .field("page_mode", &self.page_mode)
            .field("pages", &self.pages)
            .field("cleaning", &self.cleaning)
            .field("output_format", &self.output_format)
            .field("output_layout", &self.output_layout)
            .field("csv_delimiter", &(self.csv_delimiter as char))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn method(mut self, method: ExtractionMethod) -> Self {
        self.config.method = method;
        self
    }

    pub fn sensitivity(mut self, n: u8) -> Self {
        self.config.sensitivity = n.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        self
    }

    pub fn page_mode(mut self, mode: PageMode) -> Self {
        self.config.page_mode = mode;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn cleaning(mut self, cleaning: CleaningOptions) -> Self {
        self.config.cleaning = cleaning;
        self
    }

    pub fn normalize_columns(mut self, v: bool) -> Self {
        self.config.cleaning.normalize_columns = v;
        self
    }

    pub fn drop_empty_columns(mut self, v: bool) -> Self {
        self.config.cleaning.drop_empty_columns = v;
        self
    }

    pub fn fill_missing(mut self, v: bool) -> Self {
        self.config.cleaning.fill_missing = v;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn output_layout(mut self, layout: OutputLayout) -> Self {
        self.config.output_layout = layout;
        self
    }

    pub fn csv_delimiter(mut self, delimiter: u8) -> Self {
        self.config.csv_delimiter = delimiter;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2TableError> {
        let c = &self.config;
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&c.sensitivity) {
            return Err(Pdf2TableError::InvalidConfig(format!(
                "Sensitivity must be {MIN_SENSITIVITY}–{MAX_SENSITIVITY}, got {}",
                c.sensitivity
            )));
        }
        if !c.csv_delimiter.is_ascii() || matches!(c.csv_delimiter, b'"' | b'\n' | b'\r') {
            return Err(Pdf2TableError::InvalidConfig(format!(
                "CSV delimiter must be a single ASCII character other than quote or newline, got {:?}",
                c.csv_delimiter as char
            )));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(Pdf2TableError::InvalidConfig(format!(
                    "Invalid page range {start}-{end}: pages are 1-indexed and start must be <= end"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The backend that turns PDF pages into raw grids and text.
///
/// | Method | Library | Grids from |
/// |--------|---------|-----------|
/// | `Pdfium` | pdfium-render | positioned text segments clustered into rows and columns |
/// | `Layout` | lopdf | text lines split on tabs or runs of 2+ spaces |
/// | `PlainText` | pdf-extract | none: every text line is a one-column row |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Geometry-aware extraction via pdfium (default, recommended).
    #[default]
    Pdfium,
    /// Whitespace-aligned text lines via lopdf.
    Layout,
    /// Raw text lines via pdf-extract.
    PlainText,
}

impl ExtractionMethod {
    /// Short backend name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ExtractionMethod::Pdfium => "pdfium",
            ExtractionMethod::Layout => "layout",
            ExtractionMethod::PlainText => "text",
        }
    }
}

/// How the pages to extract are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageMode {
    /// Run table detection and extract the pages that have candidates.
    #[default]
    AutoDetect,
    /// Extract exactly the pages in [`ConversionConfig::pages`].
    Manual,
    /// Extract every page.
    All,
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-indexed
    /// page numbers that exist in a document of `total_pages` pages.
    pub fn to_pages(&self, total_pages: usize) -> Vec<usize> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => vec![*p],
            PageSelection::Range(start, end) => ((*start).max(1)..=(*end).min(total_pages)).collect(),
            PageSelection::Set(pages) => pages.clone(),
        };
        pages.retain(|&p| p >= 1 && p <= total_pages);
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Whether `page` (1-indexed) is part of the selection.
    pub fn contains(&self, page: usize) -> bool {
        match self {
            PageSelection::All => page >= 1,
            PageSelection::Single(p) => *p == page,
            PageSelection::Range(start, end) => (*start..=*end).contains(&page),
            PageSelection::Set(pages) => pages.contains(&page),
        }
    }
}

/// The three independent record-cleaning switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningOptions {
    /// Sanitise and deduplicate column labels.
    pub normalize_columns: bool,
    /// Drop columns whose cells are all missing or blank.
    pub drop_empty_columns: bool,
    /// Replace missing cells with the empty string.
    pub fill_missing: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            normalize_columns: true,
            drop_empty_columns: true,
            fill_missing: true,
        }
    }
}

/// Export container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One `.xlsx` workbook.
    #[default]
    Xlsx,
    /// Delimited text files.
    Csv,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }

    /// MIME type of the produced files.
    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            OutputFormat::Csv => "text/csv",
        }
    }
}

/// Whether tables are exported separately or merged into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputLayout {
    /// One sheet (XLSX) or one file (CSV) per table.
    #[default]
    PerTable,
    /// A single sheet or file holding every table.
    Merged,
}
