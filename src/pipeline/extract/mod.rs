//! Extraction backends: turn a PDF page into table grids or plain text.
//!
//! | Method | Crate | Output |
//! |--------|-------|--------|
//! | [`ExtractionMethod::Pdfium`] | `pdfium-render` | grids from positioned text segments |
//! | [`ExtractionMethod::Layout`] | `lopdf` | grids from whitespace-aligned text lines |
//! | [`ExtractionMethod::PlainText`] | `pdf-extract` | page text only |
//!
//! All backends are blocking. The async entry points in [`crate::convert`]
//! open and drive them on Tokio's blocking pool.

pub mod layout;
pub mod pdfium;
pub mod text;

use crate::config::{ConversionConfig, ExtractionMethod};
use crate::error::{Pdf2TableError, TableError};
use crate::pipeline::input::PdfSource;
use crate::table::RawTableGrid;
use tracing::{debug, info};

/// Read access to one opened document.
///
/// Pages are 1-indexed. Errors on a single page are non-fatal
/// [`TableError`]s; failing to open the document at all is reported by the
/// constructor as a [`Pdf2TableError`].
pub trait TableExtractor {
    /// Short backend name for logs and messages.
    fn name(&self) -> &'static str;

    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Every candidate grid found on `page`, in reading order.
    fn extract_table_grids(&self, page: usize) -> Result<Vec<RawTableGrid>, TableError>;

    /// The text layer of `page`, one line per text line.
    fn extract_text(&self, page: usize) -> Result<String, TableError>;

    /// `true` when the backend cannot see table structure and the
    /// orchestrator should build line tables from [`Self::extract_text`].
    fn text_only(&self) -> bool {
        false
    }
}

/// Open `source` with the backend selected in `config`.
pub fn open_extractor(
    source: &PdfSource,
    config: &ConversionConfig,
) -> Result<Box<dyn TableExtractor>, Pdf2TableError> {
    let extractor: Box<dyn TableExtractor> = match config.method {
        ExtractionMethod::Pdfium => Box::new(pdfium::PdfiumExtractor::open(
            source,
            config.password.as_deref(),
            config.pdfium_library_path.as_deref(),
        )?),
        ExtractionMethod::Layout => Box::new(layout::LayoutExtractor::open(
            source,
            config.password.as_deref(),
        )?),
        ExtractionMethod::PlainText => Box::new(text::PlainTextExtractor::open(
            source,
            config.password.as_deref(),
        )?),
    };
    info!(
        "Opened '{}' with the {} backend: {} pages",
        source.name(),
        extractor.name(),
        extractor.page_count()
    );
    Ok(extractor)
}

/// Open a second backend for the detection scan when `extractor` cannot see
/// table structure.
///
/// A text-only backend only ever yields one-column grids, which detection
/// always rejects, so auto-detection over it scans with the layout backend
/// on the same bytes instead. `None` means `extractor` can scan for itself.
pub fn open_detector(
    source: &PdfSource,
    config: &ConversionConfig,
    extractor: &dyn TableExtractor,
) -> Result<Option<Box<dyn TableExtractor>>, Pdf2TableError> {
    if !extractor.text_only() {
        return Ok(None);
    }
    debug!(
        "The {} backend is text-only; detecting with the layout backend",
        extractor.name()
    );
    let detector = layout::LayoutExtractor::open(source, config.password.as_deref())?;
    Ok(Some(Box::new(detector)))
}

/// Reject page numbers outside `1..=total`.
pub(crate) fn check_page(page: usize, total: usize) -> Result<(), TableError> {
    if page == 0 || page > total {
        return Err(TableError::PageFailed {
            page,
            detail: format!("page out of range (document has {} pages)", total),
        });
    }
    Ok(())
}

/// Map a backend load error to the fatal error a caller can act on.
///
/// Encryption problems surface as password errors; anything else means the
/// backend cannot parse the file.
pub(crate) fn load_error(
    name: &str,
    backend: &'static str,
    password: Option<&str>,
    detail: String,
) -> Pdf2TableError {
    if detail.contains("Password") || detail.contains("password") || detail.contains("ncrypt") {
        if password.is_some() {
            Pdf2TableError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            Pdf2TableError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        Pdf2TableError::UnsupportedLayout {
            name: name.to_string(),
            backend,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(check_page(1, 3).is_ok());
        assert!(check_page(3, 3).is_ok());
        assert!(matches!(check_page(0, 3), Err(TableError::PageFailed { page: 0, .. })));
        assert!(matches!(check_page(4, 3), Err(TableError::PageFailed { page: 4, .. })));
    }

    #[test]
    fn load_errors_map_to_password_variants() {
        let e = load_error("a.pdf", "pdfium", None, "PasswordError".into());
        assert!(matches!(e, Pdf2TableError::PasswordRequired { .. }));
        let e = load_error("a.pdf", "pdfium", Some("x"), "PasswordError".into());
        assert!(matches!(e, Pdf2TableError::WrongPassword { .. }));
        let e = load_error("a.pdf", "layout", None, "invalid xref".into());
        assert!(matches!(
            e,
            Pdf2TableError::UnsupportedLayout { backend: "layout", .. }
        ));
    }
}
