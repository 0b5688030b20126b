//! Conversion entry points.
//!
//! The pipeline itself is synchronous: pdfium is blocking C code and the
//! text-layer backends are CPU-bound parsers. The async functions here move
//! the whole run onto Tokio's blocking pool with `spawn_blocking` so callers
//! inside a runtime never stall a worker thread.
//!
//! ```text
//! PdfSource ─▶ open_extractor ─▶ ConversionSession::resolve_selection
//!                                   (detect, or manual / all pages)
//!                                          │
//!                 export ◀─ ConversionOutput ◀─ extract_tables
//! ```

use crate::config::{ConversionConfig, PageMode};
use crate::error::{Pdf2TableError, TableError};
use crate::output::{ConversionOutput, ConversionStats, DetectionReport, ExtractedTable};
use crate::pipeline::assemble::{add_provenance, assemble_grid, assemble_text_lines};
use crate::pipeline::clean::clean_table;
use crate::pipeline::export::{export, write_artifacts, ExportArtifact};
use crate::pipeline::extract::{open_detector, open_extractor, TableExtractor};
use crate::pipeline::input::PdfSource;
use crate::session::ConversionSession;
use crate::table::Table;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a local PDF into cleaned tables.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` whenever the document could be opened, even if
/// some pages or tables failed (see `output.failures`) or nothing was found
/// (see `output.empty_notice()`).
///
/// # Errors
/// Returns `Err(Pdf2TableError)` only for fatal errors:
/// - file not found, permission denied, not a PDF
/// - encrypted or unparsable document
/// - pdfium not available (pdfium backend only)
/// - manual page selection past the end of the document
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TableError> {
    let source = PdfSource::from_path(input)?;
    convert_source(source, config).await
}

/// Convert PDF bytes held in memory (an upload, a database blob).
///
/// `name` is the display file name; output files are named after it.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2table::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("invoice.pdf")?;
/// let output = convert_from_bytes("invoice.pdf", bytes, &ConversionConfig::default()).await?;
/// println!("{} tables", output.tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TableError> {
    let source = PdfSource::from_bytes(name, bytes)?;
    convert_source(source, config).await
}

/// Convert an already loaded [`PdfSource`].
pub async fn convert_source(
    source: PdfSource,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TableError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || convert_blocking(&source, &config))
        .await
        .map_err(|e| Pdf2TableError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TableError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2TableError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Run only the detection scan over every page.
pub async fn detect(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DetectionReport, Pdf2TableError> {
    let source = PdfSource::from_path(input)?;
    detect_source(source, config).await
}

/// Run only the detection scan over an already loaded [`PdfSource`].
pub async fn detect_source(
    source: PdfSource,
    config: &ConversionConfig,
) -> Result<DetectionReport, Pdf2TableError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || -> Result<DetectionReport, Pdf2TableError> {
        let extractor = open_extractor(&source, &config)?;
        let detector = open_detector(&source, &config, extractor.as_ref())?;
        let scanner = detector.as_deref().unwrap_or(extractor.as_ref());

        let mut session = ConversionSession::new(extractor.page_count());
        let mut report = session
            .run_detection(scanner, config.sensitivity, config.progress_callback.as_ref())
            .clone();
        report.input_bytes = source.bytes().len() as u64;
        Ok(report)
    })
    .await
    .map_err(|e| Pdf2TableError::Internal(format!("Detection task panicked: {}", e)))?
}

/// Convert a PDF, export it and write the files into `output_dir`.
///
/// Returns the conversion output and the paths written. Nothing is written
/// when no table survived.
pub async fn convert_to_dir(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(ConversionOutput, Vec<PathBuf>), Pdf2TableError> {
    let output = convert(input, config).await?;
    let artifacts = export_output(&output, config)?;
    let written = write_artifacts(output_dir, &artifacts).await?;
    Ok((output, written))
}

/// Export a conversion result with the format and layout from `config`.
pub fn export_output(
    output: &ConversionOutput,
    config: &ConversionConfig,
) -> Result<Vec<ExportArtifact>, Pdf2TableError> {
    export(
        &output.tables,
        config.output_format,
        config.output_layout,
        config.csv_delimiter,
        &output.source_name,
    )
}

/// The whole run on the calling thread: open, select pages, extract.
pub fn convert_blocking(
    source: &PdfSource,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TableError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", source.name());

    // ── Step 1: Open the document ────────────────────────────────────────
    let extractor = open_extractor(source, config)?;
    let total_pages = extractor.page_count();

    // ── Step 2: Choose pages (may run detection) ─────────────────────────
    let detect_start = Instant::now();
    let detector = if config.page_mode == PageMode::AutoDetect {
        open_detector(source, config, extractor.as_ref())?
    } else {
        None
    };
    let scanner = detector.as_deref().unwrap_or(extractor.as_ref());

    let mut session = ConversionSession::new(total_pages);
    let pages = session.resolve_selection(scanner, config)?.to_vec();
    let detection_duration_ms = if session.detection().is_some() {
        detect_start.elapsed().as_millis() as u64
    } else {
        0
    };

    // ── Step 3: Extract and clean ────────────────────────────────────────
    let mut output = extract_tables(extractor.as_ref(), &pages, config);

    output.source_name = source.name().to_string();
    output.detection = session.detection().cloned().map(|mut report| {
        report.input_bytes = source.bytes().len() as u64;
        report
    });
    output.stats.input_bytes = source.bytes().len() as u64;
    output.stats.total_pages = total_pages;
    output.stats.candidates_detected = session
        .detection()
        .map_or(0, DetectionReport::candidate_count);
    output.stats.detection_duration_ms = detection_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    if let Some(notice) = output.empty_notice() {
        warn!("{}", notice);
        if let Some(cb) = &config.progress_callback {
            cb.on_empty_result(notice);
        }
    }

    info!(
        "Conversion complete: {} tables from {} pages ({} failed) in {}ms",
        output.stats.tables_extracted,
        output.stats.selected_pages,
        output.stats.failed,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Extract, assemble and clean the tables of `pages` (1-indexed, processed
/// in ascending order).
///
/// Never fails as a whole: a page or table that cannot be read is recorded
/// in `failures`, reported to the progress observer and skipped. Tables
/// that are empty after cleaning are dropped.
///
/// The `Source_Page` and `Table_Index` columns are added before cleaning, so
/// every row has at least those two cells filled. Cleaning therefore never
/// drops a blank data row here: such a row is kept with only its provenance.
/// Call [`clean_table`] on a table without provenance to have blank rows
/// removed.
pub fn extract_tables(
    extractor: &dyn TableExtractor,
    pages: &[usize],
    config: &ConversionConfig,
) -> ConversionOutput {
    let start = Instant::now();
    let cb = config.progress_callback.as_ref();

    let mut pages = pages.to_vec();
    pages.sort_unstable();
    pages.dedup();

    let mut tables: Vec<ExtractedTable> = Vec::new();
    let mut failures: Vec<TableError> = Vec::new();
    let mut dropped = 0usize;

    for (done, &page) in pages.iter().enumerate() {
        if let Some(cb) = cb {
            cb.on_page_start(page, pages.len());
        }

        let assembled = match page_tables(extractor, page) {
            Ok(assembled) => assembled,
            Err(e) => {
                warn!("{}", e);
                if let Some(cb) = cb {
                    cb.on_page_error(page, &e.to_string());
                    cb.on_page_complete(page, done + 1, pages.len());
                }
                failures.push(e);
                continue;
            }
        };

        for (table_index, result) in assembled.into_iter().enumerate() {
            let mut table = match result {
                Ok(table) => table,
                Err(e) => {
                    warn!("{}", e);
                    if let Some(cb) = cb {
                        cb.on_table_error(page, table_index, &e.to_string());
                    }
                    failures.push(e);
                    continue;
                }
            };

            add_provenance(&mut table, page, table_index);
            let table = clean_table(table, &config.cleaning);
            if table.is_empty() {
                debug!("Page {}, table {}: empty after cleaning", page, table_index + 1);
                dropped += 1;
                continue;
            }

            if let Some(cb) = cb {
                cb.on_table_extracted(page, table_index, table.n_rows());
            }
            tables.push(ExtractedTable::new(page, table_index, table));
        }

        if let Some(cb) = cb {
            cb.on_page_complete(page, done + 1, pages.len());
        }
    }

    if let Some(cb) = cb {
        cb.on_conversion_complete(tables.len(), failures.len());
    }

    let stats = ConversionStats {
        selected_pages: pages.len(),
        tables_extracted: tables.len(),
        tables_dropped: dropped,
        failed: failures.len(),
        total_rows: tables.iter().map(|t| t.table.n_rows()).sum(),
        missing_values: tables.iter().map(|t| t.missing_values).sum(),
        extraction_duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };

    ConversionOutput {
        tables,
        failures,
        stats,
        ..Default::default()
    }
}

/// Assemble every table of one page. The outer error is a page failure,
/// inner errors are per-table failures.
fn page_tables(
    extractor: &dyn TableExtractor,
    page: usize,
) -> Result<Vec<Result<Table, TableError>>, TableError> {
    if extractor.text_only() {
        let text = extractor.extract_text(page)?;
        return Ok(vec![Ok(assemble_text_lines(page, &text))]);
    }

    let grids = extractor.extract_table_grids(page)?;
    debug!("Page {}: {} grids", page, grids.len());
    Ok(grids
        .into_iter()
        .enumerate()
        .map(|(idx, grid)| assemble_grid(page, idx, grid))
        .collect())
}
