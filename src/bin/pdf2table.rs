//! CLI binary for edgequake-pdf2table.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, runs the conversion and writes the files.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2table::{
    detect, export_output, write_artifacts, CleaningOptions, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, DetectionReport, ExtractionMethod, OutputFormat, OutputLayout,
    PageMode, PageSelection, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the detection scan, then one for
/// extraction, with a log line per table.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Stop the spinner and clear the bar. Safe to call more than once.
    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn activate_bar(&self, prefix: &'static str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }
}

fn truncate(msg: &str, max: usize) -> String {
    if msg.chars().count() > max {
        let cut: String = msg.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        msg.to_string()
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_detection_start(&self, total_pages: usize) {
        self.activate_bar("Scanning", total_pages);
    }

    fn on_page_scanned(&self, pages_done: usize, _pages_total: usize) {
        self.bar.set_position(pages_done as u64);
    }

    fn on_page_start(&self, page_num: usize, selected_total: usize) {
        if self.bar.prefix() != "Extracting" {
            self.activate_bar("Extracting", selected_total);
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_table_extracted(&self, page_num: usize, table_index: usize, rows: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}  table {:<2}  {}",
            green("✓"),
            page_num,
            table_index + 1,
            dim(&format!("{rows:>5} rows")),
        ));
    }

    fn on_table_error(&self, page_num: usize, table_index: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}  table {:<2}  {}",
            red("✗"),
            page_num,
            table_index + 1,
            red(&truncate(error, 80)),
        ));
    }

    fn on_page_error(&self, page_num: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            red("✗"),
            page_num,
            red(&truncate(error, 80)),
        ));
    }

    fn on_page_complete(&self, _page_num: usize, pages_done: usize, _selected_total: usize) {
        self.bar.set_position(pages_done as u64);
    }

    fn on_conversion_complete(&self, tables: usize, failures: usize) {
        self.finish();
        if failures == 0 {
            eprintln!("{} {} tables extracted", green("✔"), bold(&tables.to_string()));
        } else {
            eprintln!(
                "{} {} tables extracted  ({} skipped)",
                cyan("⚠"),
                bold(&tables.to_string()),
                red(&failures.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Detect tables and write <name>_converted.xlsx into the current directory
  pdf2table statement.pdf

  # CSV files, one per table, into ./out
  pdf2table --format csv -o out statement.pdf

  # One merged sheet from pages 3 to 15, no detection
  pdf2table --mode manual --pages 3-15 --merge report.pdf

  # Only keep large tables
  pdf2table --sensitivity 8 annual-report.pdf

  # Show what would be extracted, as JSON
  pdf2table --detect-only --json report.pdf

EXTRACTION METHODS:
  pdfium   (default) positioned text segments; needs libpdfium at runtime
  layout   text lines split on wide gaps; pure Rust
  text     one row per text line; pure Rust

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override the log filter (e.g. debug)
  PDF2TABLE_*             Every flag can also be set from the environment
"#;

/// Detect and extract tables from PDF files into XLSX or CSV.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2table",
    version,
    about = "Detect and extract tables from PDF files into XLSX or CSV",
    long_about = "Detect the pages of a PDF that contain tables, extract each table with a \
clean header row, and export them to an Excel workbook or CSV files.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Directory the output files are written to.
    #[arg(short, long, env = "PDF2TABLE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Extraction backend.
    #[arg(long, env = "PDF2TABLE_METHOD", value_enum, default_value = "pdfium")]
    method: MethodArg,

    /// Output format.
    #[arg(long, env = "PDF2TABLE_FORMAT", value_enum, default_value = "xlsx")]
    format: FormatArg,

    /// Merge all tables into one sheet or file.
    #[arg(long, env = "PDF2TABLE_MERGE")]
    merge: bool,

    /// Page mode: auto (detect), manual (--pages), all.
    #[arg(long, env = "PDF2TABLE_MODE", value_enum, default_value = "auto")]
    mode: ModeArg,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2TABLE_PAGES", default_value = "all")]
    pages: String,

    /// Detection sensitivity (1–10): the minimum rows a table needs.
    #[arg(long, env = "PDF2TABLE_SENSITIVITY", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(1..=10))]
    sensitivity: u8,

    /// Keep column labels exactly as extracted.
    #[arg(long, env = "PDF2TABLE_NO_NORMALIZE_COLUMNS")]
    no_normalize_columns: bool,

    /// Keep columns that are entirely empty.
    #[arg(long, env = "PDF2TABLE_KEEP_EMPTY_COLUMNS")]
    keep_empty_columns: bool,

    /// Leave missing cells unfilled.
    #[arg(long, env = "PDF2TABLE_NO_FILL_MISSING")]
    no_fill_missing: bool,

    /// CSV field delimiter (single ASCII character, `\t` for tab).
    #[arg(long, env = "PDF2TABLE_DELIMITER", default_value = ",")]
    delimiter: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TABLE_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Only run detection and print the candidates.
    #[arg(long, env = "PDF2TABLE_DETECT_ONLY")]
    detect_only: bool,

    /// Print structured JSON instead of a summary.
    #[arg(long, env = "PDF2TABLE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TABLE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Pdfium,
    Layout,
    Text,
}

impl From<MethodArg> for ExtractionMethod {
    fn from(v: MethodArg) -> Self {
        match v {
            MethodArg::Pdfium => ExtractionMethod::Pdfium,
            MethodArg::Layout => ExtractionMethod::Layout,
            MethodArg::Text => ExtractionMethod::PlainText,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Xlsx => OutputFormat::Xlsx,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Auto,
    Manual,
    All,
}

impl From<ModeArg> for PageMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Auto => PageMode::AutoDetect,
            ModeArg::Manual => PageMode::Manual,
            ModeArg::All => PageMode::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let finish_progress = || {
        if let Some(cb) = &cli_progress {
            cb.finish();
        }
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Detect-only mode ─────────────────────────────────────────────────
    if cli.detect_only {
        let result = detect(&cli.input, &config).await;
        finish_progress();
        let report = result.context("Detection failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_detection(&cli, &report);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = edgequake_pdf2table::convert(&cli.input, &config).await;
    finish_progress();
    let output = result.context("Conversion failed")?;

    if let Some(notice) = output.empty_notice() {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?
            );
        } else if !cli.quiet {
            eprintln!("{} {}", cyan("⚠"), notice);
        }
        return Ok(());
    }

    let artifacts = export_output(&output, &config).context("Export failed")?;
    let written = write_artifacts(&cli.output_dir, &artifacts)
        .await
        .with_context(|| format!("Failed to write into {}", cli.output_dir.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        print_summary(&cli, &output, &written);
    }

    Ok(())
}

/// Human-readable size with two decimals in MB.
fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Print the detection report: document metrics, first-page preview and the
/// candidate list.
fn print_detection(cli: &Cli, report: &DetectionReport) {
    println!(
        "{}  {} pages, {}, {} tables detected",
        bold(&cli.input.display().to_string()),
        report.total_pages,
        format_size(report.input_bytes),
        report.candidate_count(),
    );
    if !report.first_page_preview.is_empty() {
        println!("{}", dim("── Page 1 preview ──"));
        for line in report.first_page_preview.lines() {
            println!("  {}", dim(line));
        }
        println!();
    }
    if let Some(notice) = report.empty_notice() {
        eprintln!("{} {}", cyan("⚠"), notice);
    }
    for (page, candidates) in &report.candidates {
        for c in candidates {
            println!(
                "Page {:>3}  table {:<2}  {:>4} rows × {:<3} cols  {:>5.1}% filled",
                page,
                c.table_index + 1,
                c.rows,
                c.cols,
                c.fill_ratio * 100.0
            );
        }
    }
    for failure in &report.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }
}

/// Print the per-table metrics and the conversion summary.
fn print_summary(cli: &Cli, output: &ConversionOutput, written: &[PathBuf]) {
    for t in &output.tables {
        eprintln!(
            "  Page {:>3}  table {:<2}  {:>5} rows × {:<3} cols  {} missing",
            t.page,
            t.table_index + 1,
            t.table.n_rows(),
            t.table.n_cols(),
            t.missing_values,
        );
    }
    for failure in &output.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }

    let stats = &output.stats;
    let method: ExtractionMethod = cli.method.into();
    let format: OutputFormat = cli.format.into();
    eprintln!(
        "{}  {} tables, {} rows from {}/{} pages ({})  {}ms",
        if output.failures.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.tables_extracted,
        stats.total_rows,
        stats.selected_pages,
        stats.total_pages,
        format_size(stats.input_bytes),
        stats.total_duration_ms,
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "method {}  format {}  {} detected  {} missing values",
            method.name(),
            format.extension(),
            stats.candidates_detected,
            stats.missing_values,
        ))
    );
    for path in written {
        eprintln!("   →  {}", bold(&path.display().to_string()));
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let delimiter = parse_delimiter(&cli.delimiter)?;

    let mut builder = ConversionConfig::builder()
        .method(cli.method.into())
        .sensitivity(cli.sensitivity)
        .page_mode(cli.mode.into())
        .pages(pages)
        .cleaning(CleaningOptions {
            normalize_columns: !cli.no_normalize_columns,
            drop_empty_columns: !cli.keep_empty_columns,
            fill_missing: !cli.no_fill_missing,
        })
        .output_format(cli.format.into())
        .output_layout(if cli.merge {
            OutputLayout::Merged
        } else {
            OutputLayout::PerTable
        })
        .csv_delimiter(delimiter);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--delimiter` into a single byte.
fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => anyhow::bail!("Delimiter must be a single ASCII character (got {:?})", s),
        },
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
