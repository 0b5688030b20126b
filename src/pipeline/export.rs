//! Export: render cleaned tables as an XLSX workbook or CSV files.
//!
//! Export is in-memory: it produces [`ExportArtifact`]s (file name, media
//! type, bytes) that a web handler can stream or [`write_artifacts`] can put
//! on disk.
//!
//! | Format | Per table | Merged |
//! |--------|-----------|--------|
//! | XLSX | `{stem}_converted.xlsx`, sheet `Page_{p}_Table_{t}` each | `{stem}_converted.xlsx`, sheet `All_Tables` |
//! | CSV | `{stem}_page{p}_table{t}.csv` each | `{stem}_merged.csv` |
//!
//! `{t}` is 1-indexed. Merged output stacks all tables under the union of
//! their columns.

use crate::config::{OutputFormat, OutputLayout};
use crate::error::Pdf2TableError;
use crate::output::ExtractedTable;
use crate::pipeline::input::file_stem;
use crate::table::Table;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Sheet name used for merged workbook output.
pub const MERGED_SHEET_NAME: &str = "All_Tables";

/// One output file, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render `tables` in the requested format and layout.
///
/// `input_name` is the source file name; its stem prefixes every output
/// file. No tables means no artifacts.
pub fn export(
    tables: &[ExtractedTable],
    format: OutputFormat,
    layout: OutputLayout,
    csv_delimiter: u8,
    input_name: &str,
) -> Result<Vec<ExportArtifact>, Pdf2TableError> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }
    let stem = file_stem(input_name);

    let artifacts = match (format, layout) {
        (OutputFormat::Xlsx, OutputLayout::PerTable) => {
            let sheets: Vec<(String, &Table)> = tables
                .iter()
                .map(|t| (per_table_sheet_name(t), &t.table))
                .collect();
            vec![xlsx_artifact(&stem, &sheets)?]
        }
        (OutputFormat::Xlsx, OutputLayout::Merged) => {
            let merged = merge_tables(tables);
            vec![xlsx_artifact(&stem, &[(MERGED_SHEET_NAME.to_string(), &merged)])?]
        }
        (OutputFormat::Csv, OutputLayout::PerTable) => tables
            .iter()
            .map(|t| {
                let file_name = format!("{}_page{}_table{}.csv", stem, t.page, t.table_index + 1);
                csv_artifact(file_name, &t.table, csv_delimiter)
            })
            .collect::<Result<Vec<_>, _>>()?,
        (OutputFormat::Csv, OutputLayout::Merged) => {
            let merged = merge_tables(tables);
            vec![csv_artifact(format!("{}_merged.csv", stem), &merged, csv_delimiter)?]
        }
    };

    info!(
        "Exported {} tables as {} file(s)",
        tables.len(),
        artifacts.len()
    );
    Ok(artifacts)
}

/// Stack tables under the union of their columns.
pub fn merge_tables(tables: &[ExtractedTable]) -> Table {
    Table::concat(tables.iter().map(|t| &t.table))
}

/// Name of the workbook written for `input_name`.
pub fn workbook_file_name(input_name: &str) -> String {
    format!("{}_converted.xlsx", file_stem(input_name))
}

fn per_table_sheet_name(table: &ExtractedTable) -> String {
    format!("Page_{}_Table_{}", table.page, table.table_index + 1)
}

/// Make a valid worksheet name: every character that is not alphanumeric
/// or `_` becomes `_`, then the result is cut to 31 characters.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// Sanitise `raw` and make it unique (case-insensitively, as Excel
/// compares sheet names) against `taken`, keeping within 31 characters.
fn unique_sheet_name(raw: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(raw);
    let mut name = base.clone();
    let mut n = 1usize;
    while taken.contains(&name.to_lowercase()) {
        let suffix = format!("_{}", n);
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        name = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    taken.insert(name.to_lowercase());
    name
}

fn export_failed(file_name: &str, e: impl std::fmt::Display) -> Pdf2TableError {
    Pdf2TableError::ExportFailed {
        file_name: file_name.to_string(),
        detail: e.to_string(),
    }
}

fn xlsx_artifact(stem: &str, sheets: &[(String, &Table)]) -> Result<ExportArtifact, Pdf2TableError> {
    let file_name = format!("{}_converted.xlsx", stem);
    let fail = |e: rust_xlsxwriter::XlsxError| export_failed(&file_name, e);

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut taken = HashSet::new();

    for (raw_name, table) in sheets {
        let name = unique_sheet_name(raw_name, &mut taken);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(fail)?;

        for (col, label) in table.column_labels().iter().enumerate() {
            let col = u16::try_from(col).map_err(|e| export_failed(&file_name, e))?;
            worksheet
                .write_string_with_format(0, col, label, &header_format)
                .map_err(fail)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let row_num = u32::try_from(r + 1).map_err(|e| export_failed(&file_name, e))?;
            for (col, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    let col = u16::try_from(col).map_err(|e| export_failed(&file_name, e))?;
                    worksheet.write_string(row_num, col, value).map_err(fail)?;
                }
            }
        }
        debug!("Sheet '{}': {} rows", name, table.n_rows());
    }

    let bytes = workbook.save_to_buffer().map_err(fail)?;
    Ok(ExportArtifact {
        file_name,
        media_type: OutputFormat::Xlsx.media_type(),
        bytes,
    })
}

fn csv_artifact(file_name: String, table: &Table, delimiter: u8) -> Result<ExportArtifact, Pdf2TableError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(table.column_labels())
        .map_err(|e| export_failed(&file_name, e))?;
    for row in table.text_rows() {
        writer
            .write_record(row)
            .map_err(|e| export_failed(&file_name, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| export_failed(&file_name, e))?;

    Ok(ExportArtifact {
        file_name,
        media_type: OutputFormat::Csv.media_type(),
        bytes,
    })
}

/// Write artifacts into `dir`, creating it if needed.
///
/// Each file is written to a `.tmp` sibling first and renamed into place, so
/// a crash never leaves a truncated spreadsheet behind.
pub async fn write_artifacts(
    dir: impl AsRef<Path>,
    artifacts: &[ExportArtifact],
) -> Result<Vec<PathBuf>, Pdf2TableError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Pdf2TableError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        let tmp_path = dir.join(format!("{}.tmp", artifact.file_name));

        tokio::fs::write(&tmp_path, &artifact.bytes)
            .await
            .map_err(|e| Pdf2TableError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Pdf2TableError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn extracted(page: usize, table_index: usize, labels: &[&str], rows: &[&[&str]]) -> ExtractedTable {
        let table = Table::with_columns(
            labels.iter().map(|l| Some(l.to_string())).collect(),
            rows.iter().map(|r| cells(r)).collect(),
        )
        .unwrap();
        ExtractedTable::new(page, table_index, table)
    }

    fn read_csv(bytes: &[u8], delimiter: u8) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn sheet_names_are_sanitized_and_truncated() {
        assert_eq!(sanitize_sheet_name("Page_3_Table_1"), "Page_3_Table_1");
        assert_eq!(sanitize_sheet_name("Q1 [draft]: sales/2024"), "Q1__draft___sales_2024");
        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(sanitize_sheet_name(""), "Sheet");
    }

    #[test]
    fn duplicate_sheet_names_get_suffix_within_limit() {
        let mut taken = HashSet::new();
        let long = "a".repeat(35);
        let first = unique_sheet_name(&long, &mut taken);
        let second = unique_sheet_name(&long, &mut taken);
        let third = unique_sheet_name(&long.to_uppercase(), &mut taken);
        assert_eq!(first.len(), 31);
        assert_eq!(second, format!("{}_1", "a".repeat(29)));
        assert_eq!(third, format!("{}_2", "A".repeat(29)));
    }

    #[test]
    fn csv_round_trip_preserves_values() {
        let tables = vec![extracted(
            2,
            0,
            &["Name", "Note"],
            &[&["Smith, J.", "says \"hi\""], &["Lee", "two\nlines"]],
        )];
        let artifacts = export(&tables, OutputFormat::Csv, OutputLayout::PerTable, b',', "report.pdf").unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "report_page2_table1.csv");
        assert_eq!(artifacts[0].media_type, "text/csv");

        let records = read_csv(&artifacts[0].bytes, b',');
        assert_eq!(
            records,
            vec![
                vec!["Name", "Note"],
                vec!["Smith, J.", "says \"hi\""],
                vec!["Lee", "two\nlines"],
            ]
        );
    }

    #[test]
    fn csv_honours_delimiter_and_missing_cells() {
        let mut t = extracted(1, 0, &["a", "b"], &[&["1", "2"]]);
        t.table.rows.push(vec![None, Some("x;y".into())]);
        let artifacts = export(&[t], OutputFormat::Csv, OutputLayout::PerTable, b';', "d.pdf").unwrap();
        let records = read_csv(&artifacts[0].bytes, b';');
        assert_eq!(records[2], vec!["", "x;y"]);
    }

    #[test]
    fn merged_csv_unions_columns() {
        let tables = vec![
            extracted(1, 0, &["Source_Page", "x"], &[&["1", "a"]]),
            extracted(3, 1, &["Source_Page", "y"], &[&["3", "b"]]),
        ];
        let artifacts = export(&tables, OutputFormat::Csv, OutputLayout::Merged, b',', "Scan.PDF").unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "Scan_merged.csv");
        let records = read_csv(&artifacts[0].bytes, b',');
        assert_eq!(
            records,
            vec![
                vec!["Source_Page", "x", "y"],
                vec!["1", "a", ""],
                vec!["3", "", "b"],
            ]
        );
    }

    #[test]
    fn xlsx_is_a_single_workbook() {
        let tables = vec![
            extracted(1, 0, &["a"], &[&["1"]]),
            extracted(1, 1, &["b"], &[&["2"]]),
        ];
        for layout in [OutputLayout::PerTable, OutputLayout::Merged] {
            let artifacts = export(&tables, OutputFormat::Xlsx, layout, b',', "annual.pdf").unwrap();
            assert_eq!(artifacts.len(), 1);
            assert_eq!(artifacts[0].file_name, "annual_converted.xlsx");
            assert_eq!(workbook_file_name("annual.pdf"), artifacts[0].file_name);
            // XLSX is a zip container.
            assert!(artifacts[0].bytes.starts_with(b"PK"));
        }
    }

    #[test]
    fn nothing_to_export() {
        let artifacts = export(&[], OutputFormat::Xlsx, OutputLayout::PerTable, b',', "a.pdf").unwrap();
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn artifacts_written_without_leftover_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let artifacts = vec![ExportArtifact {
            file_name: "a.csv".into(),
            media_type: "text/csv",
            bytes: b"x,y\n".to_vec(),
        }];
        let written = write_artifacts(&out, &artifacts).await.unwrap();
        assert_eq!(written, vec![out.join("a.csv")]);
        assert_eq!(std::fs::read(out.join("a.csv")).unwrap(), b"x,y\n");
        assert!(!out.join("a.csv.tmp").exists());
    }
}
