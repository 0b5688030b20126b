//! Tabular data model shared by every pipeline stage.
//!
//! ```text
//! RawTableGrid ──detect──▶ TableCandidate        (scoring only)
//!      │
//!      └──assemble──▶ Table ──clean──▶ ExtractedTable ──export──▶ xlsx / csv
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One cell as delivered by a backend: `None` when the backend saw no cell
/// content at all, `Some("")` for an explicitly empty cell.
pub type Cell = Option<String>;

/// Rows × columns of optional text, straight from a backend. Rows may have
/// different lengths.
pub type RawTableGrid = Vec<Vec<Cell>>;

/// Number of grid rows kept in [`TableCandidate::preview`].
pub const PREVIEW_ROWS: usize = 3;

/// `true` when the cell is missing or holds only whitespace.
pub fn is_blank(cell: &Cell) -> bool {
    cell.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Width of the widest row of a grid.
pub fn grid_width(grid: &[Vec<Cell>]) -> usize {
    grid.iter().map(Vec::len).max().unwrap_or(0)
}

/// A labelled data row did not have the same width as the label row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{labels} column labels but data rows are {data} cells wide")]
pub struct ShapeMismatch {
    pub labels: usize,
    pub data: usize,
}

/// A rectangular table: column labels plus rows of optional cells.
///
/// Every row holds exactly `columns.len()` cells. Labels are optional until
/// column normalisation has run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Option<String>>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from labels and data rows.
    ///
    /// Ragged data rows are padded with missing cells up to the widest row;
    /// that width must then equal the number of labels. With no data rows
    /// any number of labels is accepted.
    pub fn with_columns(
        columns: Vec<Option<String>>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, ShapeMismatch> {
        let data_width = grid_width(&rows);
        if !rows.is_empty() && data_width != columns.len() {
            return Err(ShapeMismatch {
                labels: columns.len(),
                data: data_width,
            });
        }
        Ok(Self {
            rows: pad_rows(rows, columns.len()),
            columns,
        })
    }

    /// Build a table with generic `{prefix}{i+1}` labels as wide as the
    /// widest row.
    pub fn with_generic_columns(prefix: &str, rows: Vec<Vec<Cell>>) -> Self {
        let width = grid_width(&rows);
        let columns = (1..=width).map(|i| Some(format!("{prefix}{i}"))).collect();
        Self {
            rows: pad_rows(rows, width),
            columns,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// A table with no rows or no columns holds no data.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Labels as display strings (missing labels render as `""`).
    pub fn column_labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.clone().unwrap_or_default())
            .collect()
    }

    /// Insert a column at `index` holding `value` in every row.
    pub fn insert_constant_column(&mut self, index: usize, label: &str, value: &str) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, Some(label.to_string()));
        for row in &mut self.rows {
            row.insert(index, Some(value.to_string()));
        }
    }

    /// Number of missing (`None`) cells.
    pub fn missing_cells(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_none()).count()
    }

    /// Number of missing or blank cells: the table's missing values once
    /// cleaning has filled `None` cells with `""`.
    pub fn empty_cells(&self) -> usize {
        self.rows.iter().flatten().filter(|c| is_blank(c)).count()
    }

    /// Restore the rectangular shape after the public fields were edited by
    /// hand: short rows are padded with missing cells and rows wider than
    /// the labels gain unlabelled columns.
    pub fn conform(&mut self) {
        let width = self.columns.len().max(grid_width(&self.rows));
        self.columns.resize(width, None);
        self.rows = pad_rows(std::mem::take(&mut self.rows), width);
    }

    /// Rows as display strings (missing cells render as `""`).
    pub fn text_rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.as_deref().unwrap_or("")).collect())
    }

    /// Stack several tables into one.
    ///
    /// The result's columns are the union of the inputs' columns in order of
    /// first appearance. Repeated labels inside one table map to successive
    /// union columns with that label, so no cell overwrites another. Cells
    /// for columns a table does not have are missing.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut columns: Vec<Option<String>> = Vec::new();
        let mut mappings: Vec<Vec<usize>> = Vec::with_capacity(tables.len());

        for table in &tables {
            let mut used = vec![false; columns.len()];
            let mut mapping = Vec::with_capacity(table.columns.len());
            for label in &table.columns {
                let existing = columns
                    .iter()
                    .enumerate()
                    .position(|(i, c)| c == label && !used[i]);
                let target = match existing {
                    Some(i) => i,
                    None => {
                        columns.push(label.clone());
                        used.push(false);
                        columns.len() - 1
                    }
                };
                used[target] = true;
                mapping.push(target);
            }
            mappings.push(mapping);
        }

        let width = columns.len();
        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.n_rows()).sum());
        for (table, mapping) in tables.iter().zip(&mappings) {
            for row in &table.rows {
                let mut merged: Vec<Cell> = vec![None; width];
                for (cell, &target) in row.iter().zip(mapping) {
                    merged[target] = cell.clone();
                }
                rows.push(merged);
            }
        }

        Table { columns, rows }
    }
}

fn pad_rows(rows: Vec<Vec<Cell>>, width: usize) -> Vec<Vec<Cell>> {
    rows.into_iter()
        .map(|mut row| {
            row.resize(width, None);
            row
        })
        .collect()
}

/// A grid that passed detection and is offered for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCandidate {
    /// 1-indexed page number.
    pub page: usize,
    /// 0-based position of the grid among the page's grids.
    pub table_index: usize,
    pub rows: usize,
    /// Width of the widest row.
    pub cols: usize,
    /// Non-empty cells ÷ (rows × cols), in `[0, 1]`.
    pub fill_ratio: f64,
    /// The first [`PREVIEW_ROWS`] rows of the grid.
    pub preview: RawTableGrid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn blank_cells() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".into())));
        assert!(is_blank(&Some(String::new())));
        assert!(!is_blank(&Some(" x ".into())));
    }

    #[test]
    fn with_columns_pads_ragged_rows() {
        let t = Table::with_columns(
            vec![Some("a".into()), Some("b".into())],
            vec![cells(&["1", "2"]), cells(&["3"])],
        )
        .unwrap();
        assert_eq!(t.rows[1], vec![Some("3".into()), None]);
        assert_eq!(t.missing_cells(), 1);
    }

    #[test]
    fn conform_pads_short_rows_and_labels_wide_ones() {
        let mut t = Table {
            columns: vec![Some("a".into()), Some("b".into())],
            rows: vec![cells(&["1"]), cells(&["2", "3", "4"])],
        };
        t.conform();
        assert_eq!(t.columns, vec![Some("a".into()), Some("b".into()), None]);
        assert_eq!(t.rows[0], vec![Some("1".into()), None, None]);
        assert_eq!(t.rows[1], cells(&["2", "3", "4"]));
    }

    #[test]
    fn empty_cells_counts_missing_and_blank() {
        let t = Table::with_columns(
            vec![Some("a".into()), Some("b".into())],
            vec![cells(&["1", " "]), cells(&[""])],
        )
        .unwrap();
        assert_eq!(t.missing_cells(), 1);
        assert_eq!(t.empty_cells(), 3);
    }

    #[test]
    fn with_columns_rejects_width_mismatch() {
        let err = Table::with_columns(vec![Some("a".into())], vec![cells(&["1", "2"])]).unwrap_err();
        assert_eq!(err, ShapeMismatch { labels: 1, data: 2 });
    }

    #[test]
    fn with_columns_accepts_header_only() {
        let t = Table::with_columns(vec![Some("a".into()), None], vec![]).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.n_cols(), 2);
    }

    #[test]
    fn generic_columns() {
        let t = Table::with_generic_columns("Col_", vec![cells(&["x"]), cells(&["y", "z", "w"])]);
        assert_eq!(t.column_labels(), vec!["Col_1", "Col_2", "Col_3"]);
        assert_eq!(t.rows[0].len(), 3);
    }

    #[test]
    fn insert_constant_column_prepends() {
        let mut t = Table::with_columns(vec![Some("a".into())], vec![cells(&["1"]), cells(&["2"])]).unwrap();
        t.insert_constant_column(0, "Source_Page", "4");
        assert_eq!(t.column_labels(), vec!["Source_Page", "a"]);
        assert_eq!(t.rows[1], cells(&["4", "2"]));
    }

    #[test]
    fn concat_unions_columns_in_first_appearance_order() {
        let a = Table::with_columns(
            vec![Some("x".into()), Some("y".into())],
            vec![cells(&["1", "2"])],
        )
        .unwrap();
        let b = Table::with_columns(
            vec![Some("y".into()), Some("z".into())],
            vec![cells(&["3", "4"])],
        )
        .unwrap();
        let merged = Table::concat([&a, &b]);
        assert_eq!(merged.column_labels(), vec!["x", "y", "z"]);
        assert_eq!(merged.rows[0], vec![Some("1".into()), Some("2".into()), None]);
        assert_eq!(merged.rows[1], vec![None, Some("3".into()), Some("4".into())]);
    }

    #[test]
    fn concat_keeps_repeated_labels_apart() {
        let a = Table::with_columns(
            vec![Some("n".into()), Some("n".into())],
            vec![cells(&["1", "2"])],
        )
        .unwrap();
        let merged = Table::concat([&a, &a]);
        assert_eq!(merged.n_cols(), 2);
        assert_eq!(merged.rows[1], cells(&["1", "2"]));
    }
}
