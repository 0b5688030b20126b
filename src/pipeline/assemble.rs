//! Table assembly: turn a raw grid (or page text) into a labelled [`Table`]
//! and stamp it with where it came from.

use crate::error::TableError;
use crate::table::{grid_width, is_blank, Cell, RawTableGrid, Table};

/// Label prefix used when a grid has no usable header row.
pub const GENERIC_COLUMN_PREFIX: &str = "Col_";

/// Provenance column holding the 1-indexed source page.
pub const SOURCE_PAGE_COLUMN: &str = "Source_Page";

/// Provenance column holding the 1-indexed table number within the page.
pub const TABLE_INDEX_COLUMN: &str = "Table_Index";

/// Split a grid into header and data rows.
///
/// The first row becomes the column labels. When that row is entirely blank,
/// or its width disagrees with the widest data row, the grid gets generic
/// `Col_{i+1}` labels and every row (header included) is treated as data.
pub fn assemble_grid(page: usize, table_index: usize, grid: RawTableGrid) -> Result<Table, TableError> {
    let width = grid_width(&grid);
    if width == 0 {
        return Err(TableError::ExtractionFailed {
            page,
            table: table_index,
            detail: "grid has no columns".to_string(),
        });
    }

    let mut rows = grid.into_iter();
    let Some(header) = rows.next() else {
        return Err(TableError::ExtractionFailed {
            page,
            table: table_index,
            detail: "grid has no rows".to_string(),
        });
    };
    let data: Vec<Vec<Cell>> = rows.collect();

    let header_blank = header.iter().all(is_blank);
    let data_width = grid_width(&data);
    let header_fits = data.is_empty() || header.len() == data_width;

    if header_blank || !header_fits {
        let all_rows = std::iter::once(header).chain(data).collect();
        return Ok(Table::with_generic_columns(GENERIC_COLUMN_PREFIX, all_rows));
    }

    Table::with_columns(header, data).map_err(|e| TableError::ExtractionFailed {
        page,
        table: table_index,
        detail: e.to_string(),
    })
}

/// Build a single-column table from page text, one row per non-blank line.
///
/// The column is labelled `Line_{page}`.
pub fn assemble_text_lines(page: usize, text: &str) -> Table {
    let rows: Vec<Vec<Cell>> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| vec![Some(line.to_string())])
        .collect();
    Table {
        columns: vec![Some(format!("Line_{}", page))],
        rows,
    }
}

/// Prepend the `Source_Page` and `Table_Index` columns.
pub fn add_provenance(table: &mut Table, page: usize, table_index: usize) {
    table.insert_constant_column(0, TABLE_INDEX_COLUMN, &(table_index + 1).to_string());
    table.insert_constant_column(0, SOURCE_PAGE_COLUMN, &page.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn first_row_becomes_header() {
        let grid = vec![cells(&["Name", "Qty"]), cells(&["a", "1"]), cells(&["b", "2"])];
        let table = assemble_grid(1, 0, grid).unwrap();
        assert_eq!(table.column_labels(), vec!["Name", "Qty"]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn header_with_missing_labels_is_kept() {
        let grid = vec![vec![Some("Name".into()), None], cells(&["a", "1"])];
        let table = assemble_grid(1, 0, grid).unwrap();
        assert_eq!(table.columns, vec![Some("Name".into()), None]);
    }

    #[test]
    fn blank_header_falls_back_to_generic_labels() {
        let grid = vec![vec![None, Some(" ".into())], cells(&["a", "1"])];
        let table = assemble_grid(2, 1, grid).unwrap();
        assert_eq!(table.column_labels(), vec!["Col_1", "Col_2"]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn width_mismatch_falls_back_to_generic_labels() {
        let grid = vec![cells(&["Title"]), cells(&["a", "1", "x"]), cells(&["b", "2"])];
        let table = assemble_grid(1, 0, grid).unwrap();
        assert_eq!(table.column_labels(), vec!["Col_1", "Col_2", "Col_3"]);
        assert_eq!(table.rows[0], vec![Some("Title".into()), None, None]);
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn header_only_grid_yields_zero_rows() {
        let table = assemble_grid(1, 0, vec![cells(&["a", "b"])]).unwrap();
        assert_eq!(table.n_cols(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn grid_without_columns_is_an_extraction_failure() {
        let err = assemble_grid(3, 2, vec![vec![], vec![]]).unwrap_err();
        assert_eq!(err.page(), 3);
        assert!(matches!(err, TableError::ExtractionFailed { table: 2, .. }));
        assert!(assemble_grid(3, 0, Vec::new()).is_err());
    }

    #[test]
    fn text_lines_become_one_column() {
        let table = assemble_text_lines(4, "first line\n\n  second  \n");
        assert_eq!(table.column_labels(), vec!["Line_4"]);
        assert_eq!(table.rows, vec![cells(&["first line"]), cells(&["second"])]);
    }

    #[test]
    fn provenance_columns_are_prepended() {
        let mut table = assemble_grid(1, 0, vec![cells(&["a"]), cells(&["1"])]).unwrap();
        add_provenance(&mut table, 7, 2);
        assert_eq!(table.column_labels(), vec!["Source_Page", "Table_Index", "a"]);
        assert_eq!(table.rows[0], cells(&["7", "3", "1"]));
    }
}
