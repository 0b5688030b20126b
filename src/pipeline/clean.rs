//! Record cleaning: turn an assembled table into an export-ready one.
//!
//! ## Step order
//!
//! Steps run in a fixed order; the first three are switchable through
//! [`CleaningOptions`], the last always runs:
//!
//! 1. normalise column labels ([`super::normalize`])
//! 2. drop columns that are entirely missing or entirely blank
//! 3. fill missing cells with `""`
//! 4. drop rows whose cells are all blank
//!
//! Column removal looks at the labels produced by step 1 and row removal
//! looks at whatever steps 1–3 left behind. An empty table (no rows or no
//! columns) is returned untouched. A ragged table is first made rectangular
//! with [`Table::conform`].

use crate::config::CleaningOptions;
use crate::pipeline::normalize::normalize_columns;
use crate::table::{is_blank, Table};

/// Clean `table` according to `options`.
///
/// The result may be empty (every row blank); the caller decides what to do
/// with empty tables. Cleaning its own output again with the same options is
/// a no-op.
pub fn clean_table(mut table: Table, options: &CleaningOptions) -> Table {
    if table.is_empty() {
        return table;
    }
    table.conform();

    if options.normalize_columns {
        table.columns = normalize_columns(&table.columns)
            .into_iter()
            .map(Some)
            .collect();
    }

    if options.drop_empty_columns {
        drop_empty_columns(&mut table);
    }

    if options.fill_missing {
        fill_missing(&mut table);
    }

    drop_blank_rows(&mut table);
    table
}

fn drop_empty_columns(table: &mut Table) {
    let keep: Vec<bool> = (0..table.n_cols())
        .map(|col| table.rows.iter().any(|row| !is_blank(&row[col])))
        .collect();
    if keep.iter().all(|&k| k) {
        return;
    }

    table.columns = retain_by_mask(std::mem::take(&mut table.columns), &keep);
    for row in &mut table.rows {
        *row = retain_by_mask(std::mem::take(row), &keep);
    }
}

fn fill_missing(table: &mut Table) {
    for cell in table.rows.iter_mut().flatten() {
        if cell.is_none() {
            *cell = Some(String::new());
        }
    }
}

fn drop_blank_rows(table: &mut Table) {
    table.rows.retain(|row| !row.iter().all(is_blank));
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}
