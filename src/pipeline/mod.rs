//! Pipeline stages for PDF-to-table conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without a PDF and backends can be swapped without touching the
//! stages around them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ detect ──▶ assemble ──▶ clean ──▶ export
//! (bytes)   (grids)    (scores)   (header,    (labels,   (xlsx/csv)
//!                                  provenance) blanks)
//! ```
//!
//! 1. [`input`]: load and validate the PDF, stage it on disk when a
//!    backend needs a path
//! 2. [`extract`]: one of three backends turns a page into raw grids or text
//! 3. [`detect`]: score grids and keep the table-like ones
//! 4. [`assemble`]: split header from data, prepend provenance columns
//! 5. [`clean`]: normalise labels ([`normalize`]), drop empty columns
//!    and blank rows, fill missing cells
//! 6. [`export`]: write the workbook or CSV files

pub mod assemble;
pub mod clean;
pub mod detect;
pub mod export;
pub mod extract;
pub mod input;
pub mod normalize;
