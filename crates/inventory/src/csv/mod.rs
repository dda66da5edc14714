//! Catalog spreadsheets: a self-contained CSV reader, import shape detection,
//! row extraction and the export/template writers.
//!
//! Import flow: [`read_records`] → first record to [`ImportLayout::detect`] →
//! every other record through [`ImportRow::extract`].

pub mod export;
pub mod layout;
pub mod reader;
pub mod row;

pub use export::{write_catalog, write_template, ExportRow, EXPORT_HEADER, TEMPLATE_HEADER};
pub use layout::{normalize_header, Column, ColumnMap, ImportLayout};
pub use reader::{read_records, CsvRecord};
pub use row::{parse_quantity, ImportRow, RowError};
