use thiserror::Error;

use stockroom_core::CategoryId;

use super::layout::{Column, ImportLayout};
use super::reader::CsvRecord;
use crate::item::{ItemStatus, NewItem};

/// Why a data row could not become an item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("missing name")]
    MissingName,

    #[error("unparseable quantity in {column}: '{value}'")]
    UnparseableQuantity { column: &'static str, value: String },
}

/// A data row read through an [`ImportLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based source line.
    pub line: usize,
    pub name: String,
    pub description: Option<String>,
    pub current_stock: i64,
    pub min_stock: i64,
    pub location: Option<String>,
}

impl ImportRow {
    /// Read one data record.
    pub fn extract(layout: &ImportLayout, record: &CsvRecord) -> Result<Self, RowError> {
        let text = |column: Column| -> &str {
            layout
                .position(column)
                .map(|idx| record.field(idx))
                .unwrap_or("")
        };
        let optional = |column: Column| -> Option<String> {
            Some(text(column).to_string()).filter(|v| !v.is_empty())
        };

        let name = text(Column::Name);
        if name.is_empty() {
            return Err(RowError::MissingName);
        }

        Ok(Self {
            line: record.line,
            name: name.to_string(),
            description: optional(Column::Description),
            current_stock: parse_quantity("current stock", text(Column::CurrentStock))?,
            min_stock: parse_quantity("min stock", text(Column::MinStock))?,
            location: optional(Column::Location),
        })
    }

    /// The item creation this row stands for.
    pub fn into_new_item(self, category_id: CategoryId) -> NewItem {
        NewItem {
            name: self.name,
            description: self.description,
            category_id,
            serial_number: None,
            min_stock: self.min_stock,
            status: ItemStatus::Available,
            location: self.location,
            initial_stock: self.current_stock,
        }
    }
}

/// Sanitize a spreadsheet quantity: every non-digit character is dropped before
/// parsing, so `"1,200 units"` reads as 1200 and `"-3"` as 3.
///
/// An empty cell is zero. Unlike plain digit stripping, which would also read a
/// digit-free cell such as `"abc"` as zero, a non-empty cell without any digit is
/// reported as a row error, as is one too large for the stock counter.
pub fn parse_quantity(column: &'static str, raw: &str) -> Result<i64, RowError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(RowError::UnparseableQuantity {
            column,
            value: raw.to_string(),
        });
    }

    digits.parse::<i64>().map_err(|_| RowError::UnparseableQuantity {
        column,
        value: raw.to_string(),
    })
}
