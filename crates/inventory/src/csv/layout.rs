//! Column-shape detection for imported spreadsheets.
//!
//! Two shapes are known: files produced by the catalog export (recognised by an
//! internal-code column, columns located by header name) and the import template
//! (fixed positions). Anything else is read positionally like the template.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::reader::CsvRecord;

/// Columns the importer understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    InternalCode,
    Name,
    Description,
    CurrentStock,
    MinStock,
    Location,
}

impl Column {
    /// Position in the import template.
    fn template_position(self) -> Option<usize> {
        match self {
            Column::Name => Some(0),
            Column::Description => Some(1),
            Column::CurrentStock => Some(2),
            Column::MinStock => Some(3),
            Column::Location => Some(4),
            Column::InternalCode => None,
        }
    }

    fn from_header(normalized: &str) -> Option<Self> {
        match normalized {
            "internal code" | "codigo interno" | "codigo" => Some(Column::InternalCode),
            "name" | "nombre" => Some(Column::Name),
            "description" | "descripcion" => Some(Column::Description),
            "current stock" | "stock actual" | "stock" => Some(Column::CurrentStock),
            "min stock" | "minimum stock" | "stock minimo" => Some(Column::MinStock),
            "location" | "ubicacion" => Some(Column::Location),
            _ => None,
        }
    }
}

/// Header positions found in an export-shaped file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub description: Option<usize>,
    pub current_stock: Option<usize>,
    pub min_stock: Option<usize>,
    pub location: Option<usize>,
}

/// Detected shape of an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportLayout {
    /// Catalog export: columns located by header name.
    Export(ColumnMap),
    /// Import template: fixed positions.
    Template,
    /// Unrecognised header: read positionally like the template.
    Fallback,
}

impl ImportLayout {
    /// Classify a file by its header record.
    pub fn detect(header: &CsvRecord) -> Self {
        let columns: Vec<Option<Column>> = header
            .fields
            .iter()
            .map(|h| Column::from_header(&normalize_header(h)))
            .collect();

        if columns.contains(&Some(Column::InternalCode)) {
            let position = |wanted: Column| columns.iter().position(|c| *c == Some(wanted));
            return ImportLayout::Export(ColumnMap {
                name: position(Column::Name),
                description: position(Column::Description),
                current_stock: position(Column::CurrentStock),
                min_stock: position(Column::MinStock),
                location: position(Column::Location),
            });
        }

        let first_is_name = columns.first() == Some(&Some(Column::Name));
        if first_is_name && columns.contains(&Some(Column::CurrentStock)) {
            return ImportLayout::Template;
        }

        ImportLayout::Fallback
    }

    /// Field index holding `column`, if this layout has one.
    pub fn position(&self, column: Column) -> Option<usize> {
        match self {
            ImportLayout::Export(map) => match column {
                Column::Name => map.name,
                Column::Description => map.description,
                Column::CurrentStock => map.current_stock,
                Column::MinStock => map.min_stock,
                Column::Location => map.location,
                Column::InternalCode => None,
            },
            ImportLayout::Template | ImportLayout::Fallback => column.template_position(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImportLayout::Export(_) => "export",
            ImportLayout::Template => "template",
            ImportLayout::Fallback => "fallback",
        }
    }
}

/// Canonical form of a header cell: trimmed, lower-case, without diacritics, with
/// `_`, `-` and runs of whitespace folded to a single space.
pub fn normalize_header(raw: &str) -> String {
    let stripped: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .replace(['_', '-'], " ");

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
