use std::borrow::Cow;

use crate::item::Item;

/// Header of the catalog export, in column order.
pub const EXPORT_HEADER: [&str; 9] = [
    "Internal Code",
    "Name",
    "Description",
    "Category",
    "Current Stock",
    "Min Stock",
    "Location",
    "Status",
    "Created Date",
];

/// Header of the blank import template.
pub const TEMPLATE_HEADER: [&str; 5] = ["Name", "Description", "Current Stock", "Min Stock", "Location"];

const BOM: char = '\u{feff}';

/// One exported item with its resolved category name.
#[derive(Debug, Clone, Copy)]
pub struct ExportRow<'a> {
    pub item: &'a Item,
    pub category_name: &'a str,
}

/// Render the catalog as CSV: UTF-8 with a leading BOM (spreadsheet friendly),
/// one header row, one row per item in the given order.
pub fn write_catalog<'a>(rows: impl IntoIterator<Item = ExportRow<'a>>) -> String {
    let mut out = String::new();
    out.push(BOM);
    push_record(&mut out, EXPORT_HEADER.iter().copied());

    for row in rows {
        let item = row.item;
        let code = item.internal_code.to_string();
        let stock = item.current_stock.to_string();
        let min_stock = item.min_stock.to_string();
        let created = item.created_at.format("%Y-%m-%d").to_string();
        push_record(
            &mut out,
            [
                code.as_str(),
                item.name.as_str(),
                item.description.as_deref().unwrap_or(""),
                row.category_name,
                stock.as_str(),
                min_stock.as_str(),
                item.location.as_deref().unwrap_or(""),
                item.status.as_str(),
                created.as_str(),
            ],
        );
    }

    out
}

/// Blank import template with one illustrative row.
pub fn write_template() -> String {
    let mut out = String::new();
    out.push(BOM);
    push_record(&mut out, TEMPLATE_HEADER.iter().copied());
    push_record(&mut out, ["Wireless mouse", "Logitech M185", "10", "2", "Shelf A-3"]);
    out
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push('\n');
}

/// Quote a field when it contains a delimiter, a quote or a line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::InternalCode;
    use crate::csv::reader::read_records;
    use crate::item::NewItem;
    use chrono::{TimeZone, Utc};
    use stockroom_core::{CategoryId, ItemId};

    fn item(name: &str, location: Option<&str>) -> Item {
        let mut new = NewItem::new(name, CategoryId::new());
        new.initial_stock = 3;
        new.min_stock = 1;
        new.location = location.map(str::to_string);
        let created = Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap();
        new.into_item(ItemId::new(), InternalCode::new(2026, 12).unwrap(), created)
            .unwrap()
    }

    #[test]
    fn starts_with_bom_and_header() {
        let csv = write_catalog(Vec::<ExportRow>::new());
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(
            csv.trim_start_matches('\u{feff}').lines().next().unwrap(),
            "Internal Code,Name,Description,Category,Current Stock,Min Stock,Location,Status,Created Date"
        );
    }

    #[test]
    fn quotes_fields_with_commas_and_quotes() {
        let item = item("Monitor 27\"", Some("Room 4, cabinet"));
        let csv = write_catalog([ExportRow {
            item: &item,
            category_name: "Displays",
        }]);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "2026-0012,\"Monitor 27\"\"\",,Displays,3,1,\"Room 4, cabinet\",available,2026-02-14"
        );
    }

    #[test]
    fn output_reads_back_field_for_field() {
        let item = item("Cable, \"cat6\"", Some("Line\nbreak"));
        let csv = write_catalog([ExportRow {
            item: &item,
            category_name: "Network",
        }]);
        let records = read_records(&csv);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fields[1], "Cable, \"cat6\"");
        assert_eq!(records[1].fields[6], "Line\nbreak");
    }

    #[test]
    fn template_is_recognised_as_template_layout() {
        let records = read_records(&write_template());
        let layout = crate::csv::ImportLayout::detect(&records[0]);
        assert_eq!(layout, crate::csv::ImportLayout::Template);
        assert_eq!(records.len(), 2);
    }
}
