use crate::inventory::JiomartRecord;
use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;
use tracing::info;

pub const JIOMART_SHEET: &str = "inventories";
pub const JIOMART_FILE_NAME: &str = "jiomart_inventory_template.xlsx";

/// Bulk-upload template columns, in sheet order. `*` marks the columns
/// JioMart requires.
pub const JIOMART_COLUMNS: [&str; 21] = [
    "Variant SKU*",
    "Stock SKU*",
    "Fulfiller Branch Number*",
    "Inventory SKU*",
    "Batch Number",
    "Available quantity*",
    "Low Stock Threshold*",
    "Multiplier",
    "Shelf life value",
    "Shelf life unit",
    "Min lead time to source*",
    "Max lead time to source*",
    "Lead time unit*",
    "Min time to ship*",
    "Max time to ship*",
    "Shipping Time unit*",
    "Best Before Buy Date",
    "Manufactured Date",
    "Month and Year of Import",
    "Country of Origin*",
    "Notes",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    NothingToExport,
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(u32),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

/// One sheet row, cells aligned with [`JIOMART_COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct JiomartExportRow {
    cells: Vec<Cell>,
}

impl JiomartExportRow {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[cfg(test)]
    pub fn get(&self, column: &str) -> Option<&Cell> {
        JIOMART_COLUMNS
            .iter()
            .position(|title| *title == column)
            .and_then(|index| self.cells.get(index))
    }
}

pub fn format_jiomart(
    records: &[JiomartRecord],
) -> Result<Vec<JiomartExportRow>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    Ok(records.iter().map(format_record).collect())
}

fn format_record(record: &JiomartRecord) -> JiomartExportRow {
    let sku = record.sku.trim();
    let or_sku = |value: &str| {
        let value = value.trim();
        let chosen = if value.is_empty() { sku } else { value };
        chosen.to_string()
    };
    let text =
        |value: &Option<String>| Cell::text(value.as_deref().map(str::trim).unwrap_or_default());
    let number = |value: Option<u32>, default: u32| {
        Cell::Number(value.filter(|n| *n > 0).unwrap_or(default))
    };
    let unit = |value: &Option<String>| {
        Cell::text(
            value
                .as_deref()
                .map(str::trim)
                .filter(|unit| !unit.is_empty())
                .unwrap_or("days")
                .to_lowercase(),
        )
    };

    JiomartExportRow {
        cells: vec![
            Cell::text(sku),
            Cell::text(or_sku(&record.stock_sku)),
            Cell::text(record.branch.trim()),
            Cell::text(or_sku(&record.inventory_sku)),
            text(&record.batch_number),
            Cell::Number(record.qty),
            number(Some(record.threshold), 5),
            number(record.multiplier, 1),
            text(&record.shelf_life_value),
            text(&record.shelf_life_unit),
            number(record.min_lead_time, 1),
            number(record.max_lead_time, 3),
            unit(&record.lead_time_unit),
            number(record.min_ship_time, 1),
            number(record.max_ship_time, 4),
            unit(&record.shipping_time_unit),
            text(&record.best_before),
            text(&record.manufactured),
            text(&record.imported),
            Cell::text(
                record
                    .origin
                    .as_deref()
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .unwrap_or("India"),
            ),
            text(&record.notes),
        ],
    }
}

/// Header row plus one row per record, as an in-memory XLSX file.
pub fn write_workbook(rows: &[JiomartExportRow]) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(JIOMART_SHEET)?;
    for (col, title) in JIOMART_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, cell) in row.cells().iter().enumerate() {
            match cell {
                Cell::Text(value) => sheet.write_string(line, col as u16, value)?,
                Cell::Number(value) => sheet.write_number(line, col as u16, *value)?,
            };
        }
    }
    let bytes = workbook.save_to_buffer()?;
    info!(
        target = "inventory.export",
        rows = rows.len(),
        bytes = bytes.len(),
        "jiomart workbook written"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sku: &str, qty: u32) -> JiomartRecord {
        JiomartRecord {
            sku: sku.to_string(),
            qty,
            ..JiomartRecord::default()
        }
    }

    #[test]
    fn empty_input_has_nothing_to_export() {
        let err = format_jiomart(&[]).expect_err("empty");
        assert!(matches!(err, ExportError::NothingToExport));
        assert_eq!(err.to_string(), "nothing to export");
        assert!(matches!(write_workbook(&[]), Err(ExportError::NothingToExport)));
    }

    #[test]
    fn bare_record_gets_template_defaults() {
        let rows = format_jiomart(&[record("NT-4N-170", 0)]).expect("rows");
        let row = &rows[0];
        assert_eq!(row.cells().len(), JIOMART_COLUMNS.len());
        assert_eq!(row.get("Stock SKU*"), Some(&Cell::text("NT-4N-170")));
        assert_eq!(row.get("Inventory SKU*"), Some(&Cell::text("NT-4N-170")));
        assert_eq!(row.get("Fulfiller Branch Number*"), Some(&Cell::text("")));
        assert_eq!(row.get("Available quantity*"), Some(&Cell::Number(0)));
        assert_eq!(row.get("Low Stock Threshold*"), Some(&Cell::Number(5)));
        assert_eq!(row.get("Multiplier"), Some(&Cell::Number(1)));
        assert_eq!(row.get("Min lead time to source*"), Some(&Cell::Number(1)));
        assert_eq!(row.get("Max lead time to source*"), Some(&Cell::Number(3)));
        assert_eq!(row.get("Lead time unit*"), Some(&Cell::text("days")));
        assert_eq!(row.get("Min time to ship*"), Some(&Cell::Number(1)));
        assert_eq!(row.get("Max time to ship*"), Some(&Cell::Number(4)));
        assert_eq!(row.get("Country of Origin*"), Some(&Cell::text("India")));
        assert_eq!(row.get("Notes"), Some(&Cell::text("")));
    }

    #[test]
    fn projected_values_win_over_defaults() {
        let rows = format_jiomart(&[JiomartRecord {
            stock_sku: "NT4N170-STK".into(),
            branch: "3P2SUOA2FC02".into(),
            threshold: 8,
            min_lead_time: Some(1),
            max_lead_time: Some(2),
            lead_time_unit: Some("Days".into()),
            shipping_time_unit: Some("HOURS".into()),
            origin: Some("Italy".into()),
            ..record("NT-4N-170", 14)
        }])
        .expect("rows");
        let row = &rows[0];
        assert_eq!(row.get("Stock SKU*"), Some(&Cell::text("NT4N170-STK")));
        assert_eq!(row.get("Inventory SKU*"), Some(&Cell::text("NT-4N-170")));
        assert_eq!(
            row.get("Fulfiller Branch Number*"),
            Some(&Cell::text("3P2SUOA2FC02"))
        );
        assert_eq!(row.get("Available quantity*"), Some(&Cell::Number(14)));
        assert_eq!(row.get("Low Stock Threshold*"), Some(&Cell::Number(8)));
        assert_eq!(row.get("Max lead time to source*"), Some(&Cell::Number(2)));
        assert_eq!(row.get("Lead time unit*"), Some(&Cell::text("days")));
        assert_eq!(row.get("Shipping Time unit*"), Some(&Cell::text("hours")));
        assert_eq!(row.get("Country of Origin*"), Some(&Cell::text("Italy")));
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let rows =
            format_jiomart(&[record("NT-4N-170", 3), record("NT-5N-170", 0)]).expect("rows");
        let bytes = write_workbook(&rows).expect("xlsx");
        assert!(bytes.starts_with(b"PK"));
    }
}
