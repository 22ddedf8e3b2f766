//! Spreadsheet import row parsing
//!
//! The backend turns an uploaded CSV or XLSX file into an [`ImportTable`];
//! everything after that (header lookup, number cleanup, per-row errors) lives here.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ProductType, DEFAULT_LOW_STOCK_THRESHOLD};

pub const PRODUCT_TEMPLATE_HEADERS: [&str; 10] = [
    "Name",
    "SKU",
    "Category",
    "Type",
    "Cost",
    "Price",
    "Weight (kg)",
    "Description",
    "Opening Stock",
    "Low Stock Alert",
];

pub const PRODUCT_TEMPLATE_SAMPLE: [&str; 10] = [
    "Hammer",
    "HMR-001",
    "Tools",
    "product",
    "15000",
    "25000",
    "1.5",
    "Heavy duty steel hammer",
    "50",
    "5",
];

pub const CUSTOMER_TEMPLATE_HEADERS: [&str; 4] = ["Name", "Phone", "Email", "Address"];

pub const CUSTOMER_TEMPLATE_SAMPLE: [&str; 4] = [
    "John Doe",
    "1234567890",
    "john@example.com",
    "123 Main St, City",
];

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Excel,
}

impl ImportFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(ImportFormat::Csv)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(ImportFormat::Excel)
        } else {
            None
        }
    }
}

/// Header row plus data rows, all as trimmed text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ImportTable {
    /// Builds a table, dropping rows whose cells are all blank
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();
        Self { headers, rows }
    }

    /// Case-insensitive cell lookup. Blank cells read as `None`.
    pub fn cell<'a>(&self, row: &'a [String], header: &str) -> Option<&'a str> {
        let column = self
            .headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(header))?;
        row.get(column)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Parses a number that may carry thousands separators, e.g. `25,000.50`
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(cleaned.trim()).ok()
}

/// Whole quantity; fractional input is truncated toward zero
fn parse_quantity(raw: &str) -> Option<i32> {
    use rust_decimal::prelude::ToPrimitive;
    parse_number(raw).and_then(|d| d.trunc().to_i32())
}

/// A validated product row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImportRow {
    pub row_number: usize,
    pub name: String,
    pub sku: Option<String>,
    pub category: String,
    pub product_type: ProductType,
    pub cost: Decimal,
    pub price: Decimal,
    pub weight: Decimal,
    pub description: String,
    pub opening_stock: i32,
    pub low_stock_threshold: i32,
}

/// A customer row; rows without a name are skipped rather than reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerImportRow {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

fn money(table: &ImportTable, row: &[String], header: &str, row_number: usize) -> Result<Decimal, String> {
    match table.cell(row, header) {
        None => Ok(Decimal::ZERO),
        Some(raw) => parse_number(raw)
            .ok_or_else(|| format!("Row {}: Invalid {} '{}'", row_number, header, raw)),
    }
}

/// Parses data row `index` (0-based). Row numbers in messages count the
/// header as row 1, so the first data row is row 2.
pub fn parse_product_row(table: &ImportTable, index: usize) -> Result<ProductImportRow, String> {
    let row_number = index + 2;
    let row = table
        .rows
        .get(index)
        .ok_or_else(|| format!("Row {}: Missing row", row_number))?;

    let category = table
        .cell(row, "Category")
        .ok_or_else(|| format!("Row {}: Missing Category", row_number))?;
    let name = table
        .cell(row, "Name")
        .ok_or_else(|| format!("Row {}: Missing Product Name", row_number))?;

    let product_type = ProductType::from_str(table.cell(row, "Type").unwrap_or("product"))
        .map_err(|e| format!("Row {}: {}", row_number, e))?;

    // A bad value in either column resets both to their defaults.
    let (opening_stock, low_stock_threshold) = match (
        table.cell(row, "Opening Stock").map(parse_quantity),
        table.cell(row, "Low Stock Alert").map(parse_quantity),
    ) {
        (Some(None), _) | (_, Some(None)) => (0, DEFAULT_LOW_STOCK_THRESHOLD),
        (opening, low) => (
            opening.flatten().unwrap_or(0),
            low.flatten().unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        ),
    };

    Ok(ProductImportRow {
        row_number,
        name: name.to_string(),
        sku: table.cell(row, "SKU").map(str::to_string),
        category: category.to_string(),
        product_type,
        cost: money(table, row, "Cost", row_number)?,
        price: money(table, row, "Price", row_number)?,
        weight: money(table, row, "Weight (kg)", row_number)?,
        description: table.cell(row, "Description").unwrap_or_default().to_string(),
        opening_stock,
        low_stock_threshold,
    })
}

pub fn parse_customer_row(table: &ImportTable, index: usize) -> Option<CustomerImportRow> {
    let row = table.rows.get(index)?;
    let name = table.cell(row, "Name")?;

    Some(CustomerImportRow {
        name: name.to_string(),
        phone: table.cell(row, "Phone").unwrap_or_default().to_string(),
        email: table.cell(row, "Email").unwrap_or_default().to_string(),
        address: table.cell(row, "Address").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ImportTable {
        ImportTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(ImportFormat::from_file_name("items.CSV"), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::from_file_name("items.xlsx"), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::from_file_name("items.xls"), Some(ImportFormat::Excel));
        assert_eq!(ImportFormat::from_file_name("items.pdf"), None);
    }

    #[test]
    fn test_parse_number_strips_separators() {
        assert_eq!(parse_number("25,000"), Some(Decimal::from(25000)));
        assert_eq!(parse_number(" 1.5 "), Some(Decimal::new(15, 1)));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let t = table(&["name", "CATEGORY", "price"], &[&["Hammer", "Tools", "25,000"]]);
        let row = parse_product_row(&t, 0).unwrap();
        assert_eq!(row.name, "Hammer");
        assert_eq!(row.category, "Tools");
        assert_eq!(row.price, Decimal::from(25000));
        assert_eq!(row.product_type, ProductType::Product);
        assert_eq!(row.opening_stock, 0);
        assert_eq!(row.low_stock_threshold, 10);
    }

    #[test]
    fn test_missing_category_is_reported_first() {
        let t = table(&["Name", "Category"], &[&["Hammer", ""], &["", ""]]);
        assert_eq!(parse_product_row(&t, 0).unwrap_err(), "Row 2: Missing Category");
        // all-blank rows are dropped, so there is no second row
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn test_missing_name() {
        let t = table(&["Name", "Category"], &[&["", "Tools"]]);
        assert_eq!(parse_product_row(&t, 0).unwrap_err(), "Row 2: Missing Product Name");
    }

    #[test]
    fn test_stock_columns_fall_back_together() {
        let t = table(
            &["Name", "Category", "Opening Stock", "Low Stock Alert"],
            &[&["Nails", "Tools", "1,200.7", "3"], &["Paint", "Tools", "lots", "3"]],
        );
        let good = parse_product_row(&t, 0).unwrap();
        assert_eq!((good.opening_stock, good.low_stock_threshold), (1200, 3));

        let bad = parse_product_row(&t, 1).unwrap();
        assert_eq!((bad.opening_stock, bad.low_stock_threshold), (0, 10));
    }

    #[test]
    fn test_invalid_price_is_a_row_error() {
        let t = table(&["Name", "Category", "Price"], &[&["Nails", "Tools", "cheap"]]);
        assert_eq!(
            parse_product_row(&t, 0).unwrap_err(),
            "Row 2: Invalid Price 'cheap'"
        );
    }

    #[test]
    fn test_customer_rows_without_name_are_skipped() {
        let t = table(
            &CUSTOMER_TEMPLATE_HEADERS,
            &[&["", "0700", "", ""], &["Asha", "0712", "asha@example.com", "Dodoma"]],
        );
        assert_eq!(parse_customer_row(&t, 0), None);
        assert_eq!(parse_customer_row(&t, 1).unwrap().phone, "0712");
    }

    #[test]
    fn test_template_sample_parses() {
        let t = table(&PRODUCT_TEMPLATE_HEADERS, &[&PRODUCT_TEMPLATE_SAMPLE]);
        let row = parse_product_row(&t, 0).unwrap();
        assert_eq!(row.sku.as_deref(), Some("HMR-001"));
        assert_eq!(row.weight, Decimal::new(15, 1));
        assert_eq!(row.opening_stock, 50);
        assert_eq!(row.low_stock_threshold, 5);
    }
}
