//! Bulk product and customer import from uploaded spreadsheets
//!
//! Each data row runs inside its own savepoint so a failing row is reported
//! and rolled back without discarding the rows around it.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use sqlx::{Acquire, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::catalog::{ensure_branch, ensure_category, insert_product, open_stock, NewProduct};
use crate::services::customer::upsert_by_name;
use crate::services::notification::{stock_events, StockChange};
use shared::import::{
    parse_customer_row, parse_product_row, ImportFormat, ImportTable, ProductImportRow,
};
use shared::{Event, MovementReason};

#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
}

/// Outcome of an import. Any row error turns the response into 207.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub message: String,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_headers: Option<Vec<String>>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read an uploaded product sheet. The extension picks the parser.
pub fn read_table(file_name: &str, bytes: &[u8]) -> AppResult<ImportTable> {
    let format = ImportFormat::from_file_name(file_name).ok_or_else(|| {
        AppError::ValidationError("Unsupported file format. Please upload CSV or Excel.".to_string())
    })?;

    let table = match format {
        ImportFormat::Csv => read_csv(bytes),
        ImportFormat::Excel => read_workbook(bytes),
    }
    .map_err(|e| AppError::ValidationError(format!("Failed to read file: {}", e)))?;

    tracing::debug!(rows = table.rows.len(), headers = ?table.headers, file_name, "Import file read");
    Ok(table)
}

/// Parse CSV bytes; short rows are allowed.
pub fn read_csv(bytes: &[u8]) -> Result<ImportTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| e.to_string())
        })
        .collect::<Result<Vec<Vec<String>>, String>>()?;

    Ok(ImportTable::new(headers, rows))
}

/// First worksheet of an XLSX/XLS workbook; row 1 holds the headers.
fn read_workbook(bytes: &[u8]) -> Result<ImportTable, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "Workbook has no sheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();

    Ok(ImportTable::new(headers, rows.collect()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// CSV template: header row plus one sample row
pub fn template_csv(headers: &[&str], sample: &[&str]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in [headers, sample] {
        wtr.write_record(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding error: {}", e)))
}

impl ImportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Import products, get-or-creating categories and products and adding
    /// opening stock at `stock_branch` for stock-tracked rows.
    pub async fn import_products(
        &self,
        table: &ImportTable,
        stock_branch: &str,
    ) -> AppResult<(ImportReport, Vec<Event>)> {
        let mut tx = self.db.begin().await?;
        let mut branch_id: Option<Uuid> = None;
        let mut errors = Vec::new();
        let mut events = Vec::new();
        let mut imported = 0usize;

        for index in 0..table.rows.len() {
            let row = match parse_product_row(table, index) {
                Ok(row) => row,
                Err(message) => {
                    errors.push(message);
                    continue;
                }
            };

            if row.product_type.tracks_stock() && branch_id.is_none() {
                branch_id = Some(ensure_branch(&mut tx, stock_branch).await?);
            }

            let mut savepoint = tx.begin().await?;
            match import_product_row(&mut savepoint, &row, branch_id).await {
                Ok(change) => {
                    savepoint.commit().await?;
                    if let Some(change) = change {
                        events.extend(stock_events(&change));
                    }
                    imported += 1;
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    tracing::warn!(row = row.row_number, error = %e, "Product import row failed");
                    errors.push(format!("Row {}: {}", row.row_number, e));
                }
            }
        }

        tx.commit().await?;

        tracing::info!(rows = table.rows.len(), imported, errors = errors.len(), "Product import finished");

        let report = ImportReport {
            message: format!(
                "Processed {} rows, successfully imported/found {} products.",
                table.rows.len(),
                imported
            ),
            errors,
            detected_headers: Some(table.headers.clone()),
        };
        Ok((report, events))
    }

    /// Update-or-create customers by name. Rows without a name are skipped.
    pub async fn import_customers(&self, table: &ImportTable) -> AppResult<ImportReport> {
        let mut tx = self.db.begin().await?;
        let mut errors = Vec::new();
        let mut imported = 0usize;

        for index in 0..table.rows.len() {
            let Some(row) = parse_customer_row(table, index) else {
                continue;
            };

            let mut savepoint = tx.begin().await?;
            match upsert_by_name(&mut savepoint, &row).await {
                Ok(_) => {
                    savepoint.commit().await?;
                    imported += 1;
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    errors.push(format!("Error importing {}: {}", row.name, e));
                }
            }
        }

        tx.commit().await?;

        tracing::info!(imported, errors = errors.len(), "Customer import finished");

        Ok(ImportReport {
            message: format!("Successfully imported {} customers", imported),
            errors,
            detected_headers: None,
        })
    }
}

async fn import_product_row(
    conn: &mut PgConnection,
    row: &ProductImportRow,
    branch_id: Option<Uuid>,
) -> AppResult<Option<StockChange>> {
    let category_id = ensure_category(conn, &row.category).await?;

    let existing = match row.sku.as_deref() {
        Some(sku) => {
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE sku = $1")
                .bind(sku)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => {
            sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM products WHERE name = $1 AND category_id = $2 ORDER BY created_at LIMIT 1",
            )
            .bind(&row.name)
            .bind(category_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    let product_id = match existing {
        Some(id) => id,
        None => {
            insert_product(
                conn,
                &NewProduct {
                    name: &row.name,
                    sku: row.sku.as_deref(),
                    product_type: row.product_type,
                    category_id,
                    price: row.price,
                    cost: row.cost,
                    weight: row.weight,
                    description: &row.description,
                },
            )
            .await?
        }
    };

    match branch_id.filter(|_| row.product_type.tracks_stock()) {
        Some(branch_id) => {
            let change = open_stock(
                conn,
                product_id,
                branch_id,
                row.opening_stock,
                row.low_stock_threshold,
                MovementReason::Import,
            )
            .await?;
            Ok(Some(change))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::import::{CUSTOMER_TEMPLATE_HEADERS, CUSTOMER_TEMPLATE_SAMPLE};

    #[test]
    fn test_read_csv_keeps_short_rows() {
        let table = read_csv(b"Name,Category,Price\nHammer,Tools,\"25,000\"\nNails,Tools\n,,\n").unwrap();
        assert_eq!(table.headers, vec!["Name", "Category", "Price"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(&table.rows[0], "price"), Some("25,000"));
        assert_eq!(table.cell(&table.rows[1], "Price"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_table("stock.pdf", b"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Unsupported file format. Please upload CSV or Excel."
        );
    }

    #[test]
    fn test_corrupt_workbook_is_a_read_error() {
        let err = read_table("stock.xlsx", b"not a zip").unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_template_round_trips_through_reader() {
        let csv = template_csv(&CUSTOMER_TEMPLATE_HEADERS, &CUSTOMER_TEMPLATE_SAMPLE).unwrap();
        assert!(csv.starts_with("Name,Phone,Email,Address\n"));

        let table = read_csv(csv.as_bytes()).unwrap();
        let row = parse_customer_row(&table, 0).unwrap();
        assert_eq!(row.name, "John Doe");
        assert_eq!(row.address, "123 Main St, City");
    }

    #[test]
    fn test_report_completeness() {
        let report = ImportReport {
            message: "Successfully imported 0 customers".to_string(),
            errors: vec![],
            detected_headers: None,
        };
        assert!(report.is_complete());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("detected_headers").is_none());
    }
}
