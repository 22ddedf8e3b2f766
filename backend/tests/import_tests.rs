//! Spreadsheet import tests
//!
//! Tests for bulk import including:
//! - CSV reading and header matching
//! - Product row validation and defaults
//! - Customer row handling
//! - Downloadable templates

use std::str::FromStr;

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::import::{
    parse_customer_row, parse_number, parse_product_row, PRODUCT_TEMPLATE_HEADERS,
    PRODUCT_TEMPLATE_SAMPLE,
};
use shared::{ProductType, DEFAULT_LOW_STOCK_THRESHOLD};
use sms_server::services::import::{read_csv, read_table, template_csv};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: thousands separators never change the parsed value
    #[test]
    fn test_thousands_separators(whole in 0u64..1_000_000_000, cents in 0u32..100) {
        let plain = format!("{}.{:02}", whole, cents);
        let mut grouped = String::new();
        let digits = whole.to_string();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        let grouped = format!("{}.{:02}", grouped, cents);
        prop_assert_eq!(parse_number(&grouped), parse_number(&plain));
        prop_assert!(parse_number(&plain).is_some());
    }

    /// Property: header lookup ignores case
    #[test]
    fn test_header_case_insensitive(name in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]") {
        let csv = format!("NAME,category\n{},Tools\n", name);
        let table = read_csv(csv.as_bytes()).unwrap();
        let row = parse_product_row(&table, 0).unwrap();
        prop_assert_eq!(row.name, name.trim());
        prop_assert_eq!(row.category, "Tools");
    }
}

// ============================================================================
// Unit Tests: Product Rows
// ============================================================================

#[cfg(test)]
mod product_row_tests {
    use super::*;

    #[test]
    fn test_template_parses_cleanly() {
        let csv = template_csv(&PRODUCT_TEMPLATE_HEADERS, &PRODUCT_TEMPLATE_SAMPLE).unwrap();
        let table = read_table("products_template.csv", csv.as_bytes()).unwrap();
        let row = parse_product_row(&table, 0).unwrap();

        assert_eq!(row.row_number, 2);
        assert_eq!(row.sku.as_deref(), Some("HMR-001"));
        assert_eq!(row.product_type, ProductType::Product);
        assert_eq!(row.price, dec("25000"));
        assert_eq!(row.weight, dec("1.5"));
        assert_eq!(row.opening_stock, 50);
        assert_eq!(row.low_stock_threshold, 5);
    }

    #[test]
    fn test_missing_category_is_reported_with_row_number() {
        let table = read_csv(b"Name,Category\nHammer,Tools\nSaw,\n").unwrap();
        assert!(parse_product_row(&table, 0).is_ok());
        assert_eq!(parse_product_row(&table, 1).unwrap_err(), "Row 3: Missing Category");
    }

    #[test]
    fn test_missing_name_is_reported() {
        let table = read_csv(b"Name,Category\n,Tools\n").unwrap();
        assert_eq!(parse_product_row(&table, 0).unwrap_err(), "Row 2: Missing Product Name");
    }

    #[test]
    fn test_bad_price_is_reported() {
        let table = read_csv(b"Name,Category,Price\nHammer,Tools,cheap\n").unwrap();
        let err = parse_product_row(&table, 0).unwrap_err();
        assert!(err.starts_with("Row 2: Invalid Price"));
    }

    #[test]
    fn test_bad_stock_values_fall_back_to_defaults() {
        let table =
            read_csv(b"Name,Category,Opening Stock,Low Stock Alert\nHammer,Tools,many,3\n").unwrap();
        let row = parse_product_row(&table, 0).unwrap();
        assert_eq!(row.opening_stock, 0);
        assert_eq!(row.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn test_fractional_stock_truncates() {
        let table = read_csv(b"Name,Category,Opening Stock\nHammer,Tools,12.9\n").unwrap();
        assert_eq!(parse_product_row(&table, 0).unwrap().opening_stock, 12);
    }

    #[test]
    fn test_service_rows() {
        let table = read_csv(b"Name,Category,Type\nDelivery,Logistics,service\n").unwrap();
        let row = parse_product_row(&table, 0).unwrap();
        assert_eq!(row.product_type, ProductType::Service);
        assert!(!row.product_type.tracks_stock());
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let table = read_csv(b"Name,Category\n,\nHammer,Tools\n , \n").unwrap();
        assert_eq!(table.rows.len(), 1);
    }
}

// ============================================================================
// Unit Tests: Customer Rows and Formats
// ============================================================================

#[cfg(test)]
mod customer_row_tests {
    use super::*;

    #[test]
    fn test_customer_without_name_is_skipped() {
        let table = read_csv(b"Name,Phone\n,0712345678\nMama Njeri,0722000111\n").unwrap();
        assert!(parse_customer_row(&table, 0).is_none());
        let row = parse_customer_row(&table, 1).unwrap();
        assert_eq!(row.name, "Mama Njeri");
        assert_eq!(row.email, "");
    }

    #[test]
    fn test_format_detection() {
        assert!(read_table("customers.CSV", b"Name\nA\n").is_ok());
        assert!(read_table("customers.txt", b"Name\nA\n").is_err());
    }
}
