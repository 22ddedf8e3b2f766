//! System activity feed models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of entries returned by the activity feed
pub const RECENT_ACTIVITY_LIMIT: i64 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "activity_kind", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Sale,
    Stock,
    Transfer,
    Expense,
}

impl ActivityKind {
    /// Bootstrap icon class shown next to the entry
    pub fn icon_class(&self) -> &'static str {
        match self {
            ActivityKind::Sale => "bi-cart-check-fill",
            ActivityKind::Stock => "bi-box-seam",
            ActivityKind::Transfer => "bi-arrow-left-right",
            ActivityKind::Expense => "bi-wallet2",
        }
    }
}

pub fn sale_activity(invoice_number: &str, total_amount: Decimal) -> String {
    format!("New Sale #{} - TZS {}", invoice_number, total_amount)
}

pub fn stock_activity(product_name: &str, branch_name: &str) -> String {
    format!("Stock adjusted for {} at {}", product_name, branch_name)
}

pub fn transfer_activity(product_name: &str, from_branch: &str, to_branch: &str) -> String {
    format!(
        "Stock transfer: {} from {} to {}",
        product_name, from_branch, to_branch
    )
}

pub fn expense_activity(category: Option<&str>, amount: Decimal) -> String {
    format!(
        "New Expense: {} - TZS {}",
        category.unwrap_or(super::GENERAL_EXPENSE_CATEGORY),
        amount
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(
            sale_activity("AB12CD34", Decimal::from(15000)),
            "New Sale #AB12CD34 - TZS 15000"
        );
        assert_eq!(
            transfer_activity("Cement", "Main Branch", "Arusha"),
            "Stock transfer: Cement from Main Branch to Arusha"
        );
        assert_eq!(
            expense_activity(None, Decimal::from(500)),
            "New Expense: General - TZS 500"
        );
    }

    #[test]
    fn test_icons() {
        assert_eq!(ActivityKind::Stock.icon_class(), "bi-box-seam");
        assert_eq!(ActivityKind::Expense.icon_class(), "bi-wallet2");
    }
}
