//! Payment and expense models

use serde::{Deserialize, Serialize};

/// Direction of a money movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "transaction_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Income,
    Expense,
}

/// Label used for expenses without a category
pub const GENERAL_EXPENSE_CATEGORY: &str = "General";
