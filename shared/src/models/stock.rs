//! Stock ledger models

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Threshold applied to new stock rows unless one is supplied
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Kind of manual stock adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "adjustment_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Addition,
    Deduction,
    Correction,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Addition => "addition",
            AdjustmentType::Deduction => "deduction",
            AdjustmentType::Correction => "correction",
        }
    }

    /// New quantity after applying this adjustment to `current`.
    /// Correction sets the quantity outright.
    pub fn apply(&self, current: i32, quantity: i32) -> Result<i32, DomainError> {
        let next = match self {
            AdjustmentType::Addition => current.checked_add(quantity),
            AdjustmentType::Deduction => current.checked_sub(quantity),
            AdjustmentType::Correction => Some(quantity),
        };
        next.ok_or_else(|| {
            DomainError::validation("quantity", "Adjustment would overflow the stock quantity")
        })
    }
}

/// Why a stock row changed; recorded on every `stock_movements` entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "movement_reason", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Purchase,
    GoodsReceived,
    TransferOut,
    TransferIn,
    Adjustment,
    Dispatch,
    SaleReversal,
    Import,
    OpeningStock,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "purchase",
            MovementReason::GoodsReceived => "goods_received",
            MovementReason::TransferOut => "transfer_out",
            MovementReason::TransferIn => "transfer_in",
            MovementReason::Adjustment => "adjustment",
            MovementReason::Dispatch => "dispatch",
            MovementReason::SaleReversal => "sale_reversal",
            MovementReason::Import => "import",
            MovementReason::OpeningStock => "opening_stock",
        }
    }
}

/// Low stock when the quantity has fallen to or below the threshold
pub fn is_low_stock(quantity: i32, threshold: i32) -> bool {
    quantity <= threshold
}

/// Quantities moved by purchases, transfers and receipts must be positive
pub fn validate_movement_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_apply() {
        assert_eq!(AdjustmentType::Addition.apply(10, 5), Ok(15));
        assert_eq!(AdjustmentType::Deduction.apply(10, 15), Ok(-5));
        assert_eq!(AdjustmentType::Correction.apply(10, 3), Ok(3));
        assert_eq!(AdjustmentType::Correction.apply(-7, 0), Ok(0));
    }

    #[test]
    fn test_adjustment_overflow_is_rejected() {
        let err = AdjustmentType::Addition.apply(i32::MAX - 5, 10).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "quantity", .. }));
        assert!(AdjustmentType::Deduction
            .apply(-2_000_000_000, 2_000_000_000)
            .is_err());
        assert_eq!(AdjustmentType::Correction.apply(i32::MIN, i32::MAX), Ok(i32::MAX));
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(is_low_stock(10, 10));
        assert!(is_low_stock(-1, 0));
        assert!(!is_low_stock(11, 10));
    }

    #[test]
    fn test_movement_quantity_must_be_positive() {
        assert!(validate_movement_quantity(1).is_ok());
        assert!(validate_movement_quantity(0).is_err());
        assert!(validate_movement_quantity(-3).is_err());
    }
}
