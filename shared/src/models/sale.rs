//! Sale, line item and payment models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Customer name stored on sales that have no linked customer
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Lifecycle of a sale order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "sale_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Pending,
    Approved,
    Dispatched,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Approved => "approved",
            SaleStatus::Dispatched => "dispatched",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    /// pending -> approved
    pub fn approve(self) -> Result<SaleStatus, DomainError> {
        match self {
            SaleStatus::Pending => Ok(SaleStatus::Approved),
            other => Err(DomainError::InvalidTransition {
                from: other.as_str().to_string(),
                message: "Only pending orders can be approved",
            }),
        }
    }

    /// pending -> cancelled
    pub fn decline(self) -> Result<SaleStatus, DomainError> {
        match self {
            SaleStatus::Pending => Ok(SaleStatus::Cancelled),
            other => Err(DomainError::InvalidTransition {
                from: other.as_str().to_string(),
                message: "Only pending orders can be declined",
            }),
        }
    }

    /// approved -> dispatched
    pub fn dispatch(self) -> Result<SaleStatus, DomainError> {
        match self {
            SaleStatus::Approved => Ok(SaleStatus::Dispatched),
            other => Err(DomainError::InvalidTransition {
                from: other.as_str().to_string(),
                message: "Only approved orders can be dispatched",
            }),
        }
    }

    /// Only dispatched sales have taken goods out of stock
    pub fn restores_stock_on_delete(&self) -> bool {
        matches!(self, SaleStatus::Dispatched)
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SaleStatus::Pending),
            "approved" => Ok(SaleStatus::Approved),
            "dispatched" => Ok(SaleStatus::Dispatched),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown sale status: {}", other),
            )),
        }
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "payment_method", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Credit,
    Bank,
    Mobile,
}

/// Derived payment state of a sale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Partial,
    Credit,
}

/// Amounts derived from a sale total and its recorded payments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSummary {
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub payment_status: PaymentStatus,
}

impl PaymentSummary {
    pub fn compute(total_amount: Decimal, amount_paid: Decimal) -> Self {
        let payment_status = if amount_paid >= total_amount {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Credit
        };

        Self {
            amount_paid,
            balance: total_amount - amount_paid,
            payment_status,
        }
    }
}

/// A requested sale line before pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Overrides the product's current price
    pub price: Option<Decimal>,
    /// Pre-supplied commission; computed from the category rate when absent or zero
    pub commission_amount: Option<Decimal>,
}

/// A sale line after pricing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_sale: Decimal,
    pub subtotal: Decimal,
    pub commission_amount: Decimal,
}

/// quantity x unit price
pub fn line_subtotal(quantity: i32, price: Decimal) -> Decimal {
    Decimal::from(quantity) * price
}

/// Commission for a line: a non-zero supplied amount is kept, otherwise
/// `subtotal * percentage / 100`. A supplied zero counts as not set.
pub fn line_commission(
    subtotal: Decimal,
    commission_percentage: Decimal,
    supplied: Option<Decimal>,
) -> Decimal {
    match supplied {
        Some(amount) if !amount.is_zero() => amount,
        _ if commission_percentage > Decimal::ZERO => {
            subtotal * commission_percentage / Decimal::ONE_HUNDRED
        }
        _ => Decimal::ZERO,
    }
}

/// Price one requested line against the product's catalogue price and
/// its category commission rate.
pub fn price_line(
    line: &SaleLineRequest,
    catalogue_price: Decimal,
    commission_percentage: Decimal,
) -> Result<PricedLine, DomainError> {
    if line.quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "Quantity must be greater than zero",
        ));
    }

    let price_at_sale = line.price.unwrap_or(catalogue_price);
    if price_at_sale < Decimal::ZERO {
        return Err(DomainError::validation("price", "Price cannot be negative"));
    }

    let subtotal = line_subtotal(line.quantity, price_at_sale);
    let commission_amount = line_commission(subtotal, commission_percentage, line.commission_amount);

    Ok(PricedLine {
        product_id: line.product_id,
        quantity: line.quantity,
        price_at_sale,
        subtotal,
        commission_amount,
    })
}

/// Sum of line subtotals
pub fn order_total(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(|l| l.subtotal).sum()
}

/// Invoice numbers are the first 8 hex characters of a random UUID, uppercased
pub fn generate_invoice_number() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(quantity: i32, price: Option<Decimal>, commission: Option<Decimal>) -> SaleLineRequest {
        SaleLineRequest {
            product_id: Uuid::new_v4(),
            quantity,
            price,
            commission_amount: commission,
        }
    }

    #[test]
    fn test_only_pending_can_be_approved() {
        assert_eq!(SaleStatus::Pending.approve(), Ok(SaleStatus::Approved));
        for status in [SaleStatus::Approved, SaleStatus::Dispatched, SaleStatus::Cancelled] {
            let err = status.approve().unwrap_err();
            assert_eq!(err.to_string(), "Only pending orders can be approved");
        }
    }

    #[test]
    fn test_only_pending_can_be_declined() {
        assert_eq!(SaleStatus::Pending.decline(), Ok(SaleStatus::Cancelled));
        for status in [SaleStatus::Approved, SaleStatus::Dispatched, SaleStatus::Cancelled] {
            assert!(status.decline().is_err());
        }
    }

    #[test]
    fn test_only_approved_can_be_dispatched() {
        assert_eq!(SaleStatus::Approved.dispatch(), Ok(SaleStatus::Dispatched));
        assert!(SaleStatus::Pending.dispatch().is_err());
        assert!(SaleStatus::Dispatched.dispatch().is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            SaleStatus::Pending,
            SaleStatus::Approved,
            SaleStatus::Dispatched,
            SaleStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SaleStatus>(), Ok(status));
        }
        assert!("credit".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn test_payment_status() {
        let partial = PaymentSummary::compute(dec("100"), dec("50"));
        assert_eq!(partial.payment_status, PaymentStatus::Partial);
        assert_eq!(partial.balance, dec("50"));

        assert_eq!(
            PaymentSummary::compute(dec("100"), dec("100")).payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentSummary::compute(dec("100"), dec("120")).payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentSummary::compute(dec("100"), Decimal::ZERO).payment_status,
            PaymentStatus::Credit
        );
    }

    #[test]
    fn test_price_line_uses_catalogue_price_and_category_rate() {
        let priced = price_line(&line(3, None, None), dec("2500"), dec("10")).unwrap();
        assert_eq!(priced.price_at_sale, dec("2500"));
        assert_eq!(priced.subtotal, dec("7500"));
        assert_eq!(priced.commission_amount, dec("750"));
    }

    #[test]
    fn test_price_line_keeps_overrides() {
        let priced = price_line(&line(2, Some(dec("40")), Some(dec("1"))), dec("50"), dec("10")).unwrap();
        assert_eq!(priced.subtotal, dec("80"));
        assert_eq!(priced.commission_amount, dec("1"));

    }

    #[test]
    fn test_supplied_zero_commission_uses_category_rate() {
        let explicit_zero = price_line(&line(2, None, Some(Decimal::ZERO)), dec("50"), dec("10")).unwrap();
        assert_eq!(explicit_zero.commission_amount, dec("10"));

        let no_rate = price_line(&line(2, None, Some(Decimal::ZERO)), dec("50"), Decimal::ZERO).unwrap();
        assert_eq!(no_rate.commission_amount, Decimal::ZERO);
    }

    #[test]
    fn test_price_line_rejects_non_positive_quantity() {
        assert!(price_line(&line(0, None, None), dec("1"), Decimal::ZERO).is_err());
        assert!(price_line(&line(-4, None, None), dec("1"), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_invoice_number_format() {
        let invoice = generate_invoice_number();
        assert_eq!(invoice.len(), 8);
        assert!(invoice
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
