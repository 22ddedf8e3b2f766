//! Sales order lifecycle tests
//!
//! Tests for the order flow including:
//! - Line pricing and commission
//! - Payment status derivation
//! - Approve / decline / dispatch transitions
//! - All-or-nothing dispatch planning

use std::collections::HashMap;
use std::str::FromStr;

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    order_total, plan_dispatch, price_line, DispatchLine, DispatchTransport, DomainError,
    PaymentStatus, PaymentSummary, SaleLineRequest, SaleStatus, StockLevel,
};
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Prices in cents up to 1,000,000.00
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn quantity_strategy() -> impl Strategy<Value = i32> {
    1i32..500
}

fn status_strategy() -> impl Strategy<Value = SaleStatus> {
    prop_oneof![
        Just(SaleStatus::Pending),
        Just(SaleStatus::Approved),
        Just(SaleStatus::Dispatched),
        Just(SaleStatus::Cancelled),
    ]
}

fn request(quantity: i32, price: Option<Decimal>, commission: Option<Decimal>) -> SaleLineRequest {
    SaleLineRequest {
        product_id: Uuid::new_v4(),
        quantity,
        price,
        commission_amount: commission,
    }
}

// ============================================================================
// Property Tests: Pricing and Payment
// ============================================================================

proptest! {
    /// Property: subtotal is quantity times the price charged
    #[test]
    fn test_subtotal_is_quantity_times_price(
        quantity in quantity_strategy(),
        price in price_strategy(),
    ) {
        let line = price_line(&request(quantity, Some(price), None), dec("1.00"), Decimal::ZERO).unwrap();
        prop_assert_eq!(line.subtotal, Decimal::from(quantity) * price);
        prop_assert_eq!(line.commission_amount, Decimal::ZERO);
    }

    /// Property: the order total is the sum of line subtotals
    #[test]
    fn test_order_total_sums_lines(
        lines in prop::collection::vec((quantity_strategy(), price_strategy()), 1..10),
    ) {
        let priced: Vec<_> = lines
            .iter()
            .map(|(q, p)| price_line(&request(*q, None, None), *p, Decimal::ZERO).unwrap())
            .collect();
        let expected: Decimal = lines.iter().map(|(q, p)| Decimal::from(*q) * *p).sum();
        prop_assert_eq!(order_total(&priced), expected);
    }

    /// Property: balance plus amount paid always equals the total
    #[test]
    fn test_payment_balance_closes(
        total in price_strategy(),
        paid in price_strategy(),
    ) {
        let summary = PaymentSummary::compute(total, paid);
        prop_assert_eq!(summary.balance + summary.amount_paid, total);

        let expected = if paid >= total {
            PaymentStatus::Paid
        } else if paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Credit
        };
        prop_assert_eq!(summary.payment_status, expected);
    }

    /// Property: only pending orders can be approved or declined,
    /// only approved orders can be dispatched
    #[test]
    fn test_transitions(status in status_strategy()) {
        prop_assert_eq!(status.approve().is_ok(), status == SaleStatus::Pending);
        prop_assert_eq!(status.decline().is_ok(), status == SaleStatus::Pending);
        prop_assert_eq!(status.dispatch().is_ok(), status == SaleStatus::Approved);
        prop_assert_eq!(status.restores_stock_on_delete(), status == SaleStatus::Dispatched);
    }

    /// Property: a plan succeeds exactly when every product has enough stock,
    /// and then leaves each row at its starting quantity minus what was taken
    #[test]
    fn test_dispatch_all_or_nothing(
        wanted in prop::collection::vec((0usize..3, 1i32..20), 1..8),
        on_hand in prop::collection::vec(0i32..40, 3),
    ) {
        let products: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let stock: HashMap<Uuid, StockLevel> = products
            .iter()
            .zip(&on_hand)
            .map(|(id, qty)| (*id, StockLevel { stock_id: Uuid::new_v4(), quantity: *qty }))
            .collect();
        let lines: Vec<DispatchLine> = wanted
            .iter()
            .map(|(index, qty)| DispatchLine {
                product_id: products[*index],
                product_name: format!("Item {}", index),
                quantity: *qty,
            })
            .collect();

        let mut demand = [0i32; 3];
        for (index, qty) in &wanted {
            demand[*index] += qty;
        }
        let fits = demand.iter().zip(&on_hand).all(|(d, h)| d <= h);

        match plan_dispatch(&lines, &stock) {
            Ok(deductions) => {
                prop_assert!(fits);
                prop_assert_eq!(deductions.len(), lines.len());
                for (index, id) in products.iter().enumerate() {
                    if let Some(last) = deductions.iter().filter(|d| d.product_id == *id).last() {
                        prop_assert_eq!(last.remaining, on_hand[index] - demand[index]);
                    }
                }
            }
            Err(DomainError::InsufficientStock { errors }) => {
                prop_assert!(!fits);
                prop_assert!(!errors.is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod pricing_tests {
    use super::*;

    #[test]
    fn test_catalogue_price_when_none_supplied() {
        let line = price_line(&request(3, None, None), dec("1500.00"), Decimal::ZERO).unwrap();
        assert_eq!(line.price_at_sale, dec("1500.00"));
        assert_eq!(line.subtotal, dec("4500.00"));
    }

    #[test]
    fn test_commission_from_percentage() {
        let line = price_line(&request(2, Some(dec("250.00")), None), dec("300.00"), dec("10")).unwrap();
        assert_eq!(line.commission_amount, dec("50.0000"));
    }

    #[test]
    fn test_supplied_commission_wins() {
        let line = price_line(
            &request(2, Some(dec("250.00")), Some(dec("7.50"))),
            dec("300.00"),
            dec("10"),
        )
        .unwrap();
        assert_eq!(line.commission_amount, dec("7.50"));
    }

    #[test]
    fn test_zero_commission_is_recomputed() {
        let line = price_line(
            &request(2, Some(dec("250.00")), Some(Decimal::ZERO)),
            dec("300.00"),
            dec("10"),
        )
        .unwrap();
        assert_eq!(line.commission_amount, dec("50.0000"));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        assert!(price_line(&request(0, None, None), dec("10"), Decimal::ZERO).is_err());
        assert!(price_line(&request(1, Some(dec("-1")), None), dec("10"), Decimal::ZERO).is_err());
    }
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;

    #[test]
    fn test_store_keeper_required() {
        let transport = DispatchTransport {
            store_keeper_id: None,
            vehicle_id: Some(Uuid::new_v4()),
            lorry_info: None,
        };
        assert!(transport.validate().is_err());
    }

    #[test]
    fn test_vehicle_or_lorry_info_required() {
        let keeper = Uuid::new_v4();
        let bare = DispatchTransport {
            store_keeper_id: Some(keeper),
            vehicle_id: None,
            lorry_info: Some("   "),
        };
        assert!(bare.validate().is_err());

        let described = DispatchTransport {
            lorry_info: Some("KBX 123A - Otieno"),
            ..bare
        };
        assert_eq!(described.validate().unwrap(), keeper);
    }

    #[test]
    fn test_missing_stock_row_names_the_product() {
        let lines = vec![DispatchLine {
            product_id: Uuid::new_v4(),
            product_name: "Cement 50kg".to_string(),
            quantity: 1,
        }];
        match plan_dispatch(&lines, &HashMap::new()) {
            Err(DomainError::InsufficientStock { errors }) => {
                assert_eq!(errors, vec!["No stock record for Cement 50kg at this branch"]);
            }
            other => panic!("expected insufficient stock, got {:?}", other),
        }
    }
}
