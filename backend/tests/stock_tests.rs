//! Stock ledger and report tests
//!
//! Tests for inventory tracking including:
//! - Adjustment arithmetic
//! - Low stock alert triggering
//! - ABC classification and inventory aging
//! - Realtime stock events

use std::str::FromStr;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    is_low_stock, validate_movement_quantity, validate_transfer_branches, AdjustmentType, Event,
};
use shared::reports::{classify_abc, month_bounds, AbcClass, AgingStatus, ProductRevenue};
use sms_server::services::notification::{stock_events, StockChange};
use sms_server::services::NotificationService;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn change(quantity: i32, threshold: i32) -> StockChange {
    StockChange {
        stock_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        branch_id: Uuid::new_v4(),
        quantity,
        low_stock_threshold: threshold,
        product_name: "Iron Sheet 3m".to_string(),
        branch_name: "Main Branch".to_string(),
    }
}

fn revenue(name: &str, amount: &str) -> ProductRevenue {
    ProductRevenue {
        product_id: Uuid::new_v4(),
        product_name: name.to_string(),
        revenue: dec(amount),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: addition then deduction of the same amount is a no-op,
    /// and a correction sets the quantity outright
    #[test]
    fn test_adjustment_balance(
        current in -1_000i32..10_000,
        quantity in 0i32..10_000,
    ) {
        let added = AdjustmentType::Addition.apply(current, quantity).unwrap();
        prop_assert_eq!(AdjustmentType::Deduction.apply(added, quantity), Ok(current));
        prop_assert_eq!(AdjustmentType::Correction.apply(current, quantity), Ok(quantity));
    }

    /// Property: additions past i32::MAX are refused instead of wrapping
    #[test]
    fn test_adjustment_never_wraps(
        headroom in 0i32..1_000,
        quantity in 1i32..10_000,
    ) {
        let current = i32::MAX - headroom;
        let result = AdjustmentType::Addition.apply(current, quantity);
        if quantity > headroom {
            prop_assert!(result.is_err());
        } else {
            prop_assert_eq!(result, Ok(current + quantity));
        }
    }

    /// Property: a low stock alert accompanies the update exactly when
    /// quantity <= threshold
    #[test]
    fn test_alert_triggering(
        quantity in -50i32..200,
        threshold in 0i32..100,
    ) {
        let events = stock_events(&change(quantity, threshold));
        prop_assert!(matches!(events[0], Event::StockUpdate(_)));
        let alerted = events.iter().any(|e| matches!(e, Event::LowStockAlert(_)));
        prop_assert_eq!(alerted, is_low_stock(quantity, threshold));
        prop_assert_eq!(alerted, quantity <= threshold);
    }

    /// Property: cumulative percentages are non-decreasing and classes
    /// only move from A towards C
    #[test]
    fn test_abc_ordering(
        amounts in prop::collection::vec(0i64..1_000_000, 1..30),
    ) {
        let products = amounts
            .iter()
            .enumerate()
            .map(|(i, cents)| ProductRevenue {
                product_id: Uuid::new_v4(),
                product_name: format!("P{}", i),
                revenue: Decimal::new(*cents, 2),
            })
            .collect();

        let entries = classify_abc(products);
        for pair in entries.windows(2) {
            prop_assert!(pair[0].revenue >= pair[1].revenue);
            prop_assert!(pair[0].cumulative_percentage <= pair[1].cumulative_percentage);
            let rank = |c: AbcClass| match c { AbcClass::A => 0, AbcClass::B => 1, AbcClass::C => 2 };
            prop_assert!(rank(pair[0].class) <= rank(pair[1].class));
        }
    }

    /// Property: month bounds contain the day and span a single month
    #[test]
    fn test_month_bounds_contain_day(
        year in 2000i32..2100,
        ordinal in 1u32..366,
    ) {
        let day = NaiveDate::from_yo_opt(year, ordinal).unwrap();
        let (first, last) = month_bounds(day);
        prop_assert!(first <= day && day <= last);
        prop_assert_eq!(first.format("%Y-%m").to_string(), last.format("%Y-%m").to_string());
        prop_assert_eq!(last.succ_opt().unwrap().format("%d").to_string(), "01");
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod ledger_tests {
    use super::*;

    #[test]
    fn test_movement_quantity_must_be_positive() {
        assert!(validate_movement_quantity(1).is_ok());
        assert!(validate_movement_quantity(0).is_err());
        assert!(validate_movement_quantity(-5).is_err());
    }

    #[test]
    fn test_transfer_needs_distinct_branches() {
        let branch = Uuid::new_v4();
        assert!(validate_transfer_branches(branch, branch).is_err());
        assert!(validate_transfer_branches(branch, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_deduction_can_go_negative() {
        assert_eq!(AdjustmentType::Deduction.apply(3, 5), Ok(-2));
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn test_abc_thresholds() {
        let entries = classify_abc(vec![
            revenue("Cement", "700"),
            revenue("Nails", "200"),
            revenue("Paint", "100"),
        ]);
        assert_eq!(entries[0].class, AbcClass::A);
        assert_eq!(entries[0].cumulative_percentage, dec("70"));
        assert_eq!(entries[1].class, AbcClass::B);
        assert_eq!(entries[2].class, AbcClass::C);
        assert_eq!(entries[2].label, "success");
    }

    #[test]
    fn test_abc_with_no_revenue() {
        let entries = classify_abc(vec![revenue("Idle", "0")]);
        assert_eq!(entries[0].cumulative_percentage, Decimal::ZERO);
        assert_eq!(entries[0].class, AbcClass::A);
    }

    #[test]
    fn test_aging_bands() {
        assert_eq!(AgingStatus::from_days(0), AgingStatus::Success);
        assert_eq!(AgingStatus::from_days(30), AgingStatus::Success);
        assert_eq!(AgingStatus::from_days(31), AgingStatus::Info);
        assert_eq!(AgingStatus::from_days(61), AgingStatus::Warning);
        assert_eq!(AgingStatus::from_days(91), AgingStatus::Danger);
    }

    #[test]
    fn test_leap_february() {
        let (first, last) = month_bounds(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}

#[cfg(test)]
mod broadcast_tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let hub = NotificationService::new(16);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.receiver_count(), 2);

        hub.publish_all(stock_events(&change(2, 10)));

        for rx in [&mut first, &mut second] {
            assert!(matches!(rx.recv().await.unwrap(), Event::StockUpdate(_)));
            match rx.recv().await.unwrap() {
                Event::LowStockAlert(alert) => {
                    assert_eq!(alert.quantity, 2);
                    assert_eq!(alert.branch_name, "Main Branch");
                }
                other => panic!("expected low stock alert, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_publish_without_listeners_is_silent() {
        let hub = NotificationService::new(4);
        hub.publish_all(stock_events(&change(50, 10)));
        assert_eq!(hub.receiver_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let events = stock_events(&change(0, 10));
        let json = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(json["type"], "low_stock_alert");
        assert_eq!(json["data"]["product_name"], "Iron Sheet 3m");
    }
}
