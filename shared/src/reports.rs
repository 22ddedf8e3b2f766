//! Report classification rules

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pareto class of a product by its share of total revenue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    /// Classifies by cumulative revenue percentage: up to 70 is A, up to 90 is B.
    pub fn from_cumulative_percentage(percentage: Decimal) -> Self {
        if percentage <= Decimal::from(70) {
            AbcClass::A
        } else if percentage <= Decimal::from(90) {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }

    /// Badge colour used by the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            AbcClass::A => "danger",
            AbcClass::B => "warning",
            AbcClass::C => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub product_id: Uuid,
    pub product_name: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbcEntry {
    pub product_id: Uuid,
    pub product_name: String,
    pub revenue: Decimal,
    pub cumulative_percentage: Decimal,
    pub class: AbcClass,
    pub label: &'static str,
}

/// Sorts products by revenue, highest first, and assigns ABC classes.
pub fn classify_abc(mut products: Vec<ProductRevenue>) -> Vec<AbcEntry> {
    products.sort_by(|a, b| b.revenue.cmp(&a.revenue));

    let total: Decimal = products.iter().map(|p| p.revenue).sum();
    let total = if total.is_zero() { Decimal::ONE } else { total };

    let mut cumulative = Decimal::ZERO;
    products
        .into_iter()
        .map(|p| {
            cumulative += p.revenue;
            let cumulative_percentage = (cumulative / total * Decimal::ONE_HUNDRED).round_dp(2);
            let class = AbcClass::from_cumulative_percentage(cumulative_percentage);
            AbcEntry {
                product_id: p.product_id,
                product_name: p.product_name,
                revenue: p.revenue,
                cumulative_percentage,
                class,
                label: class.label(),
            }
        })
        .collect()
}

/// Freshness of a stock row based on days since it was last replenished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgingStatus {
    Success,
    Info,
    Warning,
    Danger,
}

impl AgingStatus {
    pub fn from_days(days: i64) -> Self {
        if days > 90 {
            AgingStatus::Danger
        } else if days > 60 {
            AgingStatus::Warning
        } else if days > 30 {
            AgingStatus::Info
        } else {
            AgingStatus::Success
        }
    }
}

/// First and last day of the month containing `day`
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .map(|d| d - Duration::days(1))
        .unwrap_or(first);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revenue(name: &str, amount: i64) -> ProductRevenue {
        ProductRevenue {
            product_id: Uuid::new_v4(),
            product_name: name.to_string(),
            revenue: Decimal::from(amount),
        }
    }

    #[test]
    fn test_classify_abc_sorts_and_classifies() {
        let entries = classify_abc(vec![
            revenue("Nails", 10),
            revenue("Cement", 70),
            revenue("Paint", 20),
        ]);

        let summary: Vec<(&str, AbcClass)> = entries
            .iter()
            .map(|e| (e.product_name.as_str(), e.class))
            .collect();
        assert_eq!(
            summary,
            vec![("Cement", AbcClass::A), ("Paint", AbcClass::B), ("Nails", AbcClass::C)]
        );
        assert_eq!(entries[2].cumulative_percentage, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_classify_abc_handles_zero_revenue() {
        let entries = classify_abc(vec![revenue("Free sample", 0)]);
        assert_eq!(entries[0].class, AbcClass::A);
    }

    #[test]
    fn test_aging_boundaries() {
        assert_eq!(AgingStatus::from_days(30), AgingStatus::Success);
        assert_eq!(AgingStatus::from_days(31), AgingStatus::Info);
        assert_eq!(AgingStatus::from_days(61), AgingStatus::Warning);
        assert_eq!(AgingStatus::from_days(90), AgingStatus::Warning);
        assert_eq!(AgingStatus::from_days(91), AgingStatus::Danger);
    }

    #[test]
    fn test_month_bounds() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(month_bounds(d(2024, 2, 14)), (d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(month_bounds(d(2023, 12, 31)), (d(2023, 12, 1), d(2023, 12, 31)));
    }
}
