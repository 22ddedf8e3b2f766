//! Dispatch planning
//!
//! Dispatch is all-or-nothing: every sale line is checked against the locked
//! stock rows first, and deductions are only produced when every line fits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::lorry_info;

/// A sale line waiting to leave the branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

/// Current level of a stock row, keyed by product in [`plan_dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub stock_id: Uuid,
    pub quantity: i32,
}

/// A decrement to apply to one stock row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDeduction {
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub remaining: i32,
}

/// Transport details supplied with a dispatch request
#[derive(Debug, Clone, Default)]
pub struct DispatchTransport<'a> {
    pub store_keeper_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub lorry_info: Option<&'a str>,
}

impl DispatchTransport<'_> {
    /// Store keeper is mandatory; a vehicle or a free-text lorry description is too.
    pub fn validate(&self) -> Result<Uuid, DomainError> {
        let store_keeper_id = self
            .store_keeper_id
            .ok_or_else(|| DomainError::validation("store_keeper", "Store keeper is required"))?;

        let has_lorry_info = self.lorry_info.is_some_and(|s| !s.trim().is_empty());
        if self.vehicle_id.is_none() && !has_lorry_info {
            return Err(DomainError::validation(
                "vehicle_id",
                "Vehicle or Lorry Info is required",
            ));
        }

        Ok(store_keeper_id)
    }

    /// Explicit lorry info wins; otherwise it is derived from the vehicle.
    pub fn resolve_lorry_info(&self, vehicle: Option<(&str, &str)>) -> Option<String> {
        match self.lorry_info.filter(|s| !s.trim().is_empty()) {
            Some(info) => Some(info.trim().to_string()),
            None => vehicle.map(|(registration, driver)| lorry_info(registration, driver)),
        }
    }
}

/// Check every line against the branch stock and produce the deductions.
///
/// Lines for the same product draw on the same row. Any missing row or
/// shortfall fails the whole plan with one message per offending line.
pub fn plan_dispatch(
    lines: &[DispatchLine],
    stock: &HashMap<Uuid, StockLevel>,
) -> Result<Vec<StockDeduction>, DomainError> {
    let mut remaining: HashMap<Uuid, i32> = HashMap::new();
    let mut deductions = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for line in lines {
        let Some(level) = stock.get(&line.product_id) else {
            errors.push(format!(
                "No stock record for {} at this branch",
                line.product_name
            ));
            continue;
        };

        let available = remaining.entry(line.product_id).or_insert(level.quantity);
        if *available < line.quantity {
            errors.push(format!("Insufficient stock for {}", line.product_name));
            continue;
        }

        *available -= line.quantity;
        deductions.push(StockDeduction {
            stock_id: level.stock_id,
            product_id: line.product_id,
            quantity: line.quantity,
            remaining: *available,
        });
    }

    if errors.is_empty() {
        Ok(deductions)
    } else {
        Err(DomainError::InsufficientStock { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, name: &str, quantity: i32) -> DispatchLine {
        DispatchLine {
            product_id,
            product_name: name.to_string(),
            quantity,
        }
    }

    fn levels(entries: &[(Uuid, i32)]) -> HashMap<Uuid, StockLevel> {
        entries
            .iter()
            .map(|(product_id, quantity)| {
                (
                    *product_id,
                    StockLevel {
                        stock_id: Uuid::new_v4(),
                        quantity: *quantity,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_plan_dispatch_deducts_each_line() {
        let cement = Uuid::new_v4();
        let nails = Uuid::new_v4();
        let stock = levels(&[(cement, 100), (nails, 5)]);

        let plan = plan_dispatch(&[line(cement, "Cement", 10), line(nails, "Nails", 5)], &stock).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].remaining, 90);
        assert_eq!(plan[1].remaining, 0);
    }

    #[test]
    fn test_plan_dispatch_collects_every_failure() {
        let cement = Uuid::new_v4();
        let nails = Uuid::new_v4();
        let paint = Uuid::new_v4();
        let stock = levels(&[(cement, 100), (nails, 2)]);

        let err = plan_dispatch(
            &[line(cement, "Cement", 10), line(nails, "Nails", 3), line(paint, "Paint", 1)],
            &stock,
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                errors: vec![
                    "Insufficient stock for Nails".to_string(),
                    "No stock record for Paint at this branch".to_string(),
                ]
            }
        );
    }

    #[test]
    fn test_plan_dispatch_shares_row_between_lines() {
        let cement = Uuid::new_v4();
        let stock = levels(&[(cement, 10)]);

        assert!(plan_dispatch(&[line(cement, "Cement", 6), line(cement, "Cement", 4)], &stock).is_ok());
        assert!(plan_dispatch(&[line(cement, "Cement", 6), line(cement, "Cement", 5)], &stock).is_err());
    }

    #[test]
    fn test_transport_validation() {
        let keeper = Uuid::new_v4();

        let missing_keeper = DispatchTransport {
            lorry_info: Some("T 1 AAA"),
            ..Default::default()
        };
        assert_eq!(
            missing_keeper.validate().unwrap_err().to_string(),
            "store_keeper: Store keeper is required"
        );

        let missing_vehicle = DispatchTransport {
            store_keeper_id: Some(keeper),
            lorry_info: Some("  "),
            ..Default::default()
        };
        assert!(missing_vehicle.validate().is_err());

        let ok = DispatchTransport {
            store_keeper_id: Some(keeper),
            vehicle_id: Some(Uuid::new_v4()),
            lorry_info: None,
        };
        assert_eq!(ok.validate(), Ok(keeper));
    }

    #[test]
    fn test_resolve_lorry_info() {
        let from_vehicle = DispatchTransport::default();
        assert_eq!(
            from_vehicle.resolve_lorry_info(Some(("T 123 ABC", "Juma"))),
            Some("T 123 ABC (Juma)".to_string())
        );

        let explicit = DispatchTransport {
            lorry_info: Some("Hired pickup"),
            ..Default::default()
        };
        assert_eq!(
            explicit.resolve_lorry_info(Some(("T 123 ABC", "Juma"))),
            Some("Hired pickup".to_string())
        );
    }
}
