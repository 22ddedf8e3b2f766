//! Delivery vehicle models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "vehicle_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    Lorry,
    Van,
    Pickup,
    Truck,
    Bike,
    Other,
}

/// Availability of a vehicle for dispatch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "vehicle_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Available
    #[default]
    Active,
    /// Out on a delivery
    Busy,
    Maintenance,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Busy => "busy",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Inactive => "inactive",
        }
    }
}

/// Transport description stored on a dispatched sale, e.g. `T 123 ABC (Juma)`
pub fn lorry_info(registration_number: &str, driver_name: &str) -> String {
    format!("{} ({})", registration_number, driver_name)
}
