//! Delivery vehicle fleet

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{validate_registration_number, VehicleStatus, VehicleType};

#[derive(Clone)]
pub struct VehicleService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub registration_number: String,
    pub driver_name: String,
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    pub current_mileage: Decimal,
    pub last_condition: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VehicleFilter {
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleInput {
    pub registration_number: String,
    #[validate(length(min = 1, max = 100, message = "Driver name is required"))]
    pub driver_name: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub current_mileage: Decimal,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub last_condition: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVehicleInput {
    pub registration_number: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Driver name is required"))]
    pub driver_name: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub status: Option<VehicleStatus>,
    pub current_mileage: Option<Decimal>,
    #[validate(length(max = 200))]
    pub last_condition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnVehicleResponse {
    pub status: VehicleStatus,
    pub message: &'static str,
}

const VEHICLE_COLUMNS: &str =
    "id, registration_number, driver_name, vehicle_type, status, current_mileage, last_condition, created_at";

fn normalize_registration(raw: &str) -> AppResult<String> {
    let registration = raw.trim().to_uppercase();
    validate_registration_number(&registration)
        .map_err(|msg| AppError::validation("registration_number", msg))?;
    Ok(registration)
}

fn validate_mileage(mileage: Decimal) -> AppResult<()> {
    if mileage.is_sign_negative() {
        return Err(AppError::validation("current_mileage", "Mileage cannot be negative"));
    }
    Ok(())
}

impl VehicleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE ($1::vehicle_status IS NULL OR status = $1) ORDER BY registration_number"
        ))
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(vehicles)
    }

    pub async fn get_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"))
            .bind(vehicle_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle".to_string()))
    }

    pub async fn create_vehicle(&self, input: CreateVehicleInput) -> AppResult<Vehicle> {
        input.validate()?;
        let registration_number = normalize_registration(&input.registration_number)?;
        validate_mileage(input.current_mileage)?;

        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            INSERT INTO vehicles (registration_number, driver_name, vehicle_type, status, current_mileage, last_condition)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {VEHICLE_COLUMNS}
            "#
        ))
        .bind(&registration_number)
        .bind(input.driver_name.trim())
        .bind(input.vehicle_type)
        .bind(input.status)
        .bind(input.current_mileage)
        .bind(input.last_condition.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(vehicle_id = %vehicle.id, registration_number = %registration_number, "Vehicle registered");

        Ok(vehicle)
    }

    pub async fn update_vehicle(&self, vehicle_id: Uuid, input: UpdateVehicleInput) -> AppResult<Vehicle> {
        input.validate()?;
        let registration_number = input
            .registration_number
            .as_deref()
            .map(normalize_registration)
            .transpose()?;
        if let Some(mileage) = input.current_mileage {
            validate_mileage(mileage)?;
        }

        sqlx::query_as::<_, Vehicle>(&format!(
            r#"
            UPDATE vehicles SET
                registration_number = COALESCE($2, registration_number),
                driver_name = COALESCE($3, driver_name),
                vehicle_type = COALESCE($4, vehicle_type),
                status = COALESCE($5, status),
                current_mileage = COALESCE($6, current_mileage),
                last_condition = COALESCE($7, last_condition)
            WHERE id = $1
            RETURNING {VEHICLE_COLUMNS}
            "#
        ))
        .bind(vehicle_id)
        .bind(registration_number)
        .bind(input.driver_name.as_deref().map(str::trim))
        .bind(input.vehicle_type)
        .bind(input.status)
        .bind(input.current_mileage)
        .bind(input.last_condition.as_deref().map(str::trim))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle".to_string()))
    }

    pub async fn delete_vehicle(&self, vehicle_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vehicle".to_string()));
        }
        Ok(())
    }

    /// A vehicle back from delivery becomes available again
    pub async fn return_vehicle(&self, vehicle_id: Uuid) -> AppResult<ReturnVehicleResponse> {
        let result = sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(vehicle_id)
            .bind(VehicleStatus::Active)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vehicle".to_string()));
        }

        tracing::info!(%vehicle_id, "Vehicle returned");

        Ok(ReturnVehicleResponse {
            status: VehicleStatus::Active,
            message: "Vehicle marked as available",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_is_normalized() {
        assert_eq!(normalize_registration(" t 123 abc ").unwrap(), "T 123 ABC");
        assert!(normalize_registration("   ").is_err());
    }

    #[test]
    fn test_negative_mileage_rejected() {
        assert!(validate_mileage(Decimal::ZERO).is_ok());
        assert!(validate_mileage(Decimal::NEGATIVE_ONE).is_err());
    }
}
