//! HTTP handlers for the delivery fleet

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::vehicle::{
    CreateVehicleInput, ReturnVehicleResponse, UpdateVehicleInput, Vehicle, VehicleFilter,
    VehicleService,
};
use crate::AppState;
use shared::{Action, Resource};

pub async fn list_vehicles(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<VehicleFilter>,
) -> AppResult<Json<Vec<Vehicle>>> {
    current_user.0.require(Resource::Vehicle, Action::View)?;
    let service = VehicleService::new(state.db);
    Ok(Json(service.list_vehicles(&filter).await?))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<Vehicle>> {
    current_user.0.require(Resource::Vehicle, Action::View)?;
    let service = VehicleService::new(state.db);
    Ok(Json(service.get_vehicle(vehicle_id).await?))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateVehicleInput>,
) -> AppResult<(StatusCode, Json<Vehicle>)> {
    current_user.0.require(Resource::Vehicle, Action::Create)?;
    let service = VehicleService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_vehicle(input).await?)))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
    Json(input): Json<UpdateVehicleInput>,
) -> AppResult<Json<Vehicle>> {
    current_user.0.require(Resource::Vehicle, Action::Edit)?;
    let service = VehicleService::new(state.db);
    Ok(Json(service.update_vehicle(vehicle_id, input).await?))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Vehicle, Action::Delete)?;
    let service = VehicleService::new(state.db);
    service.delete_vehicle(vehicle_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a vehicle back from delivery
pub async fn return_vehicle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<ReturnVehicleResponse>> {
    current_user.0.require(Resource::Vehicle, Action::Edit)?;
    let service = VehicleService::new(state.db);
    Ok(Json(service.return_vehicle(vehicle_id).await?))
}
