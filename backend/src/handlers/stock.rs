//! HTTP handlers for stock levels, adjustments and transfers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::activity::Actor;
use crate::services::stock::{
    CreateAdjustmentInput, CreateTransferInput, StockAdjustment, StockFilter, StockLevelView,
    StockMovement, StockService, StockTransfer, UpdateStockInput,
};
use crate::AppState;
use shared::{Action, Pagination, Resource};

/// List stock rows, optionally only those at or below their threshold
pub async fn list_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<StockLevelView>>> {
    current_user.0.require(Resource::Stock, Action::View)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_stock(&filter).await?))
}

pub async fn get_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockLevelView>> {
    current_user.0.require(Resource::Stock, Action::View)?;
    let service = StockService::new(state.db);
    Ok(Json(service.get_stock(stock_id).await?))
}

pub async fn update_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<UpdateStockInput>,
) -> AppResult<Json<StockLevelView>> {
    current_user.0.require(Resource::Stock, Action::Edit)?;
    let service = StockService::new(state.db);
    Ok(Json(service.update_threshold(stock_id, input).await?))
}

/// Ledger history of one stock row
pub async fn list_stock_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<StockMovement>>> {
    current_user.0.require(Resource::Stock, Action::View)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_movements(stock_id, pagination).await?))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<StockAdjustment>>> {
    current_user.0.require(Resource::Adjustment, Action::View)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_adjustments(pagination).await?))
}

pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<StockAdjustment>)> {
    current_user.0.require(Resource::Adjustment, Action::Create)?;
    let service = StockService::new(state.db.clone());
    let (adjustment, events) = service.adjust(Actor::from(&current_user.0), input).await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<StockTransfer>>> {
    current_user.0.require(Resource::Transfer, Action::View)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_transfers(pagination).await?))
}

pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<(StatusCode, Json<StockTransfer>)> {
    current_user.0.require(Resource::Transfer, Action::Create)?;
    let service = StockService::new(state.db.clone());
    let (transfer, events) = service.transfer(Actor::from(&current_user.0), input).await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(transfer)))
}
