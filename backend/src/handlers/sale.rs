//! HTTP handlers for sales orders and their approval/dispatch lifecycle

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::activity::Actor;
use crate::services::sale::{
    CreateSaleInput, DeliveryNote, DispatchInput, Receipt, Sale, SaleActionResponse, SaleDetail,
    SaleFilter, SaleItem, SaleService,
};
use crate::AppState;
use shared::{Action, PaginatedResponse, Pagination, Resource};

#[derive(Debug, Default, Deserialize)]
pub struct SaleItemQuery {
    pub sale_id: Option<Uuid>,
}

/// List sales; `?status=credit` returns sales with an outstanding balance
pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<SaleFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Sale>>> {
    current_user.0.require(Resource::Sale, Action::View)?;
    let service = SaleService::new(state.db);
    Ok(Json(service.list_sales(&filter, pagination).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    current_user.0.require(Resource::Sale, Action::View)?;
    let service = SaleService::new(state.db);
    Ok(Json(service.get_sale(sale_id).await?))
}

/// Create a pending sale. Stock is not touched until dispatch.
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleDetail>)> {
    current_user.0.require(Resource::Sale, Action::Create)?;
    let service = SaleService::new(state.db.clone());
    let (sale, events) = service.create_sale(Actor::from(&current_user.0), input).await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn approve_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleActionResponse>> {
    current_user.0.require(Resource::Sale, Action::Approve)?;
    let service = SaleService::new(state.db.clone());
    let (response, events) = service.approve(Actor::from(&current_user.0), sale_id).await?;
    state.notifications.publish_all(events);
    Ok(Json(response))
}

pub async fn decline_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleActionResponse>> {
    current_user.0.require(Resource::Sale, Action::Approve)?;
    let service = SaleService::new(state.db.clone());
    let (response, events) = service.decline(sale_id).await?;
    state.notifications.publish_all(events);
    Ok(Json(response))
}

/// Dispatch an approved order, deducting every line from branch stock
pub async fn dispatch_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<DispatchInput>,
) -> AppResult<Json<SaleActionResponse>> {
    if !current_user.0.has_permission(Resource::Sale, Action::Dispatch) {
        return Err(AppError::Forbidden(
            "You do not have permission to dispatch orders".to_string(),
        ));
    }

    let service = SaleService::new(state.db.clone());
    let (response, events) = service
        .dispatch(Actor::from(&current_user.0), sale_id, input)
        .await?;
    state.notifications.publish_all(events);
    Ok(Json(response))
}

/// Delete a sale; a dispatched sale returns its goods to stock first
pub async fn delete_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Sale, Action::Delete)?;
    let service = SaleService::new(state.db.clone());
    let events = service.delete_sale(Actor::from(&current_user.0), sale_id).await?;
    state.notifications.publish_all(events);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_receipt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    current_user.0.require(Resource::Sale, Action::View)?;
    let service = SaleService::new(state.db);
    Ok(Json(service.receipt(sale_id).await?))
}

pub async fn get_delivery_note(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<DeliveryNote>> {
    current_user.0.require(Resource::Sale, Action::View)?;
    let service = SaleService::new(state.db);
    Ok(Json(service.delivery_note(sale_id).await?))
}

pub async fn list_sale_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SaleItemQuery>,
) -> AppResult<Json<Vec<SaleItem>>> {
    current_user.0.require(Resource::Sale, Action::View)?;
    let service = SaleService::new(state.db);
    Ok(Json(service.list_items(query.sale_id).await?))
}
