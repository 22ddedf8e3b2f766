//! HTTP handlers for suppliers, purchases, purchase orders and goods receipts

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::activity::Actor;
use crate::services::procurement::{
    AddGrnItemInput, AddPurchaseOrderItemInput, CreateGrnInput, CreatePurchaseInput,
    CreatePurchaseOrderInput, GoodsReceivedNote, GrnDetail, GrnItem, ProcurementService, Purchase,
    PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItem, Supplier, SupplierInput,
    UpdatePurchaseOrderInput,
};
use crate::AppState;
use shared::{Action, Resource};

// ============================================================================
// Suppliers
// ============================================================================

pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Supplier>>> {
    current_user.0.require(Resource::Supplier, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.list_suppliers().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    current_user.0.require(Resource::Supplier, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.get_supplier(supplier_id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    current_user.0.require(Resource::Supplier, Action::Create)?;
    let service = ProcurementService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_supplier(input).await?)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    current_user.0.require(Resource::Supplier, Action::Edit)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.update_supplier(supplier_id, input).await?))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Supplier, Action::Delete)?;
    let service = ProcurementService::new(state.db);
    service.delete_supplier(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Purchases
// ============================================================================

pub async fn list_purchases(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Purchase>>> {
    current_user.0.require(Resource::Purchase, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.list_purchases().await?))
}

/// Record a purchase; the goods are added to the branch stock
pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    current_user.0.require(Resource::Purchase, Action::Create)?;
    let service = ProcurementService::new(state.db.clone());
    let (purchase, events) = service.create_purchase(Actor::from(&current_user.0), input).await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(purchase)))
}

// ============================================================================
// Purchase orders
// ============================================================================

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    current_user.0.require(Resource::PurchaseOrder, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.list_purchase_orders().await?))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    current_user.0.require(Resource::PurchaseOrder, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.get_purchase_order(order_id).await?))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    current_user.0.require(Resource::PurchaseOrder, Action::Create)?;
    let service = ProcurementService::new(state.db);
    let order = service
        .create_purchase_order(Actor::from(&current_user.0), input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    current_user.0.require(Resource::PurchaseOrder, Action::Edit)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.update_purchase_order(order_id, input).await?))
}

pub async fn delete_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::PurchaseOrder, Action::Delete)?;
    let service = ProcurementService::new(state.db);
    service.delete_purchase_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_purchase_order_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<AddPurchaseOrderItemInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrderItem>)> {
    current_user.0.require(Resource::PurchaseOrder, Action::Edit)?;
    let service = ProcurementService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.add_order_item(order_id, input).await?)))
}

// ============================================================================
// Goods received notes
// ============================================================================

pub async fn list_grns(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<GoodsReceivedNote>>> {
    current_user.0.require(Resource::Grn, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.list_grns().await?))
}

pub async fn get_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(grn_id): Path<Uuid>,
) -> AppResult<Json<GrnDetail>> {
    current_user.0.require(Resource::Grn, Action::View)?;
    let service = ProcurementService::new(state.db);
    Ok(Json(service.get_grn(grn_id).await?))
}

pub async fn create_grn(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateGrnInput>,
) -> AppResult<(StatusCode, Json<GrnDetail>)> {
    current_user.0.require(Resource::Grn, Action::Create)?;
    let service = ProcurementService::new(state.db);
    let grn = service.create_grn(Actor::from(&current_user.0), input).await?;
    Ok((StatusCode::CREATED, Json(grn)))
}

/// Record a received line; the quantity is added to the GRN branch stock
pub async fn add_grn_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(grn_id): Path<Uuid>,
    Json(input): Json<AddGrnItemInput>,
) -> AppResult<(StatusCode, Json<GrnItem>)> {
    current_user.0.require(Resource::Grn, Action::Edit)?;
    let service = ProcurementService::new(state.db.clone());
    let (item, events) = service
        .add_grn_item(Actor::from(&current_user.0), grn_id, input)
        .await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(item)))
}
