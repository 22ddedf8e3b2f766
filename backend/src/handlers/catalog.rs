//! HTTP handlers for branches, categories and products

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::{
    Branch, BranchInput, CatalogService, Category, CategoryInput, CreateProductInput, Product,
    ProductFilter, UpdateProductInput,
};
use crate::AppState;
use shared::{Action, Resource};

// ============================================================================
// Branches
// ============================================================================

pub async fn list_branches(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Branch>>> {
    current_user.0.require(Resource::Branch, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_branches().await?))
}

pub async fn get_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<Branch>> {
    current_user.0.require(Resource::Branch, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_branch(branch_id).await?))
}

pub async fn create_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BranchInput>,
) -> AppResult<(StatusCode, Json<Branch>)> {
    current_user.0.require(Resource::Branch, Action::Create)?;
    let service = CatalogService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_branch(input).await?)))
}

pub async fn update_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<BranchInput>,
) -> AppResult<Json<Branch>> {
    current_user.0.require(Resource::Branch, Action::Edit)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.update_branch(branch_id, input).await?))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Branch, Action::Delete)?;
    let service = CatalogService::new(state.db);
    service.delete_branch(branch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    current_user.0.require(Resource::Category, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    current_user.0.require(Resource::Category, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_category(category_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    current_user.0.require(Resource::Category, Action::Create)?;
    let service = CatalogService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_category(input).await?)))
}

pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    current_user.0.require(Resource::Category, Action::Edit)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.update_category(category_id, input).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Category, Action::Delete)?;
    let service = CatalogService::new(state.db);
    service.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Products
// ============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<Product>>> {
    current_user.0.require(Resource::Product, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_products(&filter).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    current_user.0.require(Resource::Product, Action::View)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_product(product_id).await?))
}

/// Create a product; stock-tracked products get an opening stock row
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    current_user.0.require(Resource::Product, Action::Create)?;
    let service = CatalogService::new(state.db.clone());
    let (product, events) = service
        .create_product(input, &state.config.inventory.default_branch_name)
        .await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    current_user.0.require(Resource::Product, Action::Edit)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.update_product(product_id, input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Product, Action::Delete)?;
    let service = CatalogService::new(state.db);
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
