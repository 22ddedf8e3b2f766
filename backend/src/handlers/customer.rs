//! HTTP handlers for the customer directory

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::customer::{Customer, CustomerFilter, CustomerInput, CustomerService};
use crate::AppState;
use shared::{Action, Resource};

pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<Vec<Customer>>> {
    current_user.0.require(Resource::Customer, Action::View)?;
    let service = CustomerService::new(state.db);
    Ok(Json(service.list_customers(&filter).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    current_user.0.require(Resource::Customer, Action::View)?;
    let service = CustomerService::new(state.db);
    Ok(Json(service.get_customer(customer_id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    current_user.0.require(Resource::Customer, Action::Create)?;
    let service = CustomerService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_customer(input).await?)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<CustomerInput>,
) -> AppResult<Json<Customer>> {
    current_user.0.require(Resource::Customer, Action::Edit)?;
    let service = CustomerService::new(state.db);
    Ok(Json(service.update_customer(customer_id, input).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Customer, Action::Delete)?;
    let service = CustomerService::new(state.db);
    service.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
