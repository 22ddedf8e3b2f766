//! HTTP handlers for staff accounts, roles and permissions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::user::{
    self, CreateUserInput, PermissionInfo, RoleInfo, UpdateUserInput, User, UserFilter,
};
use crate::services::UserService;
use crate::AppState;
use shared::{Action, Resource};

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<Vec<User>>> {
    current_user.0.require(Resource::User, Action::View)?;
    let service = UserService::new(state.db);
    Ok(Json(service.list_users(&filter).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    current_user.0.require(Resource::User, Action::View)?;
    let service = UserService::new(state.db);
    Ok(Json(service.get_user(user_id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    current_user.0.require(Resource::User, Action::Create)?;
    let service = UserService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_user(input).await?)))
}

pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    current_user.0.require(Resource::User, Action::Edit)?;
    let service = UserService::new(state.db);
    Ok(Json(service.update_user(user_id, input).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::User, Action::Delete)?;
    let service = UserService::new(state.db);
    service.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles(current_user: CurrentUser) -> AppResult<Json<Vec<RoleInfo>>> {
    current_user.0.require(Resource::User, Action::View)?;
    Ok(Json(user::list_roles()))
}

pub async fn list_permissions(current_user: CurrentUser) -> AppResult<Json<Vec<PermissionInfo>>> {
    current_user.0.require(Resource::User, Action::View)?;
    Ok(Json(user::list_permissions()))
}
