//! Activity feed handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::activity::{ActivityService, SystemActivity};
use crate::AppState;

/// Latest system activities, visible to every signed-in user
pub async fn list_activities(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<SystemActivity>>> {
    let service = ActivityService::new(state.db);
    Ok(Json(service.recent().await?))
}
