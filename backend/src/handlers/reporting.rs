//! HTTP handlers for reports and the dashboard

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use shared::{AbcEntry, Action, Resource};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{
    AgingEntry, CommissionFilter, CommissionReport, DashboardMetrics, DashboardScope,
};
use crate::services::ReportingService;
use crate::AppState;

/// Get ABC analysis of products by revenue
pub async fn get_abc_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AbcEntry>>> {
    current_user.0.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db);
    Ok(Json(service.abc_analysis().await?))
}

/// Get inventory aging
pub async fn get_inventory_aging(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AgingEntry>>> {
    current_user.0.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db);
    Ok(Json(service.inventory_aging().await?))
}

/// Get commissions per salesperson
pub async fn get_commission_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<CommissionFilter>,
) -> AppResult<Json<CommissionReport>> {
    current_user.0.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db);
    let report = service.commissions(&filter, Utc::now().date_naive()).await?;
    Ok(Json(report))
}

/// Get dashboard metrics; panels depend on the caller's permissions
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let scope = DashboardScope {
        dispatch: current_user.0.has_permission(Resource::Sale, Action::Dispatch),
        sales: current_user.0.has_permission(Resource::Sale, Action::Approve),
    };
    let service = ReportingService::new(state.db);
    Ok(Json(service.dashboard(scope).await?))
}
