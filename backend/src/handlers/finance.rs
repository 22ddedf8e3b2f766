//! HTTP handlers for payments and expenses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::activity::Actor;
use crate::services::finance::{
    CreateExpenseInput, CreateTransactionInput, Expense, ExpenseCategory, ExpenseCategoryInput,
    ExpenseFilter, FinanceService, Transaction, TransactionFilter,
};
use crate::AppState;
use shared::{Action, Resource};

// ============================================================================
// Transactions
// ============================================================================

pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<Transaction>>> {
    current_user.0.require(Resource::Transaction, Action::View)?;
    let service = FinanceService::new(state.db);
    Ok(Json(service.list_transactions(&filter).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransactionInput>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    current_user.0.require(Resource::Transaction, Action::Create)?;
    let service = FinanceService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_transaction(input).await?)))
}

// ============================================================================
// Expenses
// ============================================================================

pub async fn list_expense_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ExpenseCategory>>> {
    current_user.0.require(Resource::Expense, Action::View)?;
    let service = FinanceService::new(state.db);
    Ok(Json(service.list_expense_categories().await?))
}

pub async fn create_expense_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ExpenseCategoryInput>,
) -> AppResult<(StatusCode, Json<ExpenseCategory>)> {
    current_user.0.require(Resource::Expense, Action::Create)?;
    let service = FinanceService::new(state.db);
    Ok((StatusCode::CREATED, Json(service.create_expense_category(input).await?)))
}

pub async fn delete_expense_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Expense, Action::Delete)?;
    let service = FinanceService::new(state.db);
    service.delete_expense_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_expenses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ExpenseFilter>,
) -> AppResult<Json<Vec<Expense>>> {
    current_user.0.require(Resource::Expense, Action::View)?;
    let service = FinanceService::new(state.db);
    Ok(Json(service.list_expenses(&filter).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    current_user.0.require(Resource::Expense, Action::Create)?;
    let service = FinanceService::new(state.db.clone());
    let (expense, events) = service
        .create_expense(Actor::from(&current_user.0), input)
        .await?;
    state.notifications.publish_all(events);
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(expense_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require(Resource::Expense, Action::Delete)?;
    let service = FinanceService::new(state.db);
    service.delete_expense(expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
