//! Error handling for the Store Management System
//!
//! Every failure leaves the API as `{"error": {"code", "message", "field"?, "details"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres SQLSTATE for integer overflow, e.g. a stock upsert past i32::MAX
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock")]
    InsufficientStock(Vec<String>),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::InvalidStateTransition(_)
            | AppError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            AppError::DatabaseError(e) if is_foreign_key_violation(e) => StatusCode::CONFLICT,
            AppError::DatabaseError(e) if is_out_of_range(e) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (code, message, field, details) = match self {
            AppError::InvalidCredentials => (
                "INVALID_CREDENTIALS",
                "Invalid username or password".to_string(),
                None,
                None,
            ),
            AppError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired".to_string(), None, None),
            AppError::InvalidToken => ("INVALID_TOKEN", "Invalid token".to_string(), None, None),
            AppError::InsufficientPermissions => (
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action".to_string(),
                None,
                None,
            ),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone(), None, None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone(), None, None),
            AppError::Validation { field, message } => (
                "VALIDATION_ERROR",
                message.clone(),
                Some(field.clone()),
                None,
            ),
            AppError::ValidationError(msg) => ("VALIDATION_ERROR", msg.clone(), None, None),
            AppError::DuplicateEntry(field) => (
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
                Some(field.clone()),
                None,
            ),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone(), None, None),
            AppError::NotFound(resource) => {
                ("NOT_FOUND", format!("{} not found", resource), None, None)
            }
            AppError::InvalidStateTransition(msg) => {
                ("INVALID_STATE_TRANSITION", msg.clone(), None, None)
            }
            AppError::InsufficientStock(errors) => (
                "INSUFFICIENT_STOCK",
                "Insufficient stock to dispatch this order".to_string(),
                None,
                Some(errors.clone()),
            ),
            AppError::DatabaseError(e) if is_unique_violation(e) => (
                "DUPLICATE_ENTRY",
                "A record with these values already exists".to_string(),
                e.as_database_error()
                    .and_then(|d| d.constraint())
                    .map(str::to_string),
                None,
            ),
            AppError::DatabaseError(e) if is_foreign_key_violation(e) => (
                "REFERENCE_CONFLICT",
                "The record references, or is referenced by, another record".to_string(),
                e.as_database_error()
                    .and_then(|d| d.constraint())
                    .map(str::to_string),
                None,
            ),
            AppError::DatabaseError(e) if is_out_of_range(e) => (
                "VALUE_OUT_OF_RANGE",
                "A quantity or amount is outside the supported range".to_string(),
                None,
                None,
            ),
            AppError::DatabaseError(_) => (
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
                None,
            ),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone(), None, None),
            AppError::InternalError(_) => (
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                None,
                None,
            ),
        };

        ErrorDetail {
            code: code.to_string(),
            message,
            field,
            details,
        }
    }
}

fn has_sqlstate(error: &sqlx::Error, sqlstate: &str) -> bool {
    error
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == sqlstate)
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    has_sqlstate(error, UNIQUE_VIOLATION)
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    has_sqlstate(error, FOREIGN_KEY_VIOLATION)
}

fn is_out_of_range(error: &sqlx::Error) -> bool {
    has_sqlstate(error, NUMERIC_OUT_OF_RANGE)
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidTransition { message, .. } => {
                AppError::InvalidStateTransition(message.to_string())
            }
            DomainError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message,
            },
            DomainError::InsufficientStock { errors } => AppError::InsufficientStock(errors),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field));
                (field.to_string(), message)
            });

        match first {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = self.detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Sale".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("busy".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InsufficientStock(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_errors_convert() {
        let err: AppError = shared::SaleStatus::Approved.approve().unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail().message, "Only pending orders can be approved");

        let err: AppError = DomainError::InsufficientStock {
            errors: vec!["Insufficient stock for Cement".into()],
        }
        .into();
        assert_eq!(
            err.detail().details,
            Some(vec!["Insufficient stock for Cement".to_string()])
        );
    }
}
