//! Domain errors raised by the pure business rules

use thiserror::Error;

/// Errors produced by domain rules before anything touches the database
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{message}")]
    InvalidTransition {
        from: String,
        message: &'static str,
    },

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Insufficient stock")]
    InsufficientStock { errors: Vec<String> },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            message: message.into(),
        }
    }
}
