//! Error types for the lending server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Machine-readable error codes returned next to every error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchBook = 4,
    NoSuchBorrowing = 5,
    BookNotAvailable = 6,
    Duplicate = 7,
    BadValue = 8,
    QuantityInvariant = 9,
    BookHasOpenBorrowings = 10,
    NoSuchData = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

fn internal(message: String) -> (StatusCode, ErrorCode, String) {
    tracing::error!("Internal error: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::Failure,
        "An internal error occurred".to_string(),
    )
}

fn database(error: &sqlx::Error) -> (StatusCode, ErrorCode, String) {
    tracing::error!("Database error: {:?}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::DbFailure,
        "An internal error occurred".to_string(),
    )
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => database(e),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BusinessRule(msg) => {
                (StatusCode::CONFLICT, ErrorCode::BookHasOpenBorrowings, msg.clone())
            }
            AppError::Internal(msg) => internal(msg.clone()),
            AppError::Ledger(err) => {
                let message = err.to_string();
                match err {
                    LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, message),
                    LedgerError::Unavailable(_) => {
                        (StatusCode::CONFLICT, ErrorCode::BookNotAvailable, message)
                    }
                    LedgerError::NotFoundOrAlreadyReturned(_) => {
                        (StatusCode::NOT_FOUND, ErrorCode::NoSuchBorrowing, message)
                    }
                    LedgerError::InvariantViolation { .. } | LedgerError::TotalBelowBorrowed { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::QuantityInvariant, message)
                    }
                    LedgerError::Storage(e) => database(e),
                    LedgerError::Internal(msg) => internal(msg.clone()),
                }
            }
        }
    }

    /// Map unique-constraint violations to a conflict with the given message
    pub fn on_unique_violation(self, message: &str) -> Self {
        let unique = matches!(
            &self,
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
        );
        if unique {
            AppError::Conflict(message.to_string())
        } else {
            self
        }
    }

    /// Map foreign-key violations to a missing referenced entity
    pub fn on_foreign_key_violation(self, message: &str) -> Self {
        let foreign_key = matches!(
            &self,
            AppError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation()
        );
        if foreign_key {
            AppError::NotFound(message.to_string())
        } else {
            self
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
