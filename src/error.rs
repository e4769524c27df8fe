use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::validation::FieldErrors;

/// Message shown for every backend failure. Transient and permanent failures
/// are not distinguished.
pub const GENERIC_FAILURE: &str = "Could not complete the action, please try again";

#[derive(Debug, Error)]
pub enum AppError {
    // Auth errors
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Not authenticated")]
    Unauthorized,

    // User errors
    #[error("User not found")]
    UserNotFound,
    #[error("User already exists")]
    UserAlreadyExists,

    // Contact errors
    #[error("Contact not found")]
    ContactNotFound,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,

            AppError::UserNotFound | AppError::ContactNotFound => StatusCode::NOT_FOUND,

            AppError::UserAlreadyExists => StatusCode::CONFLICT,

            AppError::Database(_) | AppError::Jwt(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(fields) => json!({
                "error": "Validation failed",
                "fields": fields,
            }),
            AppError::Jwt(e) => {
                tracing::error!("Token signing error: {}", e);
                json!({ "error": GENERIC_FAILURE })
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                json!({ "error": GENERIC_FAILURE })
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                json!({ "error": GENERIC_FAILURE })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
