//! HTTP error handling and response conversion.
//!
//! Every handler returns `Result<_, AppError>`. The error is rendered as
//! `{"status": "fail", "message": ...}` for client errors and
//! `{"status": "error", "message": ...}` for server errors; internal details
//! only ever reach the logs.

use crate::{application::errors::ApplicationError, domain::shared::errors::DomainError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Application-level errors returned from handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found (404).
    NotFound(String),

    /// Malformed request: bad path parameter, upload rejected (400).
    BadRequest(String),

    /// Request data failed validation (400).
    ValidationError(String),

    /// Database operation failed (500).
    Database(String),

    /// Storage/file operation failed (500).
    Storage(String),

    /// Unclassified internal error (500).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `fail` for 4xx, `error` for 5xx.
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// User-safe message (without implementation details).
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::ValidationError(msg) => {
                msg.clone()
            }
            Self::Database(_) => "Database operation failed".into(),
            Self::Storage(_) => "File operation failed".into(),
            Self::Internal(_) => "Something went very wrong!".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("error={}", self);
        } else {
            tracing::warn!("error={}", self);
        }

        let body = json!({ "status": self.status_label(), "message": self.user_message() });
        (status, Json(body)).into_response()
    }
}

// === Domain Error Conversion ===

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::ValidationError(msg) => AppError::ValidationError(msg),
            DomainError::InfrastructureError(msg) => {
                tracing::error!(infrastructure_error = %msg);
                AppError::Database(msg)
            }
        }
    }
}

impl From<ApplicationError> for AppError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::Domain(e) => e.into(),
            ApplicationError::Validation(e) => e.into(),
            ApplicationError::Body(e) => {
                AppError::BadRequest(format!("Invalid input data. {}", e))
            }
            ApplicationError::Image(e) => e.into(),
            ApplicationError::Storage(e) => {
                tracing::error!(storage_error = %e);
                AppError::Storage(e.to_string())
            }
        }
    }
}

// === Validation Error Conversion ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid ({})", field, e.code),
                })
            })
            .collect();

        if messages.is_empty() {
            messages.push(err.to_string());
        }
        messages.sort();
        AppError::ValidationError(format!("Invalid input data. {}", messages.join(". ")))
    }
}

// === Database Error Conversion ===

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("No document found with that ID".into()),
            sqlx::Error::PoolTimedOut => {
                tracing::warn!("Database connection pool exhausted, timing out");
                AppError::Database("Connection pool exhausted".into())
            }
            sqlx::Error::PoolClosed => {
                tracing::error!("Database connection pool closed");
                AppError::Database("Database connection unavailable".into())
            }
            _ => {
                tracing::error!(database_error = %err);
                AppError::Database("Database error".into())
            }
        }
    }
}

// === Image Processing Error Conversion ===

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(_) => {
                tracing::warn!(image_format_error = %err);
                AppError::BadRequest("Unsupported image format".into())
            }
            image::ImageError::Decoding(_) => {
                tracing::warn!(image_decode_error = %err);
                AppError::BadRequest("Invalid image data".into())
            }
            image::ImageError::Limits(_) => {
                tracing::warn!(image_limits_error = %err);
                AppError::BadRequest("Image exceeds limits".into())
            }
            image::ImageError::Parameter(_) => {
                tracing::warn!(image_parameter_error = %err);
                AppError::BadRequest("Invalid image operation".into())
            }
            image::ImageError::IoError(_) | image::ImageError::Encoding(_) => {
                tracing::error!(image_error = %err);
                AppError::Storage("Image encoding failed".into())
            }
        }
    }
}

// === General Fallback Error Conversion ===

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(anyhow_error = %err, "Unclassified error with chain");
        err.chain().for_each(|cause| {
            tracing::error!(cause = %cause, "Error source");
        });
        AppError::Internal("Operation failed".into())
    }
}
