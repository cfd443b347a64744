// Centralized error handling for the HTTP layer

use crate::models::api::ErrorResponse;
use crate::stores::StorageError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    BoxError,
    response::{IntoResponse, Json, Response},
};
use std::any::Any;
use thiserror::Error;
use tracing::error;

pub const CODE_SYSTEM: &str = "US-000000";
pub const CODE_NOT_FOUND: &str = "US-000003";
pub const CODE_BAD_REQUEST: &str = "US-000004";
pub const CODE_METHOD_NOT_ALLOWED: &str = "US-000005";
pub const CODE_TIMEOUT: &str = "US-000006";

const SYSTEM_MESSAGE: &str = "internal system error";

/// Errors returned by request handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("request did not complete within {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    Encoding(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Persistence(_) | AppError::Encoding(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        let (message, code) = match self {
            AppError::InvalidArgument(_) => ("invalid request", CODE_BAD_REQUEST),
            AppError::NotFound(_) => ("not found", CODE_NOT_FOUND),
            AppError::MethodNotAllowed(_) => ("method not allowed", CODE_METHOD_NOT_ALLOWED),
            AppError::Timeout(_) => ("request timed out", CODE_TIMEOUT),
            AppError::Persistence(_) | AppError::Encoding(_) | AppError::Internal(_) => {
                (SYSTEM_MESSAGE, CODE_SYSTEM)
            }
        };

        ErrorResponse {
            message: message.to_string(),
            developer_message: self.to_string(),
            code: code.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            StorageError::NotFound => AppError::NotFound("user not found".to_string()),
            StorageError::Persistence(msg) => AppError::Persistence(msg),
            StorageError::Encoding(msg) => AppError::Encoding(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, "Request failed with internal error");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Render a handler panic as a 500 with the regular error body
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

/// Turn an error raised by the timeout layer into an `AppError`
pub fn timeout_error(limit: std::time::Duration, err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout(limit)
    } else {
        AppError::Internal(anyhow::anyhow!("unhandled middleware error: {err}"))
    }
}
