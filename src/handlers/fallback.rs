use crate::core::error::AppError;
use axum::http::{Method, Uri};

pub async fn fallback_handler(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!(
        "no route for {} {}. Valid endpoints: /users, /users/{{id}}, /health",
        method,
        uri.path()
    ))
}

pub async fn method_not_allowed_handler(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!(
        "{} is not supported on {}",
        method,
        uri.path()
    ))
}
