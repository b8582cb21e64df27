//! Fallback handlers for requests no route accepts

use axum::http::Uri;

use crate::AppError;

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
