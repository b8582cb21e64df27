//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::inference::{NormalizeError, ServiceError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Model errors (load reason attached only in debug mode)
    ModelUnavailable(Option<String>),
    PredictionFailed(String),

    // Payload errors
    InvalidPayload(String),
    MissingField(String),
    BodyRejected(StatusCode, String),

    // Routing errors
    NotFound(String),
    MethodNotAllowed,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ModelUnavailable(_) | AppError::PredictionFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidPayload(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::BodyRejected(status, _) => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match self {
            AppError::ModelUnavailable(reason) => {
                tracing::warn!("Prediction requested but model is not loaded");
                match reason {
                    Some(reason) => format!("Model not loaded: {}", reason),
                    None => "Model not loaded".to_string(),
                }
            }
            AppError::PredictionFailed(msg) => {
                tracing::error!("Prediction failed: {}", msg);
                format!("Prediction failed: {}", msg)
            }
            AppError::InvalidPayload(msg) | AppError::MissingField(msg) => {
                tracing::debug!("Rejected payload: {}", msg);
                msg
            }
            AppError::BodyRejected(_, msg) => {
                tracing::debug!("Failed to read request body: {}", msg);
                msg
            }
            AppError::NotFound(msg) => msg,
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MissingFields(_) => AppError::MissingField(err.to_string()),
            NormalizeError::InvalidPayload(msg) => AppError::InvalidPayload(msg),
            NormalizeError::NonNumericFields(_) => AppError::InvalidPayload(err.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ModelUnavailable => AppError::ModelUnavailable(None),
            ServiceError::Normalize(e) => e.into(),
            ServiceError::PredictionFailed(e) => AppError::PredictionFailed(e.to_string()),
        }
    }
}
