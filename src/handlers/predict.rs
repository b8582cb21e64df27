//! Prediction handler

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::Serialize;

use crate::inference::ServiceError;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Vec<f64>,
}

/// POST /predict
///
/// Takes the raw body so that empty, malformed or oversized payloads are
/// reported in the same error shape as every other failure.
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let body = match body {
        Ok(body) => body,
        // Missing model is reported ahead of any body problem
        Err(_) if !state.model.is_loaded() => Bytes::new(),
        Err(rejection) => {
            return Err(AppError::BodyRejected(rejection.status(), rejection.body_text()));
        }
    };

    let prediction = state.model.predict(&body).map_err(|err| match err {
        ServiceError::ModelUnavailable if state.config.debug => {
            AppError::ModelUnavailable(state.model.load_error().map(str::to_string))
        }
        other => AppError::from(other),
    })?;

    tracing::debug!("Prediction served: {:?}", prediction);

    Ok(Json(PredictionResponse { prediction }))
}
