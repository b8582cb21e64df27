//! Health check and service status handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::inference::ModelMetadata;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    version: &'static str,
    timestamp: i64,
}

#[derive(Serialize)]
pub struct Endpoints {
    health: &'static str,
    predict: &'static str,
}

#[derive(Serialize)]
pub struct IndexResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
    model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_error: Option<String>,
    endpoints: Endpoints,
}

pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Padi yield prediction API",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: state.model.is_loaded(),
        model: state.model.metadata().cloned(),
        model_error: state.model.load_error().map(str::to_string),
        endpoints: Endpoints {
            health: "/health",
            predict: "/predict",
        },
    })
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.model.is_loaded(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
