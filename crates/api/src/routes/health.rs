//! Health and Model Routes

use axum::{extract::State, Json};
use inference_engine::ModelInfo;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Model description, absent when no model is loaded
    pub model: Option<String>,
    pub model_loaded: bool,
    pub monitoring: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness; answers 200 even without a model
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        status: "ok".to_string(),
        model: health.model,
        model_loaded: health.model_loaded,
        monitoring: "enabled".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Metadata of the loaded model
pub async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelInfo>, ServiceError> {
    Ok(Json(state.service.model_info()?))
}
