//! Prediction Routes

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::ServiceError;
use crate::service::PredictionResult;
use crate::AppState;

/// Response for the batch endpoint
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub predictions: Vec<PredictionResult>,
}

/// Predict a single transaction
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ServiceError> {
    // 503 takes precedence over a malformed body
    state.service.ensure_available()?;
    let Json(payload) = payload.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;

    let result = state.service.predict(&payload)?;
    debug!(
        "Prediction: is_fraud={}, probability={:.4}, risk={}",
        result.is_fraud,
        result.probability,
        result.risk_level.as_str()
    );
    Ok(Json(result))
}

/// Predict every row of an uploaded CSV file
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ServiceError> {
    state.service.ensure_available()?;
    let multipart = multipart.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
    let data = read_upload(multipart).await?;
    debug!("Batch upload of {} bytes", data.len());

    let predictions = tokio::task::spawn_blocking(move || state.service.predict_batch(&data))
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("Batch prediction failed: {}", e)))??;

    Ok(Json(BatchResponse { predictions }))
}

/// Contents of the `file` field, or of the first field when none is named so
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ServiceError> {
    let mut first = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(e.body_text()))?
    {
        let is_file = field.name() == Some("file");
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;

        if is_file {
            return Ok(data);
        }
        if first.is_none() {
            first = Some(data);
        }
    }

    first.ok_or_else(|| ServiceError::InvalidInput("No file uploaded".to_string()))
}
