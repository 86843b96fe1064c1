//! Service Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use feature_engine::PreprocessError;
use inference_engine::InferenceError;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the inference service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No model was loaded at start-up
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),
    /// Malformed payload, invalid field, or any failure while predicting
    #[error("{0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<PreprocessError> for ServiceError {
    fn from(err: PreprocessError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<InferenceError> for ServiceError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable(reason) => ServiceError::ModelUnavailable(reason),
            other => ServiceError::InvalidInput(other.to_string()),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        debug!("Request failed with {}: {}", status, self);
        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
