//! Fraud Model Inference Engine
//!
//! Wraps a trained, read-only classifier artifact and exposes fraud
//! label / probability predictions over preprocessed feature vectors.

mod engine;
mod linear;
mod manifest;
mod onnx;

pub use engine::{InferenceEngine, LoadedModel, ModelInfo};
pub use linear::LogisticRegression;
pub use manifest::{BackendSpec, LogisticRegressionSpec, ModelManifest, PreprocessingSpec};
pub use onnx::OnnxClassifier;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Preprocessing profile mismatch: expected {expected}, artifact declares {actual}")]
    ProfileMismatch { expected: String, actual: String },
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

/// Output of a binary fraud classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    /// Fraud indicator as decided by the model
    pub label: bool,
    /// Probability of the fraud class, in `[0, 1]`
    pub probability: f64,
}

/// A loaded binary classifier.
///
/// Implementations are immutable after construction and shared across
/// request handlers without locking.
pub trait Classifier: Send + Sync {
    /// Model family name, e.g. `LogisticRegression`
    fn model_type(&self) -> &str;

    /// Number of input features expected
    fn n_features(&self) -> usize;

    /// Predict label and fraud probability for one feature row
    fn predict(&self, features: &[f64]) -> Result<ModelOutput, InferenceError>;
}
