//! Inference Engine Implementation

use crate::linear::LogisticRegression;
use crate::manifest::{BackendSpec, ModelManifest};
use crate::onnx::OnnxClassifier;
use crate::{Classifier, InferenceError, ModelOutput};
use feature_engine::{FeatureVector, PreprocessingProfile, Preprocessor, ScalerPolicy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Descriptive metadata of a loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model family, e.g. `LogisticRegression`
    pub model_type: String,
    /// Version string reported with every prediction
    pub model_version: String,
    /// Human readable identifier
    pub description: String,
    /// Preprocessing profile the model was trained with
    pub profile: PreprocessingProfile,
    /// Number of input features
    pub features_expected: usize,
    /// Column order
    pub feature_names: Vec<String>,
    /// Preprocessing summary
    pub preprocessing: String,
    /// Amount/Time scaler policy, `None` for profiles without scaling
    pub scaler_policy: Option<ScalerPolicy>,
}

/// A model ready to serve: metadata, matching preprocessor and classifier
pub struct LoadedModel {
    info: ModelInfo,
    preprocessor: Preprocessor,
    classifier: Box<dyn Classifier>,
}

impl LoadedModel {
    /// Assemble a model, checking the classifier width against the profile
    pub fn new(
        model_version: impl Into<String>,
        description: impl Into<String>,
        preprocessor: Preprocessor,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, InferenceError> {
        let expected = preprocessor.feature_count();
        if classifier.n_features() != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} features for profile {}", expected, preprocessor.profile()),
                actual: format!("{} model inputs", classifier.n_features()),
            });
        }

        let info = ModelInfo {
            model_type: classifier.model_type().to_string(),
            model_version: model_version.into(),
            description: description.into(),
            profile: preprocessor.profile(),
            features_expected: expected,
            feature_names: preprocessor
                .profile()
                .columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            preprocessing: preprocessor.describe().to_string(),
            scaler_policy: preprocessor.scaler_policy(),
        };

        if info.scaler_policy == Some(ScalerPolicy::RefitPerRequest) {
            warn!(
                "Model {} refits its scaler per request, scaled features will be 0",
                info.model_version
            );
        }

        Ok(Self {
            info,
            preprocessor,
            classifier,
        })
    }

    /// Load from a manifest file
    pub fn from_manifest(
        manifest_path: &Path,
        expected_profile: Option<PreprocessingProfile>,
    ) -> Result<Self, InferenceError> {
        let manifest = ModelManifest::from_path(manifest_path)?;
        manifest.validate(expected_profile)?;
        let preprocessor = manifest.preprocessor()?;
        let n_features = preprocessor.feature_count();

        let classifier: Box<dyn Classifier> = match &manifest.backend {
            BackendSpec::LogisticRegression(spec) => Box::new(LogisticRegression::from_spec(spec)?),
            BackendSpec::Onnx { path, threshold } => {
                let onnx_path = ModelManifest::resolve(manifest_path, path);
                Box::new(OnnxClassifier::load(&onnx_path, n_features, *threshold)?)
            }
        };

        let description = manifest
            .description
            .clone()
            .unwrap_or_else(|| format!("{} {}", manifest.model_version, classifier.model_type()));

        Self::new(manifest.model_version, description, preprocessor, classifier)
    }

    /// Get model metadata
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Get the preprocessor matching this model
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }
}

/// Fraud model adapter.
///
/// Built once at start-up. When the artifact could not be loaded the engine
/// still exists but every prediction fails with `ModelUnavailable`.
pub struct InferenceEngine {
    /// Model path
    model_path: PathBuf,
    model: Option<LoadedModel>,
    /// Why the model is missing
    unavailable_reason: String,
}

impl InferenceEngine {
    /// Load the artifact at `model_path`. Failure is logged, not returned.
    pub fn load(
        model_path: impl AsRef<Path>,
        expected_profile: Option<PreprocessingProfile>,
    ) -> Self {
        let model_path = model_path.as_ref().to_path_buf();
        info!("Creating inference engine with model: {}", model_path.display());

        if !model_path.exists() {
            warn!("Model artifact not found: {}", model_path.display());
            return Self::unavailable(
                &model_path,
                format!("model artifact not found: {}", model_path.display()),
            );
        }

        match LoadedModel::from_manifest(&model_path, expected_profile) {
            Ok(model) => {
                info!(
                    "Model loaded successfully: {} ({}, profile {})",
                    model.info.description, model.info.model_type, model.info.profile
                );
                Self::with_model(&model_path, model)
            }
            Err(e) => {
                tracing::error!("Model load failed for {}: {}", model_path.display(), e);
                Self::unavailable(&model_path, e.to_string())
            }
        }
    }

    /// Engine serving an already assembled model
    pub fn with_model(model_path: impl AsRef<Path>, model: LoadedModel) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            model: Some(model),
            unavailable_reason: String::new(),
        }
    }

    /// Engine without a model
    pub fn unavailable(model_path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            model: None,
            unavailable_reason: reason.into(),
        }
    }

    /// Get the loaded model, or `ModelUnavailable`
    pub fn model(&self) -> Result<&LoadedModel, InferenceError> {
        self.model
            .as_ref()
            .ok_or_else(|| InferenceError::ModelUnavailable(self.unavailable_reason.clone()))
    }

    /// Run inference on a feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<ModelOutput, InferenceError> {
        let model = self.model()?;

        if features.profile != model.info.profile
            || features.len() != model.info.features_expected
        {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} x {}", model.info.profile, model.info.features_expected),
                actual: format!("{} x {}", features.profile, features.len()),
            });
        }

        let start = std::time::Instant::now();
        let output = model.classifier.predict(&features.values)?;
        debug!(
            "Inference completed in {}us: label={} p={:.4}",
            start.elapsed().as_micros(),
            output.label,
            output.probability
        );

        Ok(output)
    }

    /// Check if engine is loaded
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Get model path
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}
