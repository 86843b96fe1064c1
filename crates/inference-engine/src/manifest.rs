//! Model Artifact Manifest
//!
//! A JSON document shipped next to (or instead of) the trained weights. It
//! pins the preprocessing profile and column order the model was trained
//! with, so a mismatched artifact is caught at load time.

use crate::InferenceError;
use feature_engine::{
    AmountTimeScaler, PreprocessingProfile, Preprocessor, ScalerParams, ScalerPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_threshold() -> f64 {
    0.5
}

/// Preprocessing section of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingSpec {
    pub profile: PreprocessingProfile,
    #[serde(default)]
    pub scaler_policy: ScalerPolicy,
    /// Training-time Amount/Time scaler (profile A with the persisted policy)
    #[serde(default)]
    pub scaler: Option<AmountTimeScaler>,
}

/// Logistic regression weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionSpec {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Per-column standardisation applied inside the model pipeline
    #[serde(default)]
    pub standardize: Option<Vec<ScalerParams>>,
}

/// Model backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSpec {
    LogisticRegression(LogisticRegressionSpec),
    /// ONNX graph built from operators tract implements (core ops, tree ensembles)
    Onnx {
        /// Path to the `.onnx` file, relative to the manifest
        path: PathBuf,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

/// Versioned model artifact manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Version string reported with every prediction
    pub model_version: String,
    /// Human readable identifier
    #[serde(default)]
    pub description: Option<String>,
    pub preprocessing: PreprocessingSpec,
    /// Column order the model was trained on
    pub feature_names: Vec<String>,
    pub backend: BackendSpec,
}

impl ModelManifest {
    /// Read a manifest from disk
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Parse a manifest from JSON text
    pub fn from_json(raw: &str) -> Result<Self, InferenceError> {
        serde_json::from_str(raw)
            .map_err(|e| InferenceError::ModelLoadError(format!("invalid manifest: {}", e)))
    }

    /// Check the manifest against its own profile, and against the
    /// deployment's expected profile when one is configured.
    pub fn validate(&self, expected: Option<PreprocessingProfile>) -> Result<(), InferenceError> {
        let profile = self.preprocessing.profile;

        if let Some(expected) = expected {
            if expected != profile {
                return Err(InferenceError::ProfileMismatch {
                    expected: expected.to_string(),
                    actual: profile.to_string(),
                });
            }
        }

        let columns = profile.columns();
        if self.feature_names.len() != columns.len()
            || self.feature_names.iter().zip(columns).any(|(a, b)| a != b)
        {
            return Err(InferenceError::ProfileMismatch {
                expected: format!("{} columns {:?}", profile, columns),
                actual: format!("{:?}", self.feature_names),
            });
        }

        Ok(())
    }

    /// Build the preprocessor the model was trained with
    pub fn preprocessor(&self) -> Result<Preprocessor, InferenceError> {
        let spec = &self.preprocessing;
        match (spec.profile, spec.scaler_policy) {
            (PreprocessingProfile::RawAmount, _) => Ok(Preprocessor::raw_amount()),
            (PreprocessingProfile::ScaledAmountTime, ScalerPolicy::RefitPerRequest) => {
                Ok(Preprocessor::scaled_amount_time_refit())
            }
            (PreprocessingProfile::ScaledAmountTime, ScalerPolicy::Persisted) => {
                let scaler = spec.scaler.ok_or_else(|| {
                    InferenceError::ModelLoadError(
                        "scaled_amount_time with persisted scaling requires scaler parameters"
                            .to_string(),
                    )
                })?;
                if !scaler.amount.is_valid() || !scaler.time.is_valid() {
                    return Err(InferenceError::ModelLoadError(
                        "scaler parameters must be finite with a non-zero scale".to_string(),
                    ));
                }
                Ok(Preprocessor::scaled_amount_time(scaler))
            }
        }
    }

    /// Resolve a backend path relative to the manifest location
    pub fn resolve(manifest_path: &Path, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            manifest_path
                .parent()
                .map(|dir| dir.join(relative))
                .unwrap_or_else(|| relative.to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_json(profile: &str, names: Vec<&str>) -> String {
        json!({
            "model_version": "UnderSampling",
            "description": "UnderSampling LogisticRegression",
            "preprocessing": {
                "profile": profile,
                "scaler": {
                    "amount": { "center": 22.0, "scale": 71.565 },
                    "time": { "center": 84692.0, "scale": 85119.0 }
                }
            },
            "feature_names": names,
            "backend": {
                "kind": "logistic_regression",
                "coefficients": vec![0.0; 30],
                "intercept": -3.0
            }
        })
        .to_string()
    }

    #[test]
    fn test_parse_and_validate() {
        let names = PreprocessingProfile::ScaledAmountTime.columns().to_vec();
        let manifest =
            ModelManifest::from_json(&manifest_json("scaled_amount_time", names)).unwrap();

        assert_eq!(manifest.preprocessing.scaler_policy, ScalerPolicy::Persisted);
        manifest.validate(None).unwrap();
        manifest
            .validate(Some(PreprocessingProfile::ScaledAmountTime))
            .unwrap();

        match &manifest.backend {
            BackendSpec::LogisticRegression(spec) => assert_eq!(spec.threshold, 0.5),
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(manifest.preprocessor().unwrap().feature_count(), 30);
    }

    #[test]
    fn test_configured_profile_mismatch() {
        let names = PreprocessingProfile::ScaledAmountTime.columns().to_vec();
        let manifest =
            ModelManifest::from_json(&manifest_json("scaled_amount_time", names)).unwrap();

        let err = manifest
            .validate(Some(PreprocessingProfile::RawAmount))
            .unwrap_err();
        assert!(matches!(err, InferenceError::ProfileMismatch { .. }));
    }

    #[test]
    fn test_columns_disagree_with_profile() {
        // Profile B columns declared under profile A
        let names = PreprocessingProfile::RawAmount.columns().to_vec();
        let manifest =
            ModelManifest::from_json(&manifest_json("scaled_amount_time", names)).unwrap();
        assert!(manifest.validate(None).is_err());

        // Same length, swapped order
        let mut names = PreprocessingProfile::ScaledAmountTime.columns().to_vec();
        names.swap(0, 1);
        let manifest =
            ModelManifest::from_json(&manifest_json("scaled_amount_time", names)).unwrap();
        assert!(manifest.validate(None).is_err());
    }

    #[test]
    fn test_persisted_policy_requires_scaler() {
        let raw = json!({
            "model_version": "v1",
            "preprocessing": { "profile": "scaled_amount_time" },
            "feature_names": PreprocessingProfile::ScaledAmountTime.columns(),
            "backend": { "kind": "onnx", "path": "model.onnx" }
        })
        .to_string();
        let manifest = ModelManifest::from_json(&raw).unwrap();
        assert!(manifest.preprocessor().is_err());
    }

    #[test]
    fn test_refit_policy_needs_no_scaler() {
        let raw = json!({
            "model_version": "v1",
            "preprocessing": {
                "profile": "scaled_amount_time",
                "scaler_policy": "refit_per_request"
            },
            "feature_names": PreprocessingProfile::ScaledAmountTime.columns(),
            "backend": { "kind": "onnx", "path": "model.onnx" }
        })
        .to_string();
        let manifest = ModelManifest::from_json(&raw).unwrap();
        assert_eq!(
            manifest.preprocessor().unwrap().scaler_policy(),
            Some(ScalerPolicy::RefitPerRequest)
        );
    }

    #[test]
    fn test_resolve_relative_backend_path() {
        let resolved =
            ModelManifest::resolve(Path::new("models/fraud.json"), Path::new("fraud.onnx"));
        assert_eq!(resolved, PathBuf::from("models/fraud.onnx"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ModelManifest::from_json("{ not json"),
            Err(InferenceError::ModelLoadError(_))
        ));
    }
}
