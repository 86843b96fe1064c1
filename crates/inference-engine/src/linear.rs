//! Logistic Regression Backend

use crate::manifest::LogisticRegressionSpec;
use crate::{Classifier, InferenceError, ModelOutput};
use feature_engine::ScalerParams;

/// Binary logistic regression with an optional standardisation step
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
    standardize: Option<Vec<ScalerParams>>,
}

impl LogisticRegression {
    /// Build and validate from a manifest entry
    pub fn from_spec(spec: &LogisticRegressionSpec) -> Result<Self, InferenceError> {
        Self::new(
            spec.coefficients.clone(),
            spec.intercept,
            spec.threshold,
            spec.standardize.clone(),
        )
    }

    /// Create a new model
    pub fn new(
        coefficients: Vec<f64>,
        intercept: f64,
        threshold: f64,
        standardize: Option<Vec<ScalerParams>>,
    ) -> Result<Self, InferenceError> {
        if coefficients.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "logistic regression has no coefficients".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InferenceError::ModelLoadError(
                "logistic regression parameters must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InferenceError::ModelLoadError(format!(
                "decision threshold {} is outside [0, 1]",
                threshold
            )));
        }
        if let Some(steps) = &standardize {
            if steps.len() != coefficients.len() {
                return Err(InferenceError::InvalidInputShape {
                    expected: format!("{} standardisation entries", coefficients.len()),
                    actual: steps.len().to_string(),
                });
            }
            if let Some(i) = steps.iter().position(|p| !p.is_valid()) {
                return Err(InferenceError::ModelLoadError(format!(
                    "standardisation entry {} has a zero or non-finite scale",
                    i
                )));
            }
        }

        Ok(Self {
            coefficients,
            intercept,
            threshold,
            standardize,
        })
    }

    /// Linear score before the sigmoid
    pub fn decision_function(&self, features: &[f64]) -> f64 {
        let dot: f64 = match &self.standardize {
            Some(steps) => features
                .iter()
                .zip(steps)
                .zip(&self.coefficients)
                .map(|((x, step), w)| step.transform(*x) * w)
                .sum(),
            None => features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum(),
        };
        self.intercept + dot
    }
}

/// Numerically stable logistic function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn model_type(&self) -> &str {
        "LogisticRegression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<ModelOutput, InferenceError> {
        if features.len() != self.coefficients.len() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[1, {}]", self.coefficients.len()),
                actual: format!("[1, {}]", features.len()),
            });
        }

        let probability = sigmoid(self.decision_function(features));
        if !probability.is_finite() {
            return Err(InferenceError::InferenceFailed(
                "model produced a non-finite probability".to_string(),
            ));
        }

        Ok(ModelOutput {
            label: probability >= self.threshold,
            probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn model() -> LogisticRegression {
        LogisticRegression::new(vec![1.0, -2.0, 0.5], -0.5, 0.5, None).unwrap()
    }

    #[test]
    fn test_probability_matches_sigmoid() {
        let out = model().predict(&[1.0, 0.0, 1.0]).unwrap();
        // z = -0.5 + 1.0 + 0.5 = 1.0
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((out.probability - expected).abs() < 1e-12);
        assert!(out.label);
    }

    #[test]
    fn test_label_follows_threshold() {
        let strict = LogisticRegression::new(vec![1.0], 0.0, 0.9, None).unwrap();
        let out = strict.predict(&[1.0]).unwrap();
        assert!(out.probability > 0.7);
        assert!(!out.label);
    }

    #[test]
    fn test_standardisation_step() {
        let steps = vec![ScalerParams { center: 100.0, scale: 50.0 }];
        let model = LogisticRegression::new(vec![1.0], 0.0, 0.5, Some(steps)).unwrap();
        // (100 - 100) / 50 = 0 -> sigmoid(0)
        assert_eq!(model.predict(&[100.0]).unwrap().probability, 0.5);
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let err = model().predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInputShape { .. }));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LogisticRegression::new(vec![], 0.0, 0.5, None).is_err());
        assert!(LogisticRegression::new(vec![f64::NAN], 0.0, 0.5, None).is_err());
        assert!(LogisticRegression::new(vec![1.0], 0.0, 1.5, None).is_err());
        assert!(LogisticRegression::new(
            vec![1.0, 1.0],
            0.0,
            0.5,
            Some(vec![ScalerParams::identity()])
        )
        .is_err());
        assert!(LogisticRegression::new(
            vec![1.0],
            0.0,
            0.5,
            Some(vec![ScalerParams { center: 0.0, scale: 0.0 }])
        )
        .is_err());
    }

    #[test]
    fn test_sigmoid_extremes() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(0.0), 0.5);
    }

    proptest! {
        #[test]
        fn prop_probability_in_unit_interval(x in proptest::collection::vec(-1e3f64..1e3, 3)) {
            let out = model().predict(&x).unwrap();
            prop_assert!((0.0..=1.0).contains(&out.probability));
            prop_assert_eq!(out.label, out.probability >= 0.5);
        }
    }
}
