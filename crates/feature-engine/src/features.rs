//! Feature Vector Assembly

use crate::profile::{PreprocessingProfile, ScalerPolicy};
use crate::scaler::{AmountTimeScaler, RobustScaler};
use crate::PreprocessError;
use data_validator::Transaction;
use serde::Serialize;
use tracing::debug;

/// Feature vector for ML inference, column-ordered for one profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Feature values in model column order
    pub values: Vec<f64>,
    /// Profile the values were built for
    pub profile: PreprocessingProfile,
}

impl FeatureVector {
    /// Column names matching `values`
    pub fn columns(&self) -> &'static [&'static str] {
        self.profile.columns()
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scaling {
    /// Profile B: no scaling at this stage
    None,
    Persisted(AmountTimeScaler),
    RefitPerRequest,
}

/// Stateless transaction preprocessor for one profile.
///
/// Holds only immutable parameters, so one instance is shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    profile: PreprocessingProfile,
    scaling: Scaling,
}

impl Preprocessor {
    /// Profile A with scaler parameters persisted at training time
    pub fn scaled_amount_time(scaler: AmountTimeScaler) -> Self {
        Self {
            profile: PreprocessingProfile::ScaledAmountTime,
            scaling: Scaling::Persisted(scaler),
        }
    }

    /// Profile A refitting the scaler on every single-row request (compatibility mode)
    pub fn scaled_amount_time_refit() -> Self {
        Self {
            profile: PreprocessingProfile::ScaledAmountTime,
            scaling: Scaling::RefitPerRequest,
        }
    }

    /// Profile B: raw Amount, no Time
    pub fn raw_amount() -> Self {
        Self {
            profile: PreprocessingProfile::RawAmount,
            scaling: Scaling::None,
        }
    }

    /// Get the profile
    pub fn profile(&self) -> PreprocessingProfile {
        self.profile
    }

    /// Scaler policy in effect, if the profile scales at all
    pub fn scaler_policy(&self) -> Option<ScalerPolicy> {
        match self.scaling {
            Scaling::None => None,
            Scaling::Persisted(_) => Some(ScalerPolicy::Persisted),
            Scaling::RefitPerRequest => Some(ScalerPolicy::RefitPerRequest),
        }
    }

    /// Number of features produced
    pub fn feature_count(&self) -> usize {
        self.profile.feature_count()
    }

    /// Human readable summary of the pipeline
    pub fn describe(&self) -> &'static str {
        match self.scaling {
            Scaling::None => "Raw Amount + V1..V28; scaling folded into the model pipeline",
            Scaling::Persisted(_) => {
                "RobustScaler on Amount & Time with training-time parameters"
            }
            Scaling::RefitPerRequest => {
                "RobustScaler on Amount & Time refit per request (compatibility mode)"
            }
        }
    }

    /// Build the feature vector for a transaction
    pub fn transform(&self, transaction: &Transaction) -> Result<FeatureVector, PreprocessError> {
        let mut values = Vec::with_capacity(self.feature_count());

        match self.profile {
            PreprocessingProfile::ScaledAmountTime => {
                let time = transaction
                    .time
                    .ok_or(PreprocessError::MissingColumn("Time"))?;
                let (scaled_amount, scaled_time) = match self.scaling {
                    Scaling::Persisted(scaler) => (
                        scaler.amount.transform(transaction.amount),
                        scaler.time.transform(time),
                    ),
                    Scaling::RefitPerRequest | Scaling::None => (
                        RobustScaler::fit_transform(&[transaction.amount])[0],
                        RobustScaler::fit_transform(&[time])[0],
                    ),
                };
                values.push(scaled_amount);
                values.push(scaled_time);
            }
            PreprocessingProfile::RawAmount => values.push(transaction.amount),
        }
        values.extend_from_slice(&transaction.v);

        for (&column, &value) in self.profile.columns().iter().zip(values.iter()) {
            if !value.is_finite() {
                return Err(PreprocessError::NonFinite {
                    column,
                    value,
                });
            }
        }

        debug!(
            "Built {} feature vector with {} values",
            self.profile,
            values.len()
        );

        Ok(FeatureVector {
            values,
            profile: self.profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::ScalerParams;
    use data_validator::V_FEATURE_COUNT;

    fn transaction(time: f64, amount: f64) -> Transaction {
        let mut v = [0.0; V_FEATURE_COUNT];
        for (i, slot) in v.iter_mut().enumerate() {
            *slot = (i + 1) as f64;
        }
        Transaction::new(Some(time), amount, v)
    }

    fn scaler() -> AmountTimeScaler {
        AmountTimeScaler {
            amount: ScalerParams {
                center: 22.0,
                scale: 71.565,
            },
            time: ScalerParams {
                center: 84692.0,
                scale: 85119.0,
            },
        }
    }

    #[test]
    fn test_profile_a_column_order() {
        let pre = Preprocessor::scaled_amount_time(scaler());
        let features = pre.transform(&transaction(84692.0, 93.565)).unwrap();

        assert_eq!(features.len(), 30);
        assert!((features.values[0] - 1.0).abs() < 1e-12);
        assert_eq!(features.values[1], 0.0);
        assert_eq!(features.values[2], 1.0);
        assert_eq!(features.values[29], 28.0);
        assert_eq!(features.columns()[15], "V14");
        assert_eq!(features.values[15], 14.0);
    }

    #[test]
    fn test_profile_b_column_order() {
        let pre = Preprocessor::raw_amount();
        let tx = Transaction::new(None, 149.62, transaction(0.0, 0.0).v);
        let features = pre.transform(&tx).unwrap();

        assert_eq!(features.len(), 29);
        assert_eq!(features.values[0], 149.62);
        assert_eq!(features.values[1], 1.0);
        assert_eq!(features.columns()[0], "Amount");
        assert!(!features.columns().contains(&"scaled_time"));
    }

    #[test]
    fn test_profile_b_ignores_time() {
        let pre = Preprocessor::raw_amount();
        let with_time = pre.transform(&transaction(5000.0, 10.0)).unwrap();
        let without_time = pre
            .transform(&Transaction::new(None, 10.0, with_time.values[1..].try_into().unwrap()))
            .unwrap();
        assert_eq!(with_time, without_time);
    }

    #[test]
    fn test_profile_a_requires_time() {
        let pre = Preprocessor::scaled_amount_time(scaler());
        let tx = Transaction::new(None, 10.0, [0.0; V_FEATURE_COUNT]);
        assert_eq!(
            pre.transform(&tx).unwrap_err(),
            PreprocessError::MissingColumn("Time")
        );
    }

    #[test]
    fn test_persisted_scaling_is_deterministic() {
        let pre = Preprocessor::scaled_amount_time(scaler());
        let tx = transaction(1000.0, 250.0);
        assert_eq!(pre.transform(&tx).unwrap(), pre.transform(&tx).unwrap());

        let other = pre.transform(&transaction(1000.0, 5000.0)).unwrap();
        assert_ne!(pre.transform(&tx).unwrap().values[0], other.values[0]);
    }

    // Known issue reproduced by the compatibility mode: a single-row refit
    // collapses Amount and Time to 0, so distinct inputs become identical.
    #[test]
    fn test_refit_per_request_loses_amount_and_time() {
        let pre = Preprocessor::scaled_amount_time_refit();
        let small = pre.transform(&transaction(0.0, 1.0)).unwrap();
        let large = pre.transform(&transaction(170_000.0, 25_000.0)).unwrap();

        assert_eq!(small.values[0], 0.0);
        assert_eq!(small.values[1], 0.0);
        assert_eq!(small, large);
        assert_eq!(pre.scaler_policy(), Some(ScalerPolicy::RefitPerRequest));
    }

    #[test]
    fn test_non_finite_output_is_rejected() {
        let pre = Preprocessor::scaled_amount_time(AmountTimeScaler {
            amount: ScalerParams {
                center: 0.0,
                scale: 1e-320,
            },
            time: ScalerParams::identity(),
        });
        let err = pre.transform(&transaction(0.0, f64::MAX)).unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::NonFinite {
                column: "scaled_amount",
                ..
            }
        ));
    }
}
