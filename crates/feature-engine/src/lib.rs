//! Feature Preprocessing Engine
//!
//! Turns validated transactions into the exact column-ordered feature
//! vectors a trained fraud model expects.

mod features;
mod profile;
mod scaler;

pub use features::{FeatureVector, Preprocessor};
pub use profile::{
    PreprocessingProfile, ScalerPolicy, RAW_AMOUNT_COLUMNS, SCALED_AMOUNT_TIME_COLUMNS,
};
pub use scaler::{AmountTimeScaler, RobustScaler, ScalerParams};

use thiserror::Error;

/// Errors during preprocessing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("Column {0} is required by the preprocessing profile but was not provided")]
    MissingColumn(&'static str),
    #[error("Column {column} produced a non-finite value {value}")]
    NonFinite { column: &'static str, value: f64 },
}
