//! Preprocessing Profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column order for [`PreprocessingProfile::ScaledAmountTime`]
pub const SCALED_AMOUNT_TIME_COLUMNS: [&str; 30] = [
    "scaled_amount", "scaled_time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10",
    "V11", "V12", "V13", "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23",
    "V24", "V25", "V26", "V27", "V28",
];

/// Column order for [`PreprocessingProfile::RawAmount`]
pub const RAW_AMOUNT_COLUMNS: [&str; 29] = [
    "Amount", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28",
];

/// Preprocessing pipeline a model was trained with.
///
/// The two profiles produce vectors of different width and column meaning;
/// a model trained on one must never be fed the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingProfile {
    /// `[scaled_amount, scaled_time, V1..V28]`, robust-scaled Amount and Time
    ScaledAmountTime,
    /// `[Amount, V1..V28]`, no Time; scaling lives inside the model pipeline
    RawAmount,
}

impl PreprocessingProfile {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessingProfile::ScaledAmountTime => "scaled_amount_time",
            PreprocessingProfile::RawAmount => "raw_amount",
        }
    }

    /// Expected column order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            PreprocessingProfile::ScaledAmountTime => &SCALED_AMOUNT_TIME_COLUMNS,
            PreprocessingProfile::RawAmount => &RAW_AMOUNT_COLUMNS,
        }
    }

    /// Number of features the model receives
    pub fn feature_count(&self) -> usize {
        self.columns().len()
    }

    /// Whether incoming transactions must carry `Time`
    pub fn requires_time(&self) -> bool {
        matches!(self, PreprocessingProfile::ScaledAmountTime)
    }
}

impl fmt::Display for PreprocessingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the robust scaler parameters for Amount/Time come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerPolicy {
    /// Parameters fit at training time and shipped with the model
    #[default]
    Persisted,
    /// Fit a fresh scaler on each single-row request.
    ///
    /// Known issue kept for drop-in compatibility: a one-sample fit has
    /// median equal to the value and zero IQR, so every scaled column is 0.
    RefitPerRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_layouts() {
        let a = PreprocessingProfile::ScaledAmountTime;
        let b = PreprocessingProfile::RawAmount;

        assert_eq!(a.feature_count(), 30);
        assert_eq!(b.feature_count(), 29);
        assert_eq!(&a.columns()[..3], &["scaled_amount", "scaled_time", "V1"]);
        assert_eq!(&b.columns()[..2], &["Amount", "V1"]);
        assert_eq!(a.columns()[29], "V28");
        assert_eq!(b.columns()[28], "V28");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PreprocessingProfile::RawAmount).unwrap();
        assert_eq!(json, "\"raw_amount\"");

        let policy: ScalerPolicy = serde_json::from_str("\"refit_per_request\"").unwrap();
        assert_eq!(policy, ScalerPolicy::RefitPerRequest);
        assert_eq!(ScalerPolicy::default(), ScalerPolicy::Persisted);
    }
}
