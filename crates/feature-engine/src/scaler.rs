//! Robust (median / IQR) Scaling

use serde::{Deserialize, Serialize};

/// Centering and scaling parameters for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Value subtracted before scaling (the median for a robust scaler)
    pub center: f64,
    /// Divisor applied after centering (the interquartile range)
    pub scale: f64,
}

impl ScalerParams {
    /// Parameters that leave values unchanged
    pub fn identity() -> Self {
        Self {
            center: 0.0,
            scale: 1.0,
        }
    }

    /// Apply `(x - center) / scale`
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }

    /// Whether the parameters can be applied
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.scale.is_finite() && self.scale != 0.0
    }
}

impl Default for ScalerParams {
    fn default() -> Self {
        Self::identity()
    }
}

/// Amount and Time scaler parameters persisted with a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountTimeScaler {
    pub amount: ScalerParams,
    pub time: ScalerParams,
}

/// Robust scaler fit from a sample of values
pub struct RobustScaler;

impl RobustScaler {
    /// Fit median/IQR parameters.
    ///
    /// A zero IQR is replaced by 1.0, so a constant (or single-value)
    /// sample maps its own values to 0.
    pub fn fit(values: &[f64]) -> ScalerParams {
        if values.is_empty() {
            return ScalerParams::identity();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let center = quantile(&sorted, 0.5);
        let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
        let scale = if iqr == 0.0 || !iqr.is_finite() { 1.0 } else { iqr };

        ScalerParams { center, scale }
    }

    /// Fit on `values` and transform them in one step
    pub fn fit_transform(values: &[f64]) -> Vec<f64> {
        let params = Self::fit(values);
        values.iter().map(|&v| params.transform(v)).collect()
    }
}

/// Quantile of sorted data with linear interpolation between order statistics
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
