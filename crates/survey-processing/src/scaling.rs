//! Standardization of numeric columns.
//!
//! Each declared numeric column is rescaled to zero mean and unit variance
//! using its own mean and population standard deviation.

use crate::error::Result;
use crate::utils::{mean, numeric_values, population_std};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fitted parameters of one standardized column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub mean: f64,
    /// Population standard deviation of the present values.
    pub std: f64,
    /// Divisor actually applied; 1.0 when `std` is negligible.
    pub scale: f64,
}

impl ColumnScale {
    /// Fit the parameters of a column from its present values.
    pub fn fit(column: &str, values: &[Option<f64>]) -> Self {
        let mean = mean(values).unwrap_or(0.0);
        let std = population_std(values, mean).unwrap_or(0.0);
        let scale = if is_negligible(std, mean) { 1.0 } else { std };
        Self {
            column: column.to_string(),
            mean,
            std,
            scale,
        }
    }

    /// Rescale one value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// A standard deviation this small relative to the mean is rounding noise
/// of a constant column.
fn is_negligible(std: f64, mean: f64) -> bool {
    !std.is_finite() || std <= 10.0 * f64::EPSILON * mean.abs().max(1.0)
}

/// Standard scaler over a fixed list of columns.
#[derive(Debug, Clone)]
pub struct Standardizer {
    columns: Vec<String>,
}

impl Standardizer {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Fit and apply the scaler to every configured column.
    ///
    /// Columns become `Float64`. Missing values stay missing and are ignored
    /// by the statistics. A constant column ends up all zeros.
    pub fn fit_transform(
        &self,
        df: DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, Vec<ColumnScale>)> {
        let mut df = df;
        let mut scales = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let values = numeric_values(df.column(name)?.as_materialized_series())?;
            let scale = ColumnScale::fit(name, &values);

            if scale.scale == 1.0 && scale.std != 1.0 {
                warn!(
                    "Column '{}' has zero variance; values centered but not scaled",
                    name
                );
            }

            let scaled: Vec<Option<f64>> = values
                .into_iter()
                .map(|v| v.map(|x| scale.apply(x)))
                .collect();
            df.replace(name, Series::new(name.as_str().into(), scaled))?;

            debug!(
                "Standardized '{}' (mean {:.4}, std {:.4})",
                name, scale.mean, scale.std
            );
            processing_steps.push(format!(
                "Standardized '{}' (mean: {:.2}, std: {:.2})",
                name, scale.mean, scale.std
            ));
            scales.push(scale);
        }

        Ok((df, scales))
    }
}
