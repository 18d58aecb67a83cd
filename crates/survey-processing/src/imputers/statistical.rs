//! Statistical imputation methods.
//!
//! Numeric columns are filled with the mean of their present values,
//! categorical columns with the most frequent present value. Statistics are
//! fitted once on the validated table and then applied in a separate step.

use crate::error::{CleaningError, Result};
use crate::schema::SurveySchema;
use crate::utils::{categorical_values, mean, mode, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fill value of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum ColumnStatistic {
    Mean(f64),
    Mode(String),
}

/// Statistic fitted for one imputed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    /// `None` only when the column had no values at all (empty table).
    pub statistic: Option<ColumnStatistic>,
    /// Missing cells found while fitting.
    pub missing_count: usize,
}

/// All statistics of one pipeline run, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationStatistics {
    pub columns: Vec<ColumnImputation>,
}

impl ImputationStatistics {
    /// Look up the statistic fitted for `column`.
    pub fn get(&self, column: &str) -> Option<&ColumnStatistic> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .and_then(|c| c.statistic.as_ref())
    }

    /// Total number of missing cells across imputed columns.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count).sum()
    }
}

/// Mean/mode imputer over the columns declared in a [`SurveySchema`].
#[derive(Debug, Clone)]
pub struct StatisticalImputer {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl StatisticalImputer {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    pub fn from_schema(schema: &SurveySchema) -> Self {
        Self::new(schema.numeric.clone(), schema.categorical.clone())
    }

    /// Compute the fill value of every imputed column.
    ///
    /// Blank strings count as missing. Fails with [`CleaningError::Parse`] on a
    /// non-numeric value in a numeric column and with
    /// [`CleaningError::NoValidValues`] when a column has missing cells but no
    /// present value.
    pub fn fit(&self, df: &DataFrame) -> Result<ImputationStatistics> {
        let mut columns = Vec::with_capacity(self.numeric.len() + self.categorical.len());

        for name in &self.numeric {
            let values = numeric_values(df.column(name)?.as_materialized_series())?;
            let missing_count = values.iter().filter(|v| v.is_none()).count();
            let statistic = mean(&values).map(ColumnStatistic::Mean);
            columns.push(Self::checked(name, statistic, missing_count)?);
        }

        for name in &self.categorical {
            let values = categorical_values(df.column(name)?.as_materialized_series())?;
            let missing_count = values.iter().filter(|v| v.is_none()).count();
            let statistic = mode(&values).map(ColumnStatistic::Mode);
            columns.push(Self::checked(name, statistic, missing_count)?);
        }

        Ok(ImputationStatistics { columns })
    }

    fn checked(
        name: &str,
        statistic: Option<ColumnStatistic>,
        missing_count: usize,
    ) -> Result<ColumnImputation> {
        if statistic.is_none() && missing_count > 0 {
            return Err(CleaningError::NoValidValues(name.to_string()));
        }
        debug!(
            "Column '{}': {} missing, statistic {:?}",
            name, missing_count, statistic
        );
        Ok(ColumnImputation {
            column: name.to_string(),
            statistic,
            missing_count,
        })
    }

    /// Replace every missing cell with its column statistic.
    ///
    /// Numeric columns come back as `Float64`, categorical ones as `String`.
    /// Each filled column appends one line to `processing_steps`.
    pub fn transform(
        &self,
        df: DataFrame,
        statistics: &ImputationStatistics,
        processing_steps: &mut Vec<String>,
    ) -> Result<DataFrame> {
        let mut df = df;

        for name in &self.numeric {
            let fill = match statistics.get(name) {
                Some(ColumnStatistic::Mean(value)) => Some(*value),
                _ => None,
            };
            let values = numeric_values(df.column(name)?.as_materialized_series())?;
            let missing = values.iter().filter(|v| v.is_none()).count();
            let filled = values
                .into_iter()
                .map(|v| v.or(fill).ok_or_else(|| CleaningError::NoValidValues(name.clone())))
                .collect::<Result<Vec<f64>>>()?;

            df.replace(name, Series::new(name.as_str().into(), filled))?;

            if let (Some(value), true) = (fill, missing > 0) {
                processing_steps.push(format!(
                    "Filled {} missing values in '{}' with mean: {:.2}",
                    missing, name, value
                ));
            }
        }

        for name in &self.categorical {
            let fill = match statistics.get(name) {
                Some(ColumnStatistic::Mode(value)) => Some(value.clone()),
                _ => None,
            };
            let values = categorical_values(df.column(name)?.as_materialized_series())?;
            let missing = values.iter().filter(|v| v.is_none()).count();
            let filled = values
                .into_iter()
                .map(|v| {
                    v.or_else(|| fill.clone())
                        .ok_or_else(|| CleaningError::NoValidValues(name.clone()))
                })
                .collect::<Result<Vec<String>>>()?;

            df.replace(name, Series::new(name.as_str().into(), filled))?;

            if let (Some(value), true) = (&fill, missing > 0) {
                processing_steps.push(format!(
                    "Filled {} missing values in '{}' with mode: '{}'",
                    missing, name, value
                ));
            }
        }

        Ok(df)
    }

    /// [`fit`](Self::fit) followed by [`transform`](Self::transform).
    pub fn fit_transform(
        &self,
        df: DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, ImputationStatistics)> {
        let statistics = self.fit(&df)?;
        let df = self.transform(df, &statistics, processing_steps)?;
        Ok((df, statistics))
    }
}
