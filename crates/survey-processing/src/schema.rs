//! Static description of the survey table.
//!
//! The cleaning steps never guess column roles from the data. Which columns
//! hold travel times, which get mean/mode imputation and which get
//! standardized is declared here up front.

use crate::error::{CleaningError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Respondent age.
pub const AGE: &str = "Wiek";
/// Respondent average income.
pub const AVERAGE_INCOME: &str = "Średnie Zarobki";
/// Respondent gender.
pub const GENDER: &str = "Płeć";
/// Respondent education level.
pub const EDUCATION: &str = "Wykształcenie";
/// Purpose of the trip.
pub const TRAVEL_PURPOSE: &str = "Cel Podróży";
/// Trip start time, `HH:MM`.
pub const START_TIME: &str = "Czas Początkowy Podróży";
/// Trip end time, `HH:MM`.
pub const END_TIME: &str = "Czas Końcowy Podróży";

/// Column roles of a survey table.
///
/// Columns not named here pass through unchanged. That includes numeric ones
/// such as an `Id` column: list them in `extra_numeric` to have them scaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySchema {
    /// Trip start time column.
    pub start_time: String,
    /// Trip end time column.
    pub end_time: String,
    /// Numeric columns imputed with the mean and then standardized.
    pub numeric: Vec<String>,
    /// Categorical columns imputed with the most frequent value.
    pub categorical: Vec<String>,
    /// Numeric columns that are standardized but not imputed.
    #[serde(default)]
    pub extra_numeric: Vec<String>,
}

impl Default for SurveySchema {
    fn default() -> Self {
        Self {
            start_time: START_TIME.to_string(),
            end_time: END_TIME.to_string(),
            numeric: vec![AGE.to_string(), AVERAGE_INCOME.to_string()],
            categorical: vec![
                GENDER.to_string(),
                EDUCATION.to_string(),
                TRAVEL_PURPOSE.to_string(),
            ],
            extra_numeric: Vec::new(),
        }
    }
}

impl SurveySchema {
    /// Columns whose missing values get filled, numeric first.
    pub fn imputed_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(&self.categorical)
            .map(String::as_str)
            .collect()
    }

    /// Columns rescaled to zero mean and unit variance.
    pub fn standardized_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(&self.extra_numeric)
            .map(String::as_str)
            .collect()
    }

    fn declared_columns(&self) -> impl Iterator<Item = &str> {
        [self.start_time.as_str(), self.end_time.as_str()]
            .into_iter()
            .chain(self.numeric.iter().map(String::as_str))
            .chain(self.categorical.iter().map(String::as_str))
            .chain(self.extra_numeric.iter().map(String::as_str))
    }

    /// Check that every declared column is present in `df`.
    pub fn check(&self, df: &DataFrame) -> Result<()> {
        for name in self.declared_columns() {
            if df.column(name).is_err() {
                return Err(CleaningError::ColumnNotFound(name.to_string()));
            }
        }
        Ok(())
    }

    /// Reject empty names and columns declared in more than one role.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for name in self.declared_columns() {
            if name.trim().is_empty() {
                return Err("column names must not be empty".to_string());
            }
            if !seen.insert(name) {
                return Err(format!("column '{}' is declared more than once", name));
            }
        }
        Ok(())
    }
}
