//! Configuration types for the survey cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use crate::error::CleaningError;
use crate::schema::SurveySchema;
use serde::{Deserialize, Serialize};

/// Denominator used for the "changed data" percentage of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChangeBase {
    /// Number of rows removed by validation. This reproduces the historical
    /// report format, where the changed-cell count is divided by the count of
    /// removed rows.
    #[default]
    RowsRemoved,
    /// Number of rows that survived validation.
    RowsRemaining,
    /// Number of imputed cells examined (surviving rows x imputed columns).
    ImputedCells,
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use survey_processing::config::{ChangeBase, CleaningConfig};
///
/// let config = CleaningConfig::builder()
///     .change_base(ChangeBase::RowsRemaining)
///     .max_trip_hours(10)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Column roles of the input table.
    pub schema: SurveySchema,

    /// Highest accepted start hour. Hour 24 is tolerated by default.
    /// Default: 24
    pub max_start_hour: i64,

    /// Longest accepted trip in whole hours, measured modulo 24.
    /// Default: 12
    pub max_trip_hours: i64,

    /// Denominator of the changed-data percentage.
    /// Default: RowsRemoved
    pub change_base: ChangeBase,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            schema: SurveySchema::default(),
            max_start_hour: 24,
            max_trip_hours: 12,
            change_base: ChangeBase::default(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Parse a JSON configuration and validate it. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_start_hour < 0 {
            return Err(ConfigValidationError::InvalidHourLimit {
                field: "max_start_hour".to_string(),
                value: self.max_start_hour,
            });
        }

        if !(0..24).contains(&self.max_trip_hours) {
            return Err(ConfigValidationError::InvalidHourLimit {
                field: "max_trip_hours".to_string(),
                value: self.max_trip_hours,
            });
        }

        self.schema
            .validate()
            .map_err(ConfigValidationError::InvalidSchema)?;

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid hour limit for '{field}': {value}")]
    InvalidHourLimit { field: String, value: i64 },

    #[error("Invalid survey schema: {0}")]
    InvalidSchema(String),
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    schema: Option<SurveySchema>,
    max_start_hour: Option<i64>,
    max_trip_hours: Option<i64>,
    change_base: Option<ChangeBase>,
}

impl CleaningConfigBuilder {
    /// Set the column roles of the input table.
    pub fn schema(mut self, schema: SurveySchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the highest accepted start hour.
    pub fn max_start_hour(mut self, hour: i64) -> Self {
        self.max_start_hour = Some(hour);
        self
    }

    /// Set the longest accepted trip in whole hours.
    ///
    /// # Arguments
    /// * `hours` - Value between 0 and 23
    pub fn max_trip_hours(mut self, hours: i64) -> Self {
        self.max_trip_hours = Some(hours);
        self
    }

    /// Set the denominator of the changed-data percentage.
    pub fn change_base(mut self, base: ChangeBase) -> Self {
        self.change_base = Some(base);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            schema: self.schema.unwrap_or_default(),
            max_start_hour: self.max_start_hour.unwrap_or(24),
            max_trip_hours: self.max_trip_hours.unwrap_or(12),
            change_base: self.change_base.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
