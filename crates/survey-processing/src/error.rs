//! Custom error types for the survey cleaning pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every failure
//! carries enough context (column name, original row position) to diagnose
//! the offending input without re-running the pipeline.
//!
//! Errors are serializable so they can be emitted as JSON by the CLI.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Column declared in the survey schema was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A value in a declared-numeric column could not be parsed.
    #[error("Failed to parse '{value}' in column '{column}' at row {row} as a number")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    /// Column has missing cells but no present value to compute a statistic from.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Column has a dtype that cannot be used for the requested operation.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A remote source or sink needs credentials that were not supplied.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Internal invariant violated.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (spreadsheet access, only with "sheets" feature).
    #[cfg(feature = "sheets")]
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Signing the service-account assertion failed (only with "sheets" feature).
    #[cfg(feature = "sheets")]
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Translate a row position relative to a filtered table back to the
    /// position in the table it was filtered from.
    ///
    /// `kept_rows[i]` is the original position of the i-th surviving row.
    pub fn at_original_row(self, kept_rows: &[usize]) -> Self {
        match self {
            Self::Parse { column, row, value } => Self::Parse {
                column,
                row: kept_rows.get(row).copied().unwrap_or(row),
                value,
            },
            Self::WithContext { context, source } => Self::WithContext {
                context,
                source: Box::new(source.at_original_row(kept_rows)),
            },
            other => other,
        }
    }

    /// Get a stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::MissingCredentials(_) => "MISSING_CREDENTIALS",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "sheets")]
            Self::Http(_) => "HTTP_REQUEST_ERROR",
            #[cfg(feature = "sheets")]
            Self::Jwt(_) => "JWT_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error points at malformed input data rather than at the
    /// environment (files, network, configuration).
    pub fn is_data_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::Parse { .. }
            | Self::NoValidValues(_)
            | Self::TypeConversionFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_data_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
