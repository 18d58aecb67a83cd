//! Survey Cleaning Pipeline Library
//!
//! A data cleaning library for travel survey responses, built with Rust and Polars.
//!
//! # Overview
//!
//! One run of the pipeline takes a raw survey table and:
//!
//! - **Validates rows**: drops responses whose trip start/end times are
//!   missing, malformed or describe an implausible trip
//! - **Imputes**: fills numeric columns with the mean and categorical columns
//!   with the most frequent value
//! - **Accounts for changes**: counts the cells altered by imputation
//! - **Standardizes**: rescales numeric columns to zero mean and unit variance
//! - **Reports**: produces the two-line removed/changed percentage report
//!
//! Column roles are declared up front in a [`SurveySchema`]; nothing is
//! inferred from the data.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use survey_processing::{CsvSource, Pipeline, TableSource};
//!
//! let df = CsvSource::new("survey.csv").fetch()?;
//!
//! let outcome = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//!
//! println!("{}", outcome.report);
//! ```
//!
//! # Configuration
//!
//! Use [`CleaningConfig`] to change the column names, the validation limits
//! or the denominator of the changed-data percentage:
//!
//! ```rust,ignore
//! use survey_processing::{ChangeBase, CleaningConfig};
//!
//! let config = CleaningConfig::builder()
//!     .max_trip_hours(10)
//!     .change_base(ChangeBase::RowsRemaining)
//!     .build()?;
//! ```
//!
//! # Sources and Sinks
//!
//! Tables are read through [`TableSource`] and written through
//! [`TableSink`]. CSV files are always supported; Google Sheets adapters are
//! available with the `sheets` feature (enabled by default). They accept an
//! access token or a service-account key.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod reporting;
pub mod scaling;
pub mod schema;
pub mod source;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{RowValidator, TripTime};
pub use config::{ChangeBase, CleaningConfig, CleaningConfigBuilder, ConfigValidationError};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use imputers::{ColumnImputation, ColumnStatistic, ImputationStatistics, StatisticalImputer};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use reporting::{ChangeAccountant, ChangeMask, CleaningReport, ColumnChanges};
pub use scaling::{ColumnScale, Standardizer};
pub use schema::SurveySchema;
pub use source::{CsvSink, CsvSource, TableSink, TableSource, write_report};
#[cfg(feature = "sheets")]
pub use source::{ServiceAccountKey, SheetConfig, SheetCredentials, SheetSink, SheetSource};
pub use types::{CleaningOutcome, CleaningSummary};
