//! Imputation module for handling missing values.
//!
//! Numeric survey columns are filled with their mean, categorical columns
//! with their most frequent value.

mod statistical;

pub use statistical::{ColumnImputation, ColumnStatistic, ImputationStatistics, StatisticalImputer};
