//! Change accounting and report generation.
//!
//! [`ChangeAccountant`] compares the validated table with its imputed version
//! and produces a [`ChangeMask`]. [`CleaningReport`] turns the row counts and
//! the mask into the two-line text report, and can also be written as JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_processing::reporting::{ChangeAccountant, CleaningReport};
//!
//! let mask = ChangeAccountant::from_schema(&schema).diff(&validated, &imputed)?;
//! let report = CleaningReport::new(rows_before, rows_removed, &mask, ChangeBase::default());
//! report.write_text(Path::new("report.txt"))?;
//! ```

pub mod accountant;
mod report;

pub use accountant::{ChangeAccountant, ChangeMask, ColumnChanges};
pub use report::{CHANGED_LABEL, CleaningReport, REMOVED_LABEL};
