//! Where survey tables come from and where cleaned tables go.
//!
//! The pipeline itself only sees a [`DataFrame`]. This module holds the
//! adapters around it:
//!
//! - [`CsvSource`] / [`CsvSink`] - local CSV files
//! - [`SheetSource`] / [`SheetSink`] - a Google spreadsheet (feature `sheets`),
//!   authenticated with [`SheetCredentials`]
//!
//! Implement [`TableSource`] or [`TableSink`] to plug in another storage.

#[cfg(feature = "sheets")]
mod credentials;
mod csv;
#[cfg(feature = "sheets")]
mod sheets;

pub use csv::{CsvSink, CsvSource, read_csv_bytes, write_csv_bytes};
#[cfg(feature = "sheets")]
pub use credentials::{SHEETS_SCOPES, ServiceAccountKey, SheetCredentials};
#[cfg(feature = "sheets")]
pub use sheets::{SheetConfig, SheetConfigBuilder, SheetSink, SheetSource};

use crate::error::Result;
use crate::reporting::CleaningReport;
use polars::prelude::*;
use std::path::Path;

/// Something a survey table can be loaded from.
pub trait TableSource {
    /// Load the whole table.
    fn fetch(&self) -> Result<DataFrame>;

    /// Short description for log messages.
    fn describe(&self) -> String;
}

/// Something a cleaned table can be written to.
pub trait TableSink {
    /// Write the whole table, replacing previous content.
    fn push(&self, df: &mut DataFrame) -> Result<()>;

    /// Short description for log messages.
    fn describe(&self) -> String;
}

/// Write the two-line text report to `path`.
pub fn write_report(path: &Path, report: &CleaningReport) -> Result<()> {
    report.write_text(path)
}
