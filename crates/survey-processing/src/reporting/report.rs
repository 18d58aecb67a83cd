use crate::config::ChangeBase;
use crate::error::Result;
use crate::reporting::accountant::{ChangeMask, ColumnChanges};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Label of the removed-rows line of the text report.
pub const REMOVED_LABEL: &str = "Procent usunietych danych";
/// Label of the changed-cells line of the text report.
pub const CHANGED_LABEL: &str = "Procent zmienionych danych";

/// Summary of how much data one pipeline run removed and altered.
///
/// The `Display` form is the two-line text report consumed downstream:
///
/// ```text
/// Procent usunietych danych: 12.50%
/// Procent zmienionych danych: 40.00%
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Rows in the input table
    pub rows_before: usize,
    /// Rows dropped by validation
    pub rows_removed: usize,
    /// Rows in the cleaned table
    pub rows_after: usize,
    /// Imputed cells whose value changed
    pub changed_cells: usize,
    /// Changed cells per imputed column
    pub changed_by_column: Vec<ColumnChanges>,
    /// Denominator used for `changed_percentage`
    pub change_base: ChangeBase,
    /// `rows_removed / rows_before`, in percent
    pub removed_percentage: f64,
    /// `changed_cells / denominator`, in percent
    pub changed_percentage: f64,
}

impl CleaningReport {
    /// Build the report from the validation counts and the imputation diff.
    ///
    /// A zero denominator gives 0%.
    pub fn new(
        rows_before: usize,
        rows_removed: usize,
        changes: &ChangeMask,
        change_base: ChangeBase,
    ) -> Self {
        let rows_after = rows_before.saturating_sub(rows_removed);
        let changed_cells = changes.changed_count();

        let denominator = match change_base {
            ChangeBase::RowsRemoved => rows_removed,
            ChangeBase::RowsRemaining => rows_after,
            ChangeBase::ImputedCells => changes.cell_count(),
        };

        Self {
            generated_at: Local::now().to_rfc3339(),
            rows_before,
            rows_removed,
            rows_after,
            changed_cells,
            changed_by_column: changes.columns.clone(),
            change_base,
            removed_percentage: percentage(rows_removed, rows_before),
            changed_percentage: percentage(changed_cells, denominator),
        }
    }

    /// The two-line text report.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Write the text report to `path`, creating parent directories.
    pub fn write_text(&self, path: &Path) -> Result<()> {
        write_file(path, self.to_text().as_bytes())?;
        info!("Report saved: {}", path.display());
        Ok(())
    }

    /// Write the report as pretty JSON to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file(path, json.as_bytes())?;
        info!("JSON report saved: {}", path.display());
        Ok(())
    }
}

impl fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2}%\n{}: {:.2}%",
            REMOVED_LABEL, self.removed_percentage, CHANGED_LABEL, self.changed_percentage
        )
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content)?;
    Ok(())
}
