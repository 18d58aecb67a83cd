//! Before/after diffing of imputed columns.

use crate::error::{CleaningError, Result};
use crate::schema::SurveySchema;
use crate::utils::{categorical_values, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Changed-cell count of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChanges {
    pub column: String,
    pub changed: usize,
}

/// Cell-level change mask over the imputed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMask {
    /// Number of rows compared.
    pub rows: usize,
    /// One entry per imputed column, in schema order.
    pub columns: Vec<ColumnChanges>,
    /// `cells[c][r]` is true when column `c` changed at row `r`.
    #[serde(skip)]
    pub cells: Vec<Vec<bool>>,
}

impl ChangeMask {
    /// Total number of changed cells.
    pub fn changed_count(&self) -> usize {
        self.columns.iter().map(|c| c.changed).sum()
    }

    /// Number of cells compared.
    pub fn cell_count(&self) -> usize {
        self.rows * self.columns.len()
    }
}

/// Compares the validated table with its imputed version.
#[derive(Debug, Clone)]
pub struct ChangeAccountant {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl ChangeAccountant {
    pub fn from_schema(schema: &SurveySchema) -> Self {
        Self {
            numeric: schema.numeric.clone(),
            categorical: schema.categorical.clone(),
        }
    }

    /// Build the change mask between `before` and `after`.
    ///
    /// Both tables must have the same height. Values are compared after
    /// normalization: numeric cells as `f64`, categorical cells as strings,
    /// blanks as missing. A missing cell that received a value is a change.
    pub fn diff(&self, before: &DataFrame, after: &DataFrame) -> Result<ChangeMask> {
        if before.height() != after.height() {
            return Err(CleaningError::Internal(format!(
                "cannot compare tables of {} and {} rows",
                before.height(),
                after.height()
            )));
        }

        let mut columns = Vec::with_capacity(self.numeric.len() + self.categorical.len());
        let mut cells = Vec::with_capacity(columns.capacity());

        for name in &self.numeric {
            let old = numeric_values(before.column(name)?.as_materialized_series())?;
            let new = numeric_values(after.column(name)?.as_materialized_series())?;
            let mask: Vec<bool> = old.iter().zip(&new).map(|(a, b)| a != b).collect();
            columns.push(Self::count(name, &mask));
            cells.push(mask);
        }

        for name in &self.categorical {
            let old = categorical_values(before.column(name)?.as_materialized_series())?;
            let new = categorical_values(after.column(name)?.as_materialized_series())?;
            let mask: Vec<bool> = old.iter().zip(&new).map(|(a, b)| a != b).collect();
            columns.push(Self::count(name, &mask));
            cells.push(mask);
        }

        Ok(ChangeMask {
            rows: before.height(),
            columns,
            cells,
        })
    }

    fn count(name: &str, mask: &[bool]) -> ColumnChanges {
        ColumnChanges {
            column: name.to_string(),
            changed: mask.iter().filter(|changed| **changed).count(),
        }
    }
}
