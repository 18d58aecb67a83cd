//! Shared utilities for the cleaning pipeline.
//!
//! Helpers for reading typed cell values out of a Series and computing the
//! column statistics the imputer and standardizer share.

use crate::error::{CleaningError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check whether a string cell counts as missing.
#[inline]
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// =============================================================================
// Cell Extraction
// =============================================================================

/// Read a column as optional `f64` values.
///
/// Nulls, blank strings and `NaN` become `None`. A string that does not parse
/// as a number fails with [`CleaningError::Parse`] carrying the row position
/// within `series`.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let column = series.name().to_string();
    let dtype = series.dtype();

    let values: Vec<Option<f64>> = if is_numeric_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().collect()
    } else if matches!(dtype, DataType::Null) {
        vec![None; series.len()]
    } else if matches!(dtype, DataType::String) {
        let mut values = Vec::with_capacity(series.len());
        for (row, cell) in series.str()?.into_iter().enumerate() {
            let value = match cell {
                Some(text) if !is_blank(text) => {
                    let parsed = text.trim().parse::<f64>().map_err(|_| CleaningError::Parse {
                        column: column.clone(),
                        row,
                        value: text.to_string(),
                    })?;
                    Some(parsed)
                }
                _ => None,
            };
            values.push(value);
        }
        values
    } else {
        return Err(CleaningError::TypeConversionFailed {
            column,
            target_type: "Float64".to_string(),
            reason: format!("unsupported dtype {}", dtype),
        });
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a column as optional strings, treating blank strings as missing.
///
/// Present values are kept verbatim (no trimming).
pub fn categorical_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|cell| cell.filter(|text| !is_blank(text)).map(str::to_string))
        .collect())
}

/// Read a column as optional strings without blank normalization.
pub fn raw_string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|cell| cell.map(str::to_string))
        .collect())
}

// =============================================================================
// Statistics
// =============================================================================

/// Mean of the present values, `None` when there are none.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    Series::new(PlSmallStr::EMPTY, values).mean()
}

/// Population standard deviation (ddof = 0) of the present values around `mean`.
pub fn population_std(values: &[Option<f64>], mean: f64) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / present.len() as f64;
    Some(variance.sqrt())
}

/// Most frequent present value.
///
/// Ties resolve to the lexicographically smallest value so repeated runs
/// always pick the same fill value.
pub fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    // BTreeMap iterates in ascending key order; keep the first maximum.
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

// =============================================================================
// Tests
// =============================================================================
