use crate::imputers::ImputationStatistics;
use crate::reporting::CleaningReport;
use crate::scaling::ColumnScale;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// Validated, imputed and standardized table.
    pub data: DataFrame,
    pub report: CleaningReport,
    /// Fill values fitted on the validated table.
    pub statistics: ImputationStatistics,
    /// Standardization parameters, one per rescaled column.
    pub scales: Vec<ColumnScale>,
    /// Original position of every surviving row.
    pub kept_rows: Vec<usize>,
    /// Human-readable log of what each stage did.
    pub processing_steps: Vec<String>,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
}

impl CleaningOutcome {
    /// Serializable view of the run, without the table itself.
    pub fn summary(&self) -> CleaningSummary {
        CleaningSummary {
            success: true,
            rows: self.data.height(),
            columns: self.data.width(),
            report: Some(self.report.clone()),
            statistics: Some(self.statistics.clone()),
            scales: self.scales.clone(),
            processing_steps: self.processing_steps.clone(),
            duration_ms: self.duration_ms,
            error: None,
        }
    }
}

/// JSON-friendly result of a pipeline run, as printed by `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub success: bool,
    pub rows: usize,
    pub columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CleaningReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ImputationStatistics>,
    pub scales: Vec<ColumnScale>,
    pub processing_steps: Vec<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl CleaningSummary {
    /// Summary of a failed run carrying the serialized error.
    pub fn failed(error: serde_json::Value) -> Self {
        Self {
            success: false,
            rows: 0,
            columns: 0,
            report: None,
            statistics: None,
            scales: Vec::new(),
            processing_steps: Vec::new(),
            duration_ms: 0,
            error: Some(error),
        }
    }
}
