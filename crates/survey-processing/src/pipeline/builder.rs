//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the survey cleaning workflow.

use crate::cleaner::RowValidator;
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::pipeline::progress::{
    CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{ChangeAccountant, CleaningReport};
use crate::scaling::Standardizer;
use crate::types::CleaningOutcome;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Share of removed rows above which a warning is logged.
const HIGH_LOSS_PERCENTAGE: f64 = 30.0;

/// The survey cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use survey_processing::{CleaningConfig, Pipeline};
///
/// let outcome = Pipeline::builder()
///     .config(CleaningConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("{}", outcome.report);
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The validated configuration this pipeline runs with.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run validation, imputation, change accounting and standardization
    /// over `df`, in that order.
    ///
    /// Any failure aborts the run; nothing is returned for a partial run.
    /// Parse errors report the row position in `df`, not in the filtered
    /// table.
    pub fn process(&self, df: DataFrame) -> Result<CleaningOutcome> {
        match self.process_internal(df) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let start_time = Instant::now();
        let schema = &self.config.schema;

        info!("Starting cleaning pipeline...");
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Starting cleaning pipeline...",
        ));

        schema.check(&df).context("Checking survey columns")?;
        let rows_before = df.height();
        debug!("Input shape: ({}, {})", rows_before, df.width());

        let mut processing_steps: Vec<String> = Vec::new();

        // Step 1: Row validation
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Validation,
            0.0,
            "Validating travel times...",
        ));
        info!("Step 1: Validating travel times...");

        let (validated, kept_rows) = RowValidator::from_config(&self.config)
            .filter(&df, &schema.start_time, &schema.end_time)
            .context("During row validation")?;

        let rows_removed = rows_before - validated.height();
        processing_steps.push(format!(
            "Removed {} of {} rows with invalid travel times",
            rows_removed, rows_before
        ));

        if rows_before > 0 {
            let removed_percentage = rows_removed as f64 / rows_before as f64 * 100.0;
            if removed_percentage > HIGH_LOSS_PERCENTAGE {
                warn!(
                    "High data loss: {:.1}% of rows were removed",
                    removed_percentage
                );
            }
        }

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Validation,
            1.0,
            format!("Kept {} of {} rows", validated.height(), rows_before),
        ));

        // Step 2: Imputation. `validated` stays untouched as the snapshot
        // the accountant compares against.
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Imputation,
            0.0,
            "Imputing missing values...",
        ));
        info!("Step 2: Imputing missing values...");

        let (imputed, statistics) = StatisticalImputer::from_schema(schema)
            .fit_transform(validated.clone(), &mut processing_steps)
            .map_err(|e| e.at_original_row(&kept_rows).with_context("During imputation"))?;

        let total = statistics.columns.len();
        for (i, column) in statistics.columns.iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                CleaningStage::Imputation,
                format!("Column: {}", column.column),
                i + 1,
                total,
                format!(
                    "Filled {} missing values in '{}'",
                    column.missing_count, column.column
                ),
            ));
        }

        // Step 3: Change accounting
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Accounting,
            0.0,
            "Counting changed cells...",
        ));
        info!("Step 3: Counting changed cells...");

        let changes = ChangeAccountant::from_schema(schema)
            .diff(&validated, &imputed)
            .context("During change accounting")?;

        let report = CleaningReport::new(rows_before, rows_removed, &changes, self.config.change_base);
        debug!(
            "{} changed cells, {:.2}% removed, {:.2}% changed",
            report.changed_cells, report.removed_percentage, report.changed_percentage
        );

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Accounting,
            1.0,
            format!("{} cells changed by imputation", report.changed_cells),
        ));

        // Step 4: Standardization
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Standardization,
            0.0,
            "Standardizing numeric columns...",
        ));
        info!("Step 4: Standardizing numeric columns...");

        let columns = schema
            .standardized_columns()
            .into_iter()
            .map(str::to_string)
            .collect();
        let (data, scales) = Standardizer::new(columns)
            .fit_transform(imputed, &mut processing_steps)
            .map_err(|e| {
                e.at_original_row(&kept_rows)
                    .with_context("During standardization")
            })?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Standardization,
            1.0,
            format!("Standardized {} columns", scales.len()),
        ));

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Cleaning finished in {}ms: {} rows kept, {} removed",
            duration_ms,
            data.height(),
            rows_removed
        );

        Ok(CleaningOutcome {
            data,
            report,
            statistics,
            scales,
            kept_rows,
            processing_steps,
            duration_ms,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use survey_processing::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct StageLogger;
    ///
    /// impl ProgressReporter for StageLogger {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         tracing::info!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(StageLogger))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
