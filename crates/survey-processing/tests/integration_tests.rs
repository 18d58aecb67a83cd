//! Integration tests for the survey cleaning pipeline.
//!
//! These tests run the whole pipeline over the CSV fixtures and check the
//! cleaned table, the fitted statistics and the text report.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use survey_processing::schema::{
    AGE, AVERAGE_INCOME, EDUCATION, END_TIME, GENDER, START_TIME, TRAVEL_PURPOSE,
};
use survey_processing::{
    ChangeBase, CleaningConfig, CleaningError, CleaningOutcome, CleaningStage, ColumnStatistic,
    CsvSink, CsvSource, Pipeline, ProgressUpdate, TableSink, TableSource, write_report,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    CsvSource::new(fixtures_path().join(filename))
        .fetch()
        .expect("Failed to read CSV file")
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("survey-it-{}-{}", name, std::process::id()))
}

fn run(df: DataFrame, config: CleaningConfig) -> CleaningOutcome {
    Pipeline::builder()
        .config(config)
        .build()
        .expect("Config should be valid")
        .process(df)
        .expect("Pipeline should complete successfully")
}

fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn assert_standardized(values: &[Option<f64>]) {
    let xs: Vec<f64> = values.iter().flatten().copied().collect();
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let std = (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    assert!(mean.abs() < 1e-6, "mean was {mean}");
    assert!((std - 1.0).abs() < 1e-6, "std was {std}");
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_full_pipeline_survey_sample() {
    let outcome = run(load_csv("survey_sample.csv"), CleaningConfig::default());

    // 25:00 start, 13 hour trip, missing start and "8:xx" are dropped
    assert_eq!(outcome.kept_rows, vec![0, 1, 2, 4, 8, 9]);
    assert_eq!(outcome.data.height(), 6);
    assert_eq!(
        outcome.report.to_text(),
        "Procent usunietych danych: 40.00%\nProcent zmienionych danych: 125.00%"
    );
    assert_eq!(outcome.report.changed_cells, 5);
}

#[test]
fn test_survey_sample_statistics() {
    let outcome = run(load_csv("survey_sample.csv"), CleaningConfig::default());
    let stats = &outcome.statistics;

    match stats.get(AGE) {
        Some(ColumnStatistic::Mean(mean)) => assert!((mean - 43.4).abs() < 1e-9),
        other => panic!("unexpected age statistic: {other:?}"),
    }
    assert_eq!(stats.get(AVERAGE_INCOME), Some(&ColumnStatistic::Mean(4925.0)));
    assert_eq!(stats.get(GENDER), Some(&ColumnStatistic::Mode("M".to_string())));
    assert_eq!(
        stats.get(EDUCATION),
        Some(&ColumnStatistic::Mode("Wyższe".to_string()))
    );
    assert_eq!(stats.missing_count(), 5);
}

#[test]
fn test_survey_sample_output_columns() {
    let outcome = run(load_csv("survey_sample.csv"), CleaningConfig::default());
    let data = &outcome.data;

    // No missing values remain in imputed columns
    for name in [AGE, AVERAGE_INCOME, GENDER, EDUCATION, TRAVEL_PURPOSE] {
        assert_eq!(data.column(name).unwrap().null_count(), 0, "{name}");
    }

    assert_standardized(&f64_values(data, AGE));
    assert_standardized(&f64_values(data, AVERAGE_INCOME));

    // Imputed cells hold the statistic
    assert_eq!(str_values(data, GENDER)[5], Some("M".to_string()));
    assert_eq!(str_values(data, EDUCATION)[3], Some("Wyższe".to_string()));

    // Undeclared and time columns pass through untouched
    let ids: Vec<Option<f64>> = f64_values(data, "Id");
    assert_eq!(
        ids,
        vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0), Some(9.0), Some(10.0)]
    );
    assert_eq!(str_values(data, START_TIME)[2], Some("23:00".to_string()));
    assert_eq!(str_values(data, END_TIME)[2], Some("02:00".to_string()));
}

// ============================================================================
// Two-Row Scenario
// ============================================================================

#[test]
fn test_scenario_literal_change_base() {
    let outcome = run(load_csv("scenario.csv"), CleaningConfig::default());

    assert_eq!(outcome.data.height(), 2);
    assert_eq!(outcome.statistics.get(AGE), Some(&ColumnStatistic::Mean(30.0)));
    assert_eq!(
        str_values(&outcome.data, GENDER),
        vec![Some("F".to_string()), Some("F".to_string())]
    );
    assert_eq!(outcome.report.changed_cells, 2);
    // No rows were dropped, so the literal denominator is zero
    assert_eq!(
        outcome.report.to_text(),
        "Procent usunietych danych: 0.00%\nProcent zmienionych danych: 0.00%"
    );
}

#[test]
fn test_scenario_rows_remaining_change_base() {
    let config = CleaningConfig::builder()
        .change_base(ChangeBase::RowsRemaining)
        .build()
        .unwrap();
    let outcome = run(load_csv("scenario.csv"), config);

    assert_eq!(
        outcome.report.to_text(),
        "Procent usunietych danych: 0.00%\nProcent zmienionych danych: 100.00%"
    );

    // Both ages equal 30 after imputation, and constant income, so both
    // standardize to zero
    assert_eq!(f64_values(&outcome.data, AGE), vec![Some(0.0), Some(0.0)]);
    assert_eq!(
        f64_values(&outcome.data, AVERAGE_INCOME),
        vec![Some(0.0), Some(0.0)]
    );
}

// ============================================================================
// Custom Configuration
// ============================================================================

#[test]
fn test_custom_schema_from_json() {
    let json = std::fs::read_to_string(fixtures_path().join("english_config.json")).unwrap();
    let config = CleaningConfig::from_json(&json).unwrap();
    let outcome = run(load_csv("english_survey.csv"), config);

    // 07:00 -> 15:00 exceeds the 6 hour limit
    assert_eq!(outcome.kept_rows, vec![0, 2, 3]);
    assert_eq!(
        outcome.report.to_text(),
        "Procent usunietych danych: 25.00%\nProcent zmienionych danych: 100.00%"
    );
    assert_eq!(
        outcome.statistics.get("purpose"),
        Some(&ColumnStatistic::Mode("Leisure".to_string()))
    );
    assert_eq!(outcome.statistics.get("income"), Some(&ColumnStatistic::Mean(4000.0)));

    // Extra numeric columns are standardized but keep their gaps
    assert_eq!(
        f64_values(&outcome.data, "distance_km"),
        vec![Some(-1.0), None, Some(1.0)]
    );
    assert_eq!(outcome.scales.len(), 3);
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_parse_error_reports_original_row() {
    let result = Pipeline::builder()
        .build()
        .unwrap()
        .process(load_csv("bad_age.csv"));

    let err = result.unwrap_err();
    assert_eq!(err.error_code(), "PARSE_ERROR");
    let message = err.to_string();
    assert!(message.contains("'abc'"), "{message}");
    assert!(message.contains("row 2"), "{message}");
    assert!(err.is_data_error());
}

#[test]
fn test_missing_column_fails_before_processing() {
    let updates = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
    let updates_clone = updates.clone();

    let df = load_csv("survey_sample.csv").drop(TRAVEL_PURPOSE).unwrap();
    let result = Pipeline::builder()
        .on_progress(move |update| updates_clone.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process(df);

    assert!(matches!(
        result,
        Err(CleaningError::WithContext { ref source, .. })
            if matches!(**source, CleaningError::ColumnNotFound(ref c) if c == TRAVEL_PURPOSE)
    ));

    let stages: Vec<CleaningStage> = updates.lock().unwrap().iter().map(|u| u.stage).collect();
    assert_eq!(stages, vec![CleaningStage::Initializing, CleaningStage::Failed]);
}

// ============================================================================
// Progress Reporting
// ============================================================================

#[test]
fn test_progress_is_monotonic_and_completes() {
    let updates = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
    let updates_clone = updates.clone();

    Pipeline::builder()
        .on_progress(move |update| updates_clone.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process(load_csv("survey_sample.csv"))
        .unwrap();

    let updates = updates.lock().unwrap();
    assert!(updates.len() >= 10);
    assert_eq!(updates.last().map(|u| u.stage), Some(CleaningStage::Complete));

    for pair in updates.windows(2) {
        assert!(
            pair[1].progress + 1e-6 >= pair[0].progress,
            "progress went back from {} to {}",
            pair[0].progress,
            pair[1].progress
        );
    }
}

// ============================================================================
// Round Trips Through Files
// ============================================================================

#[test]
fn test_rerun_on_cleaned_output_is_stable() {
    let dir = temp_dir("rerun");
    let output = dir.join("cleaned_data.csv");

    let mut first = run(load_csv("survey_sample.csv"), CleaningConfig::default());
    CsvSink::new(&output).push(&mut first.data).unwrap();

    let reloaded = CsvSource::new(&output).fetch().unwrap();
    let second = run(reloaded, CleaningConfig::default());

    assert_eq!(second.data.height(), first.data.height());
    assert_eq!(second.report.rows_removed, 0);
    assert_eq!(second.report.changed_cells, 0);

    for name in [AGE, AVERAGE_INCOME] {
        let before = f64_values(&first.data, name);
        let after = f64_values(&second.data, name);
        for (a, b) in before.iter().zip(&after) {
            let (a, b) = (a.unwrap(), b.unwrap());
            assert!((a - b).abs() < 1e-6, "{name}: {a} vs {b}");
        }
    }
    assert_eq!(
        str_values(&second.data, GENDER),
        str_values(&first.data, GENDER)
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_write_report_file() {
    let dir = temp_dir("report");
    let path = dir.join("report.txt");

    let outcome = run(load_csv("survey_sample.csv"), CleaningConfig::default());
    write_report(&path, &outcome.report).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Procent usunietych danych: 40.00%");
    assert!(lines[1].starts_with("Procent zmienionych danych: "));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_write_json_report_file() {
    let dir = temp_dir("report-json");
    let path = dir.join("report.json");

    let outcome = run(load_csv("survey_sample.csv"), CleaningConfig::default());
    outcome.report.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["rows_before"].as_u64(), Some(10));
    assert_eq!(json["rows_removed"].as_u64(), Some(4));
    assert_eq!(json["changed_cells"].as_u64(), Some(5));
    assert!((json["removed_percentage"].as_f64().unwrap() - 40.0).abs() < 1e-9);

    std::fs::remove_dir_all(&dir).ok();
}
