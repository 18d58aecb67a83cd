//! CLI entry point for the survey cleaning pipeline.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use survey_processing::{
    ChangeBase, CleaningConfig, CleaningOutcome, CleaningSummary, CsvSink, CsvSource, Pipeline,
    TableSink, TableSource, write_report,
};
use tracing::{error, info};

#[cfg(feature = "sheets")]
use survey_processing::{SheetCredentials, SheetSink, SheetSource};

/// Environment variable holding the spreadsheet to read when no input is given.
const SHEET_ID_VAR: &str = "SURVEY_SHEET_ID";

/// Environment variable holding a Google access token. Takes precedence over
/// the service-account key.
#[cfg(feature = "sheets")]
const TOKEN_VAR: &str = "GOOGLE_SHEETS_TOKEN";

/// Environment variable holding a service-account JSON key (content or path).
#[cfg(feature = "sheets")]
const CRED_VAR: &str = "GOOGLE_SHEETS_CRED";

/// CLI-compatible change base enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliChangeBase {
    /// Divide changed cells by the number of removed rows
    RowsRemoved,
    /// Divide changed cells by the number of remaining rows
    RowsRemaining,
    /// Divide changed cells by the number of imputed cells examined
    ImputedCells,
}

impl From<CliChangeBase> for ChangeBase {
    fn from(cli: CliChangeBase) -> Self {
        match cli {
            CliChangeBase::RowsRemoved => ChangeBase::RowsRemoved,
            CliChangeBase::RowsRemaining => ChangeBase::RowsRemaining,
            CliChangeBase::ImputedCells => ChangeBase::ImputedCells,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Travel Survey Cleaning Pipeline",
    long_about = "Validates, imputes and standardizes travel survey responses.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  SURVEY_SHEET_ID        Spreadsheet to read when neither --input nor --sheet-id is given\n  \
                  GOOGLE_SHEETS_TOKEN    Access token for private sheets and uploads\n  \
                  GOOGLE_SHEETS_CRED     Service-account JSON key (content or path), used without a token\n\n\
                  EXAMPLES:\n  \
                  # Clean a local file\n  \
                  survey-processing -i survey.csv\n\n  \
                  # Read from a sheet and upload the result to another one\n  \
                  survey-processing --sheet-id SRC_ID --upload-sheet-id DST_ID\n\n  \
                  # Seed a sheet with a raw export, without cleaning\n  \
                  survey-processing --upload-raw survey.csv --upload-sheet-id DST_ID\n\n  \
                  # Machine-readable output\n  \
                  survey-processing -i survey.csv --json"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long, conflicts_with = "sheet_id")]
    input: Option<PathBuf>,

    /// Google spreadsheet id to download the survey from
    #[arg(long)]
    sheet_id: Option<String>,

    /// Path of the cleaned CSV file
    #[arg(short, long, default_value = "cleaned_data.csv")]
    output: PathBuf,

    /// Path of the two-line text report
    #[arg(long, default_value = "report.txt")]
    report: PathBuf,

    /// Also write the report as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Log file, truncated on every run
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    /// Google spreadsheet id to upload the cleaned table to
    #[arg(long)]
    upload_sheet_id: Option<String>,

    /// Upload this CSV file unchanged to --upload-sheet-id and exit
    #[arg(long, requires = "upload_sheet_id", conflicts_with_all = ["input", "sheet_id"])]
    upload_raw: Option<PathBuf>,

    /// JSON file with a cleaning configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Denominator of the changed-data percentage (overrides --config)
    #[arg(long, value_enum)]
    change_base: Option<CliChangeBase>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables console logs; only outputs the final JSON summary.
    /// Useful for piping to other tools: `... --json | jq .report`
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber.
///
/// Events go to stderr and to the log file. With `--json` the console layer
/// is left out so stdout only carries the JSON summary.
fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let effective_level = if args.quiet { "warn" } else { args.log_level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("Cannot create log file {}", args.log_file.display()))?;
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    let console_layer = (!args.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    // Load .env before reading any environment variable
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args)?;

    if let Some(raw) = &args.upload_raw {
        return upload_raw_csv(&args, raw);
    }

    let config = load_config(&args)?;

    let source = open_source(&args)?;
    info!("Loading survey from {}", source.describe());
    let data = source.fetch()?;
    info!("Survey loaded: {:?}", data.shape());

    let pipeline = build_pipeline(&args, config)?;

    info!("{}", "=".repeat(80));
    info!("Starting survey cleaning pipeline...");
    info!("{}", "=".repeat(80));

    let original_shape = data.shape();
    match pipeline.process(data) {
        Ok(outcome) => handle_pipeline_output(outcome, original_shape, &args),
        Err(e) => {
            if args.json {
                let summary = CleaningSummary::failed(serde_json::to_value(&e)?);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            error!("Pipeline failed: {}", e);
            if e.is_data_error() {
                error!("The input table does not match the survey layout; check the column names and values");
            }
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Load the configuration file if given and apply CLI overrides.
fn load_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file {}", path.display()))?;
            let config = CleaningConfig::from_json(&json)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => CleaningConfig::default(),
    };

    if let Some(base) = args.change_base {
        config.change_base = base.into();
    }

    Ok(config)
}

/// Pick the survey source: `--input`, then `--sheet-id`, then `SURVEY_SHEET_ID`.
fn open_source(args: &Args) -> Result<Box<dyn TableSource>> {
    if let Some(path) = &args.input {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
        return Ok(Box::new(CsvSource::new(path)));
    }

    let sheet_id = args
        .sheet_id
        .clone()
        .or_else(|| env::var(SHEET_ID_VAR).ok())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| anyhow!("No input given: pass --input, --sheet-id or set {}", SHEET_ID_VAR))?;

    open_sheet_source(sheet_id)
}

/// Credentials from `GOOGLE_SHEETS_TOKEN`, else from `GOOGLE_SHEETS_CRED`.
#[cfg(feature = "sheets")]
fn sheet_credentials() -> Result<SheetCredentials> {
    if let Ok(token) = env::var(TOKEN_VAR)
        && !token.trim().is_empty()
    {
        return Ok(SheetCredentials::access_token(token));
    }

    let Some(value) = env::var(CRED_VAR).ok().filter(|v| !v.trim().is_empty()) else {
        return Ok(SheetCredentials::Anonymous);
    };
    let json = if value.trim_start().starts_with('{') {
        value
    } else {
        fs::read_to_string(value.trim())
            .with_context(|| format!("Cannot read {} file {}", CRED_VAR, value.trim()))?
    };
    let credentials = SheetCredentials::service_account(&json)
        .with_context(|| format!("Invalid service-account key in {}", CRED_VAR))?;
    info!("Using service-account credentials from {}", CRED_VAR);
    Ok(credentials)
}

#[cfg(feature = "sheets")]
fn open_sheet_source(sheet_id: String) -> Result<Box<dyn TableSource>> {
    let credentials = sheet_credentials()?;
    if credentials.is_anonymous() {
        tracing::warn!(
            "Neither {} nor {} set; the sheet must be publicly readable",
            TOKEN_VAR,
            CRED_VAR
        );
    }
    Ok(Box::new(SheetSource::new(sheet_id, credentials)?))
}

#[cfg(not(feature = "sheets"))]
fn open_sheet_source(sheet_id: String) -> Result<Box<dyn TableSource>> {
    bail!(
        "Cannot read sheet {}: Google Sheets support not compiled in (enable the \"sheets\" feature)",
        sheet_id
    )
}

#[cfg(feature = "sheets")]
fn upload_to_sheet(sheet_id: &str, outcome: &mut CleaningOutcome) -> Result<()> {
    let sink = SheetSink::new(sheet_id, sheet_credentials()?)?;
    info!("Uploading cleaned table to {}", sink.describe());
    sink.push(&mut outcome.data)?;
    Ok(())
}

#[cfg(not(feature = "sheets"))]
fn upload_to_sheet(sheet_id: &str, _outcome: &mut CleaningOutcome) -> Result<()> {
    bail!(
        "Cannot upload to sheet {}: Google Sheets support not compiled in (enable the \"sheets\" feature)",
        sheet_id
    )
}

/// Replace the content of `--upload-sheet-id` with the raw CSV file.
#[cfg(feature = "sheets")]
fn upload_raw_csv(args: &Args, path: &Path) -> Result<()> {
    let sheet_id = args
        .upload_sheet_id
        .as_deref()
        .ok_or_else(|| anyhow!("--upload-raw needs --upload-sheet-id"))?;
    let content =
        fs::read(path).with_context(|| format!("Cannot read raw CSV {}", path.display()))?;

    let sink = SheetSink::new(sheet_id, sheet_credentials()?)?;
    info!("Uploading {} unchanged to {}", path.display(), sink.describe());
    sink.push_csv(content)?;
    info!("Raw upload complete");
    Ok(())
}

#[cfg(not(feature = "sheets"))]
fn upload_raw_csv(_args: &Args, path: &Path) -> Result<()> {
    bail!(
        "Cannot upload {}: Google Sheets support not compiled in (enable the \"sheets\" feature)",
        path.display()
    )
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Write the cleaned table and the report, then print the summary.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no console logs)
fn handle_pipeline_output(
    mut outcome: CleaningOutcome,
    original_shape: (usize, usize),
    args: &Args,
) -> Result<()> {
    CsvSink::new(&args.output).push(&mut outcome.data)?;
    write_report(&args.report, &outcome.report)?;
    if let Some(path) = &args.report_json {
        outcome.report.write_json(path)?;
    }

    if let Some(sheet_id) = &args.upload_sheet_id {
        upload_to_sheet(sheet_id, &mut outcome)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
        return Ok(());
    }

    print_human_readable_summary(&outcome, original_shape, args);
    Ok(())
}

/// Print a human-readable summary of the cleaning results.
///
/// Uses `println!` on purpose: this is the command's output, not a log.
fn print_human_readable_summary(
    outcome: &CleaningOutcome,
    original_shape: (usize, usize),
    args: &Args,
) {
    let report = &outcome.report;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} rows x {} columns",
        original_shape.0, original_shape.1
    );
    println!(
        "Output: {} ({} rows x {} columns)",
        args.output.display(),
        outcome.data.height(),
        outcome.data.width()
    );
    println!("Report: {}", args.report.display());
    if let Some(path) = &args.report_json {
        println!("JSON report: {}", path.display());
    }
    println!();

    println!("{}", report);
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", outcome.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed)",
        report.rows_before, report.rows_after, report.rows_removed
    );
    println!("  Changed cells: {}", report.changed_cells);
    for column in report.changed_by_column.iter().filter(|c| c.changed > 0) {
        println!("    {}: {}", column.column, column.changed);
    }
    println!();

    if !outcome.processing_steps.is_empty() {
        println!("Actions Taken:");
        for step in &outcome.processing_steps {
            println!("  - {}", step);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
