//! CSV file source and sink.

use super::{TableSink, TableSource};
use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, info};

/// Rows used to infer column types.
const INFER_SCHEMA_ROWS: usize = 100;

/// Reads a table from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSource for CsvSource {
    /// Load the file, retrying without blank lines when polars rejects it.
    ///
    /// Quoted fields are never rewritten.
    fn fetch(&self) -> Result<DataFrame> {
        match CsvReadOptions::default()
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()
        {
            Ok(df) => {
                info!("Loaded {:?} from {}", df.shape(), self.path.display());
                return Ok(df);
            }
            Err(e) => {
                debug!("Standard loading failed: {}", e);
            }
        }

        let content = fs::read_to_string(&self.path)?;
        let df = read_csv_bytes(drop_blank_lines(&content).into_bytes())
            .context(format!("Reading {}", self.path.display()))?;
        info!(
            "Loaded {:?} from {} after dropping blank lines",
            df.shape(),
            self.path.display()
        );
        Ok(df)
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

/// Writes a table as CSV with a header row, `,` separators and `"` quotes.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSink for CsvSink {
    fn push(&self, df: &mut DataFrame) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&self.path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .context(format!("Writing {}", self.path.display()))?;

        info!("Saved {:?} to {}", df.shape(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

/// Parse CSV content held in memory.
pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Render a table as CSV in memory.
pub fn write_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    Ok(buffer)
}

/// Drop whitespace-only lines.
fn drop_blank_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("survey-csv-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_read_csv_bytes() {
        let csv = "Wiek,Płeć,Czas Początkowy Podróży\n30,F,08:00\n,M,09:15\n";
        let df = read_csv_bytes(csv.as_bytes().to_vec()).unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("Wiek").unwrap().null_count(), 1);
        assert_eq!(
            df.column("Czas Początkowy Podróży").unwrap().dtype(),
            &DataType::String
        );
    }

    #[test]
    fn test_sink_then_source() {
        let path = temp_path("nested/out.csv");
        let mut df = df![
            "Wiek" => [-1.0, 1.0],
            "Cel Podróży" => ["Praca, dom", "Wakacje"],
        ]
        .unwrap();

        CsvSink::new(&path).push(&mut df).unwrap();
        let loaded = CsvSource::new(&path).fetch().unwrap();

        assert_eq!(loaded.shape(), (2, 2));
        let purposes: Vec<Option<&str>> = loaded
            .column("Cel Podróży")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(purposes, vec![Some("Praca, dom"), Some("Wakacje")]);

        fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn test_write_csv_bytes_has_header() {
        let mut df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();
        let text = String::from_utf8(write_csv_bytes(&mut df).unwrap()).unwrap();
        assert_eq!(text.lines().next(), Some("a,b"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_missing_file_fails() {
        let result = CsvSource::new("/definitely/not/here.csv").fetch();
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_blank_lines_keeps_quotes() {
        let cleaned = drop_blank_lines("a,b\n\n\"say \"\"hi\"\"\",1\n   \n");
        assert_eq!(cleaned, "a,b\n\"say \"\"hi\"\"\",1");
    }

    #[test]
    fn test_escaped_quotes_pass_through() {
        let dir = std::env::temp_dir().join(format!("survey-csv-quotes-{}", std::process::id()));
        let path = dir.join("in.csv");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, "Id,Uwagi\n1,\"say \"\"hi\"\"\"\n2,plain\n").unwrap();

        let loaded = CsvSource::new(&path).fetch().unwrap();
        let notes: Vec<Option<&str>> = loaded
            .column("Uwagi")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(notes, vec![Some("say \"hi\""), Some("plain")]);

        fs::remove_dir_all(&dir).ok();
    }
}
