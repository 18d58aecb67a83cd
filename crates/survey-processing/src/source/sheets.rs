//! Google Sheets source and sink.
//!
//! The spreadsheet is exchanged as CSV: the source downloads the first
//! worksheet through the export endpoint, the sink replaces the file content
//! through the Drive media upload endpoint with conversion enabled.
//! Authentication is described by [`SheetCredentials`].

use super::credentials::SheetCredentials;
use super::csv::{read_csv_bytes, write_csv_bytes};
use super::{TableSink, TableSource};
use crate::error::{CleaningError, Result, ResultExt};
use polars::prelude::*;
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info};

/// Default CSV export endpoint; `{id}` is replaced by the sheet id.
const DEFAULT_EXPORT_URL: &str = "https://docs.google.com/spreadsheets/d/{id}/export?format=csv";

/// Default Drive upload endpoint; `{id}` is replaced by the sheet id.
const DEFAULT_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v2/files/{id}?uploadType=media&convert=true";

/// Default timeout for requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoints and timeouts of the spreadsheet adapters.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Export URL template containing `{id}`.
    pub export_url: String,
    /// Upload URL template containing `{id}`.
    pub upload_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            export_url: DEFAULT_EXPORT_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SheetConfig {
    pub fn builder() -> SheetConfigBuilder {
        SheetConfigBuilder::default()
    }

    fn export_url_for(&self, sheet_id: &str) -> String {
        self.export_url.replace("{id}", sheet_id)
    }

    fn upload_url_for(&self, sheet_id: &str) -> String {
        self.upload_url.replace("{id}", sheet_id)
    }

    fn client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?)
    }
}

/// Builder for [`SheetConfig`].
#[derive(Debug, Default)]
pub struct SheetConfigBuilder {
    export_url: Option<String>,
    upload_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl SheetConfigBuilder {
    /// Set the export URL template (must contain `{id}`).
    pub fn export_url(mut self, url: impl Into<String>) -> Self {
        self.export_url = Some(url.into());
        self
    }

    /// Set the upload URL template (must contain `{id}`).
    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = Some(url.into());
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn build(self) -> SheetConfig {
        SheetConfig {
            export_url: self.export_url.unwrap_or_else(|| DEFAULT_EXPORT_URL.to_string()),
            upload_url: self.upload_url.unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn authorized(request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
    match access_token {
        Some(token) => request.header("Authorization", format!("Bearer {}", token)),
        None => request,
    }
}

/// Downloads the first worksheet of a spreadsheet.
///
/// With [`SheetCredentials::Anonymous`] the sheet must be shared publicly.
pub struct SheetSource {
    sheet_id: String,
    credentials: SheetCredentials,
    config: SheetConfig,
    client: Client,
}

impl SheetSource {
    pub fn new(sheet_id: impl Into<String>, credentials: SheetCredentials) -> Result<Self> {
        Self::with_config(sheet_id, credentials, SheetConfig::default())
    }

    pub fn with_config(
        sheet_id: impl Into<String>,
        credentials: SheetCredentials,
        config: SheetConfig,
    ) -> Result<Self> {
        let sheet_id = sheet_id.into();
        if sheet_id.trim().is_empty() {
            return Err(CleaningError::InvalidConfig(
                "spreadsheet id must not be empty".to_string(),
            ));
        }
        let client = config.client()?;
        Ok(Self {
            sheet_id,
            credentials,
            config,
            client,
        })
    }

    /// Export URL of this spreadsheet.
    pub fn url(&self) -> String {
        self.config.export_url_for(&self.sheet_id)
    }
}

impl TableSource for SheetSource {
    fn fetch(&self) -> Result<DataFrame> {
        let url = self.url();
        let token = self.credentials.bearer_token(&self.client)?;
        debug!("GET {}", url);

        let response = authorized(self.client.get(&url), token.as_deref())
            .send()?
            .error_for_status()?;
        let bytes = response.bytes()?.to_vec();

        let df = read_csv_bytes(bytes).context(format!("Parsing sheet {}", self.sheet_id))?;
        info!("Downloaded {:?} from sheet {}", df.shape(), self.sheet_id);
        Ok(df)
    }

    fn describe(&self) -> String {
        format!("Google sheet {}", self.sheet_id)
    }
}

/// Replaces the content of a spreadsheet with a table.
pub struct SheetSink {
    sheet_id: String,
    credentials: SheetCredentials,
    config: SheetConfig,
    client: Client,
}

impl SheetSink {
    /// Uploading always needs credentials; [`SheetCredentials::Anonymous`]
    /// fails with [`CleaningError::MissingCredentials`].
    pub fn new(sheet_id: impl Into<String>, credentials: SheetCredentials) -> Result<Self> {
        Self::with_config(sheet_id, credentials, SheetConfig::default())
    }

    pub fn with_config(
        sheet_id: impl Into<String>,
        credentials: SheetCredentials,
        config: SheetConfig,
    ) -> Result<Self> {
        let sheet_id = sheet_id.into();
        if sheet_id.trim().is_empty() {
            return Err(CleaningError::InvalidConfig(
                "spreadsheet id must not be empty".to_string(),
            ));
        }
        if credentials.is_anonymous() {
            return Err(CleaningError::MissingCredentials(format!(
                "an access token or service-account key is required to upload to sheet {}",
                sheet_id
            )));
        }
        let client = config.client()?;
        Ok(Self {
            sheet_id,
            credentials,
            config,
            client,
        })
    }

    /// Upload URL of this spreadsheet.
    pub fn url(&self) -> String {
        self.config.upload_url_for(&self.sheet_id)
    }

    /// Replace the spreadsheet content with CSV text as is.
    ///
    /// Used to seed a sheet from a raw survey export without parsing it.
    pub fn push_csv(&self, body: Vec<u8>) -> Result<()> {
        let url = self.url();
        let token = self.credentials.bearer_token(&self.client)?;
        debug!("PUT {} ({} bytes)", url, body.len());

        authorized(self.client.put(&url), token.as_deref())
            .header("Content-Type", "text/csv")
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl TableSink for SheetSink {
    fn push(&self, df: &mut DataFrame) -> Result<()> {
        self.push_csv(write_csv_bytes(df)?)?;
        info!("Uploaded {:?} to sheet {}", df.shape(), self.sheet_id);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Google sheet {}", self.sheet_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let source = SheetSource::new("abc123", SheetCredentials::Anonymous).unwrap();
        assert_eq!(
            source.url(),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv"
        );

        let sink = SheetSink::new("abc123", SheetCredentials::access_token("token")).unwrap();
        assert_eq!(
            sink.url(),
            "https://www.googleapis.com/upload/drive/v2/files/abc123?uploadType=media&convert=true"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = SheetConfig::builder()
            .export_url("http://localhost:9000/{id}.csv")
            .timeout_secs(5)
            .build();

        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.upload_url, DEFAULT_UPLOAD_URL);

        let source = SheetSource::with_config("s1", SheetCredentials::Anonymous, config).unwrap();
        assert_eq!(source.url(), "http://localhost:9000/s1.csv");
    }

    #[test]
    fn test_sink_requires_token() {
        let err = SheetSink::new("abc123", SheetCredentials::Anonymous).err().unwrap();
        assert_eq!(err.error_code(), "MISSING_CREDENTIALS");

        let err = SheetSink::new("abc123", SheetCredentials::access_token("  ")).err().unwrap();
        assert_eq!(err.error_code(), "MISSING_CREDENTIALS");
    }

    #[test]
    fn test_empty_sheet_id_rejected() {
        let err = SheetSource::new(" ", SheetCredentials::Anonymous).err().unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_sink_accepts_service_account() {
        let key = include_str!("../../tests/fixtures/service_account.json");
        let credentials = SheetCredentials::service_account(key).unwrap();
        let sink = SheetSink::new("abc123", credentials).unwrap();
        assert_eq!(sink.describe(), "Google sheet abc123");
    }

    #[test]
    fn test_describe() {
        let source = SheetSource::new("abc123", SheetCredentials::Anonymous).unwrap();
        assert_eq!(source.describe(), "Google sheet abc123");
    }
}
