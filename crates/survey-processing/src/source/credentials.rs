//! Google credentials for the spreadsheet adapters.
//!
//! A caller either hands over an access token it already holds or a
//! service-account key. A key is turned into an access token by signing an
//! RS256 assertion and exchanging it at the key's token endpoint (OAuth 2.0
//! JWT bearer grant).

use crate::error::{CleaningError, Result, ResultExt};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Scopes requested for reading and replacing spreadsheets.
pub const SHEETS_SCOPES: &str =
    "https://spreadsheets.google.com/feeds https://www.googleapis.com/auth/drive";

/// Token endpoint used when the key file does not name one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Google rejects assertions valid for more than one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The parts of a service-account JSON key needed to request tokens.
///
/// Other fields of the key file (`project_id`, `client_id`, ...) are ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Parse the content of a service-account key file.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json).map_err(|e| {
            CleaningError::InvalidConfig(format!("service-account key is not valid: {}", e))
        })?;

        if key.client_email.trim().is_empty() {
            return Err(CleaningError::InvalidConfig(
                "service-account key has an empty client_email".to_string(),
            ));
        }
        if key.private_key.trim().is_empty() {
            return Err(CleaningError::InvalidConfig(
                "service-account key has an empty private_key".to_string(),
            ));
        }
        Ok(key)
    }

    /// Signed assertion issued at `issued_at` (Unix seconds).
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPES,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Exchange a fresh assertion for an access token.
    pub fn fetch_access_token(&self, client: &Client) -> Result<String> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        debug!("POST {} for {}", self.token_uri, self.client_email);

        let response: TokenResponse = client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        Ok(response.access_token)
    }
}

/// How the spreadsheet adapters authenticate.
#[derive(Clone, Default)]
pub enum SheetCredentials {
    /// No credentials; only publicly shared sheets can be read.
    #[default]
    Anonymous,
    /// An already issued OAuth access token.
    AccessToken(String),
    /// A service-account key exchanged for a token on every request batch.
    ServiceAccount(ServiceAccountKey),
}

impl fmt::Debug for SheetCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::AccessToken(_) => f.write_str("AccessToken(..)"),
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

impl SheetCredentials {
    /// Wrap a token; a blank token means no credentials.
    pub fn access_token(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            Self::Anonymous
        } else {
            Self::AccessToken(token)
        }
    }

    /// Parse a service-account key (the JSON content, not a path).
    pub fn service_account(json: &str) -> Result<Self> {
        Ok(Self::ServiceAccount(ServiceAccountKey::from_json(json)?))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Bearer token for the next request, `None` when anonymous.
    pub(crate) fn bearer_token(&self, client: &Client) -> Result<Option<String>> {
        match self {
            Self::Anonymous => Ok(None),
            Self::AccessToken(token) => Ok(Some(token.clone())),
            Self::ServiceAccount(key) => key
                .fetch_access_token(client)
                .context(format!("Authorizing {}", key.client_email))
                .map(Some),
        }
    }
}
