// Remote standings client.
//
// One authenticated GET per call, no retries. HTTP outcomes are classified
// into `FetchError` variants; the refresh cadence is the only retry policy.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::StandingsPayload;
use crate::transport::{Transport, TransportResponse};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://dirtymittenracing.com";
pub const STANDINGS_PATH: &str = "/wp-json/s4z-tls/v1/team-standings";
/// Lightest endpoint on the server; used only to probe connectivity.
pub const TEAM_MAP_PATH: &str = "/wp-json/s4z-tls/v1/team-map";
pub const ACCESS_TOKEN_HEADER: &str = "X-TLS-Access-Token";

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// A non-blank access token. Construction is the "is it configured?" check.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(AccessToken(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Why a fetch did not produce a payload. All variants are transient.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid access password")]
    Unauthorized { message: Option<String> },

    #[error("Rate limit exceeded - please wait before trying again")]
    RateLimited { message: Option<String> },

    #[error("Server error: {status}")]
    ServerError { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid standings data: {0}")]
    InvalidPayload(String),
}

impl FetchError {
    /// HTTP status behind the error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unauthorized { .. } => Some(401),
            FetchError::RateLimited { .. } => Some(429),
            FetchError::ServerError { status, .. } => Some(*status),
            FetchError::NetworkError(_) | FetchError::InvalidPayload(_) => None,
        }
    }

    /// The `{ message }` the server attached to a non-2xx response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            FetchError::Unauthorized { message }
            | FetchError::RateLimited { message }
            | FetchError::ServerError { message, .. } => message.as_deref(),
            FetchError::NetworkError(_) | FetchError::InvalidPayload(_) => None,
        }
    }

    /// Message for the connectivity probe: the server's own message when it
    /// sent one, otherwise `HTTP <status>: <reason>`.
    pub fn probe_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self.status() {
            Some(status) => {
                let reason = reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("");
                format!("HTTP {status}: {reason}")
            }
            None => self.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
}

/// Map a completed exchange to success or a typed error.
pub(crate) fn classify(response: TransportResponse) -> Result<TransportResponse, FetchError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = error_message(&response.body);
    Err(match response.status {
        401 => FetchError::Unauthorized { message },
        429 => FetchError::RateLimited { message },
        status => FetchError::ServerError { status, message },
    })
}

// ---------------------------------------------------------------------------
// StandingsClient
// ---------------------------------------------------------------------------

pub struct StandingsClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl StandingsClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        StandingsClient {
            transport,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, token: &AccessToken) -> Result<TransportResponse, FetchError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .transport
            .get(&url, &[(ACCESS_TOKEN_HEADER, token.as_str())])
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                FetchError::NetworkError(e.message)
            })?;
        debug!("GET {} -> {}", url, response.status);
        classify(response)
    }

    /// Fetch the current live race standings. The server picks the race.
    pub async fn fetch_standings(
        &self,
        token: &AccessToken,
    ) -> Result<StandingsPayload, FetchError> {
        let response = self.get(STANDINGS_PATH, token).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            warn!("Failed to decode standings payload: {}", e);
            FetchError::InvalidPayload(e.to_string())
        })
    }

    /// Probe the team-map endpoint. The body is not decoded.
    pub async fn test_connection(&self, token: &AccessToken) -> Result<(), FetchError> {
        self.get(TEAM_MAP_PATH, token).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
