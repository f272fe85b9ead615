// HTTP transport seam.
//
// The standings client only needs "GET this URL with these headers, give me
// the status and body". Keeping that behind a trait lets tests script
// responses without a server.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        TransportResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<TransportResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("livescores/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::new(format!("failed to build http client: {e}")))?;
        Ok(ReqwestTransport { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("failed reading body: {e}")))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(199, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(401, "").is_success());
    }

    #[test]
    fn reqwest_transport_builds() {
        assert!(ReqwestTransport::new(Duration::from_secs(5)).is_ok());
    }
}
