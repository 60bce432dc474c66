//! HTTP Record Source Adapter
//!
//! Fetches record bundles from the upstream document service over HTTP.
//!
//! # Configuration
//!
//! ```ignore
//! let config = RecordApiConfig::new(api_key, "https://records.internal")
//!     .with_timeout(Duration::from_secs(20));
//!
//! let source = HttpRecordSource::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use super::payload::RecordPayload;
use crate::domain::foundation::RecordId;
use crate::ports::{RecordBundle, RecordSource, RecordSourceError};

/// Configuration for the HTTP record source.
#[derive(Debug, Clone)]
pub struct RecordApiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Base URL of the record service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl RecordApiConfig {
    /// Creates a new configuration.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// HTTP client for the upstream record service.
///
/// Single-shot: retry and backoff are owned by the call gateway, so a
/// failed request surfaces immediately with a retryability
/// classification.
pub struct HttpRecordSource {
    config: RecordApiConfig,
    client: Client,
}

impl HttpRecordSource {
    /// Creates a new record source with the given configuration.
    pub fn new(config: RecordApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the record endpoint URL.
    fn record_url(&self, record_id: &RecordId) -> String {
        format!("{}/records/{}", self.config.base_url, record_id)
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(
        &self,
        record_id: &RecordId,
        response: Response,
    ) -> Result<Response, RecordSourceError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(RecordSourceError::not_found(record_id.as_str())),
            StatusCode::TOO_MANY_REQUESTS => {
                let header = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Err(RecordSourceError::RateLimited {
                    retry_after_secs: parse_retry_after(header.as_deref()),
                })
            }
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(RecordSourceError::unavailable(format!(
                    "Server error {}: {}",
                    s, body
                )))
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(RecordSourceError::malformed(format!(
                    "Unexpected status {}: {}",
                    s, body
                )))
            }
        }
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordBundle, RecordSourceError> {
        let response = self
            .client
            .get(self.record_url(record_id))
            .bearer_auth(self.config.api_key())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecordSourceError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    RecordSourceError::unavailable(format!("Connection failed: {}", e))
                } else {
                    RecordSourceError::unavailable(e.to_string())
                }
            })?;

        let response = self.handle_response_status(record_id, response).await?;

        let payload: RecordPayload = response.json().await.map_err(|e| {
            RecordSourceError::malformed(format!("Failed to decode record payload: {}", e))
        })?;
        payload.into_bundle()
    }
}

/// Parses a Retry-After header value in seconds.
fn parse_retry_after(header: Option<&str>) -> u32 {
    header.and_then(|v| v.trim().parse().ok()).unwrap_or(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = RecordApiConfig::new("test-key", "https://records.internal")
            .with_timeout(Duration::from_secs(20));

        assert_eq!(config.base_url, "https://records.internal");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn record_url_joins_base_and_id() {
        let source = HttpRecordSource::new(RecordApiConfig::new("k", "https://records.internal"));
        let id = RecordId::new("REC-001").unwrap();

        assert_eq!(source.record_url(&id), "https://records.internal/records/REC-001");
    }

    #[test]
    fn parse_retry_after_reads_seconds() {
        assert_eq!(parse_retry_after(Some("120")), 120);
        assert_eq!(parse_retry_after(Some(" 5 ")), 5);
    }

    #[test]
    fn parse_retry_after_defaults_on_garbage() {
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2026 07:28:00 GMT")), 30);
        assert_eq!(parse_retry_after(None), 30);
    }
}
