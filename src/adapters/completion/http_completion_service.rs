//! HTTP Completion Service - Client for the extraction model API.
//!
//! Sends one page of document text plus the field specs to the model
//! service and decodes the proposed candidates.
//!
//! # Configuration
//!
//! ```ignore
//! let config = CompletionApiConfig::new(api_key, "https://extract.internal")
//!     .with_model("extract-v2");
//!
//! let service = HttpCompletionService::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::extraction::{FieldKind, PageCandidate};
use crate::domain::foundation::Score;
use crate::ports::{CompletionError, CompletionService, PageCompletionRequest};

/// Configuration for the completion API client.
#[derive(Debug, Clone)]
pub struct CompletionApiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL of the extraction service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl CompletionApiConfig {
    /// Creates a new configuration.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "extract-v1".to_string(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

/// HTTP client for the extraction model service.
///
/// Single-shot: retry and backoff are owned by the call gateway, so a
/// failed request surfaces immediately with a retryability
/// classification.
pub struct HttpCompletionService {
    config: CompletionApiConfig,
    client: Client,
}

impl HttpCompletionService {
    /// Creates a new completion service with the given configuration.
    pub fn new(config: CompletionApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the extraction endpoint URL.
    fn extract_url(&self) -> String {
        format!("{}/v1/extract", self.config.base_url)
    }

    /// Converts a page request to the API format.
    fn to_extract_request(&self, request: &PageCompletionRequest) -> ExtractRequest {
        ExtractRequest {
            model: self.config.model.clone(),
            record_id: request.record_id.as_str().to_string(),
            page_index: request.page_index,
            page_text: request.page_text.clone(),
            page_quality: request.page_quality.value(),
            fields: request
                .field_specs
                .iter()
                .map(|spec| FieldPayload {
                    label: spec.label().to_string(),
                    kind: spec.kind().clone(),
                    required: spec.required(),
                })
                .collect(),
            question: request.question.clone(),
        }
    }

    /// Sends a request and handles transport errors.
    async fn send_request(
        &self,
        request: &PageCompletionRequest,
    ) -> Result<Response, CompletionError> {
        let extract_request = self.to_extract_request(request);

        self.client
            .post(self.extract_url())
            .bearer_auth(self.config.api_key())
            .header("Content-Type", "application/json")
            .json(&extract_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    CompletionError::network(format!("Connection failed: {}", e))
                } else {
                    CompletionError::network(e.to_string())
                }
            })
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, CompletionError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(CompletionError::InvalidRequest(format!(
                "Authentication failed: {}",
                body
            ))),
            429 => Err(CompletionError::rate_limited(parse_retry_after(
                retry_after.as_deref(),
            ))),
            400 => Err(CompletionError::InvalidRequest(body)),
            500..=599 => Err(CompletionError::unavailable(format!(
                "Server error {}: {}",
                status, body
            ))),
            _ => Err(CompletionError::network(format!(
                "Unexpected status {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(
        &self,
        request: PageCompletionRequest,
    ) -> Result<Vec<PageCandidate>, CompletionError> {
        let response = self.send_request(&request).await?;
        let response = self.handle_response_status(response).await?;

        let payload: ExtractResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::parse(format!("Failed to parse response: {}", e)))?;

        payload_to_candidates(&request, payload)
    }
}

/// Converts decoded candidates into domain candidates, carrying over
/// the page index and quality from the request.
fn payload_to_candidates(
    request: &PageCompletionRequest,
    payload: ExtractResponse,
) -> Result<Vec<PageCandidate>, CompletionError> {
    let mut candidates = Vec::with_capacity(payload.candidates.len());
    for c in payload.candidates {
        let confidence = Score::try_new(c.confidence).map_err(|e| {
            CompletionError::parse(format!("candidate '{}': {}", c.field_label, e))
        })?;
        let candidate = PageCandidate::new(
            c.field_label,
            request.page_index,
            c.value,
            confidence,
            request.page_quality,
        )
        .map_err(|e| CompletionError::parse(e.to_string()))?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Parses a Retry-After header value in seconds.
fn parse_retry_after(header: Option<&str>) -> u32 {
    header.and_then(|v| v.trim().parse().ok()).unwrap_or(30)
}

// ----- Extraction API Types -----

#[derive(Debug, Serialize)]
struct ExtractRequest {
    model: String,
    record_id: String,
    page_index: u32,
    page_text: String,
    page_quality: f64,
    fields: Vec<FieldPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<String>,
}

#[derive(Debug, Serialize)]
struct FieldPayload {
    label: String,
    #[serde(flatten)]
    kind: FieldKind,
    required: bool,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    candidates: Vec<CandidatePayload>,
}

#[derive(Debug, Deserialize)]
struct CandidatePayload {
    field_label: String,
    value: String,
    confidence: f64,
}
