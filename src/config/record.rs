//! Record source configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Record source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSourceConfig {
    /// Where record bundles come from
    #[serde(default)]
    pub backend: RecordBackend,

    /// Directory of YAML fixtures
    #[serde(default = "default_fixture_path")]
    pub fixture_path: String,

    /// Base URL of the record service
    pub base_url: Option<String>,

    /// API key for the record service
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Record source backend type
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordBackend {
    #[default]
    Fixture,
    Http,
}

impl RecordSourceConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate record source configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        match self.backend {
            RecordBackend::Fixture => {
                if self.fixture_path.is_empty() {
                    return Err(ValidationError::MissingRequired("RECORD_FIXTURE_PATH"));
                }
            }
            RecordBackend::Http => {
                let url = self
                    .base_url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or(ValidationError::MissingRequired("RECORD_BASE_URL"))?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ValidationError::InvalidBaseUrl("record source"));
                }
                if !self.has_api_key() {
                    return Err(ValidationError::MissingRequired("RECORD_API_KEY"));
                }
            }
        }
        Ok(())
    }
}

impl Default for RecordSourceConfig {
    fn default() -> Self {
        Self {
            backend: RecordBackend::default(),
            fixture_path: default_fixture_path(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_fixture_path() -> String {
    "fixtures/records".to_string()
}

fn default_timeout() -> u64 {
    30
}
