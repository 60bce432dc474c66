//! Workflow engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Workflow engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Per-stage deadline in seconds
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,

    /// Pages extracted concurrently per stage
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,

    /// Minimum merged weight for a field to count as available
    #[serde(default)]
    pub acceptance_threshold: f64,

    /// Total attempts allowed per upstream call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay between attempts, in milliseconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Per-attempt deadline for upstream calls, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl WorkflowConfig {
    /// Get stage timeout as Duration
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Get retry base delay as Duration
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Get per-attempt call timeout as Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate workflow configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_ttl_secs == 0 {
            return Err(ValidationError::InvalidTtl);
        }
        if self.stage_timeout_secs == 0 || self.call_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.page_concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(ValidationError::InvalidThreshold);
        }
        if self.max_retries == 0 {
            return Err(ValidationError::InvalidRetryCount);
        }
        Ok(())
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            stage_timeout_secs: default_stage_timeout(),
            page_concurrency: default_page_concurrency(),
            acceptance_threshold: 0.0,
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_stage_timeout() -> u64 {
    120
}

fn default_page_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_call_timeout() -> u64 {
    30
}
