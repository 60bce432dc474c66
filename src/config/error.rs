//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid base URL for {0}")]
    InvalidBaseUrl(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Page concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Acceptance threshold must be between 0.0 and 1.0")]
    InvalidThreshold,

    #[error("Retry count must be at least 1")]
    InvalidRetryCount,

    #[error("Session TTL must be greater than zero")]
    InvalidTtl,
}
