//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `FORMPILOT_` prefix and nested values use underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use formpilot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Session store backend: {:?}", config.store.backend);
//! ```

mod completion;
mod error;
mod record;
mod store;
mod workflow;

pub use completion::{CompletionBackend, CompletionConfig};
pub use error::{ConfigError, ValidationError};
pub use record::{RecordBackend, RecordSourceConfig};
pub use store::{StoreBackend, StoreConfig};
pub use workflow::WorkflowConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the Formpilot engine.
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Every section has working defaults (in-memory store, fixture records,
/// mock completion) so a bare environment loads a development setup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Session store configuration (memory, file, or PostgreSQL)
    #[serde(default)]
    pub store: StoreConfig,

    /// Record source configuration (fixtures or upstream HTTP)
    #[serde(default)]
    pub record: RecordSourceConfig,

    /// Completion service configuration (mock or extraction API)
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Workflow engine configuration (TTLs, timeouts, retry policy)
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FORMPILOT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `FORMPILOT__STORE__BACKEND=postgres` -> `store.backend = Postgres`
    /// - `FORMPILOT__WORKFLOW__PAGE_CONCURRENCY=8` -> `workflow.page_concurrency = 8`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FORMPILOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - Backend-specific required values (URLs, API keys, paths)
    /// - URL formats
    /// - Pool size constraints
    /// - Workflow bounds (timeouts, concurrency, threshold, retries)
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;
        self.record.validate()?;
        self.completion.validate()?;
        self.workflow.validate()?;
        Ok(())
    }
}

fn default_log_level() -> String {
    "formpilot=info,sqlx=warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to clear environment variables after testing
    fn clear_env() {
        env::remove_var("FORMPILOT__STORE__BACKEND");
        env::remove_var("FORMPILOT__STORE__DATABASE_URL");
        env::remove_var("FORMPILOT__RECORD__BACKEND");
        env::remove_var("FORMPILOT__RECORD__BASE_URL");
        env::remove_var("FORMPILOT__RECORD__API_KEY");
        env::remove_var("FORMPILOT__COMPLETION__BACKEND");
        env::remove_var("FORMPILOT__COMPLETION__MODEL");
        env::remove_var("FORMPILOT__WORKFLOW__PAGE_CONCURRENCY");
        env::remove_var("FORMPILOT__WORKFLOW__SESSION_TTL_SECS");
        env::remove_var("FORMPILOT__LOG_LEVEL");
    }

    #[test]
    fn test_load_with_bare_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.record.backend, RecordBackend::Fixture);
        assert_eq!(config.completion.backend, CompletionBackend::Mock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_overrides_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("FORMPILOT__STORE__BACKEND", "postgres");
        env::set_var(
            "FORMPILOT__STORE__DATABASE_URL",
            "postgresql://test@localhost/formpilot",
        );
        env::set_var("FORMPILOT__WORKFLOW__PAGE_CONCURRENCY", "8");
        env::set_var("FORMPILOT__COMPLETION__MODEL", "extract-v2");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(
            config.store.database_url.as_deref(),
            Some("postgresql://test@localhost/formpilot")
        );
        assert_eq!(config.workflow.page_concurrency, 8);
        assert_eq!(config.completion.model, "extract-v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_incomplete_http_backend() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("FORMPILOT__RECORD__BACKEND", "http");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        // HTTP record backend without a base URL fails validation.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_default_and_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();
        assert_eq!(config.log_level, "formpilot=info,sqlx=warn");

        env::set_var("FORMPILOT__LOG_LEVEL", "debug");
        let config = AppConfig::load().unwrap();
        clear_env();
        assert_eq!(config.log_level, "debug");
    }
}
