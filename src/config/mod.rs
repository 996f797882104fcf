//! Application configuration module
//!
//! Configuration is read from environment variables using the `config` and
//! `dotenvy` crates. Variables carry the `LIFEPAL` prefix and nested values are
//! separated by double underscores. Every section has defaults, so an empty
//! environment yields a working local setup (Ollama on localhost, in-memory
//! tool catalog).
//!
//! # Example
//!
//! ```no_run
//! use lifepal::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Using model {}", config.ollama.model);
//! ```

mod database;
mod error;
mod logging;
mod ollama;
mod orchestrator;
mod tools;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use ollama::InferenceConfig;
pub use orchestrator::ConversationConfig;
pub use tools::ToolsConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Inference endpoint (Ollama)
    #[serde(default)]
    pub ollama: InferenceConfig,

    /// Tool-calling loop settings
    #[serde(default)]
    pub orchestrator: ConversationConfig,

    /// Tool backends and catalog
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Optional PostgreSQL tool store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Tracing output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LIFEPAL` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `LIFEPAL__OLLAMA__MODEL=qwen2.5` -> `ollama.model = "qwen2.5"`
    /// - `LIFEPAL__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LIFEPAL")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ollama.validate()?;
        self.orchestrator.validate()?;
        self.tools.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "LIFEPAL__OLLAMA__MODEL",
        "LIFEPAL__OLLAMA__BASE_URL",
        "LIFEPAL__ORCHESTRATOR__MAX_ITERATIONS",
        "LIFEPAL__DATABASE__URL",
        "LIFEPAL__TOOLS__CATALOG_PATH",
        "LIFEPAL__LOGGING__LEVEL",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.orchestrator.max_iterations, 10);
        assert!(config.database.url().is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIFEPAL__OLLAMA__MODEL", "qwen2.5");
        env::set_var("LIFEPAL__ORCHESTRATOR__MAX_ITERATIONS", "4");
        env::set_var("LIFEPAL__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("LIFEPAL__TOOLS__CATALOG_PATH", "catalog/tools.yaml");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.ollama.model, "qwen2.5");
        assert_eq!(config.orchestrator.max_iterations, 4);
        assert_eq!(config.database.url(), Some("postgresql://test@localhost/test"));
        assert_eq!(config.tools.catalog_path.as_deref(), Some("catalog/tools.yaml"));
    }

    #[test]
    fn test_validate_reports_bad_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIFEPAL__OLLAMA__BASE_URL", "localhost:11434");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_log_level_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIFEPAL__LOGGING__LEVEL", "loud");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(
            result.unwrap().validate(),
            Err(ValidationError::InvalidLogLevel(_))
        ));
    }
}
