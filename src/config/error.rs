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
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid URL for {0}: must start with http:// or https://")]
    InvalidUrl(&'static str),

    #[error("Invalid timeout for {0}: must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("max_iterations must be between 1 and 100")]
    InvalidIterationLimit,

    #[error("max_context_tokens must be greater than zero")]
    InvalidContextWindow,

    #[error("temperature must be between 0.0 and 2.0")]
    InvalidTemperature,

    #[error("Remote function endpoint must contain {{region}} and {{function}} placeholders")]
    InvalidEndpointTemplate,

    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
}
