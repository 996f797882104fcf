//! Tool backend configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::backends::DEFAULT_ENDPOINT_TEMPLATE;

/// Tool execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Program scripts are run with; empty executes the script path directly
    #[serde(default = "default_interpreter")]
    pub script_interpreter: String,

    /// Base directory for relative script paths
    pub script_root: Option<String>,

    /// Timeout for remote function calls in seconds
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,

    /// Invoke URL template with `{region}` and `{function}` placeholders
    #[serde(default = "default_remote_function_endpoint")]
    pub remote_function_endpoint: String,

    /// Bearer token for the remote function gateway
    pub remote_function_token: Option<Secret<String>>,

    /// YAML catalog seeded into the store at startup
    pub catalog_path: Option<String>,
}

impl ToolsConfig {
    /// Get default timeout as Duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Validate tool configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("tools.default_timeout_secs"));
        }
        let endpoint = &self.remote_function_endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("tools.remote_function_endpoint"));
        }
        if !endpoint.contains("{region}") || !endpoint.contains("{function}") {
            return Err(ValidationError::InvalidEndpointTemplate);
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            script_interpreter: default_interpreter(),
            script_root: None,
            default_timeout_secs: default_timeout(),
            remote_function_endpoint: default_remote_function_endpoint(),
            remote_function_token: None,
            catalog_path: None,
        }
    }
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_remote_function_endpoint() -> String {
    DEFAULT_ENDPOINT_TEMPLATE.to_string()
}
