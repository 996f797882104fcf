//! Inference endpoint configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Ollama server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Context window; pruning starts at half of it
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u64,

    /// Sampling temperature, model default when unset
    pub temperature: Option<f32>,
}

impl InferenceConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate inference configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("ollama.base_url"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingRequired("OLLAMA__MODEL"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("ollama.timeout_secs"));
        }
        if self.max_context_tokens == 0 {
            return Err(ValidationError::InvalidContextWindow);
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::InvalidTemperature);
            }
        }
        Ok(())
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_context_tokens: default_max_context_tokens(),
            temperature: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_timeout() -> u64 {
    210
}

fn default_max_context_tokens() -> u64 {
    32_768
}
