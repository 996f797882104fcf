//! Conversation loop configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Model calls allowed per exchange
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Include tool-usage instructions in the system prompt
    #[serde(default = "default_true")]
    pub include_tool_instructions: bool,

    /// Replaces the built-in assistant persona
    pub persona: Option<String>,
}

impl ConversationConfig {
    /// Validate orchestrator configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_iterations == 0 || self.max_iterations > 100 {
            return Err(ValidationError::InvalidIterationLimit);
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            include_tool_instructions: true,
            persona: None,
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

fn default_true() -> bool {
    true
}
