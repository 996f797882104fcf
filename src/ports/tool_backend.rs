//! Tool Backend Port - Where a tool's logic actually runs.
//!
//! All backends share one contract: take the invocation payload, honour a
//! wall-clock timeout, and return a JSON value or a normalized error. The
//! executor never needs to know which backend served a call.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::tools::{ToolDefinition, ToolError};

/// Port for one execution backend kind.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Runs `definition` with the invocation payload
    /// (`principal_id`, `principal_email`, `principal_username`, `parameters`).
    async fn invoke(
        &self,
        definition: &ToolDefinition,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError>;
}

/// Backend failures, all normalized before they reach the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("{0}")]
    Failed(String),

    #[error("backend misconfigured: {0}")]
    Misconfigured(String),
}

impl BackendError {
    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Failed(message.into())
    }
}

impl From<BackendError> for ToolError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { timeout_secs } => ToolError::ExecutionTimeout { timeout_secs },
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}
