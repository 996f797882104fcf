//! Tool-level failure taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Final status of a tool execution, as written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ExecutionStatus::Success),
            "error" => Some(ExecutionStatus::Error),
            "timeout" => Some(ExecutionStatus::Timeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a tool call did not produce a result.
///
/// Every variant is recoverable: the orchestrator turns it into a tool-role
/// message so the model can adapt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Unauthorized to run tool '{tool}': {reason}")]
    Unauthorized { tool: String, reason: String },

    #[error("Execution timeout after {timeout_secs}s")]
    ExecutionTimeout { timeout_secs: u64 },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Malformed tool call from model: {0}")]
    MalformedModelOutput(String),

    #[error("Tool store error: {0}")]
    Store(String),
}

impl ToolError {
    pub fn not_found(name: impl Into<String>) -> Self {
        ToolError::NotFound(name.into())
    }

    pub fn unauthorized(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::Unauthorized {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ToolError::MalformedModelOutput(message.into())
    }

    /// The audit status this failure maps to.
    pub fn status(&self) -> ExecutionStatus {
        match self {
            ToolError::ExecutionTimeout { .. } => ExecutionStatus::Timeout,
            _ => ExecutionStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timeout_status() {
        let err = ToolError::ExecutionTimeout { timeout_secs: 5 };
        assert_eq!(err.status(), ExecutionStatus::Timeout);
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn other_failures_map_to_error_status() {
        assert_eq!(ToolError::not_found("x").status(), ExecutionStatus::Error);
        assert_eq!(
            ToolError::execution_failed("boom").status(),
            ExecutionStatus::Error
        );
    }

    #[test]
    fn status_parse_roundtrips() {
        for status in [
            ExecutionStatus::Success,
            ExecutionStatus::Error,
            ExecutionStatus::Timeout,
        ] {
            assert_eq!(ExecutionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ExecutionStatus::parse("pending"), None);
    }
}
