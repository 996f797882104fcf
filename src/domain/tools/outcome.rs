//! Normalized tool result.

use serde_json::{Map, Value};

use super::{ExecutionStatus, ToolError};

/// What a tool call produced, independent of the backend that served it.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Map<String, Value>),
    Failure(ToolError),
}

impl ToolOutcome {
    /// Wraps any JSON value; non-objects are placed under a `result` key.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => ToolOutcome::Success(map),
            other => {
                let mut map = Map::new();
                map.insert("success".into(), Value::Bool(true));
                map.insert("result".into(), other);
                ToolOutcome::Success(map)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// True when the payload itself reports `success: true` (or omits the key).
    pub fn reports_success(&self) -> bool {
        match self {
            ToolOutcome::Success(map) => map
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            ToolOutcome::Failure(_) => false,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            ToolOutcome::Success(_) => ExecutionStatus::Success,
            ToolOutcome::Failure(err) => err.status(),
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolOutcome::Failure(err) => Some(err),
            ToolOutcome::Success(_) => None,
        }
    }

    /// JSON value fed back to the model as the tool-role message body.
    pub fn to_payload(&self) -> Value {
        match self {
            ToolOutcome::Success(map) => Value::Object(map.clone()),
            ToolOutcome::Failure(err) => serde_json::json!({
                "success": false,
                "status": err.status().as_str(),
                "error": err.to_string(),
                "message": format!("Tool execution failed: {}", err),
            }),
        }
    }
}
