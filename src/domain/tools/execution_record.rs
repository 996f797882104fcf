//! Tool execution record - audit entry for every tool call.
//!
//! Exactly one record is written per executor call, success or failure.
//! Records are append-only: nothing in the crate updates or deletes them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, ExecutionId, PrincipalId, Timestamp, ToolId};

use super::{ExecutionStatus, ToolOutcome};

/// An immutable audit entry.
///
/// # Invariants
///
/// - `result` is present only when `status` is `Success`
/// - `error_message` is present only when `status` is not `Success`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    id: ExecutionId,
    tool_id: ToolId,
    tool_name: String,
    principal_id: PrincipalId,
    parameters: serde_json::Value,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    status: ExecutionStatus,
    execution_time_ms: u64,
    conversation_id: Option<ConversationId>,
    created_at: Timestamp,
}

impl ToolExecutionRecord {
    /// Builds the record for a finished execution.
    pub fn from_outcome(
        tool_id: ToolId,
        tool_name: impl Into<String>,
        principal_id: PrincipalId,
        parameters: serde_json::Value,
        outcome: &ToolOutcome,
        execution_time_ms: u64,
        conversation_id: Option<ConversationId>,
    ) -> Self {
        let (result, error_message) = match outcome {
            ToolOutcome::Success(map) => (Some(serde_json::Value::Object(map.clone())), None),
            ToolOutcome::Failure(err) => (None, Some(err.to_string())),
        };
        Self {
            id: ExecutionId::new(),
            tool_id,
            tool_name: tool_name.into(),
            principal_id,
            parameters,
            result,
            error_message,
            status: outcome.status(),
            execution_time_ms,
            conversation_id,
            created_at: Timestamp::now(),
        }
    }

    /// Rebuilds a record loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ExecutionId,
        tool_id: ToolId,
        tool_name: String,
        principal_id: PrincipalId,
        parameters: serde_json::Value,
        result: Option<serde_json::Value>,
        error_message: Option<String>,
        status: ExecutionStatus,
        execution_time_ms: u64,
        conversation_id: Option<ConversationId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            tool_id,
            tool_name,
            principal_id,
            parameters,
            result,
            error_message,
            status,
            execution_time_ms,
            conversation_id,
            created_at,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Getters
    // ═══════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn tool_id(&self) -> ToolId {
        self.tool_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal_id
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tools::ToolError;
    use serde_json::json;

    fn record_for(outcome: &ToolOutcome) -> ToolExecutionRecord {
        ToolExecutionRecord::from_outcome(
            ToolId::new(),
            "log_mood",
            PrincipalId::new("u1"),
            json!({"score": 4}),
            outcome,
            42,
            Some(ConversationId::new()),
        )
    }

    #[test]
    fn success_record_keeps_result() {
        let outcome = ToolOutcome::from_value(json!({"success": true}));
        let record = record_for(&outcome);

        assert!(record.is_success());
        assert_eq!(record.result(), Some(&json!({"success": true})));
        assert!(record.error_message().is_none());
        assert_eq!(record.execution_time_ms(), 42);
    }

    #[test]
    fn failure_record_keeps_error_message() {
        let outcome = ToolOutcome::Failure(ToolError::execution_failed("exit 1"));
        let record = record_for(&outcome);

        assert_eq!(record.status(), ExecutionStatus::Error);
        assert!(record.result().is_none());
        assert_eq!(record.error_message(), Some("Execution failed: exit 1"));
    }

    #[test]
    fn timeout_record_has_timeout_status() {
        let outcome = ToolOutcome::Failure(ToolError::ExecutionTimeout { timeout_secs: 1 });
        assert_eq!(record_for(&outcome).status(), ExecutionStatus::Timeout);
    }
}
