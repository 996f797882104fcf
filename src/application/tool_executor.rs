//! Tool executor - runs a definition on its backend and keeps the books.
//!
//! Every call produces exactly one audit record and one statistics update,
//! whatever the backend returned. Store failures are logged and never turn a
//! tool result into an error.

use std::sync::Arc;

use crate::domain::foundation::{ConversationId, Timestamp};
use crate::domain::principal::Principal;
use crate::domain::tools::{ExecutionBackend, ToolDefinition, ToolExecutionRecord, ToolOutcome};
use crate::ports::{ToolBackend, ToolStore};

/// One backend per execution kind.
#[derive(Clone)]
pub struct ToolBackends {
    pub script: Arc<dyn ToolBackend>,
    pub remote_function: Arc<dyn ToolBackend>,
    pub webhook: Arc<dyn ToolBackend>,
}

impl ToolBackends {
    fn for_backend(&self, backend: &ExecutionBackend) -> &Arc<dyn ToolBackend> {
        match backend {
            ExecutionBackend::Script { .. } => &self.script,
            ExecutionBackend::RemoteFunction { .. } => &self.remote_function,
            ExecutionBackend::Webhook { .. } => &self.webhook,
        }
    }
}

/// Dispatches tool calls to backends and records the result.
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn ToolStore>,
    backends: ToolBackends,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn ToolStore>, backends: ToolBackends) -> Self {
        Self { store, backends }
    }

    /// Runs `definition` for `principal` and returns the normalized outcome.
    ///
    /// Never fails: backend errors become `ToolOutcome::Failure`, and a store
    /// that cannot persist the audit record is only logged.
    pub async fn execute(
        &self,
        definition: &ToolDefinition,
        arguments: &serde_json::Value,
        principal: &Principal,
        conversation_id: Option<ConversationId>,
    ) -> ToolOutcome {
        let started = Timestamp::now();
        let payload = principal.invocation_payload(arguments);

        let outcome = match self
            .backends
            .for_backend(definition.backend())
            .invoke(definition, &payload)
            .await
        {
            Ok(value) => ToolOutcome::from_value(value),
            Err(err) => ToolOutcome::Failure(err.into()),
        };
        let elapsed_ms = Timestamp::now().millis_since(&started);

        match outcome.error() {
            None => tracing::info!(
                tool = definition.name(),
                backend = definition.backend().kind(),
                elapsed_ms,
                "Tool executed successfully"
            ),
            Some(err) => tracing::warn!(
                tool = definition.name(),
                backend = definition.backend().kind(),
                status = %err.status(),
                elapsed_ms,
                error = %err,
                "Tool execution failed"
            ),
        }

        let record = ToolExecutionRecord::from_outcome(
            definition.id(),
            definition.name(),
            principal.id().clone(),
            arguments.clone(),
            &outcome,
            elapsed_ms,
            conversation_id,
        );
        if let Err(err) = self.store.record_execution(&record).await {
            tracing::error!(
                tool = definition.name(),
                execution_id = %record.id(),
                error = %err,
                "Failed to record tool execution or update statistics"
            );
        }

        outcome
    }
}
