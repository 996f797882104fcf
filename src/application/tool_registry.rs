//! Tool registry - catalog queries and name-based execution.
//!
//! The registry is an explicitly constructed value holding the store and the
//! executor; there is no process-wide catalog. The bootstrap `tool_retriever`
//! never touches the store for its own definition and is resolved here rather
//! than by a backend.

use std::sync::Arc;

use crate::domain::foundation::ConversationId;
use crate::domain::principal::Principal;
use crate::domain::tools::{
    bootstrap_tool_schema, RetrieverArgs, ToolCategory, ToolDefinition, ToolError, ToolFilter,
    ToolOutcome, TOOL_RETRIEVER_NAME,
};
use crate::ports::{StoreError, ToolStore};

use super::ToolExecutor;

/// Result of executing a tool by name.
#[derive(Debug, Clone)]
pub struct RegistryExecution {
    pub outcome: ToolOutcome,
    /// Definitions returned by a successful retriever call; empty otherwise.
    pub discovered: Vec<ToolDefinition>,
}

impl RegistryExecution {
    fn plain(outcome: ToolOutcome) -> Self {
        Self {
            outcome,
            discovered: Vec::new(),
        }
    }
}

/// Catalog queries plus execution by tool name.
#[derive(Clone)]
pub struct ToolRegistry {
    store: Arc<dyn ToolStore>,
    executor: ToolExecutor,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn ToolStore>, executor: ToolExecutor) -> Self {
        Self { store, executor }
    }

    /// Ollama schema of the bootstrap tool.
    pub fn get_bootstrap_tool(&self) -> serde_json::Value {
        bootstrap_tool_schema().clone()
    }

    pub async fn find_by_category(&self, category: &str) -> Result<Vec<ToolDefinition>, StoreError> {
        self.store
            .load_active_tools(&ToolFilter::Category(category.to_string()))
            .await
    }

    /// Case-insensitive substring search; results are in store order, unranked.
    pub async fn find_by_query(&self, query: &str) -> Result<Vec<ToolDefinition>, StoreError> {
        self.store
            .load_active_tools(&ToolFilter::Query(query.to_string()))
            .await
    }

    pub async fn find_all(&self) -> Result<Vec<ToolDefinition>, StoreError> {
        self.store.load_active_tools(&ToolFilter::All).await
    }

    /// Names of all active tools.
    pub async fn list_tool_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .find_all()
            .await?
            .iter()
            .map(|t| t.name().to_string())
            .collect())
    }

    pub async fn list_categories(&self) -> Result<Vec<ToolCategory>, StoreError> {
        self.store.list_categories().await
    }

    /// Executes the tool called `name`.
    ///
    /// Lookup and permission failures come back as `ToolOutcome::Failure`,
    /// never as an `Err`, so the caller can hand them to the model.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        principal: &Principal,
        conversation_id: Option<ConversationId>,
    ) -> RegistryExecution {
        if name == TOOL_RETRIEVER_NAME {
            return self.retrieve(arguments).await;
        }

        let definition = match self.store.find_active_tool(name).await {
            Ok(Some(definition)) => definition,
            Ok(None) => {
                tracing::warn!(tool = name, "Model requested unknown tool");
                return RegistryExecution::plain(ToolOutcome::Failure(ToolError::not_found(name)));
            }
            Err(err) => {
                tracing::error!(tool = name, error = %err, "Tool lookup failed");
                return RegistryExecution::plain(ToolOutcome::Failure(ToolError::Store(
                    err.to_string(),
                )));
            }
        };

        if let Err(err) = authorize(&definition, principal) {
            tracing::warn!(
                tool = name,
                principal_id = %principal.id(),
                error = %err,
                "Tool call rejected"
            );
            return RegistryExecution::plain(ToolOutcome::Failure(err));
        }

        let outcome = self
            .executor
            .execute(&definition, arguments, principal, conversation_id)
            .await;
        RegistryExecution::plain(outcome)
    }

    async fn retrieve(&self, arguments: &serde_json::Value) -> RegistryExecution {
        let args = RetrieverArgs::from_arguments(arguments);
        match self.store.load_active_tools(&args.filter()).await {
            Ok(tools) => {
                tracing::info!(
                    category = args.category.as_deref(),
                    query = args.query.as_deref(),
                    tools_count = tools.len(),
                    "Tool retriever resolved tools"
                );
                RegistryExecution {
                    outcome: ToolOutcome::Success(args.response(&tools)),
                    discovered: tools,
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Tool retriever failed");
                RegistryExecution::plain(ToolOutcome::Failure(ToolError::Store(err.to_string())))
            }
        }
    }
}

fn authorize(definition: &ToolDefinition, principal: &Principal) -> Result<(), ToolError> {
    if definition.requires_auth() && !principal.is_authenticated() {
        return Err(ToolError::unauthorized(
            definition.name(),
            "authentication required",
        ));
    }
    if !principal.has_any_role(definition.allowed_roles()) {
        return Err(ToolError::unauthorized(
            definition.name(),
            format!("requires one of roles: {}", definition.allowed_roles().join(", ")),
        ));
    }
    Ok(())
}
