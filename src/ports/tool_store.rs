//! Tool Store Port - Catalog lookup, statistics and the execution audit trail.
//!
//! The catalog is written out-of-band; through this port the core only reads
//! definitions, appends audit records and bumps statistics.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use lifepal::ports::ToolStore;
//!
//! struct PostgresToolStore { /* ... */ }
//!
//! #[async_trait]
//! impl ToolStore for PostgresToolStore {
//!     async fn load_active_tools(&self, filter: &ToolFilter) -> Result<Vec<ToolDefinition>, StoreError> {
//!         // SELECT ... FROM tool_definitions WHERE is_active AND ...
//!     }
//!     // ... other methods
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::ToolId;
use crate::domain::tools::{ToolCategory, ToolDefinition, ToolExecutionRecord, ToolFilter, ToolStats};

/// Port for the tool catalog.
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Active definitions matching `filter`, in store order.
    async fn load_active_tools(&self, filter: &ToolFilter) -> Result<Vec<ToolDefinition>, StoreError>;

    /// Active categories, ordered by `order` then name.
    async fn list_categories(&self) -> Result<Vec<ToolCategory>, StoreError>;

    /// Appends an audit record.
    async fn save_execution_record(&self, record: &ToolExecutionRecord) -> Result<(), StoreError>;

    /// Folds one execution into the tool's statistics and returns the new values.
    ///
    /// Must be a safe increment: concurrent updates for the same tool never lose counts.
    async fn update_tool_stats(
        &self,
        tool_id: ToolId,
        success: bool,
        elapsed_ms: u64,
    ) -> Result<ToolStats, StoreError>;

    /// Exact-name lookup of an active tool.
    async fn find_active_tool(&self, name: &str) -> Result<Option<ToolDefinition>, StoreError> {
        let mut tools = self
            .load_active_tools(&ToolFilter::Name(name.to_string()))
            .await?;
        Ok(if tools.is_empty() { None } else { Some(tools.swap_remove(0)) })
    }

    /// Writes the audit record and the statistics update as one operation.
    ///
    /// The default runs the two calls back to back; stores that can make them
    /// atomic (one lock, one transaction) override it.
    async fn record_execution(&self, record: &ToolExecutionRecord) -> Result<ToolStats, StoreError> {
        self.save_execution_record(record).await?;
        self.update_tool_stats(record.tool_id(), record.is_success(), record.execution_time_ms())
            .await
    }
}

/// Errors from tool store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Tool not found: {0}")]
    ToolNotFound(ToolId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        StoreError::Database(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_store_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: ?Sized + Send + Sync>() {}
        assert_send_sync::<dyn ToolStore>();
    }

    #[test]
    fn errors_display_context() {
        let id = ToolId::new();
        assert_eq!(StoreError::ToolNotFound(id).to_string(), format!("Tool not found: {}", id));
        assert_eq!(StoreError::database("down").to_string(), "Database error: down");
    }
}
