//! In-memory tool store.
//!
//! Keeps the catalog, categories and audit trail behind one `Mutex`, so an
//! audit append and its statistics update happen under a single lock.
//! Useful for tests, development and single-process deployments seeded from
//! a YAML catalog. Nothing survives a restart.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::ToolId;
use crate::domain::tools::{
    sort_categories, ToolCategory, ToolDefinition, ToolExecutionRecord, ToolFilter, ToolStats,
};
use crate::ports::{StoreError, ToolStore};

#[derive(Debug, Default)]
struct State {
    tools: Vec<ToolDefinition>,
    categories: Vec<ToolCategory>,
    records: Vec<ToolExecutionRecord>,
}

impl State {
    fn bump_stats(&mut self, tool_id: ToolId, success: bool, elapsed_ms: u64) -> Result<ToolStats, StoreError> {
        let tool = self
            .tools
            .iter_mut()
            .find(|t| t.id() == tool_id)
            .ok_or(StoreError::ToolNotFound(tool_id))?;
        tool.stats_mut().record(success, elapsed_ms);
        Ok(*tool.stats())
    }
}

/// In-memory implementation of the ToolStore port.
#[derive(Debug, Default)]
pub struct InMemoryToolStore {
    state: Mutex<State>,
}

impl InMemoryToolStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool (builder style, for seeding).
    pub fn with_tool(self, tool: ToolDefinition) -> Self {
        self.insert_tool(tool);
        self
    }

    pub fn with_category(self, category: ToolCategory) -> Self {
        self.lock().categories.push(category);
        self
    }

    /// Adds a tool, replacing any existing tool with the same name.
    pub fn insert_tool(&self, tool: ToolDefinition) {
        let mut state = self.lock();
        state.tools.retain(|t| t.name() != tool.name());
        state.tools.push(tool);
    }

    pub fn insert_category(&self, category: ToolCategory) {
        let mut state = self.lock();
        state.categories.retain(|c| c.name != category.name);
        state.categories.push(category);
    }

    /// Current definition of a tool, active or not.
    pub fn tool(&self, name: &str) -> Option<ToolDefinition> {
        self.lock().tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Snapshot of the audit trail, oldest first.
    pub fn records(&self) -> Vec<ToolExecutionRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave State half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ToolStore for InMemoryToolStore {
    async fn load_active_tools(&self, filter: &ToolFilter) -> Result<Vec<ToolDefinition>, StoreError> {
        Ok(self
            .lock()
            .tools
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<ToolCategory>, StoreError> {
        let mut categories: Vec<_> = self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        sort_categories(&mut categories);
        Ok(categories)
    }

    async fn save_execution_record(&self, record: &ToolExecutionRecord) -> Result<(), StoreError> {
        self.lock().records.push(record.clone());
        Ok(())
    }

    async fn update_tool_stats(
        &self,
        tool_id: ToolId,
        success: bool,
        elapsed_ms: u64,
    ) -> Result<ToolStats, StoreError> {
        self.lock().bump_stats(tool_id, success, elapsed_ms)
    }

    async fn record_execution(&self, record: &ToolExecutionRecord) -> Result<ToolStats, StoreError> {
        // The audit entry is kept even when the tool has since been removed.
        let mut state = self.lock();
        state.records.push(record.clone());
        state.bump_stats(record.tool_id(), record.is_success(), record.execution_time_ms())
    }
}
