//! Shared fixtures for application-layer tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::adapters::store::InMemoryToolStore;
use crate::domain::principal::Principal;
use crate::domain::tools::{ExecutionBackend, ToolDefinition};
use crate::ports::{BackendError, ToolBackend};

use super::{ToolBackends, ToolExecutor};

/// Backend replaying scripted results and capturing payloads.
///
/// Once the script runs out every call returns `{"success": true}`.
pub struct ScriptedBackend {
    results: Mutex<VecDeque<Result<Value, BackendError>>>,
    pub payloads: Mutex<Vec<Value>>,
}

impl ScriptedBackend {
    pub fn new(results: Vec<Result<Value, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            payloads: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ToolBackend for ScriptedBackend {
    async fn invoke(&self, _definition: &ToolDefinition, payload: &Value) -> Result<Value, BackendError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}

/// Executor routing every backend kind to `backend`.
pub fn executor_for(store: Arc<InMemoryToolStore>, backend: Arc<ScriptedBackend>) -> ToolExecutor {
    ToolExecutor::new(
        store,
        ToolBackends {
            script: backend.clone(),
            remote_function: backend.clone(),
            webhook: backend,
        },
    )
}

pub fn script_tool(name: &str, category: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(
        name,
        category,
        description,
        ExecutionBackend::Script { script_path: format!("{}.py", name), timeout_secs: 5 },
    )
}

pub fn mood_tool() -> ToolDefinition {
    script_tool("log_mood", "wellbeing", "Record the user's mood")
}

pub fn principal() -> Principal {
    Principal::authenticated("user-1", "ada@example.com", "ada")
}
