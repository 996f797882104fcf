//! Tool definition - catalog metadata for an executable tool.
//!
//! Definitions are authored out-of-band (seed catalog, database). The
//! orchestrator only reads them, apart from the running statistics that are
//! bumped after every execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ToolId, ValidationError};

fn default_timeout_secs() -> u64 {
    30
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "1.0".to_string()
}

/// HTTP verb used by a webhook backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    Get,
    #[default]
    Post,
}

/// Where and how a tool actually runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "execution_type", rename_all = "snake_case")]
pub enum ExecutionBackend {
    /// Local subprocess speaking JSON over stdin/stdout.
    Script {
        script_path: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Region-scoped managed function invoked synchronously.
    RemoteFunction {
        function_id: String,
        #[serde(default = "default_region")]
        region: String,
    },

    /// External HTTP endpoint.
    Webhook {
        url: String,
        #[serde(default)]
        method: WebhookMethod,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ExecutionBackend {
    /// Short label used in logs and the audit table.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionBackend::Script { .. } => "script",
            ExecutionBackend::RemoteFunction { .. } => "remote_function",
            ExecutionBackend::Webhook { .. } => "webhook",
        }
    }
}

/// Running execution statistics for a tool.
///
/// `avg_execution_time_ms` is a running mean: each new sample is folded in
/// from the previous mean and the updated count.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolStats {
    pub execution_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub avg_execution_time_ms: f64,
}

impl ToolStats {
    /// Folds one execution into the statistics.
    pub fn record(&mut self, success: bool, elapsed_ms: u64) {
        self.execution_count += 1;
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        let n = self.execution_count as f64;
        self.avg_execution_time_ms =
            (self.avg_execution_time_ms * (n - 1.0) + elapsed_ms as f64) / n;
    }

    /// Fraction of executions that succeeded, 0.0 when never run.
    pub fn success_rate(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.execution_count as f64
        }
    }
}

/// A tool the model can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(default)]
    id: ToolId,
    name: String,
    #[serde(default)]
    display_name: String,
    category: String,
    description: String,
    #[serde(default)]
    usage_examples: Vec<String>,
    #[serde(flatten)]
    backend: ExecutionBackend,
    #[serde(default = "empty_object_schema")]
    parameters_schema: serde_json::Value,
    #[serde(default)]
    response_schema: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default = "default_true")]
    requires_auth: bool,
    #[serde(default)]
    allowed_roles: Vec<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    stats: ToolStats,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    /// Creates an active, auth-requiring definition with an empty parameter schema.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        backend: ExecutionBackend,
    ) -> Self {
        let name = name.into();
        Self {
            id: ToolId::new(),
            display_name: name.clone(),
            name,
            category: category.into(),
            description: description.into(),
            usage_examples: Vec::new(),
            backend,
            parameters_schema: empty_object_schema(),
            response_schema: None,
            is_active: true,
            requires_auth: true,
            allowed_roles: Vec::new(),
            version: default_version(),
            stats: ToolStats::default(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_parameters_schema(mut self, schema: serde_json::Value) -> Self {
        self.parameters_schema = schema;
        self
    }

    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_usage_example(mut self, example: impl Into<String>) -> Self {
        self.usage_examples.push(example.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn with_allowed_roles(mut self, roles: Vec<String>) -> Self {
        self.allowed_roles = roles;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_id(mut self, id: ToolId) -> Self {
        self.id = id;
        self
    }

    pub fn with_stats(mut self, stats: ToolStats) -> Self {
        self.stats = stats;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Getters
    // ═══════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> ToolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn usage_examples(&self) -> &[String] {
        &self.usage_examples
    }

    pub fn backend(&self) -> &ExecutionBackend {
        &self.backend
    }

    pub fn parameters_schema(&self) -> &serde_json::Value {
        &self.parameters_schema
    }

    pub fn response_schema(&self) -> Option<&serde_json::Value> {
        self.response_schema.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn allowed_roles(&self) -> &[String] {
        &self.allowed_roles
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn stats(&self) -> &ToolStats {
        &self.stats
    }

    /// Mutable access to the statistics, for stores that keep definitions in memory.
    pub fn stats_mut(&mut self) -> &mut ToolStats {
        &mut self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries and conversions
    // ═══════════════════════════════════════════════════════════════════════

    /// Case-insensitive substring match over name, display name and description.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [&self.name, &self.display_name, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Ollama tool-calling schema.
    pub fn to_ollama_tool(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema
            }
        })
    }

    /// Plain map returned to the model by the retriever tool.
    pub fn to_retriever_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "category": self.category,
            "parameters": self.parameters_schema
        })
    }

    /// Checks the fields a catalog author can get wrong.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::empty_field("category"));
        }
        match &self.backend {
            ExecutionBackend::Script { script_path, timeout_secs } => {
                if script_path.trim().is_empty() {
                    return Err(ValidationError::empty_field("script_path"));
                }
                if *timeout_secs == 0 {
                    return Err(ValidationError::invalid_format(
                        "timeout_secs",
                        "must be greater than zero",
                    ));
                }
            }
            ExecutionBackend::RemoteFunction { function_id, .. } => {
                if function_id.trim().is_empty() {
                    return Err(ValidationError::empty_field("function_id"));
                }
            }
            ExecutionBackend::Webhook { url, timeout_secs, .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ValidationError::invalid_format(
                        "url",
                        "must start with http:// or https://",
                    ));
                }
                if *timeout_secs == 0 {
                    return Err(ValidationError::invalid_format(
                        "timeout_secs",
                        "must be greater than zero",
                    ));
                }
            }
        }
        Ok(())
    }
}
