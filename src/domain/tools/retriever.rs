//! The bootstrap `tool_retriever` meta-tool.
//!
//! It is the only tool offered at the start of an exchange. Calling it
//! returns further tool definitions, which become callable on the next
//! model call.

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::{ToolDefinition, ToolFilter};

/// Fixed name of the bootstrap tool.
pub const TOOL_RETRIEVER_NAME: &str = "tool_retriever";

/// Categories advertised in the retriever's parameter schema.
pub const INTENT_CATEGORIES: [&str; 5] = ["wellbeing", "tasks", "reminders", "moments", "context"];

static BOOTSTRAP_TOOL: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_RETRIEVER_NAME,
            "description": "Retrieve available tools for performing actions or fetching data. \
                Call this FIRST when you need to interact with external systems, create/modify \
                data, or fetch information. Returns tool definitions you can then use.",
            "parameters": {
                "type": "object",
                "properties": {
                    "intent_category": {
                        "type": "string",
                        "enum": INTENT_CATEGORIES,
                        "description": "Category of tools needed"
                    },
                    "query": {
                        "type": "string",
                        "description": "Free-text description of what you want to do"
                    }
                },
                "required": []
            }
        }
    })
});

/// Ollama schema of the bootstrap tool.
pub fn bootstrap_tool_schema() -> &'static Value {
    &BOOTSTRAP_TOOL
}

/// Arguments the model passes to the retriever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieverArgs {
    pub category: Option<String>,
    pub query: Option<String>,
}

impl RetrieverArgs {
    /// Lenient parse: accepts `intent_category` or `category`; blank strings count as absent.
    pub fn from_arguments(arguments: &Value) -> Self {
        let text = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            category: text("intent_category").or_else(|| text("category")),
            query: text("query"),
        }
    }

    /// Category wins over query; neither means every active tool.
    pub fn filter(&self) -> ToolFilter {
        match (&self.category, &self.query) {
            (Some(category), _) => ToolFilter::Category(category.clone()),
            (None, Some(query)) => ToolFilter::Query(query.clone()),
            (None, None) => ToolFilter::All,
        }
    }

    /// Result payload returned to the model.
    pub fn response(&self, tools: &[ToolDefinition]) -> Map<String, Value> {
        let mut message = format!("Retrieved {} tools", tools.len());
        if let Some(category) = &self.category {
            message.push_str(&format!(" for category '{}'", category));
        } else if let Some(query) = &self.query {
            message.push_str(&format!(" matching '{}'", query));
        }

        let mut map = Map::new();
        map.insert("success".into(), Value::Bool(true));
        map.insert("tools_count".into(), json!(tools.len()));
        map.insert(
            "tools".into(),
            Value::Array(tools.iter().map(ToolDefinition::to_retriever_entry).collect()),
        );
        map.insert("message".into(), Value::String(message));
        map
    }
}
