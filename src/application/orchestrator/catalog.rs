//! Tool schemas offered to the model during one exchange.
//!
//! Starts with the bootstrap retriever and grows as the retriever returns
//! definitions. Lives only for the exchange that created it.

use std::collections::HashSet;

use crate::domain::tools::ToolDefinition;

#[derive(Debug, Clone, Default)]
pub struct OfferedTools {
    schemas: Vec<serde_json::Value>,
    names: HashSet<String>,
}

impl OfferedTools {
    /// No tools at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only the bootstrap tool.
    pub fn bootstrap(schema: serde_json::Value) -> Self {
        let mut offered = Self::default();
        offered.push(schema);
        offered
    }

    /// Adds definitions not yet offered. Returns the names actually added.
    pub fn extend(&mut self, definitions: &[ToolDefinition]) -> Vec<String> {
        let mut added = Vec::new();
        for definition in definitions {
            if self.contains(definition.name()) {
                continue;
            }
            if let Some(name) = self.push(definition.to_ollama_tool()) {
                added.push(name);
            }
        }
        added
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schemas for the next request, in the order they were offered.
    pub fn schemas(&self) -> Vec<serde_json::Value> {
        self.schemas.clone()
    }

    fn push(&mut self, schema: serde_json::Value) -> Option<String> {
        let name = schema["function"]["name"].as_str()?.to_string();
        if !self.names.insert(name.clone()) {
            return None;
        }
        self.schemas.push(schema);
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::script_tool;
    use crate::domain::tools::{bootstrap_tool_schema, TOOL_RETRIEVER_NAME};

    #[test]
    fn bootstrap_offers_only_the_retriever() {
        let offered = OfferedTools::bootstrap(bootstrap_tool_schema().clone());
        assert_eq!(offered.len(), 1);
        assert!(offered.contains(TOOL_RETRIEVER_NAME));
    }

    #[test]
    fn none_is_empty() {
        assert!(OfferedTools::none().is_empty());
    }

    #[test]
    fn extend_skips_already_offered_tools() {
        let mut offered = OfferedTools::bootstrap(bootstrap_tool_schema().clone());
        let mood = script_tool("log_mood", "wellbeing", "Record mood");
        let history = script_tool("mood_history", "wellbeing", "Past moods");

        let added = offered.extend(&[mood.clone(), history]);
        assert_eq!(added, vec!["log_mood", "mood_history"]);

        let added_again = offered.extend(&[mood]);
        assert!(added_again.is_empty());
        assert_eq!(offered.len(), 3);
        assert_eq!(offered.schemas()[1]["function"]["name"], "log_mood");
    }
}
