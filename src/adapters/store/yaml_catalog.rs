//! YAML tool catalog.
//!
//! Seeds a store from a file of categories and tool definitions:
//!
//! ```yaml
//! categories:
//!   - name: wellbeing
//!     description: Mood, energy and check-ins
//!     order: 1
//! tools:
//!   - name: log_mood
//!     category: wellbeing
//!     description: Record the user's mood
//!     execution_type: script
//!     script_path: tools/log_mood.py
//!     timeout_secs: 10
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::domain::tools::{ToolCategory, ToolDefinition};
use crate::ports::StoreError;

use super::InMemoryToolStore;

/// Parsed contents of a catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCatalog {
    #[serde(default)]
    pub categories: Vec<ToolCategory>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    /// Parses and validates catalog YAML.
    ///
    /// # Errors
    ///
    /// - `Serialization` if the YAML does not match the catalog shape
    /// - `InvalidCatalog` for an invalid tool or a duplicate tool name
    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        let catalog: ToolCatalog =
            serde_yaml::from_str(yaml).map_err(|e| StoreError::Serialization(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reads a catalog file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::InvalidCatalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            tool.validate()
                .map_err(|e| StoreError::InvalidCatalog(format!("tool '{}': {}", tool.name(), e)))?;
            if !seen.insert(tool.name()) {
                return Err(StoreError::InvalidCatalog(format!(
                    "duplicate tool name '{}'",
                    tool.name()
                )));
            }
        }
        Ok(())
    }

    /// Copies everything into `store`, replacing same-named entries.
    pub fn seed(&self, store: &InMemoryToolStore) {
        for category in &self.categories {
            store.insert_category(category.clone());
        }
        for tool in &self.tools {
            store.insert_tool(tool.clone());
        }
        tracing::info!(
            tools = self.tools.len(),
            categories = self.categories.len(),
            "Seeded tool catalog"
        );
    }

    /// Builds a fresh in-memory store holding this catalog.
    pub fn into_store(self) -> InMemoryToolStore {
        let store = InMemoryToolStore::new();
        self.seed(&store);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tools::{ExecutionBackend, ToolFilter, WebhookMethod};
    use crate::ports::ToolStore;
    use std::io::Write;

    const CATALOG: &str = r#"
categories:
  - name: wellbeing
    display_name: Wellbeing
    description: Mood, energy and check-ins
    order: 1
  - name: tasks
    description: To-do items
    order: 2
tools:
  - name: log_mood
    display_name: Log Mood
    category: wellbeing
    description: Record the user's mood
    execution_type: script
    script_path: tools/log_mood.py
    timeout_secs: 10
    parameters_schema:
      type: object
      properties:
        score: { type: integer }
      required: [score]
  - name: create_task
    category: tasks
    description: Create a to-do item
    execution_type: webhook
    url: https://tasks.example.com/api
    method: GET
    headers:
      X-Api-Key: abc
    requires_auth: false
    allowed_roles: [member]
"#;

    #[test]
    fn parses_tools_and_categories() {
        let catalog = ToolCatalog::from_yaml(CATALOG).unwrap();

        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.tools.len(), 2);

        let mood = &catalog.tools[0];
        assert_eq!(mood.display_name(), "Log Mood");
        assert_eq!(
            mood.backend(),
            &ExecutionBackend::Script { script_path: "tools/log_mood.py".into(), timeout_secs: 10 }
        );
        assert_eq!(mood.parameters_schema()["required"][0], "score");

        let task = &catalog.tools[1];
        assert!(!task.requires_auth());
        assert_eq!(task.allowed_roles(), &["member".to_string()]);
        match task.backend() {
            ExecutionBackend::Webhook { method, headers, .. } => {
                assert_eq!(*method, WebhookMethod::Get);
                assert_eq!(headers.get("X-Api-Key").map(String::as_str), Some("abc"));
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let yaml = r#"
tools:
  - { name: a, category: c, description: d, execution_type: script, script_path: a.py }
  - { name: a, category: c, description: d, execution_type: script, script_path: b.py }
"#;
        let err = ToolCatalog::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate tool name 'a'"));
    }

    #[test]
    fn rejects_invalid_tool() {
        let yaml = r#"
tools:
  - { name: hook, category: c, description: d, execution_type: webhook, url: not-a-url }
"#;
        assert!(matches!(
            ToolCatalog::from_yaml(yaml),
            Err(StoreError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(
            ToolCatalog::from_yaml("tools: [unclosed"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_file_and_seeds_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let store = ToolCatalog::load(file.path()).await.unwrap().into_store();

        let tools = store.load_active_tools(&ToolFilter::All).await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(store.list_categories().await.unwrap()[0].name, "wellbeing");
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let result = ToolCatalog::load("/nonexistent/catalog.yaml").await;
        assert!(matches!(result, Err(StoreError::InvalidCatalog(_))));
    }
}
