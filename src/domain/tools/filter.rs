//! Filters for loading active tools from the store.

use super::ToolDefinition;

/// Which active tools to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFilter {
    All,
    Category(String),
    /// Case-insensitive substring match over name, display name and description.
    Query(String),
    Name(String),
}

impl ToolFilter {
    /// In-memory evaluation; SQL stores translate the same rules to WHERE clauses.
    ///
    /// Inactive tools never match.
    pub fn matches(&self, tool: &ToolDefinition) -> bool {
        if !tool.is_active() {
            return false;
        }
        match self {
            ToolFilter::All => true,
            ToolFilter::Category(category) => tool.category() == category,
            ToolFilter::Query(query) => tool.matches_query(query),
            ToolFilter::Name(name) => tool.name() == name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tools::ExecutionBackend;

    fn tool(name: &str, category: &str) -> ToolDefinition {
        ToolDefinition::new(
            name,
            category,
            format!("{} tool", name),
            ExecutionBackend::Script { script_path: "x.py".into(), timeout_secs: 5 },
        )
    }

    #[test]
    fn inactive_tools_never_match() {
        let t = tool("log_mood", "wellbeing").with_active(false);
        assert!(!ToolFilter::All.matches(&t));
        assert!(!ToolFilter::Name("log_mood".into()).matches(&t));
    }

    #[test]
    fn category_filter_is_exact() {
        let t = tool("log_mood", "wellbeing");
        assert!(ToolFilter::Category("wellbeing".into()).matches(&t));
        assert!(!ToolFilter::Category("Wellbeing".into()).matches(&t));
    }

    #[test]
    fn query_filter_uses_substring_match() {
        let t = tool("log_mood", "wellbeing");
        assert!(ToolFilter::Query("MOO".into()).matches(&t));
    }
}
