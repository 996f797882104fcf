//! Tool category - a coarse discovery namespace.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A namespace label tools reference by name.
///
/// The reference is soft: a tool may name a category the store does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCategory {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ToolCategory {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: description.into(),
            order: 0,
            is_active: true,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Sorts categories the way they are presented: by `order`, then name.
pub fn sort_categories(categories: &mut [ToolCategory]) {
    categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_display_name_to_name() {
        let c = ToolCategory::new("wellbeing", "Mood and energy");
        assert_eq!(c.display_name, "wellbeing");
        assert!(c.is_active);
    }

    #[test]
    fn sort_uses_order_then_name() {
        let mut cats = vec![
            ToolCategory::new("tasks", "").with_order(2),
            ToolCategory::new("wellbeing", "").with_order(1),
            ToolCategory::new("moments", "").with_order(2),
        ];
        sort_categories(&mut cats);
        let names: Vec<_> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["wellbeing", "moments", "tasks"]);
    }
}
