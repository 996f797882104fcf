//! System prompt assembly.
//!
//! The prompt is rebuilt for every exchange and only ever prepended to the
//! outgoing request; it is not written back into the caller's history.

use chrono::{DateTime, Utc};

use crate::domain::tools::{ToolCategory, TOOL_RETRIEVER_NAME};

use super::{ChatMessage, Role};

/// Persona used when the caller supplies none.
pub const DEFAULT_PERSONA: &str = "You are LifePal, a supportive life assistant and wellbeing companion.

Your core personality:
- Empathetic and understanding, never judgmental
- Encouraging and supportive while staying realistic
- Respectful of boundaries and privacy
- Able to recognise when professional help might be needed

You help with journaling, to-do lists, wellbeing check-ins, reminders and habit building.
Respond with warmth and use markdown formatting for readability.";

/// Builds the system prompt for one exchange.
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    persona: String,
    include_tool_instructions: bool,
    user_context: Option<String>,
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl SystemPromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            include_tool_instructions: true,
            user_context: None,
        }
    }

    pub fn with_tool_instructions(mut self, include: bool) -> Self {
        self.include_tool_instructions = include;
        self
    }

    /// Free-text facts about the user, rendered under a USER CONTEXT section.
    pub fn with_user_context(mut self, context: impl Into<String>) -> Self {
        self.user_context = Some(context.into());
        self
    }

    /// Renders the prompt.
    ///
    /// Tool instructions are only emitted when `tools_enabled` and the builder
    /// was configured to include them.
    pub fn build(&self, now: DateTime<Utc>, categories: &[ToolCategory], tools_enabled: bool) -> String {
        let mut prompt = self.persona.clone();

        if tools_enabled && self.include_tool_instructions {
            prompt.push_str("\n\n=== YOUR CAPABILITIES ===\n");
            prompt.push_str(&tool_instructions(categories));
        }

        prompt.push_str("\n\n=== CURRENT CONTEXT ===\n");
        prompt.push_str(&format!(
            "Today's Date: {}\nCurrent Time: {} UTC",
            now.format("%A, %B %d, %Y"),
            now.format("%H:%M")
        ));

        if let Some(context) = self.user_context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str("\n\n=== USER CONTEXT ===\n");
            prompt.push_str(context);
        }

        prompt
    }
}

fn tool_instructions(categories: &[ToolCategory]) -> String {
    let category_list = if categories.is_empty() {
        "No categories available yet.".to_string()
    } else {
        categories
            .iter()
            .filter(|c| c.is_active)
            .map(|c| format!("- **{}**: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You can perform actions and fetch data through tools.\n\
         \n\
         Use tools silently: never tell the user you are calling or retrieving tools.\n\
         \n\
         Call **{retriever}** FIRST when the user asks what you can do, or when a request\n\
         needs live data or an action (tasks, reminders, check-ins, moments). Pass an\n\
         `intent_category` or a free-text `query`. Only mention tools that {retriever}\n\
         actually returned. General conversation needs no tools.\n\
         \n\
         Categories for {retriever} (these are not tools):\n\
         {categories}",
        retriever = TOOL_RETRIEVER_NAME,
        categories = category_list
    )
}

/// Returns the request messages with `prompt` prepended, unless the history
/// already opens with a system message.
pub fn with_system_prompt(history: &[ChatMessage], prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if history.first().map(ChatMessage::role) != Some(Role::System) {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend_from_slice(history);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn includes_date_and_time() {
        let prompt = SystemPromptBuilder::default().build(fixed_now(), &[], false);
        assert!(prompt.contains("Today's Date: Saturday, March 14, 2026"));
        assert!(prompt.contains("Current Time: 09:30 UTC"));
    }

    #[test]
    fn lists_categories_when_tools_enabled() {
        let categories = vec![ToolCategory::new("wellbeing", "Mood and energy")];
        let prompt = SystemPromptBuilder::default().build(fixed_now(), &categories, true);

        assert!(prompt.contains("=== YOUR CAPABILITIES ==="));
        assert!(prompt.contains("- **wellbeing**: Mood and energy"));
        assert!(prompt.contains(TOOL_RETRIEVER_NAME));
    }

    #[test]
    fn omits_capabilities_when_tools_disabled() {
        let prompt = SystemPromptBuilder::default().build(fixed_now(), &[], false);
        assert!(!prompt.contains("=== YOUR CAPABILITIES ==="));
    }

    #[test]
    fn blank_user_context_is_skipped() {
        let prompt = SystemPromptBuilder::default()
            .with_user_context("  ")
            .build(fixed_now(), &[], false);
        assert!(!prompt.contains("USER CONTEXT"));
    }

    #[test]
    fn prepends_when_first_is_not_system() {
        let history = vec![ChatMessage::user("hi")];
        let messages = with_system_prompt(&history, "prompt");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), Role::System);
    }

    #[test]
    fn keeps_existing_system_message() {
        let history = vec![ChatMessage::system("custom"), ChatMessage::user("hi")];
        let messages = with_system_prompt(&history, "prompt");
        assert_eq!(messages, history);
    }
}
