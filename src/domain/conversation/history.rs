//! Conversation history and token accounting.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ChatMessage, Role};

/// Running token counters reported by the inference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Adds another call's usage.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// History handed to and returned by the orchestrator.
///
/// Owned by the caller between exchanges. The caller serializes access per
/// conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ConversationHistory {
    pub fn new(messages: Vec<ChatMessage>, usage: TokenUsage) -> Self {
        Self { messages, usage }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A broken call/result interleaving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterleavingError {
    #[error("tool message at index {index} does not follow an assistant tool-call turn")]
    OrphanedToolResult { index: usize },

    #[error("tool message at index {index} answers unknown call id '{call_id}'")]
    UnknownCallId { index: usize, call_id: String },
}

/// Checks that every tool message sits in the contiguous block after an
/// assistant message whose tool calls include its id.
pub fn validate_interleaving(messages: &[ChatMessage]) -> Result<(), InterleavingError> {
    let mut open_calls: Option<HashSet<&str>> = None;

    for (index, message) in messages.iter().enumerate() {
        match message.role() {
            Role::Tool => {
                let calls = open_calls
                    .as_ref()
                    .ok_or(InterleavingError::OrphanedToolResult { index })?;
                let call_id = message.tool_call_id().unwrap_or_default();
                if !calls.contains(call_id) {
                    return Err(InterleavingError::UnknownCallId {
                        index,
                        call_id: call_id.to_string(),
                    });
                }
            }
            Role::Assistant if message.has_tool_calls() => {
                open_calls = Some(message.tool_calls().iter().map(|c| c.id()).collect());
            }
            _ => open_calls = None,
        }
    }
    Ok(())
}

/// Drops tool messages at the head of a history slice.
///
/// A tail slice can start in the middle of a tool-result block, leaving
/// results whose assistant turn was cut off.
pub fn drop_leading_tool_results(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let skip = messages
        .iter()
        .take_while(|m| m.role() == Role::Tool)
        .count();
    if skip == 0 {
        messages
    } else {
        messages.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ToolCallRequest;
    use serde_json::json;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "log_mood", json!({}))
    }

    mod usage {
        use super::*;

        #[test]
        fn new_sums_total() {
            assert_eq!(TokenUsage::new(10, 5).total_tokens, 15);
        }

        #[test]
        fn add_accumulates_all_counters() {
            let mut usage = TokenUsage::new(1, 2);
            usage.add(TokenUsage::new(10, 20));
            assert_eq!(usage, TokenUsage { input_tokens: 11, output_tokens: 22, total_tokens: 33 });
        }
    }

    mod interleaving {
        use super::*;

        #[test]
        fn accepts_valid_block() {
            let messages = vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant_with_tool_calls("", vec![call("a"), call("b")]),
                ChatMessage::tool_result("a", "log_mood", "{}"),
                ChatMessage::tool_result("b", "log_mood", "{}"),
                ChatMessage::assistant("done"),
            ];
            assert!(validate_interleaving(&messages).is_ok());
        }

        #[test]
        fn rejects_tool_without_assistant() {
            let messages = vec![
                ChatMessage::user("hi"),
                ChatMessage::tool_result("a", "log_mood", "{}"),
            ];
            assert_eq!(
                validate_interleaving(&messages),
                Err(InterleavingError::OrphanedToolResult { index: 1 })
            );
        }

        #[test]
        fn rejects_unknown_call_id() {
            let messages = vec![
                ChatMessage::assistant_with_tool_calls("", vec![call("a")]),
                ChatMessage::tool_result("zzz", "log_mood", "{}"),
            ];
            assert!(matches!(
                validate_interleaving(&messages),
                Err(InterleavingError::UnknownCallId { index: 1, .. })
            ));
        }

        #[test]
        fn block_ends_at_next_non_tool_message() {
            let messages = vec![
                ChatMessage::assistant_with_tool_calls("", vec![call("a")]),
                ChatMessage::tool_result("a", "log_mood", "{}"),
                ChatMessage::user("again"),
                ChatMessage::tool_result("a", "log_mood", "{}"),
            ];
            assert!(validate_interleaving(&messages).is_err());
        }
    }

    #[test]
    fn drop_leading_tool_results_repairs_head() {
        let messages = vec![
            ChatMessage::tool_result("a", "log_mood", "{}"),
            ChatMessage::tool_result("b", "log_mood", "{}"),
            ChatMessage::assistant("done"),
        ];
        let repaired = drop_leading_tool_results(messages);
        assert_eq!(repaired, vec![ChatMessage::assistant("done")]);
        assert!(validate_interleaving(&repaired).is_ok());
    }
}
