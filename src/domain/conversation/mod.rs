//! Conversation domain - messages, history, pruning and prompts.

mod history;
mod message;
pub mod pruner;
mod prompt;

pub use history::{
    drop_leading_tool_results, validate_interleaving, ConversationHistory, InterleavingError,
    TokenUsage,
};
pub use message::{ChatMessage, Role, ToolCallRequest};
pub use prompt::{with_system_prompt, SystemPromptBuilder, DEFAULT_PERSONA};
pub use pruner::prune;
