//! Events emitted by a streaming exchange.

use futures::Stream;
use serde::Serialize;
use std::pin::Pin;

use crate::domain::conversation::ConversationHistory;
use crate::domain::tools::ExecutionStatus;

/// Why an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered without requesting tools.
    Final,
    /// The model kept requesting tools until the iteration cap.
    IterationLimitExceeded,
}

/// Stream event for real-time updates.
///
/// A stream ends with exactly one `Completed` or `Failed` event, unless the
/// consumer stops reading first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A fragment of assistant text, forwarded as soon as it arrives.
    Content { delta: String },

    ToolStarted { name: String, call_id: String },

    ToolCompleted {
        name: String,
        call_id: String,
        status: ExecutionStatus,
        /// Whether the result payload reported success.
        success: bool,
    },

    /// The retriever returned tools; they are offered from the next model call.
    ToolsDiscovered { count: usize, names: Vec<String> },

    /// The exchange finished; `history` is what the caller should persist.
    Completed {
        content: String,
        history: ConversationHistory,
        stop_reason: StopReason,
    },

    /// The inference endpoint failed. Nothing should be persisted.
    Failed { message: String },
}

impl ConversationEvent {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversationEvent::Completed { .. } | ConversationEvent::Failed { .. }
        )
    }
}

/// Events of one streaming exchange.
pub type ConversationEventStream = Pin<Box<dyn Stream<Item = ConversationEvent> + Send>>;
