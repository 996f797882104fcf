//! Application layer - services coordinating domain operations through ports.
//!
//! - `ToolExecutor` - runs a tool on its backend and writes the audit trail
//! - `ToolRegistry` - catalog queries and name-based execution
//! - `ConversationOrchestrator` - the model/tool loop, buffered or streaming

pub mod orchestrator;
mod tool_executor;
mod tool_registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{
    ConversationError, ConversationEvent, ConversationEventStream, ConversationOrchestrator,
    ConversationReply, ExchangeCommand, OrchestratorConfig, StopReason,
};
pub use tool_executor::{ToolBackends, ToolExecutor};
pub use tool_registry::{RegistryExecution, ToolRegistry};
