//! Ports - async interfaces the application layer depends on.
//!
//! - `InferenceEndpoint` - the chat model
//! - `ToolStore` - tool catalog, statistics and audit trail
//! - `ToolBackend` - one execution backend kind

mod inference;
mod tool_backend;
mod tool_store;

pub use inference::{ChatChunk, ChatRequest, ChatResponse, ChatStream, InferenceEndpoint, InferenceError};
pub use tool_backend::{BackendError, ToolBackend};
pub use tool_store::{StoreError, ToolStore};
