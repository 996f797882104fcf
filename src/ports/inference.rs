//! Inference Endpoint Port - Interface to the chat model.
//!
//! The orchestrator talks to the model only through this port, so tests can
//! script responses and production can point at a local Ollama server.
//!
//! # Design
//!
//! - Buffered (`chat`) and incremental (`chat_stream`) calls share one request type
//! - Tool catalogs are passed as ready-made JSON schemas
//! - Incremental chunks are concatenable: content deltas append, tool calls accumulate
//!
//! # Example
//!
//! ```ignore
//! let request = ChatRequest::new(messages).with_tools(catalog.schemas());
//! let response = endpoint.chat(request).await?;
//! if response.message.has_tool_calls() { /* execute */ }
//! ```

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::conversation::{ChatMessage, TokenUsage, ToolCallRequest};

/// Stream of incremental chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, InferenceError>> + Send>>;

/// Port for the chat model.
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    /// One complete assistant message.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError>;

    /// Partial messages as they are produced. The last chunk has `done` set
    /// and carries the call's token usage.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, InferenceError>;

    /// Cheap health probe.
    async fn is_available(&self) -> bool;

    /// Model identifier requests are sent to.
    fn model_name(&self) -> &str;
}

/// A chat request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Ollama-style tool schemas offered for this call.
    pub tools: Vec<serde_json::Value>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Names of the offered tools, in catalog order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|t| t["function"]["name"].as_str())
            .collect()
    }
}

/// A buffered response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Always an assistant message.
    pub message: ChatMessage,
    pub usage: TokenUsage,
    pub model: String,
}

/// One incremental piece of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub done: bool,
    pub usage: Option<TokenUsage>,
}

impl ChatChunk {
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            content: delta.into(),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn final_chunk(usage: TokenUsage) -> Self {
        Self {
            done: true,
            usage: Some(usage),
            ..Default::default()
        }
    }
}

/// Inference failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    #[error("inference endpoint unavailable: {message}")]
    Unavailable { message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
}

impl InferenceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        InferenceError::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        InferenceError::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        InferenceError::Parse(message.into())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::Unavailable { .. }
                | InferenceError::Network(_)
                | InferenceError::Timeout { .. }
                | InferenceError::StreamInterrupted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builder_sets_fields() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .with_tools(vec![json!({"type": "function", "function": {"name": "tool_retriever"}})])
            .with_temperature(0.2);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.tool_names(), vec!["tool_retriever"]);
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn final_chunk_is_done_with_usage() {
        let chunk = ChatChunk::final_chunk(TokenUsage::new(3, 4));
        assert!(chunk.done);
        assert_eq!(chunk.usage.map(|u| u.total_tokens), Some(7));
        assert!(chunk.content.is_empty());
    }

    #[test]
    fn retryable_errors() {
        assert!(InferenceError::network("reset").is_retryable());
        assert!(InferenceError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(!InferenceError::parse("bad json").is_retryable());
        assert!(!InferenceError::ModelNotFound("llama".into()).is_retryable());
    }

    #[test]
    fn endpoint_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: ?Sized + Send + Sync>() {}
        assert_send_sync::<dyn InferenceEndpoint>();
    }
}
