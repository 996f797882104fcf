//! Mock inference endpoint for testing.
//!
//! Scripted replies are consumed in order; every request is recorded so
//! tests can inspect the tool catalog and messages each call received.
//!
//! # Example
//!
//! ```ignore
//! let endpoint = MockInferenceEndpoint::new()
//!     .with_tool_call("tool_retriever", json!({"intent_category": "wellbeing"}))
//!     .with_reply("Logged!");
//!
//! let response = endpoint.chat(request).await?;
//! assert!(response.message.has_tool_calls());
//! ```

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::conversation::{ChatMessage, TokenUsage, ToolCallRequest};
use crate::ports::{ChatChunk, ChatRequest, ChatResponse, ChatStream, InferenceEndpoint, InferenceError};

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A complete assistant message.
    Message {
        content: String,
        tool_calls: Vec<ToolCallRequest>,
        usage: TokenUsage,
    },
    /// The call fails before producing anything.
    Error(InferenceError),
    /// Streaming yields `partial` and then fails; buffered calls just fail.
    BrokenStream { partial: String },
}

/// Scripted inference endpoint.
#[derive(Debug, Clone)]
pub struct MockInferenceEndpoint {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: Option<MockReply>,
    delay: Duration,
    calls: Arc<Mutex<Vec<ChatRequest>>>,
}

impl Default for MockInferenceEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferenceEndpoint {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            fallback: None,
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a plain text reply.
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.push(MockReply::Message {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: TokenUsage::new(10, 20),
        })
    }

    /// Queues a reply requesting a single tool call.
    pub fn with_tool_call(self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let index = self.replies.lock().unwrap().len();
        let call = ToolCallRequest::new(format!("call_{}", index), name, arguments);
        self.with_tool_calls(vec![call])
    }

    /// Queues a reply requesting several tool calls.
    pub fn with_tool_calls(self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.push(MockReply::Message {
            content: String::new(),
            tool_calls,
            usage: TokenUsage::new(10, 5),
        })
    }

    /// Queues an arbitrary reply.
    pub fn with(self, reply: MockReply) -> Self {
        self.push(reply)
    }

    /// Queues a failure.
    pub fn with_error(self, error: InferenceError) -> Self {
        self.push(MockReply::Error(error))
    }

    /// Reply used once the queue is empty, instead of the default text.
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this endpoint.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded requests.
    pub fn get_calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn push(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    async fn next_reply(&self, request: ChatRequest) -> MockReply {
        self.calls.lock().unwrap().push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        queued
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| MockReply::Message {
                content: "Mock response".to_string(),
                tool_calls: Vec::new(),
                usage: TokenUsage::new(5, 10),
            })
    }
}

#[async_trait]
impl InferenceEndpoint for MockInferenceEndpoint {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        match self.next_reply(request).await {
            MockReply::Message { content, tool_calls, usage } => Ok(ChatResponse {
                message: ChatMessage::assistant_with_tool_calls(content, tool_calls),
                usage,
                model: "mock-model".to_string(),
            }),
            MockReply::Error(err) => Err(err),
            MockReply::BrokenStream { .. } => {
                Err(InferenceError::StreamInterrupted("mock stream broke".into()))
            }
        }
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, InferenceError> {
        let chunks: Vec<Result<ChatChunk, InferenceError>> = match self.next_reply(request).await {
            MockReply::Message { content, tool_calls, usage } => {
                // Split on spaces so consumers see several deltas.
                let mut chunks: Vec<_> = content
                    .split_inclusive(' ')
                    .map(|piece| Ok(ChatChunk::content(piece)))
                    .collect();
                if !tool_calls.is_empty() {
                    chunks.push(Ok(ChatChunk::tool_calls(tool_calls)));
                }
                chunks.push(Ok(ChatChunk::final_chunk(usage)));
                chunks
            }
            MockReply::Error(err) => return Err(err),
            MockReply::BrokenStream { partial } => vec![
                Ok(ChatChunk::content(partial)),
                Err(InferenceError::StreamInterrupted("connection reset".into())),
            ],
        };
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let endpoint = MockInferenceEndpoint::new().with_reply("one").with_reply("two");

        let first = endpoint.chat(request()).await.unwrap();
        let second = endpoint.chat(request()).await.unwrap();

        assert_eq!(first.message.content(), "one");
        assert_eq!(second.message.content(), "two");
        assert_eq!(endpoint.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_queue_returns_default() {
        let endpoint = MockInferenceEndpoint::new();
        let response = endpoint.chat(request()).await.unwrap();
        assert_eq!(response.message.content(), "Mock response");
    }

    #[tokio::test]
    async fn tool_call_reply_carries_calls() {
        let endpoint = MockInferenceEndpoint::new().with_tool_call("tool_retriever", json!({}));
        let response = endpoint.chat(request()).await.unwrap();
        assert_eq!(response.message.tool_calls()[0].name(), "tool_retriever");
    }

    #[tokio::test]
    async fn stream_splits_content_and_ends_with_usage() {
        let endpoint = MockInferenceEndpoint::new().with_reply("hello there friend");
        let chunks: Vec<_> = endpoint
            .chat_stream(request())
            .await
            .unwrap()
            .collect()
            .await;

        let text: String = chunks
            .iter()
            .filter_map(|c| c.as_ref().ok())
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(text, "hello there friend");
        assert!(chunks.last().unwrap().as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn broken_stream_yields_partial_then_error() {
        let endpoint = MockInferenceEndpoint::new().with(MockReply::BrokenStream {
            partial: "Hel".into(),
        });
        let chunks: Vec<_> = endpoint
            .chat_stream(request())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn records_requests() {
        let endpoint = MockInferenceEndpoint::new();
        endpoint.chat(request()).await.unwrap();
        assert_eq!(endpoint.get_calls()[0].messages[0].content(), "hi");
    }
}
