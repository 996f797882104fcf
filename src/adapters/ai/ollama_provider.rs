//! Ollama Provider - InferenceEndpoint backed by a local Ollama server.
//!
//! Talks to `/api/chat` with tool calling. Buffered calls send
//! `stream: false`; incremental calls read the JSON Lines body, one
//! complete chunk object per line.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OllamaConfig::new("http://localhost:11434")
//!     .with_model("llama3.1")
//!     .with_timeout(Duration::from_secs(210));
//!
//! let provider = OllamaProvider::new(config)?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::conversation::{ChatMessage, Role, TokenUsage, ToolCallRequest};
use crate::ports::{ChatChunk, ChatRequest, ChatResponse, ChatStream, InferenceEndpoint, InferenceError};

/// Stream buffers beyond this size abort the stream.
const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model to use (e.g., "llama3.1", "qwen2.5").
    pub model: String,
    /// Request timeout, covering the whole streamed response.
    pub timeout: Duration,
    /// Context window passed as `num_ctx`.
    pub context_window: Option<u64>,
    pub temperature: Option<f32>,
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: "llama3.1".to_string(),
            timeout: Duration::from_secs(210),
            context_window: None,
            temperature: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Ollama chat provider.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Creates a provider; fails only if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::unavailable(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Converts our request to Ollama's format.
    fn to_ollama_request(&self, request: &ChatRequest, stream: bool) -> OllamaRequest {
        let temperature = request.temperature.or(self.config.temperature);
        let options = if temperature.is_some() || self.config.context_window.is_some() {
            Some(OllamaOptions {
                temperature,
                num_ctx: self.config.context_window,
            })
        } else {
            None
        };

        OllamaRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(OllamaMessage::from_domain).collect(),
            tools: request.tools.clone(),
            stream,
            options,
        }
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<Response, InferenceError> {
        let body = self.to_ollama_request(request, stream);

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        self.handle_response_status(response).await
    }

    fn map_transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if e.is_connect() {
            InferenceError::network(format!("Connection failed: {}", e))
        } else {
            InferenceError::network(e.to_string())
        }
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, InferenceError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            404 => Err(InferenceError::ModelNotFound(self.config.model.clone())),
            500..=599 => Err(InferenceError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            code => Err(InferenceError::Http {
                status: code,
                message: error_body,
            }),
        }
    }

    /// Names of the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let response = self.handle_response_status(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::parse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl InferenceEndpoint for OllamaProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        let response = self.send(&request, false).await?;
        let chunk: OllamaChunk = response
            .json()
            .await
            .map_err(|e| InferenceError::parse(format!("Invalid chat response: {}", e)))?;

        let usage = chunk.usage();
        let (content, tool_calls) = chunk.message.map(OllamaMessage::into_parts).unwrap_or_default();

        Ok(ChatResponse {
            message: ChatMessage::assistant_with_tool_calls(content, tool_calls),
            usage,
            model: chunk.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, InferenceError> {
        let response = self.send(&request, true).await?;

        let stream = decode_lines(response.bytes_stream());
        Ok(Box::pin(stream))
    }

    async fn is_available(&self) -> bool {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Ollama health probe failed");
                false
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Decoder state for one streamed response body.
struct LineDecoder<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<ChatChunk, InferenceError>>,
    saw_done: bool,
    finished: bool,
}

impl<S> LineDecoder<S> {
    fn queue(&mut self, results: Vec<Result<ChatChunk, InferenceError>>) {
        for result in results {
            if matches!(&result, Ok(chunk) if chunk.done) {
                self.saw_done = true;
            }
            self.pending.push_back(result);
        }
    }

    /// Parses whatever is left once the body ends. A body that ends before
    /// the `done` chunk was cut off.
    fn finish(&mut self) {
        self.finished = true;
        let tail = std::mem::take(&mut self.buffer);
        let tail = trim_line(&tail);
        if !tail.is_empty() {
            let result = parse_json_line(tail);
            let failed = result.is_err();
            self.queue(vec![result]);
            if failed {
                return;
            }
        }
        if !self.saw_done {
            self.pending.push_back(Err(InferenceError::StreamInterrupted(
                "stream ended before done".into(),
            )));
        }
    }
}

/// Turns a JSON Lines body into chat chunks.
fn decode_lines<S, B, E>(body: S) -> impl futures::Stream<Item = Result<ChatChunk, InferenceError>>
where
    S: futures::Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let decoder = LineDecoder {
        body: Box::pin(body),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        saw_done: false,
        finished: false,
    };

    stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.pending.pop_front() {
                return Some((item, decoder));
            }
            if decoder.finished {
                return None;
            }
            match decoder.body.next().await {
                Some(Ok(bytes)) => {
                    decoder.buffer.extend_from_slice(bytes.as_ref());
                    if decoder.buffer.len() > MAX_LINE_BYTES {
                        decoder.buffer.clear();
                        decoder.finished = true;
                        decoder
                            .pending
                            .push_back(Err(InferenceError::parse("Stream line exceeded 16 MiB")));
                    } else {
                        let results = drain_lines(&mut decoder.buffer);
                        decoder.queue(results);
                    }
                }
                Some(Err(e)) => {
                    decoder.finished = true;
                    decoder
                        .pending
                        .push_back(Err(InferenceError::StreamInterrupted(e.to_string())));
                }
                None => decoder.finish(),
            }
        }
    })
}

/// Splits complete lines off the buffer and parses each as a chunk.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<Result<ChatChunk, InferenceError>> {
    let mut results = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = trim_line(&line);
        if line.is_empty() {
            continue;
        }
        results.push(parse_json_line(line));
    }
    results
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r' | b' ') {
        end -= 1;
    }
    &line[..end]
}

/// Parses one JSON line of a streamed chat response.
fn parse_json_line(line: &[u8]) -> Result<ChatChunk, InferenceError> {
    let chunk: OllamaChunk = serde_json::from_slice(line)
        .map_err(|e| InferenceError::parse(format!("Invalid stream line: {}", e)))?;

    if let Some(error) = &chunk.error {
        return Err(InferenceError::StreamInterrupted(error.clone()));
    }

    let done = chunk.done.unwrap_or(false);
    let usage = if done { Some(chunk.usage()) } else { None };
    let (content, tool_calls) = chunk.message.map(OllamaMessage::into_parts).unwrap_or_default();

    Ok(ChatChunk {
        content,
        tool_calls,
        done,
        usage,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl OllamaMessage {
    fn from_domain(message: &ChatMessage) -> Self {
        let tool_calls = message
            .tool_calls()
            .iter()
            .map(|call| OllamaToolCall {
                id: Some(call.id().to_string()),
                function: OllamaFunction {
                    name: call.name().to_string(),
                    arguments: call
                        .parsed_arguments()
                        .unwrap_or_else(|_| call.arguments().clone()),
                },
            })
            .collect();

        Self {
            role: message.role().as_str().to_string(),
            content: message.content().to_string(),
            tool_calls,
            tool_name: match message.role() {
                Role::Tool => message.tool_name().map(str::to_string),
                _ => None,
            },
        }
    }

    fn into_parts(self) -> (String, Vec<ToolCallRequest>) {
        let calls = self
            .tool_calls
            .into_iter()
            .map(|tc| {
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
                ToolCallRequest::new(id, tc.function.name, tc.function.arguments)
            })
            .collect();
        (self.content, calls)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    model: Option<String>,
    message: Option<OllamaMessage>,
    done: Option<bool>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
    error: Option<String>,
}

impl OllamaChunk {
    fn usage(&self) -> TokenUsage {
        TokenUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
