//! Conversation orchestrator - the tool-calling loop.
//!
//! One exchange walks the states
//! `BUILD_REQUEST -> AWAIT_MODEL -> {FINAL | TOOL_CALL_PENDING -> EXECUTE_TOOLS -> BUILD_REQUEST}`
//! until the model answers without tool calls or the iteration cap is hit.
//!
//! The system prompt is rebuilt for every request and never stored in the
//! history. The offered tool set starts with the bootstrap retriever and grows
//! as the retriever returns definitions. Tool failures are fed back to the
//! model as tool-role messages; only inference failures end an exchange
//! early.
//!
//! # Example
//!
//! ```ignore
//! let command = ExchangeCommand::new(history, "What can you do?", principal);
//! let reply = orchestrator.run(command).await?;
//! save(reply.history);
//! ```

mod catalog;
mod events;

pub use catalog::OfferedTools;
pub use events::{ConversationEvent, ConversationEventStream, StopReason};

use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::conversation::{
    drop_leading_tool_results, prune, validate_interleaving, with_system_prompt, ChatMessage,
    ConversationHistory, InterleavingError, Role, SystemPromptBuilder, TokenUsage,
    ToolCallRequest,
};
use crate::domain::foundation::ConversationId;
use crate::domain::principal::Principal;
use crate::domain::tools::{ToolOutcome, TOOL_RETRIEVER_NAME};
use crate::ports::{ChatRequest, InferenceEndpoint, InferenceError};

use super::{RegistryExecution, ToolRegistry};

/// Returned instead of a model answer when the iteration cap is hit.
pub const ITERATION_LIMIT_MESSAGE: &str =
    "I'm sorry, I couldn't complete that request. Please try rephrasing or breaking it into smaller steps.";

/// Shown to the user when the inference endpoint fails.
pub const INFERENCE_FAILURE_MESSAGE: &str =
    "I'm sorry, I'm having trouble connecting to my brain. Please try again later.";

/// Appended to the content stream when a streaming exchange fails.
pub const STREAM_FAILURE_NOTICE: &str = "\n\nError: Connection to AI service interrupted.";

const EVENT_BUFFER: usize = 64;

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Maximum model calls per exchange.
    pub max_iterations: usize,
    /// Context window the pruner budgets against.
    pub max_context_tokens: u64,
    pub temperature: Option<f32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_context_tokens: 32_768,
            temperature: None,
        }
    }
}

/// Command to run one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeCommand {
    /// Prior turns and the token usage reported for them.
    pub history: ConversationHistory,
    pub user_message: String,
    /// When false the model is offered no tools.
    pub tools_enabled: bool,
    pub principal: Principal,
    /// Attached to audit records.
    pub conversation_id: Option<ConversationId>,
}

impl ExchangeCommand {
    /// Creates a command with tools enabled.
    pub fn new(
        history: ConversationHistory,
        user_message: impl Into<String>,
        principal: Principal,
    ) -> Self {
        Self {
            history,
            user_message: user_message.into(),
            tools_enabled: true,
            principal,
            conversation_id: None,
        }
    }

    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }
}

/// Result of a buffered exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationReply {
    /// Final assistant text, or the iteration-limit apology.
    pub content: String,
    /// Updated history for the caller to persist. Its usage is the total for
    /// this exchange.
    pub history: ConversationHistory,
    pub stop_reason: StopReason,
    /// Model calls made.
    pub iterations: usize,
}

/// Errors that end an exchange.
#[derive(Debug, Clone, Error)]
pub enum ConversationError {
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Invalid history: {0}")]
    InvalidHistory(#[from] InterleavingError),

    /// The streaming consumer went away.
    #[error("Exchange cancelled")]
    Cancelled,
}

impl ConversationError {
    /// Text safe to show the end user in place of a response.
    pub fn user_message(&self) -> &'static str {
        INFERENCE_FAILURE_MESSAGE
    }
}

/// Runs exchanges against an inference endpoint and a tool registry.
///
/// Cheap to clone; clones share the endpoint and registry.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    endpoint: Arc<dyn InferenceEndpoint>,
    registry: Arc<ToolRegistry>,
    prompt: Arc<SystemPromptBuilder>,
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    pub fn new(endpoint: Arc<dyn InferenceEndpoint>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            endpoint,
            registry,
            prompt: Arc::new(SystemPromptBuilder::default()),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prompt_builder(mut self, prompt: SystemPromptBuilder) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one exchange with buffered model calls.
    ///
    /// # Errors
    ///
    /// - `InvalidHistory` if the supplied history breaks call/result interleaving
    /// - `Inference` if a model call fails; show `user_message()` instead of a reply
    pub async fn run(&self, command: ExchangeCommand) -> Result<ConversationReply, ConversationError> {
        self.drive(command, None).await
    }

    /// Runs one exchange with incremental model calls.
    ///
    /// Content is forwarded as it arrives. Dropping the stream cancels the
    /// exchange at its next event; nothing should be persisted in that case.
    pub fn run_streaming(&self, command: ExchangeCommand) -> ConversationEventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let orchestrator = self.clone();

        tokio::spawn(async move {
            match orchestrator.drive(command, Some(&tx)).await {
                Ok(reply) => {
                    let _ = tx
                        .send(ConversationEvent::Completed {
                            content: reply.content,
                            history: reply.history,
                            stop_reason: reply.stop_reason,
                        })
                        .await;
                }
                Err(ConversationError::Cancelled) => {
                    tracing::debug!("Streaming consumer dropped; exchange abandoned");
                }
                Err(err) => {
                    let _ = tx
                        .send(ConversationEvent::Content {
                            delta: STREAM_FAILURE_NOTICE.to_string(),
                        })
                        .await;
                    let _ = tx
                        .send(ConversationEvent::Failed {
                            message: err.user_message().to_string(),
                        })
                        .await;
                }
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }

    /// The state machine shared by both modes. `events` is set when streaming.
    async fn drive(
        &self,
        command: ExchangeCommand,
        events: Option<&mpsc::Sender<ConversationEvent>>,
    ) -> Result<ConversationReply, ConversationError> {
        let ExchangeCommand {
            history,
            user_message,
            tools_enabled,
            principal,
            conversation_id,
        } = command;

        validate_interleaving(&history.messages).map_err(|err| {
            tracing::warn!(error = %err, "Rejected conversation history");
            err
        })?;

        // BUILD_REQUEST
        let before = history.messages.len();
        // May keep fewer than the pruner's minimum when the tail opens on tool results.
        let mut messages = fit_to_budget(
            history.messages,
            history.usage.total_tokens,
            self.config.max_context_tokens,
        );
        if messages.len() != before {
            tracing::debug!(
                before,
                after = messages.len(),
                total_tokens = history.usage.total_tokens,
                max_tokens = self.config.max_context_tokens,
                "Pruned conversation history"
            );
        }
        messages.push(ChatMessage::user(user_message));

        let system_prompt = self.system_prompt(tools_enabled).await;
        let mut offered = if tools_enabled {
            OfferedTools::bootstrap(self.registry.get_bootstrap_tool())
        } else {
            OfferedTools::none()
        };
        let mut usage = TokenUsage::default();

        for iteration in 1..=self.config.max_iterations {
            let mut request = ChatRequest::new(with_system_prompt(&messages, &system_prompt))
                .with_tools(offered.schemas());
            if let Some(temperature) = self.config.temperature {
                request = request.with_temperature(temperature);
            }

            // AWAIT_MODEL
            let (reply, call_usage) = match events {
                None => self.call_buffered(request).await,
                Some(tx) => self.call_streaming(request, tx).await,
            }
            .map_err(|err| {
                if let ConversationError::Inference(inner) = &err {
                    tracing::error!(
                        iteration,
                        conversation_id = ?conversation_id,
                        error = %inner,
                        "Inference call failed"
                    );
                }
                err
            })?;
            usage.add(call_usage);

            if !tools_enabled || !reply.has_tool_calls() {
                // FINAL
                let content = reply.content().to_string();
                messages.push(ChatMessage::assistant(content.clone()));
                tracing::info!(
                    iteration,
                    tools_offered = offered.len(),
                    total_tokens = usage.total_tokens,
                    "Exchange completed"
                );
                return Ok(ConversationReply {
                    content,
                    history: ConversationHistory::new(messages, usage),
                    stop_reason: StopReason::Final,
                    iterations: iteration,
                });
            }

            // TOOL_CALL_PENDING
            let calls = with_call_ids(reply.tool_calls());
            messages.push(ChatMessage::assistant_with_tool_calls(
                reply.content(),
                calls.clone(),
            ));

            // EXECUTE_TOOLS, strictly in order: a retriever call changes what later calls see
            for call in &calls {
                emit(
                    events,
                    ConversationEvent::ToolStarted {
                        name: call.name().to_string(),
                        call_id: call.id().to_string(),
                    },
                )
                .await?;

                let execution = self
                    .execute_call(call, &principal, conversation_id)
                    .await;

                if call.name() == TOOL_RETRIEVER_NAME && execution.outcome.reports_success() {
                    offered.extend(&execution.discovered);
                    let names: Vec<String> = execution
                        .discovered
                        .iter()
                        .map(|d| d.name().to_string())
                        .collect();
                    tracing::info!(
                        iteration,
                        count = names.len(),
                        tools = ?names,
                        "Tools discovered"
                    );
                    emit(
                        events,
                        ConversationEvent::ToolsDiscovered {
                            count: names.len(),
                            names,
                        },
                    )
                    .await?;
                }

                emit(
                    events,
                    ConversationEvent::ToolCompleted {
                        name: call.name().to_string(),
                        call_id: call.id().to_string(),
                        status: execution.outcome.status(),
                        success: execution.outcome.reports_success(),
                    },
                )
                .await?;

                messages.push(ChatMessage::tool_result(
                    call.id(),
                    call.name(),
                    execution.outcome.to_payload().to_string(),
                ));
            }
        }

        tracing::warn!(
            max_iterations = self.config.max_iterations,
            conversation_id = ?conversation_id,
            "Iteration limit exceeded"
        );
        emit(
            events,
            ConversationEvent::Content {
                delta: ITERATION_LIMIT_MESSAGE.to_string(),
            },
        )
        .await?;

        Ok(ConversationReply {
            content: ITERATION_LIMIT_MESSAGE.to_string(),
            history: ConversationHistory::new(messages, usage),
            stop_reason: StopReason::IterationLimitExceeded,
            iterations: self.config.max_iterations,
        })
    }

    async fn system_prompt(&self, tools_enabled: bool) -> String {
        let categories = if tools_enabled {
            self.registry.list_categories().await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Failed to load tool categories for prompt");
                Vec::new()
            })
        } else {
            Vec::new()
        };
        self.prompt.build(Utc::now(), &categories, tools_enabled)
    }

    async fn call_buffered(
        &self,
        request: ChatRequest,
    ) -> Result<(ChatMessage, TokenUsage), ConversationError> {
        let response = self.endpoint.chat(request).await?;
        Ok((response.message, response.usage))
    }

    /// Accumulates chunks into one assistant message, forwarding content as it comes.
    async fn call_streaming(
        &self,
        request: ChatRequest,
        tx: &mpsc::Sender<ConversationEvent>,
    ) -> Result<(ChatMessage, TokenUsage), ConversationError> {
        let mut stream = self.endpoint.chat_stream(request).await?;
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = TokenUsage::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.content.is_empty() {
                content.push_str(&chunk.content);
                tx.send(ConversationEvent::Content { delta: chunk.content })
                    .await
                    .map_err(|_| ConversationError::Cancelled)?;
            }
            tool_calls.extend(chunk.tool_calls);
            if let Some(chunk_usage) = chunk.usage {
                usage = chunk_usage;
            }
            if chunk.done {
                break;
            }
        }

        Ok((ChatMessage::assistant_with_tool_calls(content, tool_calls), usage))
    }

    async fn execute_call(
        &self,
        call: &ToolCallRequest,
        principal: &Principal,
        conversation_id: Option<ConversationId>,
    ) -> RegistryExecution {
        match call.parsed_arguments() {
            Ok(arguments) => {
                self.registry
                    .execute(call.name(), &arguments, principal, conversation_id)
                    .await
            }
            Err(err) => {
                tracing::warn!(tool = call.name(), error = %err, "Malformed tool call");
                RegistryExecution {
                    outcome: ToolOutcome::Failure(err),
                    discovered: Vec::new(),
                }
            }
        }
    }
}

/// Prunes `messages` to the context budget.
///
/// A leading system message is held out of pruning and put back in front.
/// Tool results left at the head of the pruned tail are dropped, so the tail
/// can come out shorter than the pruner's minimum.
fn fit_to_budget(mut messages: Vec<ChatMessage>, total_tokens: u64, max_tokens: u64) -> Vec<ChatMessage> {
    let system = match messages.first() {
        Some(first) if first.role() == Role::System => Some(messages.remove(0)),
        _ => None,
    };
    let mut kept = drop_leading_tool_results(prune(messages, total_tokens, max_tokens));
    if let Some(system) = system {
        kept.insert(0, system);
    }
    kept
}

/// Gives every call a non-empty id so results can be matched to it.
fn with_call_ids(calls: &[ToolCallRequest]) -> Vec<ToolCallRequest> {
    calls
        .iter()
        .map(|call| {
            if call.id().is_empty() {
                ToolCallRequest::new(
                    format!("call_{}", uuid::Uuid::new_v4().simple()),
                    call.name(),
                    call.arguments().clone(),
                )
            } else {
                call.clone()
            }
        })
        .collect()
}

async fn emit(
    events: Option<&mpsc::Sender<ConversationEvent>>,
    event: ConversationEvent,
) -> Result<(), ConversationError> {
    match events {
        Some(tx) => tx.send(event).await.map_err(|_| ConversationError::Cancelled),
        None => Ok(()),
    }
}
