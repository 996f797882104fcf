//! End-to-end conversation scenarios through the public API.
//!
//! Uses the scripted inference endpoint, the in-memory tool store and real
//! script backends running `sh` fixtures from a temporary directory.

use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

use lifepal::adapters::{
    InMemoryToolStore, MockInferenceEndpoint, MockReply, RemoteFunctionBackend,
    RemoteFunctionConfig, ScriptBackend, WebhookBackend,
};
use lifepal::application::{
    ConversationError, ConversationEvent, ConversationOrchestrator, ExchangeCommand, StopReason,
    ToolBackends, ToolExecutor, ToolRegistry,
};
use lifepal::domain::conversation::{ConversationHistory, Role, TokenUsage, ToolCallRequest};
use lifepal::domain::tools::{ExecutionBackend, ToolCategory, ToolDefinition, TOOL_RETRIEVER_NAME};
use lifepal::domain::Principal;
use lifepal::ports::InferenceError;

// =============================================================================
// Test Infrastructure
// =============================================================================

const ECHO_SCRIPT: &str = "#!/bin/sh\ncat > /dev/null\necho '{\"success\": true, \"logged\": true}'\n";

struct Harness {
    endpoint: Arc<MockInferenceEndpoint>,
    store: Arc<InMemoryToolStore>,
    orchestrator: ConversationOrchestrator,
    _scripts: tempfile::TempDir,
}

fn script_tool(name: &str, category: &str) -> ToolDefinition {
    ToolDefinition::new(
        name,
        category,
        format!("{} tool", name),
        ExecutionBackend::Script { script_path: "echo.sh".to_string(), timeout_secs: 5 },
    )
}

fn harness(endpoint: MockInferenceEndpoint) -> Harness {
    let scripts = tempfile::tempdir().unwrap();
    std::fs::write(scripts.path().join("echo.sh"), ECHO_SCRIPT).unwrap();

    let store = Arc::new(
        InMemoryToolStore::new()
            .with_category(ToolCategory::new("wellbeing", "Mood and energy").with_order(1))
            .with_category(ToolCategory::new("tasks", "To-do items").with_order(2))
            .with_tool(script_tool("log_mood", "wellbeing"))
            .with_tool(script_tool("mood_history", "wellbeing"))
            .with_tool(script_tool("create_task", "tasks")),
    );
    let backends = ToolBackends {
        script: Arc::new(
            ScriptBackend::new()
                .with_interpreter("sh")
                .with_script_root(scripts.path()),
        ),
        remote_function: Arc::new(RemoteFunctionBackend::new(RemoteFunctionConfig::default())),
        webhook: Arc::new(WebhookBackend::new()),
    };
    let executor = ToolExecutor::new(store.clone(), backends);
    let registry = Arc::new(ToolRegistry::new(store.clone(), executor));

    let endpoint = Arc::new(endpoint);
    let orchestrator = ConversationOrchestrator::new(endpoint.clone(), registry);
    Harness { endpoint, store, orchestrator, _scripts: scripts }
}

fn user() -> Principal {
    Principal::authenticated("user-42", "grace@example.com", "grace")
}

fn offered_names(tools: &[serde_json::Value]) -> Vec<String> {
    tools
        .iter()
        .filter_map(|t| t["function"]["name"].as_str().map(str::to_string))
        .collect()
}

// =============================================================================
// Buffered Mode
// =============================================================================

#[tokio::test]
async fn greeting_without_tools_is_a_single_round_trip() {
    let h = harness(MockInferenceEndpoint::new().with_reply("Hi there!"));

    let command = ExchangeCommand::new(ConversationHistory::default(), "hello", user()).with_tools(false);
    let reply = h.orchestrator.run(command).await.unwrap();

    assert_eq!(h.endpoint.call_count(), 1);
    assert_eq!(reply.content, "Hi there!");
    assert_eq!(reply.stop_reason, StopReason::Final);
    assert_eq!(reply.history.len(), 2);
    assert_eq!(reply.history.messages[0].role(), Role::User);
    assert_eq!(reply.history.messages[1].role(), Role::Assistant);
    assert!(h.endpoint.get_calls()[0].tools.is_empty());
}

#[tokio::test]
async fn model_that_never_stops_is_capped_at_ten_calls() {
    let h = harness(MockInferenceEndpoint::new().with_fallback(MockReply::Message {
        content: String::new(),
        tool_calls: vec![ToolCallRequest::new("", TOOL_RETRIEVER_NAME, json!({"query": "mood"}))],
        usage: TokenUsage::new(1, 1),
    }));

    let command = ExchangeCommand::new(ConversationHistory::default(), "loop forever", user());
    let reply = h.orchestrator.run(command).await.unwrap();

    assert_eq!(h.endpoint.call_count(), 10);
    assert_eq!(reply.stop_reason, StopReason::IterationLimitExceeded);
    assert!(reply.content.starts_with("I'm sorry, I couldn't complete that request."));
    // user + 10 x (assistant call, tool result); the apology is not stored
    assert_eq!(reply.history.len(), 21);
    assert!(reply
        .history
        .messages
        .iter()
        .all(|m| m.content() != reply.content));
}

#[tokio::test]
async fn retriever_discovery_offers_exactly_the_category_tools() {
    let h = harness(
        MockInferenceEndpoint::new()
            .with_tool_call(TOOL_RETRIEVER_NAME, json!({"intent_category": "wellbeing"}))
            .with_tool_call("log_mood", json!({"score": 7}))
            .with_reply("Logged your mood."),
    );

    let command = ExchangeCommand::new(ConversationHistory::default(), "I feel like a 7", user());
    let reply = h.orchestrator.run(command).await.unwrap();

    let calls = h.endpoint.get_calls();
    assert_eq!(offered_names(&calls[0].tools), vec![TOOL_RETRIEVER_NAME]);

    let mut second = offered_names(&calls[1].tools);
    second.sort();
    assert_eq!(second, vec!["log_mood", "mood_history", TOOL_RETRIEVER_NAME]);

    assert_eq!(reply.content, "Logged your mood.");
    assert_eq!(h.store.records().len(), 1);
    assert_eq!(h.store.records()[0].tool_name(), "log_mood");
    assert_eq!(h.store.tool("log_mood").unwrap().stats().success_count, 1);
}

#[tokio::test]
async fn unknown_tool_is_reported_back_to_the_model() {
    let h = harness(
        MockInferenceEndpoint::new()
            .with_tool_call("teleport", json!({}))
            .with_reply("I can't do that."),
    );

    let command = ExchangeCommand::new(ConversationHistory::default(), "beam me up", user());
    let reply = h.orchestrator.run(command).await.unwrap();

    let tool_message = reply
        .history
        .messages
        .iter()
        .find(|m| m.role() == Role::Tool)
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(tool_message.content()).unwrap();
    assert_eq!(payload["success"], false);
    assert!(payload["error"].as_str().unwrap().contains("teleport"));
    assert_eq!(reply.content, "I can't do that.");
    assert!(h.store.records().is_empty());
}

#[tokio::test]
async fn endpoint_failure_surfaces_as_conversation_error() {
    let h = harness(MockInferenceEndpoint::new().with_error(InferenceError::unavailable("down")));

    let command = ExchangeCommand::new(ConversationHistory::default(), "hello", user());
    let err = h.orchestrator.run(command).await.unwrap_err();

    assert!(matches!(err, ConversationError::Inference(_)));
    assert!(err.user_message().contains("trouble connecting"));
}

// =============================================================================
// Streaming Mode
// =============================================================================

#[tokio::test]
async fn streaming_reports_discovery_count() {
    let h = harness(
        MockInferenceEndpoint::new()
            .with_tool_call(TOOL_RETRIEVER_NAME, json!({"category": "wellbeing"}))
            .with_reply("Here is what I can do."),
    );

    let command = ExchangeCommand::new(ConversationHistory::default(), "what can you do?", user());
    let events: Vec<_> = h.orchestrator.run_streaming(command).collect().await;

    let discovered = events
        .iter()
        .find_map(|e| match e {
            ConversationEvent::ToolsDiscovered { count, .. } => Some(*count),
            _ => None,
        })
        .unwrap();
    assert_eq!(discovered, 2);

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            ConversationEvent::Content { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Here is what I can do.");
    assert!(matches!(events.last(), Some(ConversationEvent::Completed { .. })));
}

#[tokio::test]
async fn interrupted_stream_appends_notice_and_fails() {
    let h = harness(MockInferenceEndpoint::new().with(MockReply::BrokenStream {
        partial: "Let me think".to_string(),
    }));

    let command = ExchangeCommand::new(ConversationHistory::default(), "hello", user());
    let events: Vec<_> = h.orchestrator.run_streaming(command).collect().await;

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            ConversationEvent::Content { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert!(text.starts_with("Let me think"));
    assert!(text.ends_with("Error: Connection to AI service interrupted."));
    assert!(matches!(events.last(), Some(ConversationEvent::Failed { .. })));
}
