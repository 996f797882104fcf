use futures::StreamExt;
use sqlx::postgres::PgPoolOptions;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use lifepal::adapters::{
    InMemoryToolStore, OllamaConfig, OllamaProvider, PostgresToolStore, RemoteFunctionBackend,
    RemoteFunctionConfig, ScriptBackend, ToolCatalog, WebhookBackend,
};
use lifepal::application::{
    ConversationEvent, ConversationOrchestrator, ExchangeCommand, OrchestratorConfig,
    ToolBackends, ToolExecutor, ToolRegistry,
};
use lifepal::config::AppConfig;
use lifepal::domain::conversation::{ConversationHistory, SystemPromptBuilder};
use lifepal::domain::foundation::ConversationId;
use lifepal::domain::Principal;
use lifepal::ports::{InferenceEndpoint, ToolStore};
use lifepal::telemetry;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging);

    let store = build_store(&config).await?;
    let executor = ToolExecutor::new(store.clone(), build_backends(&config));
    let registry = Arc::new(ToolRegistry::new(store, executor));

    let mut ollama = OllamaConfig::new(&config.ollama.base_url)
        .with_model(&config.ollama.model)
        .with_timeout(config.ollama.timeout())
        .with_context_window(config.ollama.max_context_tokens);
    if let Some(temperature) = config.ollama.temperature {
        ollama = ollama.with_temperature(temperature);
    }
    let endpoint = Arc::new(OllamaProvider::new(ollama)?);
    if !endpoint.is_available().await {
        tracing::warn!(base_url = %config.ollama.base_url, "Ollama is not reachable");
    }

    let prompt = match &config.orchestrator.persona {
        Some(persona) => SystemPromptBuilder::new(persona.clone()),
        None => SystemPromptBuilder::default(),
    }
    .with_tool_instructions(config.orchestrator.include_tool_instructions);

    let orchestrator = ConversationOrchestrator::new(endpoint, registry)
        .with_prompt_builder(prompt)
        .with_config(OrchestratorConfig {
            max_iterations: config.orchestrator.max_iterations,
            max_context_tokens: config.ollama.max_context_tokens,
            temperature: config.ollama.temperature,
        });

    chat_loop(&orchestrator, local_principal()).await
}

/// Reads one user turn per line until EOF or `/quit`.
async fn chat_loop(orchestrator: &ConversationOrchestrator, principal: Principal) -> Result<(), BoxError> {
    let conversation_id = ConversationId::new();
    let mut history = ConversationHistory::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt_marker()?;
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message == "/quit" {
            break;
        }
        if message.is_empty() {
            prompt_marker()?;
            continue;
        }

        let command = ExchangeCommand::new(history.clone(), message, principal.clone())
            .with_conversation_id(conversation_id);
        let mut events = orchestrator.run_streaming(command);
        while let Some(event) = events.next().await {
            match event {
                ConversationEvent::Content { delta } => {
                    print!("{delta}");
                    std::io::stdout().flush()?;
                }
                ConversationEvent::ToolStarted { name, .. } => eprintln!("[running {name}]"),
                ConversationEvent::ToolsDiscovered { names, .. } => {
                    eprintln!("[discovered {}]", names.join(", "))
                }
                ConversationEvent::ToolCompleted { .. } => {}
                ConversationEvent::Completed { history: updated, .. } => history = updated,
                ConversationEvent::Failed { message } => {
                    tracing::error!(error = %message, "Exchange failed");
                }
            }
        }
        println!();
        prompt_marker()?;
    }
    Ok(())
}

fn prompt_marker() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

fn local_principal() -> Principal {
    let username = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    Principal::authenticated(username.clone(), "", username)
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn ToolStore>, BoxError> {
    let catalog = match &config.tools.catalog_path {
        Some(path) => Some(ToolCatalog::load(path).await?),
        None => None,
    };

    let Some(url) = config.database.url() else {
        tracing::info!("No database configured, using in-memory tool store");
        let store = catalog.map(ToolCatalog::into_store).unwrap_or_else(InMemoryToolStore::new);
        return Ok(Arc::new(store));
    };

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(url)
        .await?;
    let store = PostgresToolStore::new(pool);
    if config.database.run_migrations {
        store.migrate().await?;
    }
    if let Some(catalog) = catalog {
        for category in &catalog.categories {
            store.upsert_category(category).await?;
        }
        for tool in &catalog.tools {
            store.upsert_tool(tool).await?;
        }
        tracing::info!(tools = catalog.tools.len(), "Seeded tool catalog into database");
    }
    Ok(Arc::new(store))
}

fn build_backends(config: &AppConfig) -> ToolBackends {
    let mut script = ScriptBackend::new().with_interpreter(&config.tools.script_interpreter);
    if let Some(root) = &config.tools.script_root {
        script = script.with_script_root(root);
    }

    let mut remote = RemoteFunctionConfig::default()
        .with_endpoint_template(&config.tools.remote_function_endpoint)
        .with_timeout(config.tools.default_timeout());
    if let Some(token) = &config.tools.remote_function_token {
        remote = remote.with_token(token.clone());
    }

    ToolBackends {
        script: Arc::new(script),
        remote_function: Arc::new(RemoteFunctionBackend::new(remote)),
        webhook: Arc::new(WebhookBackend::new()),
    }
}
