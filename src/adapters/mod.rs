//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Inference endpoints (Ollama, scripted mock)
//! - `backends` - Tool execution backends (script, remote function, webhook)
//! - `store` - In-memory tool store and YAML catalog
//! - `postgres` - PostgreSQL tool store

pub mod ai;
pub mod backends;
pub mod postgres;
pub mod store;

pub use ai::{MockInferenceEndpoint, MockReply, OllamaConfig, OllamaProvider};
pub use backends::{RemoteFunctionBackend, RemoteFunctionConfig, ScriptBackend, WebhookBackend};
pub use postgres::PostgresToolStore;
pub use store::{InMemoryToolStore, ToolCatalog};
