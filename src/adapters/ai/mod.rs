//! Inference Endpoint Adapters.
//!
//! ## Available Adapters
//!
//! - `OllamaProvider` - Local Ollama server via `/api/chat`
//! - `MockInferenceEndpoint` - Scripted endpoint for testing

mod mock_provider;
mod ollama_provider;

pub use mock_provider::{MockInferenceEndpoint, MockReply};
pub use ollama_provider::{OllamaConfig, OllamaProvider};
