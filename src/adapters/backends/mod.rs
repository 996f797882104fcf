//! Tool Backend Adapters.
//!
//! - `ScriptBackend` - local subprocess, JSON over stdin/stdout
//! - `RemoteFunctionBackend` - region-scoped managed function
//! - `WebhookBackend` - external HTTP endpoint

mod remote_function;
mod script;
mod webhook;

#[cfg(test)]
pub(crate) mod test_server;

pub use remote_function::{RemoteFunctionBackend, RemoteFunctionConfig, DEFAULT_ENDPOINT_TEMPLATE};
pub use script::ScriptBackend;
pub use webhook::WebhookBackend;
