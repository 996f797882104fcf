//! Remote-function backend - synchronous invocation of a managed function.
//!
//! Functions are addressed by id and region through an HTTP invoke endpoint
//! (a function gateway in front of the provider). The URL comes from a
//! template with `{region}` and `{function}` placeholders. A payload with an
//! `errorMessage` key is the provider's way of reporting a failed run.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::domain::tools::{ExecutionBackend, ToolDefinition};
use crate::ports::{BackendError, ToolBackend};

/// Default invoke URL template.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str =
    "https://lambda.{region}.amazonaws.com/2015-03-31/functions/{function}/invocations";

/// Configuration for remote function calls.
#[derive(Debug, Clone)]
pub struct RemoteFunctionConfig {
    pub endpoint_template: String,
    /// Bearer token for the gateway, if it needs one.
    token: Option<Secret<String>>,
    pub timeout: Duration,
}

impl Default for RemoteFunctionConfig {
    fn default() -> Self {
        Self {
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RemoteFunctionConfig {
    pub fn with_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = template.into();
        self
    }

    pub fn with_token(mut self, token: Secret<String>) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn invoke_url(&self, function_id: &str, region: &str) -> String {
        self.endpoint_template
            .replace("{region}", region)
            .replace("{function}", function_id)
    }
}

/// Runs remote-function tools.
#[derive(Debug, Clone)]
pub struct RemoteFunctionBackend {
    config: RemoteFunctionConfig,
    client: Client,
}

impl RemoteFunctionBackend {
    pub fn new(config: RemoteFunctionConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

/// Maps the provider's error convention onto a failure.
fn check_function_error(value: serde_json::Value) -> Result<serde_json::Value, BackendError> {
    match value.get("errorMessage") {
        Some(message) => {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            Err(BackendError::failed(format!("Remote function error: {}", message)))
        }
        None => Ok(value),
    }
}

#[async_trait]
impl ToolBackend for RemoteFunctionBackend {
    async fn invoke(
        &self,
        definition: &ToolDefinition,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let (function_id, region) = match definition.backend() {
            ExecutionBackend::RemoteFunction { function_id, region } => (function_id, region),
            other => {
                return Err(BackendError::Misconfigured(format!(
                    "remote function backend cannot run a {} tool",
                    other.kind()
                )))
            }
        };

        let timeout_secs = self.config.timeout.as_secs();
        let mut request = self
            .client
            .post(self.config.invoke_url(function_id, region))
            .timeout(self.config.timeout)
            .json(payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { timeout_secs }
            } else {
                BackendError::failed(format!("Remote function call failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { timeout_secs }
            } else {
                BackendError::failed(format!("Remote function response unreadable: {}", e))
            }
        })?;

        // Error payloads come back with a 200 as often as not, so parse first.
        let value = serde_json::from_str::<serde_json::Value>(&body).map_err(|_| {
            BackendError::failed(format!(
                "Remote function returned HTTP {} with non-JSON body",
                status.as_u16()
            ))
        })?;
        let value = check_function_error(value)?;

        if !status.is_success() {
            return Err(BackendError::failed(format!(
                "Remote function returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(value)
    }
}
