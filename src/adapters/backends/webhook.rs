//! Webhook backend - calls an external HTTP endpoint.
//!
//! GET tools receive their `parameters` as query string; POST tools receive
//! the full invocation payload as JSON body. Any non-2xx status or non-JSON
//! body is a failure.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::tools::{ExecutionBackend, ToolDefinition, WebhookMethod};
use crate::ports::{BackendError, ToolBackend};

/// Runs webhook tools.
#[derive(Debug, Clone, Default)]
pub struct WebhookBackend {
    client: Client,
}

impl WebhookBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares an existing client (connection pool).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Flattens `parameters` into query pairs; nested values are JSON-encoded.
fn query_pairs(payload: &serde_json::Value) -> Vec<(String, String)> {
    payload
        .get("parameters")
        .and_then(serde_json::Value::as_object)
        .map(|params| {
            params
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ToolBackend for WebhookBackend {
    async fn invoke(
        &self,
        definition: &ToolDefinition,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let (url, method, headers, timeout_secs) = match definition.backend() {
            ExecutionBackend::Webhook { url, method, headers, timeout_secs } => {
                (url, *method, headers, *timeout_secs)
            }
            other => {
                return Err(BackendError::Misconfigured(format!(
                    "webhook backend cannot run a {} tool",
                    other.kind()
                )))
            }
        };

        let mut request = match method {
            WebhookMethod::Get => self.client.get(url).query(&query_pairs(payload)),
            WebhookMethod::Post => self.client.post(url).json(payload),
        }
        .timeout(Duration::from_secs(timeout_secs))
        .header("Content-Type", "application/json");

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { timeout_secs }
            } else {
                BackendError::failed(format!("Webhook request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout { timeout_secs }
            } else {
                BackendError::failed(format!("Webhook response unreadable: {}", e))
            }
        })?;

        if !status.is_success() {
            return Err(BackendError::failed(format!(
                "Webhook returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&body).map_err(|_| {
            BackendError::failed(format!(
                "Webhook response is not valid JSON: {}",
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}
