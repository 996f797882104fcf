//! Script backend - runs a tool as a local subprocess.
//!
//! The invocation payload goes to the process's stdin as JSON; the process
//! must print a single JSON object to stdout and exit zero. The whole
//! exchange (stdin write included) is bounded by the tool's timeout, and the
//! child is killed if the timeout fires.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::tools::{ExecutionBackend, ToolDefinition};
use crate::ports::{BackendError, ToolBackend};

/// How many bytes of bad output are quoted back in error messages.
const OUTPUT_PREVIEW_CHARS: usize = 200;

/// Runs script tools.
#[derive(Debug, Clone, Default)]
pub struct ScriptBackend {
    /// Program the script path is passed to (`python3`); `None` runs the path directly.
    interpreter: Option<String>,
    /// Base directory for relative script paths.
    script_root: Option<PathBuf>,
}

impl ScriptBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        let interpreter = interpreter.into();
        self.interpreter = if interpreter.trim().is_empty() { None } else { Some(interpreter) };
        self
    }

    pub fn with_script_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.script_root = Some(root.into());
        self
    }

    fn resolve(&self, script_path: &str) -> PathBuf {
        let path = Path::new(script_path);
        match &self.script_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn command(&self, script: &Path) -> Command {
        match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(script);
                cmd
            }
            None => Command::new(script),
        }
    }
}

#[async_trait]
impl ToolBackend for ScriptBackend {
    async fn invoke(
        &self,
        definition: &ToolDefinition,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let (script_path, timeout_secs) = match definition.backend() {
            ExecutionBackend::Script { script_path, timeout_secs } => (script_path, *timeout_secs),
            other => {
                return Err(BackendError::Misconfigured(format!(
                    "script backend cannot run a {} tool",
                    other.kind()
                )))
            }
        };

        let script = self.resolve(script_path);
        if tokio::fs::metadata(&script).await.is_err() {
            return Err(BackendError::failed(format!(
                "Script not found: {}",
                script.display()
            )));
        }

        let input = serde_json::to_vec(payload)
            .map_err(|e| BackendError::failed(format!("Failed to encode payload: {}", e)))?;

        let mut child = self
            .command(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::failed(format!("Failed to start script: {}", e)))?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // A script may exit without reading its input.
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(error = %e, "script closed stdin early");
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), run)
            .await
            .map_err(|_| BackendError::Timeout { timeout_secs })?
            .map_err(|e| BackendError::failed(format!("Script execution failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::failed(format!("Script error: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match serde_json::from_str::<serde_json::Value>(stdout.trim()) {
            Ok(value @ serde_json::Value::Object(_)) => Ok(value),
            Ok(_) => Err(BackendError::failed("Script output must be a JSON object")),
            Err(_) => Err(BackendError::failed(format!(
                "Script output is not valid JSON: {}",
                stdout.chars().take(OUTPUT_PREVIEW_CHARS).collect::<String>()
            ))),
        }
    }
}
