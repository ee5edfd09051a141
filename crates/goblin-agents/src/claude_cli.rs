use std::time::Duration;

use async_trait::async_trait;
use goblin_models::ModelConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::model::LanguageModel;

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&ModelConfig> for ClaudeCliConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Invoke the `claude` CLI with a single prompt. Returns the raw stdout text.
pub async fn invoke_claude(prompt: &str, config: &ClaudeCliConfig) -> Result<String, AgentError> {
    debug!(model = %config.model, prompt_len = prompt.len(), "Invoking claude CLI");

    let result = tokio::time::timeout(config.timeout, async {
        Command::new("claude")
            .args([
                "-p",
                prompt,
                "--model",
                &config.model,
                "--output-format",
                "text",
            ])
            .output()
            .await
    })
    .await
    .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
    .map_err(|e| AgentError::Cli(format!("Failed to spawn claude: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::Cli(format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli("Claude returned empty response".to_string()));
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// [`LanguageModel`] backed by the local `claude` CLI.
pub struct ClaudeCliModel {
    config: ClaudeCliConfig,
}

impl ClaudeCliModel {
    pub fn new(config: ClaudeCliConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LanguageModel for ClaudeCliModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn ensure_available(&self) -> Result<(), AgentError> {
        if check_cli_available().await {
            Ok(())
        } else {
            Err(AgentError::ModelUnavailable(
                "claude CLI not found on PATH".to_string(),
            ))
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        invoke_claude(prompt, &self.config).await
    }
}
