use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use goblin_models::{ModelConfig, ModelProvider};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claude_cli::{ClaudeCliConfig, ClaudeCliModel};
use crate::error::AgentError;

/// A text-in, text-out language model. Mockable for testing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Fails when the model cannot be called at all (missing credential,
    /// missing binary). Stages check this before making any call.
    async fn ensure_available(&self) -> Result<(), AgentError>;

    async fn complete(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Build the model described by `config`.
pub fn build_model(config: &ModelConfig) -> Arc<dyn LanguageModel> {
    match config.provider {
        ModelProvider::ChatCompletions => Arc::new(ChatCompletionsModel::from_config(config)),
        ModelProvider::ClaudeCli => Arc::new(ClaudeCliModel::new(ClaudeCliConfig::from(config))),
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (Groq by default).
pub struct ChatCompletionsModel {
    http: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsModel {
    pub fn new(config: ModelConfig, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Read the API key from the environment variable named in the config.
    pub fn from_config(config: &ModelConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config.clone(), api_key)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, AgentError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelUnavailable(format!(
                "{} returned {status}: {body}",
                self.config.model
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| AgentError::Parse("Model returned no content".to_string()))
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn ensure_available(&self) -> Result<(), AgentError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(AgentError::ModelUnavailable(format!(
                "{} is not set",
                self.config.api_key_env
            ))),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AgentError::ModelUnavailable(format!("{} is not set", self.config.api_key_env))
        })?;

        debug!(model = %self.config.model, prompt_len = prompt.len(), "Calling chat completions");
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        tokio::time::timeout(timeout, self.send(api_key, prompt))
            .await
            .map_err(|_| AgentError::Timeout(self.config.timeout_seconds))?
    }
}
